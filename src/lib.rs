//! Permissive HTML/XML engine.
//!
//! Three pieces wired in a straight line: a tokenizer that never fails,
//! a tree builder that applies HTML's tag-omission and scope rules to
//! repair malformed nesting, and a renderer that serializes the tree
//! back to markup with deterministic attribute order. Every byte
//! sequence parses; callers wanting strictness layer validation on top
//! of the tree.
//!
//! ```
//! let mut engine = laxdom::Engine::new();
//! engine.parse("<ul><li>one<li>two</ul>");
//! assert_eq!(engine.render(), "<ul><li>one</li><li>two</li></ul>");
//! ```
//!
//! The engine starts in auto mode: HTML rules apply, but the first
//! processing instruction mentioning `xml` switches it to XML mode,
//! which preserves name case and drops the HTML-only repair rules.
//!
//! Out of scope by design: selector matching, DOM query APIs, I/O,
//! encoding detection, and the full HTML5 insertion-mode state machine.

pub mod debug;
pub mod snapshot;
pub mod tags;

mod entities;
mod render;
mod tokenizer;
mod tree;
mod tree_builder;

pub use render::render_node;
pub use tokenizer::{Token, Tokenizer};
pub use tree::{Ancestors, Attrs, Descendants, Node, NodeData, NodeId, Tree};

use tree_builder::TreeBuilder;

/// Parsing/serialization mode.
///
/// `Auto` applies HTML rules but latches to `Xml` the first time a
/// processing instruction whose body mentions `xml` (case-insensitive)
/// is parsed. Setting `Html` or `Xml` explicitly disables the latch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Auto,
    Html,
    Xml,
}

/// The engine: owns the current tree and the mode flag.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    tree: Tree,
    mode: Mode,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            mode: Mode::Auto,
        }
    }

    /// Parse `source`, replacing the current tree. Total: malformed
    /// input is repaired, never rejected.
    pub fn parse(&mut self, source: &str) -> &mut Self {
        let xml = matches!(self.mode, Mode::Xml);
        let auto = matches!(self.mode, Mode::Auto);
        let mut tokenizer = Tokenizer::new(source, xml);
        let mut builder = TreeBuilder::new(xml, auto);
        while let Some(token) = tokenizer.next_token() {
            builder.process(token);
            // The builder may have latched XML off a PI; the tokenizer
            // must see that before it scans the next token.
            tokenizer.set_xml(builder.xml());
        }
        let (tree, latched_xml) = builder.finish();
        if auto && latched_xml {
            self.mode = Mode::Xml;
        }
        self.tree = tree;
        self
    }

    /// Serialize the current tree.
    pub fn render(&self) -> String {
        render_node(&self.tree, self.tree.root(), self.is_xml())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Replace the tree wholesale, e.g. after external transformation.
    pub fn set_tree(&mut self, tree: Tree) {
        self.tree = tree;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the mode for subsequent `parse` and `render` calls.
    /// `Mode::Auto` re-arms XML auto-detection.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn is_xml(&self) -> bool {
        matches!(self.mode, Mode::Xml)
    }
}

/// Parse `source` into a fresh auto-mode engine.
pub fn parse(source: &str) -> Engine {
    let mut engine = Engine::new();
    engine.parse(source);
    engine
}
