//! Token stream to tree, with HTML's error-tolerant nesting rules.
//!
//! The builder keeps a single insertion point into the arena; the stack
//! of open elements is the parent chain above it. All repair is
//! expressed as implicit end-tag events: tag-omission rules fire them
//! before a new element opens, and the end-tag walk fires them for
//! ancestors that never saw their own end tag. Nothing here can fail —
//! stray end tags are dropped and mismatched nesting is repaired.
//!
//! In XML mode the omission rules, the phrasing guard, void elements and
//! the `table` scope repair are all disabled; only explicit end tags and
//! self-closing syntax close elements.

use crate::tags;
use crate::tokenizer::Token;
use crate::tree::{Attrs, NodeData, NodeId, Tree};
use memchr::memchr2;

pub(crate) struct TreeBuilder {
    tree: Tree,
    current: NodeId,
    xml: bool,
    /// Auto-detection armed: an `<?xml …?>` PI may still latch XML mode.
    auto: bool,
}

impl TreeBuilder {
    pub(crate) fn new(xml: bool, auto: bool) -> Self {
        let tree = Tree::new();
        let current = tree.root();
        Self {
            tree,
            current,
            xml,
            auto,
        }
    }

    pub(crate) fn xml(&self) -> bool {
        self.xml
    }

    pub(crate) fn finish(self) -> (Tree, bool) {
        (self.tree, self.xml)
    }

    pub(crate) fn process(&mut self, token: Token) {
        match token {
            Token::Text(text) => {
                if text.is_empty() {
                    return;
                }
                // Repair can drop markup between two runs (a stray end
                // tag, say); keep character data contiguous so the tree
                // re-parses to the same shape it renders.
                if let Some(&last) = self.tree.children(self.current).last()
                    && let NodeData::Text(existing) = self.tree.data_mut(last)
                {
                    existing.push_str(&text);
                    return;
                }
                self.tree.append(self.current, NodeData::Text(text));
            }
            Token::Raw(text) => {
                self.tree.append(self.current, NodeData::Raw(text));
            }
            Token::Comment(body) => {
                self.tree.append(self.current, NodeData::Comment(body));
            }
            Token::Cdata(body) => {
                self.tree.append(self.current, NodeData::Cdata(body));
            }
            Token::Doctype(payload) => {
                self.tree.append(self.current, NodeData::Doctype(payload));
            }
            Token::Pi(body) => {
                if self.auto && !self.xml && pi_declares_xml(&body) {
                    log::trace!(target: "laxdom.tree_builder", "xml mode latched by <?{body}?>");
                    self.xml = true;
                }
                self.tree.append(self.current, NodeData::Pi(body));
            }
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => self.start_tag(name, attrs, self_closing),
            Token::EndTag(name) => {
                let mut name = name;
                if !self.xml {
                    name.make_ascii_lowercase();
                }
                self.end_tag(&name);
            }
        }
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, Option<String>)>, self_closing: bool) {
        let mut name = name;
        if !self.xml {
            name.make_ascii_lowercase();
        }
        if !self.xml && self.current != self.tree.root() {
            self.apply_tag_omission(&name);
        }

        let mut map = Attrs::new();
        for (mut key, value) in attrs {
            if !self.xml {
                key.make_ascii_lowercase();
            }
            // Duplicate names: the last occurrence wins.
            map.insert(key, value);
        }

        let id = self.tree.append(
            self.current,
            NodeData::Tag {
                name: name.clone(),
                attrs: map,
            },
        );
        self.current = id;

        if self_closing || (!self.xml && tags::is_void(&name)) {
            self.end_tag(&name);
        }
    }

    /// HTML tag-omission rules, applied before `name` opens.
    fn apply_tag_omission(&mut self, name: &str) {
        match name {
            "li" => self.close_scope(&["li"], "ul"),
            "body" => self.end_tag("head"),
            "optgroup" => self.end_tag("optgroup"),
            "option" => self.end_tag("option"),
            "colgroup" | "thead" | "tbody" | "tfoot" => {
                self.close_scope(tags::TABLE_SECTIONS, "table");
            }
            "tr" => self.close_scope(&["tr"], "table"),
            "th" | "td" => {
                self.close_scope(&["th"], "table");
                self.close_scope(&["td"], "table");
            }
            "dt" | "dd" => {
                self.end_tag("dt");
                self.end_tag("dd");
            }
            "rt" | "rp" => {
                self.end_tag("rt");
                self.end_tag("rp");
            }
            s if tags::breaks_paragraph(s) => {
                // A block element never nests inside inline markup: close
                // any phrasing elements left open, then the paragraph.
                self.close_open_phrasing();
                self.end_tag("p");
            }
            _ => {}
        }
    }

    fn close_open_phrasing(&mut self) {
        while let Some(name) = self.tree.name(self.current) {
            if !tags::is_phrasing(name) {
                break;
            }
            log::trace!(target: "laxdom.tree_builder", "implicit </{name}> before block element");
            self.current = self.parent_of_current();
        }
    }

    /// Implicitly end every ancestor (insertion point included) whose
    /// name is in `allowed`, walking outward but never past an ancestor
    /// named `scope` or the root.
    fn close_scope(&mut self, allowed: &[&str], scope: &str) {
        loop {
            let mut probe = Some(self.current);
            let mut target: Option<String> = None;
            while let Some(id) = probe {
                let Some(open) = self.tree.name(id) else {
                    break; // reached the root
                };
                if open == scope {
                    break;
                }
                if allowed.contains(&open) {
                    target = Some(open.to_string());
                    break;
                }
                probe = self.tree.parent(id);
            }
            let Some(name) = target else {
                break;
            };
            let before = self.current;
            self.end_tag(&name);
            if self.current == before {
                break;
            }
        }
    }

    /// The end-tag algorithm: locate a matching open element (subject to
    /// the phrasing guard), then unwind to it, implicitly ending every
    /// element in between.
    fn end_tag(&mut self, name: &str) {
        let guarded = !self.xml && tags::is_phrasing(name);
        let mut probe = Some(self.current);
        let mut found = false;
        while let Some(id) = probe {
            let Some(open) = self.tree.name(id) else {
                break; // reached the root without a match
            };
            if open == name {
                found = true;
                break;
            }
            if guarded && !tags::is_phrasing(open) {
                log::trace!(
                    target: "laxdom.tree_builder",
                    "</{name}> ignored: would cross <{open}>"
                );
                return;
            }
            probe = self.tree.parent(id);
        }
        if !found {
            log::trace!(target: "laxdom.tree_builder", "stray </{name}> ignored");
            return;
        }

        loop {
            let matches = match self.tree.name(self.current) {
                None => break,
                Some(open) => open == name,
            };
            if matches {
                self.current = self.parent_of_current();
                break;
            }
            if !self.xml && name == "table" {
                // Dangling section content closes as a group before the
                // table itself can end.
                let before = self.current;
                self.close_scope(tags::TABLE_SECTIONS, "table");
                if self.current != before {
                    continue;
                }
            }
            log::trace!(
                target: "laxdom.tree_builder",
                "implicit </{}> for </{name}>",
                self.tree.name(self.current).unwrap_or("?")
            );
            self.current = self.parent_of_current();
        }
    }

    fn parent_of_current(&self) -> NodeId {
        self.tree
            .parent(self.current)
            .unwrap_or_else(|| self.tree.root())
    }
}

/// Whether a processing-instruction body names XML (case-insensitive
/// substring probe, the one-shot auto-detection trigger).
fn pi_declares_xml(body: &str) -> bool {
    let hay = body.as_bytes();
    let mut i = 0;
    while i + 3 <= hay.len() {
        let Some(rel) = memchr2(b'x', b'X', &hay[i..]) else {
            return false;
        };
        let pos = i + rel;
        if pos + 3 <= hay.len() && hay[pos..pos + 3].eq_ignore_ascii_case(b"xml") {
            return true;
        }
        i = pos + 1;
    }
    false
}
