//! Arena-backed markup tree.
//!
//! All nodes of a document live in one `Vec`; a [`NodeId`] is an index into
//! it. Parent links are plain indices, so upward traversal never extends a
//! node's lifetime and the structure cannot form an ownership cycle.
//! Node 0 is always the root.
//!
//! The tree is produced by [`crate::Engine::parse`] and treated as
//! read-only by the engine afterwards. Callers may mutate it through
//! [`Tree::append`] and [`Tree::data_mut`]; the engine makes no invariant
//! guarantees after external mutation.

use std::collections::BTreeMap;

/// Index of a node within its [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Attribute map: name to decoded value, `None` for a valueless attribute.
///
/// A `BTreeMap` gives the two properties the engine needs: a later
/// occurrence of a name overwrites an earlier one, and iteration is in
/// ascending key order so rendering is deterministic.
pub type Attrs = BTreeMap<String, Option<String>>;

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Tag { name: String, attrs: Attrs },
    /// Character data with entities decoded once.
    Text(String),
    /// Verbatim `script`/`style` body; never escaped or decoded.
    Raw(String),
    /// Everything between `<!DOCTYPE` and `>`, verbatim.
    Doctype(String),
    /// Everything between `<!--` and `--`, verbatim.
    Comment(String),
    /// Everything between `<![CDATA[` and `]]>`, verbatim.
    Cdata(String),
    /// Everything between `<?` and `?>`, verbatim.
    Pi(String),
}

impl NodeData {
    /// Tag name, if this is a `Tag` node.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeData::Tag { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeData::Root | NodeData::Tag { .. })
    }

    /// Decoded attribute value. `None` for non-tags, missing attributes,
    /// and valueless attributes alike; use [`NodeData::has_attr`] to
    /// distinguish the latter.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            NodeData::Tag { attrs, .. } => attrs.get(key).and_then(|v| v.as_deref()),
            _ => None,
        }
    }

    pub fn has_attr(&self, key: &str) -> bool {
        matches!(self, NodeData::Tag { attrs, .. } if attrs.contains_key(key))
    }

    /// Whether a whitespace-separated attribute value contains `token`
    /// (ASCII case-insensitive), as in `class` lookups.
    pub fn attr_has_token(&self, key: &str, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        self.attr(key)
            .is_some_and(|v| v.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root is always present.
        self.nodes.len() == 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Tag name of `id`, if it is a tag node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.data(id).name()
    }

    /// Append a new node under `parent` and return its id.
    ///
    /// Only `Root` and `Tag` nodes may have children.
    pub fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.data(parent).is_container(),
            "append target must be root or a tag"
        );
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node count overflow"));
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Walk from `id` toward the root, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Depth-first pre-order walk of the subtree under `id`, excluding
    /// `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        stack.extend(self.children(id).iter().rev().copied());
        Descendants { tree: self, stack }
    }

    /// Concatenated decoded text of the subtree under `id`. Raw bodies,
    /// comments and other non-text leaves do not contribute.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeData::Text(text) = self.data(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let NodeData::Text(text) = self.data(node) {
                out.push_str(text);
            }
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> NodeData {
        NodeData::Tag {
            name: name.to_string(),
            attrs: Attrs::new(),
        }
    }

    #[test]
    fn append_links_parent_and_children() {
        let mut tree = Tree::new();
        let div = tree.append(tree.root(), tag("div"));
        let text = tree.append(div, NodeData::Text("hi".to_string()));

        assert_eq!(tree.parent(div), Some(tree.root()));
        assert_eq!(tree.parent(text), Some(div));
        assert_eq!(tree.children(tree.root()), &[div]);
        assert_eq!(tree.children(div), &[text]);
        assert!(tree.parent(tree.root()).is_none());
    }

    #[test]
    fn ancestors_walk_to_root() {
        let mut tree = Tree::new();
        let a = tree.append(tree.root(), tag("a"));
        let b = tree.append(a, tag("b"));
        let c = tree.append(b, tag("c"));

        let chain: Vec<NodeId> = tree.ancestors(c).collect();
        assert_eq!(chain, vec![b, a, tree.root()]);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut tree = Tree::new();
        let ul = tree.append(tree.root(), tag("ul"));
        let li1 = tree.append(ul, tag("li"));
        let t1 = tree.append(li1, NodeData::Text("a".to_string()));
        let li2 = tree.append(ul, tag("li"));

        let order: Vec<NodeId> = tree.descendants(tree.root()).collect();
        assert_eq!(order, vec![ul, li1, t1, li2]);
    }

    #[test]
    fn text_content_skips_raw_and_comments() {
        let mut tree = Tree::new();
        let div = tree.append(tree.root(), tag("div"));
        tree.append(div, NodeData::Text("a".to_string()));
        tree.append(div, NodeData::Comment("nope".to_string()));
        let script = tree.append(div, tag("script"));
        tree.append(script, NodeData::Raw("x()".to_string()));
        tree.append(div, NodeData::Text("b".to_string()));

        assert_eq!(tree.text_content(tree.root()), "ab");
    }

    #[test]
    fn attr_helpers_distinguish_valueless() {
        let mut attrs = Attrs::new();
        attrs.insert("disabled".to_string(), None);
        attrs.insert("class".to_string(), Some("Big  red".to_string()));
        let data = NodeData::Tag {
            name: "input".to_string(),
            attrs,
        };

        assert!(data.has_attr("disabled"));
        assert_eq!(data.attr("disabled"), None);
        assert!(data.attr_has_token("class", "RED"));
        assert!(!data.attr_has_token("class", ""));
        assert!(!data.has_attr("id"));
    }
}
