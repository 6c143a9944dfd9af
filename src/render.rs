//! Tree to markup string.
//!
//! Serialization is total: any node renders to some string. Attribute
//! output is in ascending key order, so rendering the same tree twice
//! produces identical bytes. The walk is iterative with an explicit
//! stack; input depth must not dictate call depth.

use crate::tags;
use crate::tree::{NodeData, NodeId, Tree};

/// Serialize the subtree rooted at `id`.
pub fn render_node(tree: &Tree, id: NodeId, xml: bool) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(id)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(id) => {
                if let NodeData::Tag { name, .. } = tree.data(id) {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            Step::Open(id) => match tree.data(id) {
                NodeData::Root => {
                    push_children(tree, id, &mut stack);
                }
                NodeData::Text(text) => escape_into(&mut out, text),
                NodeData::Raw(text) => out.push_str(text),
                NodeData::Doctype(payload) => {
                    out.push_str("<!DOCTYPE");
                    out.push_str(payload);
                    out.push('>');
                }
                NodeData::Comment(body) => {
                    out.push_str("<!--");
                    out.push_str(body);
                    out.push_str("-->");
                }
                NodeData::Cdata(body) => {
                    out.push_str("<![CDATA[");
                    out.push_str(body);
                    out.push_str("]]>");
                }
                NodeData::Pi(body) => {
                    out.push_str("<?");
                    out.push_str(body);
                    out.push_str("?>");
                }
                NodeData::Tag { name, attrs } => {
                    out.push('<');
                    out.push_str(name);
                    for (key, value) in attrs {
                        out.push(' ');
                        out.push_str(key);
                        if let Some(value) = value {
                            out.push_str("=\"");
                            escape_into(&mut out, value);
                            out.push('"');
                        }
                    }
                    if tree.children(id).is_empty() && (xml || tags::is_void(name)) {
                        out.push_str(" />");
                    } else {
                        out.push('>');
                        stack.push(Step::Close(id));
                        push_children(tree, id, &mut stack);
                    }
                }
            },
        }
    }
    out
}

enum Step {
    Open(NodeId),
    Close(NodeId),
}

fn push_children(tree: &Tree, id: NodeId, stack: &mut Vec<Step>) {
    // Reversed so children pop in document order.
    for &child in tree.children(id).iter().rev() {
        stack.push(Step::Open(child));
    }
}

pub(crate) fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}
