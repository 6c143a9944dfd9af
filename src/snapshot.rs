//! Deterministic tree serialization and equality for tests.
//!
//! Not a public stable format; intended for internal comparisons such as
//! the parse/render round-trip properties.
//!
//! Equivalence rules:
//! - Node kinds must match.
//! - Tag names must match.
//! - Attribute maps must match (names, values and valuelessness).
//! - Text, raw, doctype, comment, CDATA and PI bodies must match exactly.
//! - Child lists must match pairwise, in order.

use crate::tree::{NodeData, NodeId, Tree};
use std::fmt::{self, Write};

#[derive(Debug)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

impl TreeSnapshot {
    pub fn new(tree: &Tree, id: NodeId) -> Self {
        let mut lines = Vec::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let mut line = String::new();
            for _ in 0..depth {
                line.push_str("  ");
            }
            write_node_line(&mut line, tree.data(node));
            lines.push(line);
            for &child in tree.children(node).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

/// A structural difference between two trees, with enough context to
/// point a failing test at the offending node.
#[derive(Debug)]
pub struct TreeMismatch {
    path: String,
    detail: String,
    expected: String,
    actual: String,
}

impl fmt::Display for TreeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tree mismatch at {}: {}", self.path, self.detail)?;
        writeln!(f, "expected: {}", self.expected)?;
        write!(f, "actual:   {}", self.actual)
    }
}

impl std::error::Error for TreeMismatch {}

pub fn assert_tree_eq(expected: &Tree, actual: &Tree) {
    if let Err(mismatch) = compare_tree(expected, actual) {
        panic!("{mismatch}");
    }
}

pub fn compare_tree(expected: &Tree, actual: &Tree) -> Result<(), Box<TreeMismatch>> {
    let mut path = vec![node_label(expected.data(expected.root()))];
    compare_nodes(expected, expected.root(), actual, actual.root(), &mut path)
}

fn compare_nodes(
    expected: &Tree,
    expected_id: NodeId,
    actual: &Tree,
    actual_id: NodeId,
    path: &mut Vec<String>,
) -> Result<(), Box<TreeMismatch>> {
    let expected_data = expected.data(expected_id);
    let actual_data = actual.data(actual_id);
    if expected_data != actual_data {
        let detail = if std::mem::discriminant(expected_data) == std::mem::discriminant(actual_data)
        {
            "node payload"
        } else {
            "node kind"
        };
        return Err(mismatch(path, detail, expected_data, actual_data));
    }

    let expected_children = expected.children(expected_id);
    let actual_children = actual.children(actual_id);
    if expected_children.len() != actual_children.len() {
        return Err(mismatch(
            path,
            &format!(
                "child count (expected {}, actual {})",
                expected_children.len(),
                actual_children.len()
            ),
            expected_data,
            actual_data,
        ));
    }
    for (index, (&exp, &act)) in expected_children.iter().zip(actual_children).enumerate() {
        path.push(format!("{}[{index}]", node_label(expected.data(exp))));
        let result = compare_nodes(expected, exp, actual, act, path);
        path.pop();
        result?;
    }
    Ok(())
}

fn mismatch(
    path: &[String],
    detail: &str,
    expected: &NodeData,
    actual: &NodeData,
) -> Box<TreeMismatch> {
    let mut expected_line = String::new();
    write_node_line(&mut expected_line, expected);
    let mut actual_line = String::new();
    write_node_line(&mut actual_line, actual);
    Box::new(TreeMismatch {
        path: format!("/{}", path.join("/")),
        detail: detail.to_string(),
        expected: truncate_line(expected_line, 160),
        actual: truncate_line(actual_line, 160),
    })
}

fn node_label(data: &NodeData) -> String {
    match data {
        NodeData::Root => "#root".to_string(),
        NodeData::Tag { name, attrs } => {
            let mut label = name.clone();
            if let Some(Some(id)) = attrs.get("id") {
                label.push('#');
                label.push_str(id);
            }
            label
        }
        NodeData::Text(_) => "#text".to_string(),
        NodeData::Raw(_) => "#raw".to_string(),
        NodeData::Doctype(_) => "#doctype".to_string(),
        NodeData::Comment(_) => "#comment".to_string(),
        NodeData::Cdata(_) => "#cdata".to_string(),
        NodeData::Pi(_) => "#pi".to_string(),
    }
}

fn truncate_line(mut line: String, max_len: usize) -> String {
    if line.len() > max_len {
        line.truncate(max_len.saturating_sub(3));
        line.push_str("...");
    }
    line
}

fn write_node_line(out: &mut String, data: &NodeData) {
    match data {
        NodeData::Root => out.push_str("#root"),
        NodeData::Tag { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                if let Some(value) = value {
                    out.push_str("=\"");
                    write_escaped(out, value);
                    out.push('"');
                }
            }
            out.push('>');
        }
        NodeData::Text(text) => {
            out.push('"');
            write_escaped(out, text);
            out.push('"');
        }
        NodeData::Raw(text) => {
            out.push_str("raw\"");
            write_escaped(out, text);
            out.push('"');
        }
        NodeData::Doctype(payload) => {
            out.push_str("<!DOCTYPE");
            write_escaped(out, payload);
            out.push('>');
        }
        NodeData::Comment(body) => {
            out.push_str("<!-- ");
            write_escaped(out, body);
            out.push_str(" -->");
        }
        NodeData::Cdata(body) => {
            out.push_str("<![CDATA[");
            write_escaped(out, body);
            out.push_str("]]>");
        }
        NodeData::Pi(body) => {
            out.push_str("<?");
            write_escaped(out, body);
            out.push_str("?>");
        }
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}
