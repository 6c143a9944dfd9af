//! Human-readable tree outlines for logs and failure triage.

use crate::tree::{NodeData, NodeId, Tree};

/// Indented outline of the subtree under `id`, capped at `cap` lines.
pub fn outline(tree: &Tree, id: NodeId, cap: usize) -> Vec<String> {
    fn preview(s: &str, max_chars: usize) -> String {
        let mut out = String::new();
        let mut truncated = false;
        for (i, ch) in s.chars().enumerate() {
            if i == max_chars {
                truncated = true;
                break;
            }
            out.push(ch);
        }
        if truncated {
            out.push('…');
        }
        out
    }

    let mut out = Vec::new();
    let mut stack = vec![(id, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if out.len() == cap {
            break;
        }
        let indent = "  ".repeat(depth);
        match tree.data(node) {
            NodeData::Root => out.push(format!("{indent}#root")),
            NodeData::Tag { name, .. } => {
                let data = tree.data(node);
                let mut line = format!("{indent}<{name}");
                if let Some(id_attr) = data.attr("id") {
                    line.push_str(&format!(r#" id="{id_attr}""#));
                }
                if let Some(class) = data.attr("class") {
                    line.push_str(&format!(r#" class="{class}""#));
                }
                line.push('>');
                out.push(line);
            }
            NodeData::Text(text) => {
                let flat = text.replace('\n', " ");
                let trimmed = flat.trim();
                if !trimmed.is_empty() {
                    out.push(format!("{indent}\"{}\"", preview(trimmed, 40)));
                }
            }
            NodeData::Raw(text) => {
                out.push(format!("{indent}raw({})", preview(text.trim(), 40)));
            }
            NodeData::Doctype(payload) => {
                out.push(format!("{indent}<!DOCTYPE{payload}>"));
            }
            NodeData::Comment(body) => {
                out.push(format!(
                    "{indent}<!-- {} -->",
                    preview(&body.replace('\n', " "), 40)
                ));
            }
            NodeData::Cdata(body) => {
                out.push(format!("{indent}<![CDATA[{}]]>", preview(body, 40)));
            }
            NodeData::Pi(body) => {
                out.push(format!("{indent}<?{}?>", preview(body, 40)));
            }
        }
        for &child in tree.children(node).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn outline_shows_structure_and_ids() {
        let engine = parse(r#"<div id="main"><p>Some text</p><br></div>"#);
        let tree = engine.tree();
        let lines = outline(tree, tree.root(), 16);
        assert_eq!(
            lines,
            [
                "#root",
                r#"  <div id="main">"#,
                "    <p>",
                "      \"Some text\"",
                "    <br>",
            ]
        );
    }

    #[test]
    fn outline_respects_the_cap() {
        let engine = parse("<ul><li>a<li>b<li>c</ul>");
        let tree = engine.tree();
        let lines = outline(tree, tree.root(), 3);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn whitespace_only_text_is_skipped_but_counts_nothing() {
        let engine = parse("<div>  \n  </div>");
        let tree = engine.tree();
        let lines = outline(tree, tree.root(), 16);
        assert_eq!(lines, ["#root", "  <div>"]);
    }
}
