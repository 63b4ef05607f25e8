use crate::node::{ElementRole, NodeKind};
use crate::tree::DocTree;
use core_types::NodeKey;
use std::fmt::Write;

const INDENT_STEP: &str = "  ";
const PREVIEW_CHARS: usize = 40;

/// Indented, one-line-per-node rendering of the subtree at `node`, capped at
/// `cap` lines. Whitespace-only text is omitted.
pub fn outline(tree: &DocTree, node: NodeKey, cap: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![(node, 0usize)];
    while let Some((key, depth)) = stack.pop() {
        if out.len() == cap {
            out.push("…".to_string());
            break;
        }
        let Some(kind) = tree.kind(key) else {
            continue;
        };
        let mut line = INDENT_STEP.repeat(depth);
        match kind {
            NodeKind::Root => line.push_str("#root"),
            NodeKind::Element(data) => {
                let _ = write!(line, "<{}", data.name);
                for attr in &data.attributes {
                    let _ = write!(line, " {}=\"{}\"", attr.name, attr.value);
                }
                line.push('>');
                if data.role != ElementRole::Real {
                    let _ = write!(line, " ({:?})", data.role);
                }
            }
            NodeKind::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                line.push('"');
                push_preview(&mut line, trimmed);
                line.push('"');
            }
        }
        out.push(line);
        for child in tree.children(key).iter().rev() {
            stack.push((*child, depth + 1));
        }
    }
    out
}

fn push_preview(out: &mut String, s: &str) {
    for (i, ch) in s.chars().enumerate() {
        if i == PREVIEW_CHARS {
            out.push('…');
            return;
        }
        out.push(if ch == '\n' { ' ' } else { ch });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_markup;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nested_structure() {
        let tree = parse_markup("<a id=\"1\">\n  <b>hello\nworld</b>\n  <w _role=\"wrapper\"/>\n</a>")
            .unwrap();
        assert_eq!(
            outline(&tree, tree.root(), 10),
            vec![
                "#root".to_string(),
                "  <a id=\"1\">".to_string(),
                "    <b>".to_string(),
                "      \"hello world\"".to_string(),
                "    <w _role=\"wrapper\"> (Wrapper)".to_string(),
            ]
        );
    }

    #[test]
    fn stops_at_cap() {
        let tree = parse_markup("<a><b/><c/><d/></a>").unwrap();
        let lines = outline(&tree, tree.root(), 2);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "…");
    }
}
