//! Loader for XML-like markup.
//!
//! Supported: elements, attributes (single or double quoted), self-closing
//! tags, text, CDATA sections, comments and processing instructions
//! (skipped), `<!DOCTYPE ...>` (skipped), and the predefined entities plus
//! numeric character references.
//!
//! Elements are created with [`ElementRole::Real`] unless they carry a
//! `_role` bookkeeping attribute naming another role (`wrapper`,
//! `placeholder`, `decoration`).

use crate::edit::{NullSink, TreeEdit};
use crate::node::{Attribute, ElementRole};
use crate::tree::{DocTree, TreeError};
use core_types::NodeKey;
use memchr::memchr;
use std::sync::Arc;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof { position: usize },
    #[error("malformed tag at byte {position}")]
    MalformedTag { position: usize },
    #[error("end tag `{found}` at byte {position} does not match open element `{expected}`")]
    MismatchedEndTag {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("end tag `{name}` at byte {position} has no open element")]
    UnexpectedEndTag { name: String, position: usize },
    #[error("element `{name}` is never closed")]
    UnclosedElement { name: String },
    #[error("unknown element role `{value}`")]
    UnknownRole { value: String },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

fn is_name_byte(b: u8) -> bool {
    !(b.is_ascii_whitespace() || matches!(b, b'/' | b'>' | b'=' | b'<' | b'"' | b'\''))
}

/// Parses `input` into a fresh tree.
pub fn parse_markup(input: &str) -> Result<DocTree, MarkupError> {
    let mut tree = DocTree::new();
    let mut open: Vec<(NodeKey, Arc<str>)> = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    // Slices are only cut at ASCII structural bytes, so every endpoint is a
    // UTF-8 char boundary.
    while i < bytes.len() {
        let parent = open.last().map(|(key, _)| *key).unwrap_or(tree.root());
        if bytes[i] != b'<' {
            let end = memchr(b'<', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
            let text = decode_entities(&input[i..end]);
            append_text(&mut tree, parent, text)?;
            i = end;
            continue;
        }
        let rest = &input[i..];
        if rest.starts_with(COMMENT_START) {
            let end = rest
                .find(COMMENT_END)
                .ok_or(MarkupError::UnexpectedEof { position: i })?;
            i += end + COMMENT_END.len();
            continue;
        }
        if rest.starts_with(CDATA_START) {
            let body_start = i + CDATA_START.len();
            let end = input[body_start..]
                .find(CDATA_END)
                .ok_or(MarkupError::UnexpectedEof { position: i })?;
            append_text(
                &mut tree,
                parent,
                input[body_start..body_start + end].to_string(),
            )?;
            i = body_start + end + CDATA_END.len();
            continue;
        }
        if rest.starts_with("<?") || rest.starts_with("<!") {
            let end = memchr(b'>', &bytes[i..]).ok_or(MarkupError::UnexpectedEof { position: i })?;
            i += end + 1;
            continue;
        }
        if rest.starts_with("</") {
            let start = i + 2;
            let mut j = start;
            while j < bytes.len() && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = &input[start..j];
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j >= bytes.len() || bytes[j] != b'>' {
                return Err(MarkupError::MalformedTag { position: i });
            }
            match open.pop() {
                Some((_, expected)) if &*expected == name => {}
                Some((_, expected)) => {
                    return Err(MarkupError::MismatchedEndTag {
                        expected: expected.to_string(),
                        found: name.to_string(),
                        position: i,
                    });
                }
                None => {
                    return Err(MarkupError::UnexpectedEndTag {
                        name: name.to_string(),
                        position: i,
                    });
                }
            }
            i = j + 1;
            continue;
        }

        let (tag, next) = read_start_tag(input, i)?;
        let role = match tag
            .attributes
            .iter()
            .find(|attr| &*attr.name == "_role")
        {
            Some(attr) => ElementRole::parse(&attr.value).ok_or_else(|| MarkupError::UnknownRole {
                value: attr.value.clone(),
            })?,
            None => ElementRole::Real,
        };
        let key = tree.append_element(parent, &tag.name, role, tag.attributes, &mut NullSink)?;
        if !tag.self_closing {
            open.push((key, Arc::from(tag.name.as_str())));
        }
        i = next;
    }
    if let Some((_, name)) = open.pop() {
        return Err(MarkupError::UnclosedElement {
            name: name.to_string(),
        });
    }
    Ok(tree)
}

struct StartTag {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
}

fn read_start_tag(input: &str, at: usize) -> Result<(StartTag, usize), MarkupError> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut k = at + 1;
    while k < len && is_name_byte(bytes[k]) {
        k += 1;
    }
    if k == at + 1 {
        return Err(MarkupError::MalformedTag { position: at });
    }
    let name = input[at + 1..k].to_string();
    let mut attributes = Vec::new();
    loop {
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len {
            return Err(MarkupError::UnexpectedEof { position: at });
        }
        match bytes[k] {
            b'>' => {
                return Ok((
                    StartTag {
                        name,
                        attributes,
                        self_closing: false,
                    },
                    k + 1,
                ));
            }
            b'/' if k + 1 < len && bytes[k + 1] == b'>' => {
                return Ok((
                    StartTag {
                        name,
                        attributes,
                        self_closing: true,
                    },
                    k + 2,
                ));
            }
            _ => {}
        }
        let name_start = k;
        while k < len && is_name_byte(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            return Err(MarkupError::MalformedTag { position: k });
        }
        let attr_name = &input[name_start..k];
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len || bytes[k] != b'=' {
            return Err(MarkupError::MalformedTag { position: k });
        }
        k += 1;
        while k < len && bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        if k >= len || !matches!(bytes[k], b'"' | b'\'') {
            return Err(MarkupError::MalformedTag { position: k });
        }
        let quote = bytes[k];
        let value_start = k + 1;
        let value_end = memchr(quote, &bytes[value_start..])
            .map(|rel| value_start + rel)
            .ok_or(MarkupError::UnexpectedEof { position: k })?;
        attributes.push(Attribute::new(
            attr_name,
            decode_entities(&input[value_start..value_end]),
        ));
        k = value_end + 1;
    }
}

fn append_text(tree: &mut DocTree, parent: NodeKey, text: String) -> Result<(), MarkupError> {
    if text.is_empty() {
        return Ok(());
    }
    let key = tree.allocate_key();
    tree.apply(TreeEdit::CreateText { key, text }, &mut NullSink)?;
    tree.apply(TreeEdit::AppendChild { parent, child: key }, &mut NullSink)?;
    Ok(())
}

/// Decodes the five predefined entities and well-formed, semicolon-terminated
/// numeric references. Anything else passes through unchanged.
fn decode_entities(s: &str) -> String {
    const MAX_REFERENCE_LEN: usize = 10;
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= MAX_REFERENCE_LEN)
            .and_then(|semi| decode_reference(&after[..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = body.strip_prefix('#')?;
            let value = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeClass;

    #[test]
    fn parses_nested_elements_text_and_attributes() {
        let tree = parse_markup(r#"<a id="x"><b>one &amp; two</b><c/></a>"#).unwrap();
        let root = tree.root();
        let a = tree.children(root)[0];
        let data = tree.element(a).unwrap();
        assert_eq!(&*data.name, "a");
        assert_eq!(data.attribute("id"), Some("x"));
        let b = tree.children(a)[0];
        let text = tree.children(b)[0];
        assert_eq!(tree.text(text), Some("one & two"));
        let c = tree.children(a)[1];
        assert!(tree.children(c).is_empty());
    }

    #[test]
    fn skips_prolog_comments_and_doctype() {
        let tree =
            parse_markup("<?xml version=\"1.0\"?><!DOCTYPE a><!-- note --><a><![CDATA[<x>]]></a>")
                .unwrap();
        let a = tree.children(tree.root())[0];
        let text = tree.children(a)[0];
        assert_eq!(tree.text(text), Some("<x>"));
    }

    #[test]
    fn reads_roles_from_bookkeeping_attribute() {
        let tree = parse_markup(r#"<a><w _role="wrapper"><b/></w><p _role="placeholder"/></a>"#)
            .unwrap();
        let a = tree.children(tree.root())[0];
        assert_eq!(tree.class(tree.children(a)[0]), Some(NodeClass::Wrapper));
        assert_eq!(tree.class(tree.children(a)[1]), Some(NodeClass::Placeholder));
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse_markup("<a><b></a>").unwrap_err(),
            MarkupError::MismatchedEndTag {
                expected: "b".into(),
                found: "a".into(),
                position: 6
            }
        );
        assert_eq!(
            parse_markup("<a>").unwrap_err(),
            MarkupError::UnclosedElement { name: "a".into() }
        );
        assert!(matches!(
            parse_markup("</a>").unwrap_err(),
            MarkupError::UnexpectedEndTag { .. }
        ));
        assert!(matches!(
            parse_markup("<a x=1></a>").unwrap_err(),
            MarkupError::MalformedTag { .. }
        ));
    }

    #[test]
    fn entity_decoding_is_conservative() {
        assert_eq!(decode_entities("a &lt; b &#x41;&#66; &bogus; &"), "a < b AB &bogus; &");
    }
}
