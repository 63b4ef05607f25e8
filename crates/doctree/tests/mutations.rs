use doctree::{
    Attribute, DocTree, ElementRole, NullSink, TreeEdit, TreeMutation, document_namespaces,
    parse_markup,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn element(tree: &DocTree, path: &[usize]) -> doctree::NodeKey {
    let mut key = tree.root();
    for &index in path {
        key = tree.children(key)[index];
    }
    key
}

#[test]
fn insertion_into_attached_parent_is_reported() {
    let mut tree = parse_markup("<a><b/></a>").unwrap();
    let a = element(&tree, &[0]);
    let b = element(&tree, &[0, 0]);
    let mut seen = Vec::new();
    let c = tree.allocate_key();
    tree.apply(
        TreeEdit::CreateElement {
            key: c,
            name: Arc::from("c"),
            role: ElementRole::Real,
            attributes: Vec::new(),
        },
        &mut seen,
    )
    .unwrap();
    assert!(seen.is_empty(), "detached creation must be silent");
    tree.apply(
        TreeEdit::InsertBefore {
            parent: a,
            child: c,
            before: b,
        },
        &mut seen,
    )
    .unwrap();
    assert_eq!(seen, vec![TreeMutation::NodeInserted { node: c, parent: a }]);
    assert_eq!(tree.children(a), &[c, b]);
}

#[test]
fn removal_reports_before_and_after_with_former_siblings() {
    let mut tree = parse_markup("<a>x<b/>y</a>").unwrap();
    let a = element(&tree, &[0]);
    let x = element(&tree, &[0, 0]);
    let b = element(&tree, &[0, 1]);
    let y = element(&tree, &[0, 2]);
    let mut seen = Vec::new();
    tree.apply(TreeEdit::RemoveNode { key: b }, &mut seen)
        .unwrap();
    assert_eq!(
        seen,
        vec![
            TreeMutation::NodeWillBeRemoved { node: b, parent: a },
            TreeMutation::NodeRemoved {
                node: b,
                parent: a,
                previous_sibling: Some(x),
                next_sibling: Some(y),
            },
        ]
    );
}

#[test]
fn edits_inside_detached_subtrees_are_silent() {
    let mut tree = DocTree::new();
    let key = tree.allocate_key();
    tree.apply(
        TreeEdit::CreateElement {
            key,
            name: Arc::from("p"),
            role: ElementRole::Real,
            attributes: Vec::new(),
        },
        &mut NullSink,
    )
    .unwrap();
    let mut seen = Vec::new();
    let text = tree.append_text(key, "draft", &mut seen).unwrap();
    tree.apply(
        TreeEdit::SetText {
            key: text,
            text: "final".into(),
        },
        &mut seen,
    )
    .unwrap();
    assert!(seen.is_empty());
    tree.apply(
        TreeEdit::AppendChild {
            parent: tree.root(),
            child: key,
        },
        &mut seen,
    )
    .unwrap();
    assert_eq!(seen.len(), 1);
}

#[test]
fn text_and_attribute_changes_are_reported() {
    let mut tree = parse_markup("<a id=\"1\">t</a>").unwrap();
    let a = element(&tree, &[0]);
    let t = element(&tree, &[0, 0]);
    let mut seen = Vec::new();
    tree.apply(
        TreeEdit::SetText {
            key: t,
            text: "u".into(),
        },
        &mut seen,
    )
    .unwrap();
    tree.apply(
        TreeEdit::SetAttribute {
            key: a,
            name: Arc::from("id"),
            value: None,
        },
        &mut seen,
    )
    .unwrap();
    // Removing an attribute that is not there changes nothing.
    tree.apply(
        TreeEdit::SetAttribute {
            key: a,
            name: Arc::from("id"),
            value: None,
        },
        &mut seen,
    )
    .unwrap();
    assert_eq!(
        seen,
        vec![
            TreeMutation::TextChanged { node: t, parent: a },
            TreeMutation::AttributeChanged {
                node: a,
                name: Arc::from("id")
            },
        ]
    );
    assert_eq!(tree.element(a).unwrap().attribute("id"), None);
    assert_eq!(tree.text(t), Some("u"));
}

#[test]
fn document_namespaces_collects_rebound_prefixes() {
    let tree = parse_markup(
        r#"<a xmlns="urn:d" xmlns:x="urn:x1"><b xmlns:x="urn:x2"/><c xmlns:x="urn:x1"/></a>"#,
    )
    .unwrap();
    let namespaces = document_namespaces(&tree);
    assert_eq!(namespaces[""], vec!["urn:d".to_string()]);
    assert_eq!(
        namespaces["x"],
        vec!["urn:x1".to_string(), "urn:x2".to_string()]
    );
}

#[test]
fn data_attributes_skip_declarations_and_bookkeeping() {
    let tree = parse_markup(r#"<a xmlns:x="urn:x" _caret="3" x:n="1" id="i"/>"#).unwrap();
    let a = element(&tree, &[0]);
    let names: Vec<&str> = tree
        .element(a)
        .unwrap()
        .data_attributes()
        .map(|attr: &Attribute| &*attr.name)
        .collect();
    assert_eq!(names, vec!["x:n", "id"]);
}
