mod common;

use common::{doc, drain, find, new_validator};
use doctree::{DocTree, Name};
use grammar::GrammarError;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use validator::{CheckpointKind, DocumentIssue, Position, ValidatorConfig, Violation, WorkingState};

fn ids_are_numeric(tree: &DocTree) -> Vec<DocumentIssue> {
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|node| {
            let id = tree.element(node)?.attribute("id")?;
            (!id.chars().all(|c| c.is_ascii_digit()))
                .then(|| DocumentIssue::new(node, format!("id `{id}` is not numeric")))
        })
        .collect()
}

#[test]
fn document_validators_run_at_the_end_of_the_pass() {
    let tree = doc(r#"<a id="x1"><b/><c/></a>"#);
    let mut validator = new_validator(ValidatorConfig::default());
    validator.add_document_validator(ids_are_numeric);
    validator.start(&tree);
    drain(&mut validator, &tree);

    assert_eq!(validator.working_state().state, WorkingState::Invalid);
    let errors = validator.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].node, find(&tree, "a"));
    assert_eq!(
        errors[0].violation,
        Violation::Document("id `x1` is not numeric".into())
    );
    assert_eq!(errors[0].event, None);
}

#[test]
fn unbound_prefixes_fall_back_to_the_local_name() {
    let tree = doc(r#"<a xmlns:p="urn:p"><b/><q:c/></a>"#);
    let mut validator = new_validator(ValidatorConfig::default());
    validator.start(&tree);
    drain(&mut validator, &tree);

    let errors = validator.errors();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors[0].node, find(&tree, "q:c"));
    assert_eq!(
        errors[0].violation,
        Violation::UnresolvedPrefix {
            prefix: "q".into(),
            name: "q:c".into(),
        }
    );
}

#[test]
fn namespaces_of_schema_and_document() {
    let tree = doc(r#"<a xmlns:p="urn:p"><b xmlns:p="urn:p2"/><c xmlns="urn:c"/></a>"#);
    let validator = new_validator(ValidatorConfig::default());
    assert!(validator.schema_namespaces().is_empty());
    let expected = BTreeMap::from([
        ("".to_string(), vec!["urn:c".to_string()]),
        ("p".to_string(), vec!["urn:p".to_string(), "urn:p2".to_string()]),
    ]);
    assert_eq!(validator.document_namespaces(&tree), expected);
}

#[test]
fn speculative_checks_leave_the_live_pass_alone() {
    let tree = doc("<a><b>x</b><c/></a>");
    let b = find(&tree, "b");
    let a = find(&tree, "a");
    let mut validator = new_validator(ValidatorConfig::default());
    validator.start(&tree);
    drain(&mut validator, &tree);
    let log = validator.event_log().to_vec();
    let checkpoints = validator.checkpoints();
    validator.take_notifications();

    let fragment = doc("<em>y</em><c/>plain");
    let [em, c, plain] = fragment.children(fragment.root()) else {
        panic!("unexpected fragment shape");
    };
    let (em, c, plain) = (*em, *c, *plain);

    let fits = validator
        .speculatively_validate(&tree, Position::new(b, 1), &fragment, &[em])
        .unwrap();
    assert_eq!(fits, None);

    let misplaced = validator
        .speculatively_validate(&tree, Position::new(b, 1), &fragment, &[em, c])
        .unwrap()
        .unwrap();
    assert_eq!(misplaced.len(), 1);
    assert_eq!(misplaced[0].node, c);
    assert_eq!(
        misplaced[0].violation,
        Violation::Grammar(GrammarError::ElementNotAllowed {
            name: Name::local("c")
        })
    );

    let text = validator
        .speculatively_validate(&tree, Position::new(a, 1), &fragment, &[plain])
        .unwrap()
        .unwrap();
    assert_eq!(
        text[0].violation,
        Violation::Grammar(GrammarError::TextNotAllowed {
            parent: Some(Name::local("a"))
        })
    );

    assert_eq!(validator.event_log(), log.as_slice());
    assert_eq!(validator.checkpoints(), checkpoints);
    assert_eq!(validator.working_state().state, WorkingState::Valid);
    assert!(validator.take_notifications().is_empty());
    assert!(validator.scheduler().is_empty());
}

#[test]
fn speculative_check_before_any_pass_forces_one() {
    let tree = doc("<a><b/><c/></a>");
    let c = find(&tree, "c");
    let fragment = doc("<em/>");
    let em = fragment.children(fragment.root())[0];
    let mut validator = new_validator(ValidatorConfig::default());
    let errors = validator
        .speculatively_validate(&tree, Position::new(c, 0), &fragment, &[em])
        .unwrap();
    assert!(errors.is_some());
    assert!(validator.checkpoint(c, CheckpointKind::AfterStart).is_some());
}
