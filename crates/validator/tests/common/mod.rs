#![allow(dead_code)]

use doctree::{DocTree, NodeKey, parse_markup};
use grammar::RuleGrammar;
use std::sync::Arc;
use validator::{ManualScheduler, Validator, ValidatorConfig};

/// `a` holds one `b` then one `c`; `b` may hold `em` children. All but `a`
/// are mixed.
pub const GRAMMAR: &str = r#"
start = ["a"]

[[element]]
name = "a"
content = [{ element = "b" }, { element = "c" }]

[[element.attribute]]
name = "id"

[[element]]
name = "b"
text = true
content = [{ element = "em", occurs = "zero-or-more" }]

[[element]]
name = "c"
text = true

[[element.attribute]]
name = "kind"
values = ["note", "aside"]

[[element]]
name = "em"
text = true
"#;

pub type TestValidator = Validator<RuleGrammar, ManualScheduler>;

pub fn required_id_grammar() -> String {
    GRAMMAR.replacen("name = \"id\"", "name = \"id\"\nrequired = true", 1)
}

pub fn new_validator_with(source: &str, config: ValidatorConfig) -> TestValidator {
    let grammar = RuleGrammar::from_toml_str(source).unwrap();
    Validator::new(Arc::new(grammar), config, ManualScheduler::new())
}

pub fn new_validator(config: ValidatorConfig) -> TestValidator {
    new_validator_with(GRAMMAR, config)
}

pub fn doc(markup: &str) -> DocTree {
    parse_markup(markup).unwrap()
}

/// First element named `local` in document order.
pub fn find(tree: &DocTree, local: &str) -> NodeKey {
    tree.descendants(tree.root())
        .into_iter()
        .find(|&node| tree.element(node).is_some_and(|data| &*data.name == local))
        .unwrap_or_else(|| panic!("no element {local}"))
}

/// Hands queued tickets back until the scheduler is empty. Returns the
/// number of slices run.
pub fn drain(validator: &mut TestValidator, tree: &DocTree) -> usize {
    let mut slices = 0;
    while let Some(ticket) = validator.scheduler_mut().pop() {
        validator.resume(tree, ticket);
        slices += 1;
        assert!(slices < 100_000, "validator never settled");
    }
    slices
}

pub fn finished(validator: &TestValidator) -> bool {
    validator.working_state().state.is_finished()
}
