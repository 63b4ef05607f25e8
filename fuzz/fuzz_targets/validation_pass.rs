#![no_main]

use grammar::RuleGrammar;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use validator::{ManualScheduler, Position, Validator, ValidatorConfig, WorkingState};

const GRAMMAR: &str = r#"
start = ["doc"]

[[element]]
name = "doc"
content = [{ element = "head", occurs = "optional" }, { element = "p", occurs = "zero-or-more" }]

[[element]]
name = "head"
text = true

[[element]]
name = "p"
text = true
content = [{ element = "hi", occurs = "zero-or-more" }]

[[element.attribute]]
name = "rend"
values = ["bold", "italic"]

[[element]]
name = "hi"
text = true
"#;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(tree) = doctree::parse_markup(input) else {
        return;
    };
    let Ok(grammar) = RuleGrammar::from_toml_str(GRAMMAR) else {
        return;
    };
    let mut validator = Validator::new(
        Arc::new(grammar),
        ValidatorConfig::deterministic(7),
        ManualScheduler::new(),
    );
    validator.start(&tree);
    while let Some(ticket) = validator.scheduler_mut().pop() {
        validator.resume(&tree, ticket);
    }
    assert!(matches!(
        validator.working_state().state,
        WorkingState::Valid | WorkingState::Invalid
    ));
    for node in tree.descendants(tree.root()) {
        let _ = validator.possible_at(&tree, Position::new(node, 0));
    }
});
