use grammar::{Event, Grammar, GrammarWalker, Name, RuleGrammar};
use proptest::prelude::*;

const GRAMMAR: &str = r#"
start = ["doc"]

[[element]]
name = "doc"
content = [{ element = "head", occurs = "optional" }, { element = "p", occurs = "one-or-more" }]

[[element]]
name = "head"

[[element]]
name = "p"
text = true
content = [{ element = "hi", occurs = "zero-or-more" }]

[[element.attribute]]
name = "rend"
values = ["a", "b"]

[[element]]
name = "hi"
text = true
"#;

fn event_strategy() -> impl Strategy<Value = Event> {
    let names = prop::sample::select(vec!["doc", "head", "p", "hi", "zzz"]);
    prop_oneof![
        names.clone().prop_map(|n| Event::EnterStartTag(Name::local(n))),
        Just(Event::AttributeName(Name::local("rend"))),
        prop::sample::select(vec!["a", "b", "c"])
            .prop_map(|v| Event::AttributeValue(v.to_string())),
        Just(Event::LeaveStartTag),
        prop::sample::select(vec!["", " ", "x"]).prop_map(|t| Event::Text(t.to_string())),
        names.prop_map(|n| Event::EndTag(Name::local(n))),
    ]
}

proptest! {
    #[test]
    fn same_prefix_gives_same_answers(events in prop::collection::vec(event_strategy(), 0..40)) {
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let mut left = grammar.new_walker();
        let mut right = grammar.new_walker();
        for event in &events {
            prop_assert_eq!(left.fire_event(event), right.fire_event(event));
            prop_assert_eq!(left.possible(), right.possible());
        }
        prop_assert_eq!(left.end(), right.end());
    }

    #[test]
    fn clone_continues_independently(
        prefix in prop::collection::vec(event_strategy(), 0..20),
        suffix in prop::collection::vec(event_strategy(), 0..20),
    ) {
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let mut original = grammar.new_walker();
        for event in &prefix {
            let _ = original.fire_event(event);
        }
        let mut copy = original.clone();
        let before = original.possible();
        for event in &suffix {
            prop_assert_eq!(copy.fire_event(event), original.fire_event(event));
        }
        let mut fresh = grammar.new_walker();
        for event in &prefix {
            let _ = fresh.fire_event(event);
        }
        prop_assert_eq!(fresh.possible(), before);
    }
}
