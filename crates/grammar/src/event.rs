use core_types::Name;
use std::collections::BTreeSet;
use std::fmt;

/// A single structural fact submitted to a grammar walker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    EnterStartTag(Name),
    AttributeName(Name),
    AttributeValue(String),
    LeaveStartTag,
    Text(String),
    EndTag(Name),
}

impl Event {
    pub fn descriptor(&self) -> EventDescriptor {
        match self {
            Event::EnterStartTag(name) => EventDescriptor::EnterStartTag(name.clone()),
            Event::AttributeName(name) => EventDescriptor::AttributeName(name.clone()),
            Event::AttributeValue(_) => EventDescriptor::AttributeValue,
            Event::LeaveStartTag => EventDescriptor::LeaveStartTag,
            Event::Text(_) => EventDescriptor::Text,
            Event::EndTag(name) => EventDescriptor::EndTag(name.clone()),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::EnterStartTag(name) => write!(f, "enterStartTag {name}"),
            Event::AttributeName(name) => write!(f, "attributeName {name}"),
            Event::AttributeValue(value) => write!(f, "attributeValue {value:?}"),
            Event::LeaveStartTag => f.write_str("leaveStartTag"),
            Event::Text(text) => write!(f, "text {text:?}"),
            Event::EndTag(name) => write!(f, "endTag {name}"),
        }
    }
}

/// Payload-free description of an event a walker would accept.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventDescriptor {
    EnterStartTag(Name),
    AttributeName(Name),
    AttributeValue,
    LeaveStartTag,
    Text,
    EndTag(Name),
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventDescriptor::EnterStartTag(name) => write!(f, "enterStartTag {name}"),
            EventDescriptor::AttributeName(name) => write!(f, "attributeName {name}"),
            EventDescriptor::AttributeValue => f.write_str("attributeValue"),
            EventDescriptor::LeaveStartTag => f.write_str("leaveStartTag"),
            EventDescriptor::Text => f.write_str("text"),
            EventDescriptor::EndTag(name) => write!(f, "endTag {name}"),
        }
    }
}

/// Ordered set of event descriptors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventSet {
    events: BTreeSet<EventDescriptor>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: EventDescriptor) -> bool {
        self.events.insert(event)
    }

    pub fn contains(&self, event: &EventDescriptor) -> bool {
        self.events.contains(event)
    }

    pub fn accepts_text(&self) -> bool {
        self.contains(&EventDescriptor::Text)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventDescriptor> + '_ {
        self.events.iter()
    }

    /// Names of the elements that could start here.
    pub fn element_names(&self) -> impl Iterator<Item = &Name> + '_ {
        self.events.iter().filter_map(|event| match event {
            EventDescriptor::EnterStartTag(name) => Some(name),
            _ => None,
        })
    }

    /// Names of the attributes that could be added here.
    pub fn attribute_names(&self) -> impl Iterator<Item = &Name> + '_ {
        self.events.iter().filter_map(|event| match event {
            EventDescriptor::AttributeName(name) => Some(name),
            _ => None,
        })
    }
}

impl FromIterator<EventDescriptor> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventDescriptor>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EventSet {
    type Item = EventDescriptor;
    type IntoIter = std::collections::btree_set::IntoIter<EventDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = &'a EventDescriptor;
    type IntoIter = std::collections::btree_set::Iter<'a, EventDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_drop_string_payloads() {
        assert_eq!(
            Event::Text("abc".into()).descriptor(),
            EventDescriptor::Text
        );
        assert_eq!(
            Event::AttributeValue("v".into()).descriptor(),
            EventDescriptor::AttributeValue
        );
        assert_eq!(
            Event::EndTag(Name::local("p")).descriptor(),
            EventDescriptor::EndTag(Name::local("p"))
        );
    }

    #[test]
    fn set_filters_names_by_kind() {
        let set: EventSet = [
            EventDescriptor::EnterStartTag(Name::local("b")),
            EventDescriptor::AttributeName(Name::local("id")),
            EventDescriptor::EndTag(Name::local("a")),
            EventDescriptor::Text,
        ]
        .into_iter()
        .collect();
        assert!(set.accepts_text());
        assert_eq!(set.element_names().collect::<Vec<_>>(), vec![&Name::local("b")]);
        assert_eq!(
            set.attribute_names().collect::<Vec<_>>(),
            vec![&Name::local("id")]
        );
    }
}
