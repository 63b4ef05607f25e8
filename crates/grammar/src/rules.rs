//! Declarative element grammar loaded from TOML.
//!
//! ```toml
//! namespace = "urn:example"
//! start = ["doc"]
//!
//! [[element]]
//! name = "doc"
//! content = [{ element = "title" }, { element = "p", occurs = "zero-or-more" }]
//!
//! [[element]]
//! name = "p"
//! text = true
//!
//! [[element.attribute]]
//! name = "rend"
//! values = ["bold", "italic"]
//! ```
//!
//! Matching is greedy and never backtracks. A sequence that skips a required
//! particle reports it as missing and continues from the matched particle.
//! Elements the grammar does not declare are reported once and their whole
//! subtree is then accepted without further checks.

use crate::event::{Event, EventDescriptor, EventSet};
use crate::walker::{FireResult, Grammar, GrammarError, GrammarWalker};
use core_types::Name;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GrammarLoadError {
    #[error("grammar is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("element {name} is declared twice")]
    DuplicateElement { name: Name },
    #[error("element {name} is referenced but never declared")]
    UndeclaredElement { name: Name },
    #[error("grammar has no start element")]
    NoStart,
}

/// Serialized form of a [`RuleGrammar`].
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarSpec {
    /// Namespace for every element that does not set its own `ns`.
    #[serde(default)]
    pub namespace: String,
    pub start: Vec<String>,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementSpec>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    pub name: String,
    #[serde(default)]
    pub ns: Option<String>,
    /// Mixed content: non-whitespace text is allowed between children.
    #[serde(default)]
    pub text: bool,
    #[serde(default)]
    pub order: ContentOrder,
    #[serde(default)]
    pub content: Vec<ParticleSpec>,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeSpec>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticleSpec {
    pub element: String,
    #[serde(default)]
    pub ns: Option<String>,
    #[serde(default)]
    pub occurs: Occurs,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub ns: String,
    #[serde(default)]
    pub required: bool,
    /// Closed list of accepted values. Any value is accepted when absent.
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentOrder {
    #[default]
    Sequence,
    Interleave,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Occurs {
    #[default]
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Occurs {
    fn min(self) -> u32 {
        match self {
            Occurs::One | Occurs::OneOrMore => 1,
            Occurs::Optional | Occurs::ZeroOrMore => 0,
        }
    }

    fn max(self) -> Option<u32> {
        match self {
            Occurs::One | Occurs::Optional => Some(1),
            Occurs::ZeroOrMore | Occurs::OneOrMore => None,
        }
    }
}

#[derive(Debug)]
struct Rules {
    elements: Vec<ElementRule>,
    by_name: HashMap<Name, usize>,
    start: Vec<usize>,
}

#[derive(Debug)]
struct ElementRule {
    name: Name,
    mixed: bool,
    order: ContentOrder,
    content: Vec<Particle>,
    attributes: Vec<AttributeRule>,
}

#[derive(Debug)]
struct Particle {
    element: usize,
    min: u32,
    max: Option<u32>,
}

#[derive(Debug)]
struct AttributeRule {
    name: Name,
    required: bool,
    values: Option<Vec<String>>,
}

/// Compiled grammar. Cloning shares the compiled rules.
#[derive(Clone, Debug)]
pub struct RuleGrammar {
    rules: Arc<Rules>,
}

impl RuleGrammar {
    pub fn from_toml_str(source: &str) -> Result<Self, GrammarLoadError> {
        let spec: GrammarSpec = toml::from_str(source)?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &GrammarSpec) -> Result<Self, GrammarLoadError> {
        let qualify =
            |ns: &Option<String>, local: &str| Name::new(ns.as_deref().unwrap_or(&spec.namespace), local);

        let mut by_name = HashMap::new();
        for (index, element) in spec.elements.iter().enumerate() {
            let name = qualify(&element.ns, &element.name);
            if by_name.insert(name.clone(), index).is_some() {
                return Err(GrammarLoadError::DuplicateElement { name });
            }
        }
        let lookup = |name: Name| {
            by_name
                .get(&name)
                .copied()
                .ok_or(GrammarLoadError::UndeclaredElement { name })
        };

        let mut elements = Vec::with_capacity(spec.elements.len());
        for element in &spec.elements {
            let content = element
                .content
                .iter()
                .map(|particle| {
                    Ok(Particle {
                        element: lookup(qualify(&particle.ns, &particle.element))?,
                        min: particle.occurs.min(),
                        max: particle.occurs.max(),
                    })
                })
                .collect::<Result<Vec<_>, GrammarLoadError>>()?;
            let attributes = element
                .attributes
                .iter()
                .map(|attr| AttributeRule {
                    name: Name::new(&attr.ns, &attr.name),
                    required: attr.required,
                    values: attr.values.clone(),
                })
                .collect();
            elements.push(ElementRule {
                name: qualify(&element.ns, &element.name),
                mixed: element.text,
                order: element.order,
                content,
                attributes,
            });
        }

        let start = spec
            .start
            .iter()
            .map(|local| lookup(Name::new(&spec.namespace, local)))
            .collect::<Result<Vec<_>, _>>()?;
        if start.is_empty() {
            return Err(GrammarLoadError::NoStart);
        }

        Ok(Self {
            rules: Arc::new(Rules {
                elements,
                by_name,
                start,
            }),
        })
    }
}

impl Grammar for RuleGrammar {
    type Walker = RuleWalker;

    fn new_walker(&self) -> RuleWalker {
        RuleWalker {
            rules: Arc::clone(&self.rules),
            stack: Vec::new(),
            root: RootState::Before,
        }
    }

    fn namespaces(&self) -> BTreeSet<String> {
        let elements = self.rules.elements.iter();
        elements
            .clone()
            .map(|rule| &rule.name)
            .chain(elements.flat_map(|rule| rule.attributes.iter().map(|attr| &attr.name)))
            .filter(|name| name.has_namespace())
            .map(|name| name.ns.to_string())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RootState {
    Before,
    Inside,
    After,
}

#[derive(Clone, Debug)]
enum Pending {
    Declared(usize),
    Undeclared,
}

#[derive(Clone, Debug)]
struct ElementFrame {
    rule: usize,
    in_start_tag: bool,
    pending: Option<Pending>,
    seen: Vec<bool>,
    position: usize,
    counts: Vec<u32>,
}

impl ElementFrame {
    fn new(rules: &Rules, rule: usize) -> Self {
        let element = &rules.elements[rule];
        Self {
            rule,
            in_start_tag: true,
            pending: None,
            seen: vec![false; element.attributes.len()],
            position: 0,
            counts: vec![0; element.content.len()],
        }
    }

    fn accept_child(&mut self, rules: &Rules, name: &Name) -> FireResult {
        let rule = &rules.elements[self.rule];
        let fits = |particle: &Particle, count: u32| {
            rules.elements[particle.element].name == *name
                && particle.max.is_none_or(|max| count < max)
        };
        match rule.order {
            ContentOrder::Interleave => {
                for (index, particle) in rule.content.iter().enumerate() {
                    if fits(particle, self.counts[index]) {
                        self.counts[index] += 1;
                        return Ok(());
                    }
                }
            }
            ContentOrder::Sequence => {
                let mut skipped = Vec::new();
                for index in self.position..rule.content.len() {
                    let particle = &rule.content[index];
                    if fits(particle, self.counts[index]) {
                        self.position = index;
                        self.counts[index] += 1;
                        return if skipped.is_empty() {
                            Ok(())
                        } else {
                            Err(skipped)
                        };
                    }
                    if self.counts[index] < particle.min {
                        skipped.push(GrammarError::MissingElement {
                            parent: rule.name.clone(),
                            element: rules.elements[particle.element].name.clone(),
                        });
                    }
                }
            }
        }
        Err(vec![GrammarError::ElementNotAllowed { name: name.clone() }])
    }

    fn open_particles(&self, rules: &Rules) -> std::ops::Range<usize> {
        let len = rules.elements[self.rule].content.len();
        match rules.elements[self.rule].order {
            ContentOrder::Sequence => self.position..len,
            ContentOrder::Interleave => 0..len,
        }
    }

    fn missing_children(&self, rules: &Rules) -> Vec<GrammarError> {
        let rule = &rules.elements[self.rule];
        self.open_particles(rules)
            .filter(|&index| self.counts[index] < rule.content[index].min)
            .map(|index| GrammarError::MissingElement {
                parent: rule.name.clone(),
                element: rules.elements[rule.content[index].element].name.clone(),
            })
            .collect()
    }

    fn missing_attributes(&self, rules: &Rules) -> Vec<GrammarError> {
        let rule = &rules.elements[self.rule];
        rule.attributes
            .iter()
            .zip(&self.seen)
            .filter(|(attr, seen)| attr.required && !**seen)
            .map(|(attr, _)| GrammarError::MissingAttribute {
                element: rule.name.clone(),
                attribute: attr.name.clone(),
            })
            .collect()
    }

    fn possible(&self, rules: &Rules, set: &mut EventSet) {
        let rule = &rules.elements[self.rule];
        if self.in_start_tag {
            if self.pending.is_some() {
                set.insert(EventDescriptor::AttributeValue);
                return;
            }
            for (attr, seen) in rule.attributes.iter().zip(&self.seen) {
                if !seen {
                    set.insert(EventDescriptor::AttributeName(attr.name.clone()));
                }
            }
            set.insert(EventDescriptor::LeaveStartTag);
            return;
        }
        for index in self.open_particles(rules) {
            let particle = &rule.content[index];
            if particle.max.is_none_or(|max| self.counts[index] < max) {
                set.insert(EventDescriptor::EnterStartTag(
                    rules.elements[particle.element].name.clone(),
                ));
            }
            if rule.order == ContentOrder::Sequence && self.counts[index] < particle.min {
                break;
            }
        }
        if rule.mixed {
            set.insert(EventDescriptor::Text);
        }
        if self.missing_children(rules).is_empty() {
            set.insert(EventDescriptor::EndTag(rule.name.clone()));
        }
    }
}

#[derive(Clone, Debug)]
enum Frame {
    Known(ElementFrame),
    /// Subtree of an element the grammar does not declare.
    Lenient(Name),
}

/// Walker over a [`RuleGrammar`].
#[derive(Clone, Debug)]
pub struct RuleWalker {
    rules: Arc<Rules>,
    stack: Vec<Frame>,
    root: RootState,
}

impl RuleWalker {
    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn unexpected(event: &Event) -> Vec<GrammarError> {
        vec![GrammarError::UnexpectedEvent {
            event: event.to_string(),
        }]
    }

    fn enter_start_tag(&mut self, event: &Event, name: &Name) -> FireResult {
        let rules = Arc::clone(&self.rules);
        let mut errors = Vec::new();
        let mut lenient = false;
        match self.stack.last_mut() {
            None => {
                let is_start = rules
                    .start
                    .iter()
                    .any(|&index| rules.elements[index].name == *name);
                if self.root != RootState::Before || !is_start {
                    errors.push(GrammarError::ElementNotAllowed { name: name.clone() });
                }
                self.root = RootState::Inside;
            }
            Some(Frame::Lenient(_)) => lenient = true,
            Some(Frame::Known(frame)) => {
                if frame.in_start_tag {
                    errors.extend(Self::unexpected(event));
                    frame.in_start_tag = false;
                    frame.pending = None;
                }
                if let Err(more) = frame.accept_child(&rules, name) {
                    errors.extend(more);
                }
            }
        }
        let frame = match rules.by_name.get(name) {
            Some(&index) if !lenient => Frame::Known(ElementFrame::new(&rules, index)),
            _ => Frame::Lenient(name.clone()),
        };
        self.stack.push(frame);
        finish(errors)
    }

    fn attribute_name(&mut self, event: &Event, name: &Name) -> FireResult {
        let rules = &self.rules;
        match self.stack.last_mut() {
            Some(Frame::Lenient(_)) => Ok(()),
            Some(Frame::Known(frame)) if frame.in_start_tag && frame.pending.is_none() => {
                let rule = &rules.elements[frame.rule];
                match rule.attributes.iter().position(|attr| attr.name == *name) {
                    Some(index) => {
                        frame.seen[index] = true;
                        frame.pending = Some(Pending::Declared(index));
                        Ok(())
                    }
                    None => {
                        frame.pending = Some(Pending::Undeclared);
                        Err(vec![GrammarError::AttributeNotAllowed {
                            element: rule.name.clone(),
                            attribute: name.clone(),
                        }])
                    }
                }
            }
            _ => Err(Self::unexpected(event)),
        }
    }

    fn attribute_value(&mut self, event: &Event, value: &str) -> FireResult {
        let rules = &self.rules;
        match self.stack.last_mut() {
            Some(Frame::Lenient(_)) => Ok(()),
            Some(Frame::Known(frame)) if frame.in_start_tag => match frame.pending.take() {
                Some(Pending::Declared(index)) => {
                    let attr = &rules.elements[frame.rule].attributes[index];
                    match &attr.values {
                        Some(values) if !values.iter().any(|v| v == value) => {
                            Err(vec![GrammarError::InvalidAttributeValue {
                                attribute: attr.name.clone(),
                                value: value.to_string(),
                            }])
                        }
                        _ => Ok(()),
                    }
                }
                Some(Pending::Undeclared) => Ok(()),
                None => Err(Self::unexpected(event)),
            },
            _ => Err(Self::unexpected(event)),
        }
    }

    fn leave_start_tag(&mut self, event: &Event) -> FireResult {
        let rules = Arc::clone(&self.rules);
        match self.stack.last_mut() {
            Some(Frame::Lenient(_)) => Ok(()),
            Some(Frame::Known(frame)) if frame.in_start_tag => {
                let mut errors = Vec::new();
                if frame.pending.take().is_some() {
                    errors.extend(Self::unexpected(event));
                }
                frame.in_start_tag = false;
                errors.extend(frame.missing_attributes(&rules));
                finish(errors)
            }
            _ => Err(Self::unexpected(event)),
        }
    }

    fn text(&mut self, event: &Event, text: &str) -> FireResult {
        let blank = text.trim().is_empty();
        match self.stack.last() {
            Some(Frame::Lenient(_)) => Ok(()),
            Some(Frame::Known(frame)) if frame.in_start_tag => Err(Self::unexpected(event)),
            Some(Frame::Known(frame)) => {
                let rule = &self.rules.elements[frame.rule];
                if rule.mixed || blank {
                    Ok(())
                } else {
                    Err(vec![GrammarError::TextNotAllowed {
                        parent: Some(rule.name.clone()),
                    }])
                }
            }
            None if blank => Ok(()),
            None => Err(vec![GrammarError::TextNotAllowed { parent: None }]),
        }
    }

    fn end_tag(&mut self, event: &Event, name: &Name) -> FireResult {
        let mut errors = Vec::new();
        let open = match self.stack.pop() {
            None => return Err(vec![GrammarError::UnexpectedEndTag { name: name.clone() }]),
            Some(Frame::Lenient(open)) => open,
            Some(Frame::Known(frame)) => {
                if frame.in_start_tag {
                    errors.extend(Self::unexpected(event));
                }
                errors.extend(frame.missing_children(&self.rules));
                self.rules.elements[frame.rule].name.clone()
            }
        };
        if open != *name {
            errors.push(GrammarError::UnexpectedEndTag { name: name.clone() });
        }
        if self.stack.is_empty() {
            self.root = RootState::After;
        }
        finish(errors)
    }
}

fn finish(errors: Vec<GrammarError>) -> FireResult {
    if errors.is_empty() {
        Ok(())
    } else {
        log::trace!(target: "grammar.rules", "rejected: {errors:?}");
        Err(errors)
    }
}

impl GrammarWalker for RuleWalker {
    fn fire_event(&mut self, event: &Event) -> FireResult {
        match event {
            Event::EnterStartTag(name) => self.enter_start_tag(event, name),
            Event::AttributeName(name) => self.attribute_name(event, name),
            Event::AttributeValue(value) => self.attribute_value(event, value),
            Event::LeaveStartTag => self.leave_start_tag(event),
            Event::Text(text) => self.text(event, text),
            Event::EndTag(name) => self.end_tag(event, name),
        }
    }

    fn possible(&self) -> EventSet {
        let mut set = EventSet::new();
        match self.stack.last() {
            None if self.root == RootState::Before => {
                for &index in &self.rules.start {
                    set.insert(EventDescriptor::EnterStartTag(
                        self.rules.elements[index].name.clone(),
                    ));
                }
            }
            None => {}
            Some(Frame::Lenient(name)) => {
                set.insert(EventDescriptor::Text);
                set.insert(EventDescriptor::EndTag(name.clone()));
            }
            Some(Frame::Known(frame)) => frame.possible(&self.rules, &mut set),
        }
        set
    }

    fn end(&mut self) -> FireResult {
        let mut errors = Vec::new();
        if self.root == RootState::Before {
            errors.push(GrammarError::MissingRoot);
        }
        while let Some(frame) = self.stack.pop() {
            let name = match frame {
                Frame::Lenient(name) => name,
                Frame::Known(frame) => self.rules.elements[frame.rule].name.clone(),
            };
            errors.push(GrammarError::UnclosedElement { name });
        }
        self.root = RootState::After;
        finish(errors)
    }
}
