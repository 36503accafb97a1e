//! Reference evaluator used to check that compression preserves decisions.
//!
//! Rules are evaluated the way an ability check would: highest priority
//! first, first matching rule decides, otherwise the default applies.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use ability_core::{AttrValue, Condition, ConditionMap, Constraint, Polarity, Rule};

/// Value of a subject attribute.
#[derive(Clone, Debug)]
pub enum SubjectValue {
    Scalar(AttrValue),
    Record(Subject),
}

/// A concrete subject instance.
#[derive(Clone, Debug, Default)]
pub struct Subject {
    attributes: BTreeMap<String, SubjectValue>,
    /// Labels of the opaque predicates this subject satisfies.
    predicates: BTreeSet<String>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes
            .insert(key.to_string(), SubjectValue::Scalar(value.into()));
        self
    }

    pub fn record(mut self, key: &str, record: Subject) -> Self {
        self.attributes
            .insert(key.to_string(), SubjectValue::Record(record));
        self
    }

    pub fn satisfies(mut self, predicate: &str) -> Self {
        self.predicates.insert(predicate.to_string());
        self
    }
}

fn matches_map(map: &ConditionMap, subject: &Subject) -> bool {
    map.iter().all(|(key, constraint)| {
        let value = subject.attributes.get(key.as_str());
        match (constraint, value) {
            (Constraint::Eq(expected), Some(SubjectValue::Scalar(actual))) => expected == actual,
            (Constraint::Eq(expected), None) => *expected == AttrValue::Null,
            (Constraint::In(accepted), Some(SubjectValue::Scalar(actual))) => {
                accepted.contains(actual)
            }
            (Constraint::In(accepted), None) => accepted.contains(&AttrValue::Null),
            (Constraint::Nested(nested), Some(SubjectValue::Record(record))) => {
                matches_map(nested, record)
            }
            _ => false,
        }
    })
}

pub fn matches(rule: &Rule, subject: &Subject) -> bool {
    match rule.condition() {
        None => true,
        Some(Condition::Structured(map)) => matches_map(map, subject),
        Some(Condition::Opaque(label)) => subject.predicates.contains(label),
    }
}

/// Decide `action` on a subject of `subject_type`.
pub fn decide<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    action: &str,
    subject_type: &str,
    subject: &Subject,
    default_decision: Polarity,
) -> Polarity {
    let mut relevant: Vec<&Rule> = rules
        .into_iter()
        .filter(|rule| rule.action().as_str() == action && rule.subject().as_str() == subject_type)
        .collect();
    relevant.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));

    relevant
        .into_iter()
        .find(|rule| matches(rule, subject))
        .map(|rule| rule.polarity())
        .unwrap_or(default_decision)
}

pub const ACTIONS: [&str; 2] = ["read", "update"];
pub const SUBJECT_TYPES: [&str; 2] = ["Blog", "Post"];
pub const PREDICATES: [&str; 2] = ["owner?", "draft?"];

/// Every subject over the attribute space the generated rules constrain.
pub fn all_subjects() -> Vec<Subject> {
    let ids: Vec<Option<i64>> = std::iter::once(None).chain((0..5).map(Some)).collect();
    let authors: Vec<Option<i64>> = std::iter::once(None).chain((0..3).map(Some)).collect();
    let predicate_sets: Vec<Vec<&str>> = vec![
        vec![],
        vec![PREDICATES[0]],
        vec![PREDICATES[1]],
        PREDICATES.to_vec(),
    ];

    let mut subjects = Vec::new();
    for id in &ids {
        for private in [false, true] {
            for author in &authors {
                for predicates in &predicate_sets {
                    let mut subject = Subject::new().set("private", private);
                    if let Some(id) = id {
                        subject = subject.set("id", *id);
                    }
                    if let Some(author) = author {
                        subject = subject.record("author", Subject::new().set("id", *author));
                    }
                    for predicate in predicates {
                        subject = subject.satisfies(predicate);
                    }
                    subjects.push(subject);
                }
            }
        }
    }
    subjects
}

/// First (action, subject type, subject) for which the two lists disagree.
pub fn first_disagreement(
    original: &[Rule],
    compressed: &[&Rule],
    default_decision: Polarity,
) -> Option<String> {
    let subjects = all_subjects();
    for action in ACTIONS {
        for subject_type in SUBJECT_TYPES {
            for subject in &subjects {
                let before = decide(original, action, subject_type, subject, default_decision);
                let after = decide(
                    compressed.iter().copied(),
                    action,
                    subject_type,
                    subject,
                    default_decision,
                );
                if before != after {
                    return Some(format!(
                        "{} {} {:?}: {} before, {} after",
                        action, subject_type, subject, before, after
                    ));
                }
            }
        }
    }
    None
}

pub fn can(action: &str, subject: &str, condition: Option<ConditionMap>) -> Rule {
    with_condition(Rule::allow(action, subject), condition)
}

pub fn cannot(action: &str, subject: &str, condition: Option<ConditionMap>) -> Rule {
    with_condition(Rule::deny(action, subject), condition)
}

fn with_condition(rule: Rule, condition: Option<ConditionMap>) -> Rule {
    match condition {
        Some(condition) => rule.with_condition(condition),
        None => rule,
    }
}

pub fn id(value: i64) -> Option<ConditionMap> {
    Some(ConditionMap::new().eq("id", value))
}
