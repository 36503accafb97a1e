//! Rule grouping.
//!
//! Rules interact only with rules for the exact same action and subject
//! type. Subject types are compared by identity; a rule for a parent type
//! never joins the group of a child type.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::condition::AttrShape;
use crate::error::{CompressError, Result};
use crate::rule::{Action, Rule, SubjectType};

/// The (action, subject type) pair a group is keyed by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub action: Action,
    pub subject: SubjectType,
}

impl GroupKey {
    pub fn of(rule: &Rule) -> Self {
        Self {
            action: rule.action().clone(),
            subject: rule.subject().clone(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.action, self.subject)
    }
}

/// Rules sharing one [`GroupKey`], as positions into the input slice.
#[derive(Clone, Debug)]
pub struct RuleGroup<'a> {
    key: GroupKey,
    rules: &'a [Rule],
    members: Vec<usize>,
}

impl<'a> RuleGroup<'a> {
    fn new(key: GroupKey, rules: &'a [Rule]) -> Self {
        Self {
            key,
            rules,
            members: Vec::new(),
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Input positions of the members, in input order.
    pub fn positions(&self) -> &[usize] {
        &self.members
    }

    pub fn rule(&self, position: usize) -> &'a Rule {
        let rules: &'a [Rule] = self.rules;
        &rules[position]
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Rule> + '_ {
        let rules: &'a [Rule] = self.rules;
        self.members.iter().map(move |&position| &rules[position])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check the group is well formed: distinct priorities, internally
    /// consistent conditions, and every attribute constrained to the same
    /// kind of value across all members.
    pub fn validate(&self) -> Result<()> {
        let mut priorities = HashSet::with_capacity(self.members.len());
        let mut shapes: BTreeMap<String, (AttrShape, &Rule)> = BTreeMap::new();

        for rule in self.iter() {
            if !priorities.insert(rule.priority()) {
                return Err(CompressError::DuplicatePriority {
                    priority: rule.priority(),
                    action: self.key.action.clone(),
                    subject: self.key.subject.clone(),
                });
            }

            let Some(condition) = rule.condition() else {
                continue;
            };
            condition
                .validate()
                .map_err(|e| e.in_rule(rule.priority()))?;

            let Some(map) = condition.as_structured() else {
                continue;
            };
            for (path, shape) in map.attribute_shapes() {
                match shapes.get(&path) {
                    Some((seen, first)) if *seen != shape => {
                        return Err(CompressError::IncomparableValues {
                            attribute: path,
                            left: format!("{} in rule {}", seen, first),
                            right: format!("{} in rule {}", shape, rule),
                        });
                    }
                    Some(_) => {}
                    None => {
                        shapes.insert(path, (shape, rule));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Partition `rules` by exact (action, subject type).
///
/// Groups appear in the order their key is first seen, and members keep
/// their input order.
pub fn group_rules(rules: &[Rule]) -> Vec<RuleGroup<'_>> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<RuleGroup<'_>> = Vec::new();

    for (position, rule) in rules.iter().enumerate() {
        let key = GroupKey::of(rule);
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push(RuleGroup::new(key, rules));
                groups.len() - 1
            }
        };
        groups[slot].members.push(position);
    }

    groups
}
