//! Condition predicates.
//!
//! A structured condition maps attribute names to constraints. Conditions
//! are compared by containment: `a.contains(b)` holds when every subject
//! matching `b` also matches `a`. Conditions that cannot be inspected
//! (executable predicates) are modelled as [`Condition::Opaque`] and never
//! take part in containment.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CompressError, Result};

/// A scalar attribute value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Null value. Comparable with every other kind.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i64),

    /// String value.
    Str(String),
}

/// The kind of a scalar value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::Str => write!(f, "string"),
        }
    }
}

impl AttrValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::Str,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Constraint on a single attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraint {
    /// The attribute equals the value.
    Eq(AttrValue),

    /// The attribute is one of the values.
    In(BTreeSet<AttrValue>),

    /// The attribute is an associated record matching the nested condition.
    Nested(ConditionMap),
}

/// Shape of a constrained attribute, used to detect rules that disagree on
/// what an attribute holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttrShape {
    Scalar(ValueKind),
    Nested,
}

impl fmt::Display for AttrShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{}", kind),
            Self::Nested => write!(f, "nested condition"),
        }
    }
}

impl Constraint {
    /// Kind of the accepted values, ignoring nulls. `None` when the
    /// constraint only accepts null, accepts nothing, or is nested.
    fn scalar_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Eq(value) => Some(value.kind()).filter(|k| *k != ValueKind::Null),
            Self::In(values) => values
                .iter()
                .map(AttrValue::kind)
                .find(|k| *k != ValueKind::Null),
            Self::Nested(_) => None,
        }
    }

    /// Whether the only value accepted is null. Holds for an empty set too.
    fn accepts_only_null(&self) -> bool {
        match self {
            Self::Eq(value) => *value == AttrValue::Null,
            Self::In(values) => values.iter().all(|value| *value == AttrValue::Null),
            Self::Nested(_) => false,
        }
    }

    fn shape(&self) -> Option<AttrShape> {
        match self {
            Self::Nested(_) => Some(AttrShape::Nested),
            _ => self.scalar_kind().map(AttrShape::Scalar),
        }
    }

    /// Check that every subject accepted by `other` is accepted by `self`.
    fn covers(&self, other: &Constraint, path: &str) -> Result<bool> {
        match (self, other) {
            (Self::Nested(mine), Self::Nested(theirs)) => mine.contains_at(theirs, path),
            (Self::Nested(_), scalar) | (scalar, Self::Nested(_)) if scalar.accepts_only_null() => {
                Ok(false)
            }
            (Self::Nested(_), _) | (_, Self::Nested(_)) => Err(incomparable(path, self, other)),
            _ => {
                if let (Some(mine), Some(theirs)) = (self.scalar_kind(), other.scalar_kind()) {
                    if mine != theirs {
                        return Err(incomparable(path, self, other));
                    }
                }
                Ok(match (self, other) {
                    (Self::Eq(a), Self::Eq(b)) => a == b,
                    (Self::In(accepted), Self::Eq(b)) => accepted.contains(b),
                    (Self::In(accepted), Self::In(theirs)) => theirs.is_subset(accepted),
                    (Self::Eq(a), Self::In(theirs)) => theirs.iter().all(|b| b == a),
                    _ => false,
                })
            }
        }
    }

    fn validate(&self, path: &str) -> Result<()> {
        match self {
            Self::Eq(_) => Ok(()),
            Self::In(values) => {
                let mut kinds = values
                    .iter()
                    .map(AttrValue::kind)
                    .filter(|k| *k != ValueKind::Null);
                if let Some(first) = kinds.next() {
                    if let Some(other) = kinds.find(|k| *k != first) {
                        return Err(CompressError::InconsistentCondition {
                            rule: None,
                            attribute: path.to_string(),
                            reason: format!("value set mixes {} and {} values", first, other),
                        });
                    }
                }
                Ok(())
            }
            Self::Nested(map) => map.validate_at(path),
        }
    }
}

impl From<AttrValue> for Constraint {
    fn from(value: AttrValue) -> Self {
        Self::Eq(value)
    }
}

impl From<ConditionMap> for Constraint {
    fn from(value: ConditionMap) -> Self {
        Self::Nested(value)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(value) => write!(f, "{}", value),
            Self::In(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Self::Nested(map) => write!(f, "{}", map),
        }
    }
}

fn incomparable(path: &str, left: &Constraint, right: &Constraint) -> CompressError {
    CompressError::IncomparableValues {
        attribute: path.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Attribute constraints that must all hold for a subject to match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionMap(BTreeMap<String, Constraint>);

impl ConditionMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Require `key` to equal `value`.
    pub fn eq(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.with(key, Constraint::Eq(value.into()))
    }

    /// Require `key` to be one of `values`.
    pub fn any_of<V: Into<AttrValue>>(
        self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(key, Constraint::In(values))
    }

    /// Require the record under `key` to match `condition`.
    pub fn nested(self, key: impl Into<String>, condition: ConditionMap) -> Self {
        self.with(key, Constraint::Nested(condition))
    }

    pub fn with(mut self, key: impl Into<String>, constraint: Constraint) -> Self {
        self.0.insert(key.into(), constraint);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Constraint> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Constraint)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every subject matching `other` also matches `self`.
    ///
    /// Attributes constrained here but not in `other` make `self` narrower on
    /// that dimension, so containment fails.
    pub fn contains(&self, other: &ConditionMap) -> Result<bool> {
        self.contains_at(other, "")
    }

    fn contains_at(&self, other: &ConditionMap, prefix: &str) -> Result<bool> {
        if self.0.keys().any(|key| !other.0.contains_key(key)) {
            return Ok(false);
        }
        for (key, mine) in &self.0 {
            let theirs = &other.0[key];
            if !mine.covers(theirs, &join_path(prefix, key))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Reject value sets that mix incompatible kinds.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("")
    }

    fn validate_at(&self, prefix: &str) -> Result<()> {
        for (key, constraint) in &self.0 {
            constraint.validate(&join_path(prefix, key))?;
        }
        Ok(())
    }

    /// Dotted attribute paths with the shape each one is constrained to.
    pub(crate) fn attribute_shapes(&self) -> Vec<(String, AttrShape)> {
        let mut shapes = Vec::new();
        self.collect_shapes("", &mut shapes);
        shapes
    }

    fn collect_shapes(&self, prefix: &str, shapes: &mut Vec<(String, AttrShape)>) {
        for (key, constraint) in &self.0 {
            let path = join_path(prefix, key);
            if let Some(shape) = constraint.shape() {
                shapes.push((path.clone(), shape));
            }
            if let Constraint::Nested(map) = constraint {
                map.collect_shapes(&path, shapes);
            }
        }
    }
}

impl fmt::Display for ConditionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// The condition attached to a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Attribute constraints that can be compared.
    Structured(ConditionMap),

    /// An executable predicate, identified only by a label.
    Opaque(String),
}

impl Condition {
    pub fn opaque(label: impl Into<String>) -> Self {
        Self::Opaque(label.into())
    }

    pub fn as_structured(&self) -> Option<&ConditionMap> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Opaque(_) => None,
        }
    }

    /// Whether every subject matching `other` also matches `self`. Opaque
    /// conditions neither contain nor are contained.
    pub fn contains(&self, other: &Condition) -> Result<bool> {
        match (self, other) {
            (Self::Structured(mine), Self::Structured(theirs)) => mine.contains(theirs),
            _ => Ok(false),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Structured(map) => map.validate(),
            Self::Opaque(_) => Ok(()),
        }
    }
}

impl From<ConditionMap> for Condition {
    fn from(value: ConditionMap) -> Self {
        Self::Structured(value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(map) => write!(f, "{}", map),
            Self::Opaque(label) => write!(f, "<{}>", label),
        }
    }
}

/// Containment over optional conditions, where `None` is the catch-all.
///
/// The catch-all contains every condition and is contained only by itself.
pub fn contains(outer: Option<&Condition>, inner: Option<&Condition>) -> Result<bool> {
    match (outer, inner) {
        (None, _) => Ok(true),
        (Some(_), None) => Ok(false),
        (Some(outer), Some(inner)) => outer.contains(inner),
    }
}
