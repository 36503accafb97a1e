//! Ability rules.
//!
//! A rule is one immutable policy statement. Its priority is the position
//! it was defined at: rules defined later are checked first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Whether a rule grants or revokes the ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Grant the ability.
    Allow,

    /// Revoke the ability.
    Deny,
}

impl Polarity {
    /// The other polarity.
    pub fn opposite(self) -> Self {
        match self {
            Self::Allow => Self::Deny,
            Self::Deny => Self::Allow,
        }
    }
}

impl Default for Polarity {
    fn default() -> Self {
        Self::Deny
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

impl std::str::FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" | "can" => Ok(Self::Allow),
            "deny" | "cannot" => Ok(Self::Deny),
            _ => Err(format!("Invalid polarity: {}", s)),
        }
    }
}

/// Action token a rule applies to, e.g. `read`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact subject type identifier. Two subject types are related only when
/// they are identical; ancestry is never consulted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectType(String);

impl SubjectType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubjectType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Original definition index of a rule. Higher priority is checked first.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub u64);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Priority {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A single allow/deny statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    polarity: Polarity,
    action: Action,
    subject: SubjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    #[serde(default)]
    priority: Priority,
}

impl Rule {
    /// Create a catch-all rule with priority zero.
    pub fn new(
        polarity: Polarity,
        action: impl Into<Action>,
        subject: impl Into<SubjectType>,
    ) -> Self {
        Self {
            polarity,
            action: action.into(),
            subject: subject.into(),
            condition: None,
            priority: Priority::default(),
        }
    }

    pub fn allow(action: impl Into<Action>, subject: impl Into<SubjectType>) -> Self {
        Self::new(Polarity::Allow, action, subject)
    }

    pub fn deny(action: impl Into<Action>, subject: impl Into<SubjectType>) -> Self {
        Self::new(Polarity::Deny, action, subject)
    }

    /// Restrict the rule to subjects matching `condition`.
    pub fn with_condition(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Assign priorities by position, first rule lowest.
    pub fn prioritized(rules: impl IntoIterator<Item = Rule>) -> Vec<Rule> {
        rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| rule.with_priority(Priority(index as u64)))
            .collect()
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn subject(&self) -> &SubjectType {
        &self.subject
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// A rule without a condition matches every subject of its type.
    pub fn is_catch_all(&self) -> bool {
        self.condition.is_none()
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.condition, Some(Condition::Opaque(_)))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {}",
            self.priority, self.polarity, self.action, self.subject
        )?;
        match &self.condition {
            Some(condition) => write!(f, " where {}", condition),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionMap;

    #[test]
    fn test_prioritized_assigns_positions() {
        let rules = Rule::prioritized(vec![
            Rule::deny("read", "Blog"),
            Rule::allow("read", "Blog").with_priority(Priority(42)),
        ]);
        assert_eq!(rules[0].priority(), Priority(0));
        assert_eq!(rules[1].priority(), Priority(1));
    }

    #[test]
    fn test_catch_all_and_opaque() {
        let catch_all = Rule::allow("read", "Blog");
        assert!(catch_all.is_catch_all());
        assert!(!catch_all.is_opaque());

        let opaque = Rule::allow("read", "Blog").with_condition(Condition::opaque("owner?"));
        assert!(!opaque.is_catch_all());
        assert!(opaque.is_opaque());

        let structured =
            Rule::deny("read", "Blog").with_condition(ConditionMap::new().eq("private", true));
        assert!(!structured.is_catch_all());
        assert!(!structured.is_opaque());
    }

    #[test]
    fn test_polarity_parsing() {
        assert_eq!("allow".parse::<Polarity>(), Ok(Polarity::Allow));
        assert_eq!("CANNOT".parse::<Polarity>(), Ok(Polarity::Deny));
        assert!("maybe".parse::<Polarity>().is_err());
        assert_eq!(Polarity::Allow.opposite(), Polarity::Deny);
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::deny("read", "Blog")
            .with_condition(ConditionMap::new().eq("id", 2))
            .with_priority(Priority(3));
        assert_eq!(rule.to_string(), "#3 deny read Blog where {id: 2}");
    }
}
