//! Error types for rule compression.
//!
//! Compression is a pure transform, so the taxonomy is narrow: malformed
//! input is reported, everything else is propagated from the loaders.

use std::io;
use thiserror::Error;

use crate::rule::{Action, Priority, SubjectType};

pub type Result<T, E = CompressError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Duplicate priority {priority} in group ({action}, {subject})")]
    DuplicatePriority {
        priority: Priority,
        action: Action,
        subject: SubjectType,
    },

    #[error("Inconsistent condition on attribute `{attribute}`{}: {reason}", rule_suffix(.rule))]
    InconsistentCondition {
        /// Priority of the rule carrying the condition, once known.
        rule: Option<Priority>,
        attribute: String,
        reason: String,
    },

    #[error("Incomparable values for attribute `{attribute}`: {left} vs {right}")]
    IncomparableValues {
        attribute: String,
        left: String,
        right: String,
    },

    #[error("Invalid rule file: {0}")]
    InvalidRuleFile(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn rule_suffix(rule: &Option<Priority>) -> String {
    match rule {
        Some(priority) => format!(" in rule #{}", priority),
        None => String::new(),
    }
}

impl CompressError {
    /// Attach the offending rule to a condition error.
    pub(crate) fn in_rule(self, priority: Priority) -> Self {
        match self {
            Self::InconsistentCondition {
                rule: None,
                attribute,
                reason,
            } => Self::InconsistentCondition {
                rule: Some(priority),
                attribute,
                reason,
            },
            other => other,
        }
    }

    /// Whether the error describes a caller contract violation rather than
    /// a failure to load input.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePriority { .. }
                | Self::InconsistentCondition { .. }
                | Self::IncomparableValues { .. }
        )
    }
}
