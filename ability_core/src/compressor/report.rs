//! Compression report.
//!
//! Records why each discarded rule was dropped.

use std::fmt;

use serde::Serialize;

use crate::rule::{Action, Polarity, Priority, Rule, SubjectType};

/// Why a rule was removed from the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalReason {
    /// A higher-priority rule matches every subject this rule matches.
    Dominated { by: Priority },

    /// Same polarity as a lower-priority catch-all with no exception between.
    ShadowTrimmed { by: Priority },

    /// A catch-all that only restates the default decision.
    DefaultCatchAll,

    /// Below a catch-all, so never evaluated.
    Unreachable { by: Priority },
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dominated { by } => write!(f, "dominated by #{}", by),
            Self::ShadowTrimmed { by } => write!(f, "shadowed by catch-all #{}", by),
            Self::DefaultCatchAll => write!(f, "restates the default decision"),
            Self::Unreachable { by } => write!(f, "unreachable below catch-all #{}", by),
        }
    }
}

/// A discarded rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub priority: Priority,
    pub polarity: Polarity,
    pub action: Action,
    pub subject: SubjectType,
    pub reason: RemovalReason,
}

impl Removal {
    pub(crate) fn new(rule: &Rule, reason: RemovalReason) -> Self {
        Self {
            priority: rule.priority(),
            polarity: rule.polarity(),
            action: rule.action().clone(),
            subject: rule.subject().clone(),
            reason,
        }
    }
}

/// Summary of one compression run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    /// Number of rules given.
    pub input_rules: usize,

    /// Number of rules kept.
    pub output_rules: usize,

    /// Number of (action, subject type) groups.
    pub groups: usize,

    /// Discarded rules, by ascending priority.
    pub removals: Vec<Removal>,
}

impl CompressionReport {
    pub fn removed(&self) -> usize {
        self.removals.len()
    }

    /// Reason recorded for the rule at `priority`, if it was discarded.
    pub fn reason_for(&self, priority: Priority) -> Option<RemovalReason> {
        self.removals
            .iter()
            .find(|removal| removal.priority == priority)
            .map(|removal| removal.reason)
    }
}

impl fmt::Display for CompressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} rules in {} groups compressed to {} ({} removed)",
            self.input_rules,
            self.groups,
            self.output_rules,
            self.removed()
        )?;
        for removal in &self.removals {
            writeln!(
                f,
                "  #{} {} {} {}: {}",
                removal.priority, removal.polarity, removal.action, removal.subject, removal.reason
            )?;
        }
        Ok(())
    }
}
