//! Rule files.
//!
//! Rules are read from a JSON array or from TOML `[[rules]]` tables.
//! Priorities follow file order.

use std::fs;
use std::path::Path;

use ability_core::{CompressError, Condition, ConditionMap, Polarity, Result, Rule};
use serde::{Deserialize, Serialize};

/// One rule as written in a rule file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub polarity: Polarity,
    pub action: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionMap>,
    /// Label of an executable predicate that cannot be inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opaque: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleTable {
    rules: Vec<RuleEntry>,
}

impl RuleEntry {
    fn into_rule(self, index: usize) -> Result<Rule> {
        let rule = Rule::new(self.polarity, self.action, self.subject);
        match (self.conditions, self.opaque) {
            (Some(_), Some(_)) => Err(CompressError::InvalidRuleFile(format!(
                "rule {} has both `conditions` and `opaque`",
                index
            ))),
            (Some(conditions), None) => Ok(rule.with_condition(conditions)),
            (None, Some(label)) => Ok(rule.with_condition(Condition::opaque(label))),
            (None, None) => Ok(rule),
        }
    }
}

impl From<&Rule> for RuleEntry {
    fn from(rule: &Rule) -> Self {
        let (conditions, opaque) = match rule.condition() {
            Some(Condition::Structured(map)) => (Some(map.clone()), None),
            Some(Condition::Opaque(label)) => (None, Some(label.clone())),
            None => (None, None),
        };
        Self {
            polarity: rule.polarity(),
            action: rule.action().to_string(),
            subject: rule.subject().to_string(),
            conditions,
            opaque,
        }
    }
}

/// Parse a rule list from JSON.
pub fn parse_json(source: &str) -> Result<Vec<Rule>> {
    let entries: Vec<RuleEntry> = serde_json::from_str(source)?;
    into_rules(entries)
}

/// Parse a rule list from TOML.
pub fn parse_toml(source: &str) -> Result<Vec<Rule>> {
    let table: RuleTable =
        toml::from_str(source).map_err(|e| CompressError::InvalidRuleFile(e.to_string()))?;
    into_rules(table.rules)
}

/// Load a rule file, picking the format from the extension.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let source = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => parse_toml(&source),
        Some("json") | None => parse_json(&source),
        Some(other) => Err(CompressError::InvalidRuleFile(format!(
            "unsupported rule file extension: {}",
            other
        ))),
    }
}

fn into_rules(entries: Vec<RuleEntry>) -> Result<Vec<Rule>> {
    let rules = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_rule(index))
        .collect::<Result<Vec<_>>>()?;
    Ok(Rule::prioritized(rules))
}
