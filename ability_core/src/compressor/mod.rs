//! Rule list compression.
//!
//! The compressor partitions rules by (action, subject type), scans each
//! group from highest to lowest priority and merges the survivors back into
//! definition order. The output is always a subsequence of the input and
//! yields the same decision for every subject.

mod report;
mod scan;

pub use report::{CompressionReport, Removal, RemovalReason};

use rayon::prelude::*;
use tracing::info;

use crate::config::CompressorConfig;
use crate::error::Result;
use crate::group::{group_rules, RuleGroup};
use crate::rule::Rule;

use scan::{scan_group, GroupScan};

/// Result of compressing a rule slice.
#[derive(Debug, Clone)]
pub struct Compressed<'a> {
    /// Surviving rules, in definition order.
    pub rules: Vec<&'a Rule>,

    pub report: CompressionReport,
}

impl Compressed<'_> {
    pub fn to_owned_rules(&self) -> Vec<Rule> {
        self.rules.iter().map(|&rule| rule.clone()).collect()
    }
}

/// Removes rules that can never change a decision.
#[derive(Debug, Clone, Default)]
pub struct RuleCompressor {
    config: CompressorConfig,
}

impl RuleCompressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Compress `rules`.
    ///
    /// Every group is validated before any rule is discarded, so malformed
    /// input fails without producing a partial result.
    pub fn compress<'a>(&self, rules: &'a [Rule]) -> Result<Compressed<'a>> {
        let groups = group_rules(rules);
        for group in &groups {
            group.validate()?;
        }

        let default_decision = self.config.default_decision;
        let scans: Vec<GroupScan> = if self.config.runs_parallel(groups.len()) {
            groups
                .par_iter()
                .map(|group| scan_group(group, default_decision))
                .collect::<Result<_>>()?
        } else {
            groups
                .iter()
                .map(|group| scan_group(group, default_decision))
                .collect::<Result<_>>()?
        };

        let compressed = assemble(rules, &groups, scans);
        info!(
            input = compressed.report.input_rules,
            output = compressed.report.output_rules,
            groups = compressed.report.groups,
            "Compressed rule list"
        );
        Ok(compressed)
    }
}

/// Merge group survivors back into definition order.
fn assemble<'a>(rules: &'a [Rule], groups: &[RuleGroup<'a>], scans: Vec<GroupScan>) -> Compressed<'a> {
    let mut survivors: Vec<usize> = Vec::new();
    let mut removals = Vec::new();
    for scan in scans {
        survivors.extend(scan.survivors);
        removals.extend(scan.removals);
    }

    survivors.sort_by_key(|&position| (rules[position].priority(), position));
    removals.sort_by_key(|removal| removal.priority);

    let kept: Vec<&'a Rule> = survivors.into_iter().map(|position| &rules[position]).collect();
    let report = CompressionReport {
        input_rules: rules.len(),
        output_rules: kept.len(),
        groups: groups.len(),
        removals,
    };

    Compressed { rules: kept, report }
}

/// Compress `rules` with the default configuration.
pub fn compress(rules: &[Rule]) -> Result<Vec<&Rule>> {
    Ok(RuleCompressor::default().compress(rules)?.rules)
}

/// Owned variant of [`compress`].
pub fn compress_rules(rules: Vec<Rule>) -> Result<Vec<Rule>> {
    Ok(RuleCompressor::default().compress(&rules)?.to_owned_rules())
}
