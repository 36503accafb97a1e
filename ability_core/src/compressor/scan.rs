//! Per-group scan.
//!
//! Rules are visited from highest to lowest priority. `pending` holds the
//! input positions of tentatively kept rules, most recent first. The scan
//! stops at the first catch-all, since nothing below it can be reached.

use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::compressor::report::{Removal, RemovalReason};
use crate::condition::{self, Condition};
use crate::error::Result;
use crate::group::RuleGroup;
use crate::rule::{Polarity, Rule};

/// Survivors and removals of one group.
#[derive(Debug, Default)]
pub(crate) struct GroupScan {
    /// Input positions of the kept rules, highest priority first.
    pub survivors: Vec<usize>,
    pub removals: Vec<Removal>,
}

impl GroupScan {
    fn drop_rule(&mut self, rule: &Rule, reason: RemovalReason) {
        debug!(rule = %rule, reason = %reason, "Dropping rule");
        self.removals.push(Removal::new(rule, reason));
    }
}

/// Compress one validated group.
pub(crate) fn scan_group(group: &RuleGroup<'_>, default_decision: Polarity) -> Result<GroupScan> {
    trace!(group = %group.key(), rules = group.len(), "Scanning group");

    let mut order: Vec<usize> = group.positions().to_vec();
    order.sort_by_key(|&position| Reverse(group.rule(position).priority()));

    let mut scan = GroupScan {
        survivors: Vec::with_capacity(order.len()),
        removals: Vec::new(),
    };
    let mut remaining = order.into_iter();

    while let Some(position) = remaining.next() {
        let rule = group.rule(position);

        let Some(condition) = rule.condition() else {
            trim_shadowed(group, &mut scan, rule);
            if rule.polarity() == default_decision {
                scan.drop_rule(rule, RemovalReason::DefaultCatchAll);
            } else {
                scan.survivors.push(position);
            }
            for unreachable in remaining.by_ref() {
                scan.drop_rule(
                    group.rule(unreachable),
                    RemovalReason::Unreachable {
                        by: rule.priority(),
                    },
                );
            }
            break;
        };

        match find_dominator(group, &scan.survivors, condition)? {
            Some(by) => scan.drop_rule(rule, RemovalReason::Dominated { by: by.priority() }),
            None => scan.survivors.push(position),
        }
    }

    Ok(scan)
}

/// First pending rule whose condition contains `condition`.
fn find_dominator<'a>(
    group: &RuleGroup<'a>,
    pending: &[usize],
    condition: &Condition,
) -> Result<Option<&'a Rule>> {
    for &position in pending {
        let candidate = group.rule(position);
        if condition::contains(candidate.condition(), Some(condition))? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Drop the trailing run of pending rules that share the catch-all's
/// polarity. The run ends at the first rule of the opposite polarity. Opaque
/// rules inside the run are kept.
fn trim_shadowed(group: &RuleGroup<'_>, scan: &mut GroupScan, catch_all: &Rule) {
    let mut opaque = Vec::new();

    while let Some(&last) = scan.survivors.last() {
        let candidate = group.rule(last);
        if candidate.polarity() != catch_all.polarity() {
            break;
        }
        scan.survivors.pop();
        if candidate.is_opaque() {
            opaque.push(last);
        } else {
            scan.drop_rule(
                candidate,
                RemovalReason::ShadowTrimmed {
                    by: catch_all.priority(),
                },
            );
        }
    }

    scan.survivors.extend(opaque.into_iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionMap;
    use crate::group::group_rules;
    use crate::rule::Priority;

    fn id(value: i64) -> ConditionMap {
        ConditionMap::new().eq("id", value)
    }

    fn scan(rules: &[Rule], default_decision: Polarity) -> GroupScan {
        let groups = group_rules(rules);
        assert_eq!(groups.len(), 1);
        scan_group(&groups[0], default_decision).unwrap()
    }

    #[test]
    fn test_survivors_are_highest_priority_first() {
        let rules = Rule::prioritized(vec![
            Rule::allow("read", "Blog").with_condition(id(1)),
            Rule::deny("read", "Blog").with_condition(id(2)),
            Rule::allow("read", "Blog").with_condition(id(3)),
        ]);
        let result = scan(&rules, Polarity::Deny);
        assert_eq!(result.survivors, vec![2, 1, 0]);
        assert!(result.removals.is_empty());
    }

    fn reasons(scan: &GroupScan) -> Vec<(Priority, RemovalReason)> {
        scan.removals
            .iter()
            .map(|removal| (removal.priority, removal.reason))
            .collect()
    }

    #[test]
    fn test_allow_catch_all_reasons() {
        let rules = Rule::prioritized(vec![
            Rule::allow("read", "Blog").with_condition(id(9)),
            Rule::allow("read", "Blog"),
            Rule::allow("read", "Blog").with_condition(id(2)),
            Rule::deny("read", "Blog").with_condition(id(3)),
            Rule::allow("read", "Blog").with_condition(id(1)),
            Rule::allow("read", "Blog").with_condition(id(1)),
        ]);
        let result = scan(&rules, Polarity::Deny);
        assert_eq!(result.survivors, vec![5, 3, 1]);
        assert_eq!(
            reasons(&result),
            vec![
                (Priority(4), RemovalReason::Dominated { by: Priority(5) }),
                (Priority(2), RemovalReason::ShadowTrimmed { by: Priority(1) }),
                (Priority(0), RemovalReason::Unreachable { by: Priority(1) }),
            ]
        );
    }

    #[test]
    fn test_deny_catch_all_reasons() {
        let rules = Rule::prioritized(vec![
            Rule::allow("read", "Blog").with_condition(id(1)),
            Rule::deny("read", "Blog"),
            Rule::deny("read", "Blog").with_condition(id(2)),
        ]);
        let result = scan(&rules, Polarity::Deny);
        assert!(result.survivors.is_empty());
        assert_eq!(
            reasons(&result),
            vec![
                (Priority(2), RemovalReason::ShadowTrimmed { by: Priority(1) }),
                (Priority(1), RemovalReason::DefaultCatchAll),
                (Priority(0), RemovalReason::Unreachable { by: Priority(1) }),
            ]
        );
    }

    #[test]
    fn test_opaque_rules_survive_trimming() {
        let rules = Rule::prioritized(vec![
            Rule::allow("read", "Blog"),
            Rule::allow("read", "Blog").with_condition(id(1)),
            Rule::allow("read", "Blog").with_condition(Condition::opaque("owner?")),
            Rule::allow("read", "Blog").with_condition(id(2)),
        ]);
        let result = scan(&rules, Polarity::Deny);
        assert_eq!(result.survivors, vec![2, 0]);
    }

    #[test]
    fn test_allow_default_swaps_catch_all_roles() {
        let rules = Rule::prioritized(vec![
            Rule::deny("read", "Blog"),
            Rule::deny("read", "Blog").with_condition(id(1)),
            Rule::allow("read", "Blog").with_condition(id(2)),
        ]);
        let result = scan(&rules, Polarity::Allow);
        assert_eq!(result.survivors, vec![2, 0]);

        let rules = Rule::prioritized(vec![
            Rule::deny("read", "Blog").with_condition(id(1)),
            Rule::allow("read", "Blog"),
        ]);
        let result = scan(&rules, Polarity::Allow);
        assert_eq!(result.survivors, Vec::<usize>::new());
        assert_eq!(result.removals[0].reason, RemovalReason::DefaultCatchAll);
    }
}
