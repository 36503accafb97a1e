//! # Ability Core
//!
//! Compression of ordered allow/deny ability rules.
//!
//! A rule list is evaluated from the most recently defined rule to the
//! oldest; the first rule whose condition matches decides, and when none
//! matches the default decision (deny) applies. Long lists are slow to
//! evaluate, so this crate removes rules that can never change a decision:
//!
//! - rules whose condition is contained in a higher-priority rule's condition
//! - rules below a catch-all, which are never reached
//! - rules that restate a catch-all of the same polarity
//! - catch-alls that restate the default decision
//!
//! Rules only interact with rules for the exact same action and subject
//! type.
//!
//! ```
//! use ability_core::{compress, ConditionMap, Rule};
//!
//! let rules = Rule::prioritized(vec![
//!     Rule::deny("read", "Blog").with_condition(ConditionMap::new().eq("id", 2)),
//!     Rule::allow("read", "Blog").with_condition(ConditionMap::new().eq("id", 1)),
//!     Rule::allow("read", "Blog"),
//! ]);
//! let compressed = compress(&rules).unwrap();
//! assert_eq!(compressed, vec![&rules[2]]);
//! ```

pub mod compressor;
pub mod condition;
pub mod config;
pub mod error;
pub mod group;
pub mod rule;

// Re-export key items for convenience
pub use compressor::{
    compress, compress_rules, CompressionReport, Compressed, Removal, RemovalReason,
    RuleCompressor,
};
pub use condition::{AttrValue, Condition, ConditionMap, Constraint, ValueKind};
pub use config::CompressorConfig;
pub use error::{CompressError, Result};
pub use group::{group_rules, GroupKey, RuleGroup};
pub use rule::{Action, Polarity, Priority, Rule, SubjectType};
