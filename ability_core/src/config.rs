//! Compressor configuration.
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! default_decision = "deny"
//! parallel = true
//! parallel_threshold = 16
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rule::Polarity;

/// Minimum number of groups before parallel compression kicks in.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorConfig {
    /// Decision applied when no rule matches.
    pub default_decision: Polarity,

    /// Compress groups on the rayon thread pool.
    pub parallel: bool,

    /// Group count below which compression stays on the calling thread.
    pub parallel_threshold: usize,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            default_decision: Polarity::Deny,
            parallel: false,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl CompressorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_default_decision(mut self, decision: Polarity) -> Self {
        self.default_decision = decision;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Whether `groups` groups should be compressed in parallel.
    pub fn runs_parallel(&self, groups: usize) -> bool {
        self.parallel && groups >= self.parallel_threshold.max(1)
    }
}
