//! LR construction settings.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Configuration for LR table construction and parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct LrConfig {
    /// Enable error-token recovery
    pub error_recovery: bool,

    /// Maximum number of recoveries before the parse gives up
    pub max_errors: usize,

    /// Merge states with equal item cores (LALR(1)) instead of keeping the
    /// canonical LR(1) collection
    pub use_lalr: bool,
}

impl Default for LrConfig {
    fn default() -> Self {
        Self {
            error_recovery: true,
            max_errors: 100,
            use_lalr: true,
        }
    }
}

impl LrConfig {
    /// Canonical LR(1): no state merging.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            use_lalr: false,
            ..Self::default()
        }
    }
}
