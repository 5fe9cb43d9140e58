//! Error types and exit-code mapping for the driver.
//!
//! The error hierarchy follows two layers:
//! - [`AnalysisError`]: what a single analyzer run can produce. It stays
//!   inside the framework; dependents of a failed analyzer are skipped.
//! - [`VetchError`]: the unified driver-level error with a stable exit
//!   code for the CLI.
//!
//! ## Exit Codes
//!
//! - `0`: clean run (always, in JSON mode)
//! - `1`: diagnostics were reported (text mode only)
//! - `2`: configuration error (cyclic requirement, duplicate name, bad flag)
//! - `3`: package load error (unreadable file, malformed unit input)
//! - `4`: fact serialization error
//! - `10`: internal error

use thiserror::Error;

// ============================================================================
// Per-analyzer errors
// ============================================================================

/// Failure of one analyzer on one package.
///
/// An error aborts the analyzer: its diagnostics for that package are
/// discarded and its dependents are skipped.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Ordinary failure reported by the analyzer itself.
    #[error("{0}")]
    Message(String),

    /// A fact export was rejected (unexported object, foreign object).
    #[error("fact export rejected: {0}")]
    Fact(String),

    /// The analyzer panicked; the payload is preserved.
    #[error("panic: {0}")]
    Panicked(String),

    /// A required analyzer failed or was skipped earlier in the schedule.
    #[error("requirement {0} did not run")]
    RequirementFailed(String),
}

impl AnalysisError {
    pub fn msg(m: impl Into<String>) -> Self {
        AnalysisError::Message(m.into())
    }
}

// ============================================================================
// Driver errors
// ============================================================================

/// Unified driver error with a stable exit code.
#[derive(Debug, Error)]
pub enum VetchError {
    /// Invalid registry or flag configuration; fails before any analysis.
    #[error("configuration error: {0}")]
    Config(String),

    /// The package could not be loaded at all (I/O, malformed unit input).
    #[error("load error: {0}")]
    Load(String),

    /// A fact file could not be read or written.
    #[error("fact error: {0}")]
    Fact(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VetchError {
    /// Stable CLI exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            VetchError::Config(_) => 2,
            VetchError::Load(_) | VetchError::Io(_) | VetchError::Json(_) => 3,
            VetchError::Fact(_) => 4,
            VetchError::Internal(_) => 10,
        }
    }
}

impl From<crate::registry::RegistryError> for VetchError {
    fn from(err: crate::registry::RegistryError) -> Self {
        VetchError::Config(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
