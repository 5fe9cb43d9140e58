//! The analyzer descriptor.
//!
//! An [`Analyzer`] is an immutable static record describing one check: its
//! name, documentation, flags, requirements, fact kinds, and run function.
//! Descriptors are registered into a [`crate::registry::Registry`], which
//! validates them and computes the schedule; the framework then invokes
//! [`Analyzer::run`] once per package with a fresh [`crate::pass::Pass`].

use crate::error::AnalysisError;
use crate::pass::Pass;
use std::any::Any;
use std::sync::Arc;

/// The opaque result value an analyzer produces for its dependents.
///
/// Dependents downcast through [`Pass::result_of`]; analyzers without a
/// meaningful result return [`no_result`].
pub type AnalyzerValue = Arc<dyn Any + Send + Sync>;

/// The unit result for analyzers that only report diagnostics.
pub fn no_result() -> AnalyzerValue {
    Arc::new(())
}

/// The per-package entry point of an analyzer.
pub type RunFn = fn(&mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError>;

/// A declarative flag on an analyzer, surfaced by the driver as
/// `-analyzername.flagname=value`.
#[derive(Debug, Clone, Copy)]
pub struct FlagDef {
    pub name: &'static str,
    pub doc: &'static str,
    pub default: &'static str,
}

/// A kind of fact an analyzer exports, identified by name within the
/// analyzer and versioned for serialization.
///
/// Payloads are serde values; the kind must be listed in the declaring
/// analyzer's [`Analyzer::fact_kinds`] or export is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactKind {
    pub name: &'static str,
    pub schema_version: u32,
}

/// A named, self-contained check.
///
/// `requires` forms a DAG over registered analyzers; cycles and references
/// to unregistered analyzers are configuration errors. When
/// `run_despite_errors` is false the analyzer is skipped for packages with
/// parse or type errors.
pub struct Analyzer {
    pub name: &'static str,
    pub doc: &'static str,
    pub flags: &'static [FlagDef],
    pub requires: &'static [&'static Analyzer],
    pub fact_kinds: &'static [FactKind],
    pub run_despite_errors: bool,
    pub run: RunFn,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("name", &self.name)
            .field(
                "requires",
                &self.requires.iter().map(|a| a.name).collect::<Vec<_>>(),
            )
            .field("fact_kinds", &self.fact_kinds)
            .field("run_despite_errors", &self.run_despite_errors)
            .finish()
    }
}

impl PartialEq for Analyzer {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Analyzer {}
