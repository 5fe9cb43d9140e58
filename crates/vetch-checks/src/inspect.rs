//! The `inspect` analyzer: shared traversal infrastructure.
//!
//! Builds the package's [`Inspector`] and [`TypeIndex`] once and hands
//! them to every other analyzer through the result mechanism, so the
//! event array and the object lookup tables are computed a single time
//! per package.

use vetch_core::{AnalysisError, Analyzer, AnalyzerValue, Pass};
use vetch_inspect::{Inspector, TypeIndex};
use std::sync::Arc;

/// The shared result: the pre-order event index and the object tables.
#[derive(Debug)]
pub struct Inspection {
    pub inspector: Inspector,
    pub index: TypeIndex,
}

pub static ANALYZER: Analyzer = Analyzer {
    name: "inspect",
    doc: "optimize AST traversal for later passes\n\n\
          This analyzer builds the package's pre-order inspector and type\n\
          index. It produces no diagnostics; its result is consumed by\n\
          every other built-in analyzer.",
    flags: &[],
    requires: &[],
    fact_kinds: &[],
    run_despite_errors: true,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let inspector = Inspector::new(pass.ast);
    let index = TypeIndex::new(&inspector, pass.ast, &pass.res.info);
    Ok(Arc::new(Inspection { inspector, index }))
}

/// Fetch the inspection from a dependent analyzer's pass.
///
/// Errors rather than panicking if the requirement was not declared; the
/// scheduler turns that into a failed run for the calling analyzer.
pub fn of<'a>(pass: &Pass<'a>) -> Result<&'a Inspection, AnalysisError> {
    pass.result_of::<Inspection>(&ANALYZER)
        .ok_or_else(|| AnalysisError::msg("inspect result unavailable; declare it in requires"))
}

// ============================================================================
// Tests
// ============================================================================
