//! Per-package scheduling: run a registry's analyzers in dependency order.
//!
//! Each analyzer runs exactly once per package, after all of its
//! requirements. A failed or skipped requirement skips its dependents; a
//! panic inside an analyzer is caught and converted to an error carrying
//! the payload. Diagnostics of a failed analyzer are discarded.

use crate::analyzer::AnalyzerValue;
use crate::diagnostics::Diagnostic;
use crate::error::AnalysisError;
use crate::facts::{Fact, FactBase};
use crate::pass::{Pass, ReadFileFn};
use crate::registry::Registry;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use vetch_syntax::{parse_file, Ast, FileSet};
use vetch_types::{resolve, Config, Resolution, TypeError};

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation signal, checked before each analyzer starts.
/// A running analyzer is never preempted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Package inputs
// ============================================================================

/// A parsed and resolved package, ready for analysis.
#[derive(Debug)]
pub struct PackageData {
    pub path: String,
    pub fset: FileSet,
    pub ast: Ast,
    pub res: Resolution,
}

impl PackageData {
    /// Parse and resolve `files` (name, source pairs) as one package.
    ///
    /// Parse errors do not abort: they are folded into the resolution's
    /// error list so the `run_despite_errors` gate covers both parse and
    /// type errors.
    pub fn parse(cfg: &Config, files: &[(String, String)]) -> PackageData {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let mut parse_errors = Vec::new();
        for (name, src) in files {
            let parsed = parse_file(&mut fset, &mut ast, name, src);
            parse_errors.extend(
                parsed
                    .errors
                    .into_iter()
                    .map(|e| TypeError {
                        pos: e.pos,
                        message: e.message,
                    }),
            );
        }
        let mut res = resolve(&ast, cfg);
        // Parse errors precede type errors in discovery order.
        parse_errors.extend(res.info.errors.drain(..));
        res.info.errors = parse_errors;
        PackageData {
            path: cfg.package_path.clone(),
            fset,
            ast,
            res,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why an analyzer did not run on a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The package has parse or type errors and the analyzer did not opt
    /// into running despite them.
    TypeErrors,
    /// The named requirement failed or was skipped.
    RequirementFailed(String),
    Cancelled,
}

/// One analyzer's result on one package.
#[derive(Debug)]
pub struct AnalyzerOutcome {
    pub analyzer: &'static str,
    /// Report-ordered diagnostics; empty when the analyzer failed.
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<AnalysisError>,
    pub skipped: Option<SkipReason>,
}

impl AnalyzerOutcome {
    pub fn ran(&self) -> bool {
        self.error.is_none() && self.skipped.is_none()
    }
}

/// Everything produced by one package's schedule.
#[derive(Debug)]
pub struct PackageOutcome {
    /// Outcomes in schedule order; diagnostic streams merge in this order.
    pub outcomes: Vec<AnalyzerOutcome>,
    /// Facts exported by all analyzers, for the package's fact file.
    pub facts: Vec<Fact>,
}

impl PackageOutcome {
    /// All diagnostics with their reporting analyzer, in merge order.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&'static str, &Diagnostic)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.diagnostics.iter().map(|d| (o.analyzer, d)))
    }

    /// Errors of failed analyzers, in schedule order.
    pub fn errors(&self) -> impl Iterator<Item = (&'static str, &AnalysisError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (o.analyzer, e)))
    }
}

// ============================================================================
// The scheduler
// ============================================================================

/// Run every analyzer of `registry` on one package.
pub fn analyze(
    registry: &Registry,
    data: &PackageData,
    imported: &FactBase,
    flags: &HashMap<String, String>,
    read_file: ReadFileFn<'_>,
    cancel: &CancelToken,
) -> PackageOutcome {
    let has_errors = !data.res.info.errors.is_empty();
    let mut results: HashMap<&'static str, AnalyzerValue> = HashMap::new();
    let mut outcomes = Vec::with_capacity(registry.analyzers().len());
    let mut facts = Vec::new();

    for &a in registry.analyzers() {
        let mut outcome = AnalyzerOutcome {
            analyzer: a.name,
            diagnostics: Vec::new(),
            error: None,
            skipped: None,
        };

        if cancel.is_cancelled() {
            outcome.skipped = Some(SkipReason::Cancelled);
            outcomes.push(outcome);
            continue;
        }
        if has_errors && !a.run_despite_errors {
            debug!(analyzer = a.name, package = %data.path, "skipped: package has errors");
            outcome.skipped = Some(SkipReason::TypeErrors);
            outcomes.push(outcome);
            continue;
        }
        if let Some(missing) = a
            .requires
            .iter()
            .find(|req| !results.contains_key(req.name))
        {
            outcome.skipped = Some(SkipReason::RequirementFailed(missing.name.to_string()));
            outcome.error = Some(AnalysisError::RequirementFailed(missing.name.to_string()));
            outcomes.push(outcome);
            continue;
        }

        let mut pass = Pass::new(
            a, &data.fset, &data.ast, &data.res, &data.path, &results, imported, flags, read_file,
        );
        let run = catch_unwind(AssertUnwindSafe(|| (a.run)(&mut pass)));
        match run {
            Ok(Ok(value)) => {
                outcome.diagnostics = pass.take_diagnostics();
                facts.extend(pass.take_exported());
                results.insert(a.name, value);
            }
            Ok(Err(err)) => {
                warn!(analyzer = a.name, package = %data.path, %err, "analyzer failed");
                outcome.error = Some(err);
            }
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                warn!(analyzer = a.name, package = %data.path, panic = %msg, "analyzer panicked");
                outcome.error = Some(AnalysisError::Panicked(msg));
            }
        }
        outcomes.push(outcome);
    }

    PackageOutcome { outcomes, facts }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{no_result, Analyzer, FactKind};
    use crate::diagnostics::Diagnostic;
    use std::io;
    use vetch_syntax::fileset::Pos;

    fn no_read(_: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no file hook"))
    }

    fn parse(src: &str) -> PackageData {
        PackageData::parse(
            &Config::new("example.com/p", "go1.21"),
            &[("a.go".to_string(), src.to_string())],
        )
    }

    fn run_with(data: &PackageData, analyzers: &[&'static Analyzer]) -> PackageOutcome {
        let registry = Registry::new(analyzers).unwrap();
        analyze(
            &registry,
            data,
            &FactBase::new(),
            &HashMap::new(),
            &no_read,
            &CancelToken::new(),
        )
    }

    fn run_count(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        Ok(Arc::new(pass.ast.files().len()))
    }

    static COUNTER: Analyzer = Analyzer {
        name: "counter",
        doc: "counts files",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_count,
    };

    fn run_reporter(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        let n = pass
            .result_of::<usize>(&COUNTER)
            .copied()
            .ok_or_else(|| AnalysisError::msg("counter result missing"))?;
        pass.report(Diagnostic::new(
            Pos(1),
            Pos(2),
            format!("package has {n} file(s)"),
        ));
        Ok(no_result())
    }

    static REPORTER: Analyzer = Analyzer {
        name: "reporter",
        doc: "reports the count",
        flags: &[],
        requires: &[&COUNTER],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_reporter,
    };

    #[test]
    fn results_flow_to_dependents() {
        let data = parse("package p\n");
        let out = run_with(&data, &[&REPORTER, &COUNTER]);
        let diags: Vec<_> = out.diagnostics().collect();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].0, "reporter");
        assert_eq!(diags[0].1.message, "package has 1 file(s)");
    }

    fn run_fail(_pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        Err(AnalysisError::msg("deliberate failure"))
    }

    static FAILING: Analyzer = Analyzer {
        name: "failing",
        doc: "",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_fail,
    };

    fn run_dependent(_pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        panic!("must not run");
    }

    static DEPENDENT: Analyzer = Analyzer {
        name: "dependent",
        doc: "",
        flags: &[],
        requires: &[&FAILING],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_dependent,
    };

    #[test]
    fn failed_requirement_skips_dependents() {
        let data = parse("package p\n");
        let out = run_with(&data, &[&FAILING, &DEPENDENT]);
        assert_eq!(out.outcomes.len(), 2);
        assert!(out.outcomes[0].error.is_some());
        assert_eq!(
            out.outcomes[1].skipped,
            Some(SkipReason::RequirementFailed("failing".to_string()))
        );
    }

    fn run_diag_then_fail(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        pass.report(Diagnostic::new(Pos(1), Pos(2), "about to fail"));
        Err(AnalysisError::msg("late failure"))
    }

    static LATE_FAIL: Analyzer = Analyzer {
        name: "latefail",
        doc: "",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_diag_then_fail,
    };

    #[test]
    fn failed_analyzer_diagnostics_are_discarded() {
        let data = parse("package p\n");
        let out = run_with(&data, &[&LATE_FAIL]);
        assert_eq!(out.diagnostics().count(), 0);
        assert!(out.outcomes[0].error.is_some());
    }

    fn run_panic(_pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        panic!("boom at node 17");
    }

    static PANICKING: Analyzer = Analyzer {
        name: "panicking",
        doc: "",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_panic,
    };

    #[test]
    fn panics_become_errors() {
        let data = parse("package p\n");
        let out = run_with(&data, &[&PANICKING]);
        match &out.outcomes[0].error {
            Some(AnalysisError::Panicked(msg)) => assert!(msg.contains("boom at node 17")),
            other => panic!("expected panic error, got {other:?}"),
        }
    }

    #[test]
    fn type_errors_skip_non_tolerant_analyzers() {
        let data = parse("package p\n\nfunc f() { undefined() }\n");
        assert!(!data.res.info.errors.is_empty());
        let out = run_with(&data, &[&COUNTER]);
        assert_eq!(out.outcomes[0].skipped, Some(SkipReason::TypeErrors));
    }

    fn run_tolerant(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        assert!(!pass.type_errors().is_empty());
        Ok(no_result())
    }

    static TOLERANT: Analyzer = Analyzer {
        name: "tolerant",
        doc: "",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: true,
        run: run_tolerant,
    };

    #[test]
    fn tolerant_analyzers_run_despite_errors() {
        let data = parse("package p\n\nfunc f() { undefined() }\n");
        let out = run_with(&data, &[&TOLERANT]);
        assert!(out.outcomes[0].ran());
    }

    #[test]
    fn cancellation_skips_remaining_analyzers() {
        let data = parse("package p\n");
        let registry = Registry::new(&[&COUNTER]).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = analyze(
            &registry,
            &data,
            &FactBase::new(),
            &HashMap::new(),
            &no_read,
            &cancel,
        );
        assert_eq!(out.outcomes[0].skipped, Some(SkipReason::Cancelled));
    }

    static KIND: FactKind = FactKind {
        name: "marker",
        schema_version: 1,
    };

    fn run_export(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        pass.export_package_fact(&KIND, &"seen")?;
        Ok(no_result())
    }

    static EXPORTER: Analyzer = Analyzer {
        name: "exporter",
        doc: "",
        flags: &[],
        requires: &[],
        fact_kinds: &[KIND],
        run_despite_errors: false,
        run: run_export,
    };

    #[test]
    fn exported_facts_are_collected() {
        let data = parse("package p\n");
        let out = run_with(&data, &[&EXPORTER]);
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.facts[0].kind, "marker");
    }

    #[test]
    fn parse_errors_join_the_error_list() {
        let data = parse("package p\n\nfunc f( {\n");
        assert!(!data.res.info.errors.is_empty());
    }
}
