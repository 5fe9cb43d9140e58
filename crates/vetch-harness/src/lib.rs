//! Expectation-comment test harness for vetch analyzers.
//!
//! Test sources carry their expected diagnostics inline:
//!
//! ```text
//! go func() { println(v) }() // want "loop variable v captured by func literal"
//! ```
//!
//! [`expect`] parses and resolves the source as one package, runs the
//! given analyzers, and matches every reported diagnostic against the
//! `// want "regex"` comment on its line. Unmatched expectations and
//! unexpected diagnostics both fail the test with a combined report.
//!
//! [`Project`] chains several packages in dependency order, carrying
//! exported facts from one package's run into the next, for analyzers
//! that communicate across package boundaries.

use regex::Regex;
use std::collections::HashMap;
use std::io;
use vetch_core::{analyze, Analyzer, CancelToken, FactBase, PackageData, PackageOutcome, Registry};
use vetch_types::Config;

// ============================================================================
// Fixtures
// ============================================================================

/// One package's worth of test sources.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub package_path: String,
    pub go_version: String,
    /// (file name, source) pairs.
    pub files: Vec<(String, String)>,
    /// Per-file language version overrides.
    pub file_versions: HashMap<String, String>,
}

impl Fixture {
    pub fn new(package_path: impl Into<String>, go_version: impl Into<String>) -> Fixture {
        Fixture {
            package_path: package_path.into(),
            go_version: go_version.into(),
            files: Vec::new(),
            file_versions: HashMap::new(),
        }
    }

    pub fn file(mut self, name: impl Into<String>, src: impl Into<String>) -> Fixture {
        self.files.push((name.into(), src.into()));
        self
    }

    pub fn file_version(mut self, name: impl Into<String>, version: impl Into<String>) -> Fixture {
        self.file_versions.insert(name.into(), version.into());
        self
    }
}

/// Several packages analyzed in order, facts flowing forward.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub packages: Vec<Fixture>,
}

impl Project {
    pub fn new() -> Project {
        Project::default()
    }

    pub fn package(mut self, fixture: Fixture) -> Project {
        self.packages.push(fixture);
        self
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Analyze a single-file `main.go` package under the pre-loop-fix
/// language version and match `// want` expectations.
///
/// # Panics
/// Panics with a combined report when any expectation is unmatched or any
/// diagnostic is unexpected.
pub fn expect(src: &str, analyzers: &[&'static Analyzer]) {
    let fixture = Fixture::new("example.com/fix", "go1.21").file("main.go", src);
    expect_fixture(&fixture, analyzers);
}

/// Analyze one fixture package and match `// want` expectations.
pub fn expect_fixture(fixture: &Fixture, analyzers: &[&'static Analyzer]) {
    let (outcome, data) = run_fixture(fixture, analyzers, &FactBase::new());
    check_expectations(fixture, &data, &outcome);
}

/// Analyze every package of a project in order, carrying facts, matching
/// each package's `// want` expectations.
pub fn expect_project(project: &Project, analyzers: &[&'static Analyzer]) {
    let mut facts = FactBase::new();
    for fixture in &project.packages {
        let (outcome, data) = run_fixture(fixture, analyzers, &facts);
        facts.add_facts(&fixture.package_path, &outcome.facts);
        check_expectations(fixture, &data, &outcome);
    }
}

/// Run a fixture and hand back the raw outcome, for tests that inspect
/// facts or analyzer errors directly.
pub fn run_fixture(
    fixture: &Fixture,
    analyzers: &[&'static Analyzer],
    imported: &FactBase,
) -> (PackageOutcome, PackageData) {
    let registry = Registry::new(analyzers).unwrap_or_else(|e| panic!("invalid registry: {e}"));
    let mut cfg = Config::new(fixture.package_path.clone(), fixture.go_version.clone());
    cfg.file_versions = fixture.file_versions.clone();
    let data = PackageData::parse(&cfg, &fixture.files);
    let outcome = analyze(
        &registry,
        &data,
        imported,
        &HashMap::new(),
        &harness_read_file,
        &CancelToken::new(),
    );
    (outcome, data)
}

fn harness_read_file(path: &str) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("harness fixtures have no file system: {path}"),
    ))
}

// ============================================================================
// Expectation matching
// ============================================================================

#[derive(Debug)]
struct Expectation {
    file: String,
    line: u32,
    pattern: Regex,
    matched: bool,
}

/// Pull `// want "re" "re"...` expectations out of every fixture file.
fn parse_expectations(fixture: &Fixture) -> Vec<Expectation> {
    let quoted = Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap();
    let mut out = Vec::new();
    for (name, src) in &fixture.files {
        for (i, line) in src.lines().enumerate() {
            let Some(idx) = line.find("// want ") else {
                continue;
            };
            let rest = &line[idx + "// want ".len()..];
            for cap in quoted.captures_iter(rest) {
                let raw = cap[1].replace("\\\"", "\"");
                let pattern = Regex::new(&raw)
                    .unwrap_or_else(|e| panic!("{name}:{}: bad want pattern {raw:?}: {e}", i + 1));
                out.push(Expectation {
                    file: name.clone(),
                    line: i as u32 + 1,
                    pattern,
                    matched: false,
                });
            }
        }
    }
    out
}

fn check_expectations(fixture: &Fixture, data: &PackageData, outcome: &PackageOutcome) {
    let mut expectations = parse_expectations(fixture);
    let mut problems = Vec::new();

    for (analyzer, diag) in outcome.diagnostics() {
        let posn = data.fset.position(diag.pos);
        let slot = expectations.iter_mut().find(|e| {
            !e.matched
                && e.file == posn.file
                && e.line == posn.line
                && e.pattern.is_match(&diag.message)
        });
        match slot {
            Some(e) => e.matched = true,
            None => problems.push(format!(
                "{posn}: unexpected diagnostic from {analyzer}: {:?}",
                diag.message
            )),
        }
    }
    for e in expectations.iter().filter(|e| !e.matched) {
        problems.push(format!(
            "{}:{}: expected diagnostic matching {:?}, got none",
            e.file,
            e.line,
            e.pattern.as_str()
        ));
    }

    // A failed or skipped analyzer explains missing diagnostics better
    // than the bare mismatch does.
    if !problems.is_empty() {
        for o in &outcome.outcomes {
            if let Some(err) = &o.error {
                problems.push(format!("analyzer {} failed: {err}", o.analyzer));
            }
            if let Some(skip) = &o.skipped {
                problems.push(format!("analyzer {} skipped: {skip:?}", o.analyzer));
            }
        }
        for e in &data.res.info.errors {
            problems.push(format!(
                "package error at {}: {}",
                data.fset.position(e.pos),
                e.message
            ));
        }
        panic!(
            "expectation mismatch in {}:\n  {}",
            fixture.package_path,
            problems.join("\n  ")
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vetch_core::{no_result, AnalysisError, AnalyzerValue, Diagnostic, Pass};
    use vetch_syntax::ast::NodeTag;

    fn run_flag_idents_named_bad(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        let ast = pass.ast;
        let mut hits = Vec::new();
        for entry in ast.files() {
            let mut stack = vec![entry.node];
            while let Some(id) = stack.pop() {
                if ast.tag(id) == NodeTag::Ident && ast.ident_name(id) == "bad" {
                    hits.push((ast.pos(id), ast.end(id)));
                }
                ast.visit_children(id, |_, _, c| stack.push(c));
            }
        }
        for (pos, end) in hits {
            pass.report(Diagnostic::new(pos, end, "identifier bad is bad"));
        }
        Ok(no_result())
    }

    static BADNAME: Analyzer = Analyzer {
        name: "badname",
        doc: "flags identifiers named bad",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: false,
        run: run_flag_idents_named_bad,
    };

    #[test]
    fn matching_expectations_pass() {
        expect(
            "package p\n\nvar bad = 1 // want \"identifier bad is bad\"\nvar good = 2\n",
            &[&BADNAME],
        );
    }

    #[test]
    #[should_panic(expected = "unexpected diagnostic")]
    fn unexpected_diagnostic_fails() {
        expect("package p\n\nvar bad = 1\n", &[&BADNAME]);
    }

    #[test]
    #[should_panic(expected = "got none")]
    fn unmatched_expectation_fails() {
        expect(
            "package p\n\nvar good = 1 // want \"identifier bad is bad\"\n",
            &[&BADNAME],
        );
    }

    #[test]
    fn regex_patterns_match_partially() {
        expect(
            "package p\n\nvar bad = 1 // want \"bad is\"\n",
            &[&BADNAME],
        );
    }
}
