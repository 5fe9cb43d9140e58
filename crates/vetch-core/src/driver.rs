//! The driver: the unit-description protocol and diagnostic output.
//!
//! A driver invocation analyzes exactly one package, described by a JSON
//! unit read from stdin (or a file): the package path, its files with
//! per-file language versions, the imports whose fact files to load, and
//! optional output paths for the produced facts and diagnostics.
//!
//! Output is either the short text form `file:line:col: message` on
//! stderr (optionally with a source context window), or the structured
//! JSON schema on stdout. The exit code is non-zero iff diagnostics were
//! reported and JSON mode is off.

use crate::diagnostics::Diagnostic;
use crate::error::VetchError;
use crate::facts::{FactBase, FactFile};
use crate::pass::ReadFileFn;
use crate::registry::Registry;
use crate::schedule::{analyze, CancelToken, PackageData, PackageOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::debug;
use vetch_syntax::annotate_window;
use vetch_types::Config;

// ============================================================================
// Unit description
// ============================================================================

/// One source file of the unit: inline source, or a path for the driver's
/// read hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Per-file language version override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_version: Option<String>,
}

/// An imported package and, when available, its fact file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitImport {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<String>,
}

fn default_go_version() -> String {
    "go1.21".to_string()
}

/// The unit-description file consumed on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub package_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default = "default_go_version")]
    pub go_version: String,
    pub files: Vec<UnitFile>,
    #[serde(default)]
    pub imports: Vec<UnitImport>,
    /// Where to write the package's exported facts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts_output: Option<String>,
    /// Where to write the diagnostics JSON in addition to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_output: Option<String>,
}

/// Parse a unit description from a reader.
pub fn read_unit(mut reader: impl Read) -> Result<Unit, VetchError> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map_err(|e| VetchError::Load(format!("reading unit description: {e}")))?;
    serde_json::from_str(&buf).map_err(|e| VetchError::Load(format!("unit description: {e}")))
}

// ============================================================================
// Options
// ============================================================================

/// Framework-level driver options, set by the CLI.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Emit the JSON schema on stdout and always exit zero.
    pub json: bool,
    /// Print N context lines around each diagnostic in text mode.
    pub context: Option<usize>,
    /// Per-analyzer flag values keyed `analyzer.flag`.
    pub flags: HashMap<String, String>,
}

/// The default read hook: an OS file read.
pub fn os_read_file(path: &str) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

// ============================================================================
// JSON output schema
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEdit {
    pub filename: String,
    pub start: u32,
    pub end: u32,
    pub new: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFix {
    pub message: String,
    pub edits: Vec<JsonEdit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// `file:line:col` of the diagnostic's start.
    pub posn: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggested_fixes: Vec<JsonFix>,
}

/// Package path -> analyzer name -> diagnostics.
pub type JsonOutput = HashMap<String, HashMap<String, Vec<JsonDiagnostic>>>;

fn to_json_diagnostic(data: &PackageData, d: &Diagnostic) -> JsonDiagnostic {
    let posn = format!("{}", data.fset.position(d.pos));
    let suggested_fixes = d
        .fixes
        .iter()
        .map(|fix| JsonFix {
            message: fix.message.clone(),
            edits: fix
                .edits
                .iter()
                .filter_map(|e| {
                    let file = data.fset.file_containing(e.pos)?;
                    Some(JsonEdit {
                        filename: file.name().to_string(),
                        start: file.offset(e.pos) as u32,
                        end: file.offset(e.end) as u32,
                        new: e.new_text.clone(),
                    })
                })
                .collect(),
        })
        .collect();
    JsonDiagnostic {
        posn,
        message: d.message.clone(),
        suggested_fixes,
    }
}

// ============================================================================
// run_unit
// ============================================================================

/// Load, analyze, and report one unit. Returns the process exit code.
pub fn run_unit(
    registry: &Registry,
    unit: &Unit,
    opts: &DriverOptions,
    read_file: ReadFileFn<'_>,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> Result<i32, VetchError> {
    // Materialize sources.
    let mut files = Vec::with_capacity(unit.files.len());
    let mut file_versions = HashMap::new();
    for f in &unit.files {
        let src = match (&f.source, &f.path) {
            (Some(src), _) => src.clone(),
            (None, Some(path)) => {
                let bytes = read_file(path)
                    .map_err(|e| VetchError::Load(format!("reading {path}: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|_| VetchError::Load(format!("{path}: not valid UTF-8")))?
            }
            (None, None) => {
                return Err(VetchError::Load(format!(
                    "file {:?} has neither source nor path",
                    f.name
                )))
            }
        };
        if let Some(v) = &f.go_version {
            file_versions.insert(f.name.clone(), v.clone());
        }
        files.push((f.name.clone(), src));
    }

    let mut cfg = Config::new(unit.package_path.clone(), unit.go_version.clone());
    cfg.package_name = unit.package_name.clone();
    cfg.file_versions = file_versions;
    let data = PackageData::parse(&cfg, &files);

    // Load the imports' fact files.
    let mut imported = FactBase::new();
    for imp in &unit.imports {
        let Some(path) = &imp.facts else { continue };
        let bytes =
            read_file(path).map_err(|e| VetchError::Fact(format!("reading {path}: {e}")))?;
        let file = FactFile::decode(&bytes)?;
        imported.add_file(&file);
    }
    debug!(package = %unit.package_path, facts = imported.len(), "unit loaded");

    let outcome = analyze(
        registry,
        &data,
        &imported,
        &opts.flags,
        read_file,
        &CancelToken::new(),
    );

    if let Some(path) = &unit.facts_output {
        let file = FactFile::new(unit.package_path.clone(), outcome.facts.clone());
        std::fs::write(path, file.encode()?)?;
    }

    report(unit, &data, &outcome, opts, stdout, stderr)
}

/// Render the outcome and compute the exit code.
fn report(
    unit: &Unit,
    data: &PackageData,
    outcome: &PackageOutcome,
    opts: &DriverOptions,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> Result<i32, VetchError> {
    for (name, err) in outcome.errors() {
        writeln!(stderr, "vetch: analyzer {name}: {err}")?;
    }

    if opts.json {
        let mut by_analyzer: HashMap<String, Vec<JsonDiagnostic>> = HashMap::new();
        for (name, d) in outcome.diagnostics() {
            by_analyzer
                .entry(name.to_string())
                .or_default()
                .push(to_json_diagnostic(data, d));
        }
        let mut output = JsonOutput::new();
        output.insert(unit.package_path.clone(), by_analyzer);
        let rendered = serde_json::to_string_pretty(&output)?;
        writeln!(stdout, "{rendered}")?;
        if let Some(path) = &unit.diagnostics_output {
            std::fs::write(path, rendered.as_bytes())?;
        }
        return Ok(0);
    }

    let mut count = 0usize;
    for (_, d) in outcome.diagnostics() {
        count += 1;
        let posn = data.fset.position(d.pos);
        writeln!(stderr, "{posn}: {}", d.message)?;
        if let Some(context) = opts.context {
            if let Some(file) = data.fset.file_containing(d.pos) {
                if let Some(entry) = data.ast.files().iter().find(|e| e.name == file.name()) {
                    let window = annotate_window(
                        &entry.source,
                        file.name(),
                        file.offset(d.pos),
                        file.offset(d.end),
                        &d.message,
                        context,
                    );
                    writeln!(stderr, "{window}")?;
                }
            }
        }
    }
    Ok(if count > 0 { 1 } else { 0 })
}

/// The `Main(analyzers...)` entry point: read a unit from `stdin`, run,
/// and return the exit code. Configuration errors exit with their stable
/// code after printing to stderr.
pub fn main_from(
    registry: &Registry,
    opts: &DriverOptions,
    stdin: impl Read,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> i32 {
    let result = read_unit(stdin)
        .and_then(|unit| run_unit(registry, &unit, opts, &os_read_file, stdout, stderr));
    match result {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(stderr, "vetch: {err}");
            err.exit_code() as i32
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
