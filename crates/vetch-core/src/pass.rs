//! The per-(analyzer, package) invocation context.
//!
//! A [`Pass`] bundles everything one analyzer run may touch: the parsed
//! files, the resolution, the results of required analyzers, imported
//! facts, flags, and the diagnostic and fact export buffers. All shared
//! inputs are read-only; the pass itself is owned exclusively by the
//! running analyzer, so a driver may analyze different (analyzer, package)
//! pairs on separate threads.

use crate::analyzer::{Analyzer, AnalyzerValue, FactKind};
use crate::diagnostics::Diagnostic;
use crate::error::AnalysisError;
use crate::facts::{Fact, FactBase, FactKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use tracing::warn;
use vetch_syntax::{Ast, FileSet};
use vetch_types::{object_path, ObjId, Resolution, TypeError};

/// File read hook; defaults to the OS read in the driver.
pub type ReadFileFn<'a> = &'a dyn Fn(&str) -> io::Result<Vec<u8>>;

/// Everything an analyzer sees while running on one package.
pub struct Pass<'a> {
    pub analyzer: &'static Analyzer,
    pub fset: &'a FileSet,
    pub ast: &'a Ast,
    pub res: &'a Resolution,
    /// Import path of the package under analysis.
    pub pkg_path: &'a str,

    results: &'a HashMap<&'static str, AnalyzerValue>,
    imported: &'a FactBase,
    /// Flag values keyed `analyzer.flag`.
    flags: &'a HashMap<String, String>,
    read_file: ReadFileFn<'a>,

    diagnostics: Vec<Diagnostic>,
    exported: Vec<Fact>,
}

impl<'a> Pass<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        analyzer: &'static Analyzer,
        fset: &'a FileSet,
        ast: &'a Ast,
        res: &'a Resolution,
        pkg_path: &'a str,
        results: &'a HashMap<&'static str, AnalyzerValue>,
        imported: &'a FactBase,
        flags: &'a HashMap<String, String>,
        read_file: ReadFileFn<'a>,
    ) -> Pass<'a> {
        Pass {
            analyzer,
            fset,
            ast,
            res,
            pkg_path,
            results,
            imported,
            flags,
            read_file,
            diagnostics: Vec::new(),
            exported: Vec::new(),
        }
    }

    /// Parse and type errors recorded for this package.
    pub fn type_errors(&self) -> &'a [TypeError] {
        &self.res.info.errors
    }

    // ------------------------------------------------------------------
    // Results of required analyzers
    // ------------------------------------------------------------------

    /// The result of a required analyzer, downcast to its concrete type.
    ///
    /// `None` when `dep` was not declared in `requires` (its run is not
    /// ordered before this one) or when the downcast type is wrong.
    pub fn result_of<T: 'static>(&self, dep: &'static Analyzer) -> Option<&'a T> {
        if !self.analyzer.requires.iter().any(|r| std::ptr::eq(*r, dep)) {
            return None;
        }
        self.results.get(dep.name)?.downcast_ref::<T>()
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Append a diagnostic. Suggested fixes that fail validation are
    /// dropped here, with a warning, rather than propagated to the driver.
    pub fn report(&mut self, mut d: Diagnostic) {
        let analyzer = self.analyzer.name;
        d.retain_valid_fixes(|fix, err| {
            warn!(analyzer, fix = %fix.message, %err, "dropping invalid suggested fix");
        });
        self.diagnostics.push(d);
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // ------------------------------------------------------------------
    // Facts
    // ------------------------------------------------------------------

    fn check_kind(&self, kind: &FactKind) -> Result<(), AnalysisError> {
        if self.analyzer.fact_kinds.contains(kind) {
            Ok(())
        } else {
            Err(AnalysisError::Fact(format!(
                "analyzer {:?} does not declare fact kind {:?}",
                self.analyzer.name, kind.name
            )))
        }
    }

    /// Attach a fact to an exported object of the current package.
    ///
    /// Facts on unexported or foreign objects are rejected: unexported
    /// objects are invisible to importers, so such a fact could never be
    /// observed.
    pub fn export_object_fact(
        &mut self,
        kind: &FactKind,
        obj: ObjId,
        value: &impl Serialize,
    ) -> Result<(), AnalysisError> {
        self.check_kind(kind)?;
        let o = self.res.objects.obj(obj);
        if o.pkg != Some(self.res.pkg) {
            return Err(AnalysisError::Fact(format!(
                "cannot export fact on {}: not in the current package",
                self.res.objects.describe(obj)
            )));
        }
        if !o.is_exported() {
            return Err(AnalysisError::Fact(format!(
                "cannot export fact on unexported object {}",
                o.name
            )));
        }
        let Some(path) = object_path(&self.res.types, &self.res.objects, self.res.pkg, obj) else {
            return Err(AnalysisError::Fact(format!(
                "object {} has no stable path",
                o.name
            )));
        };
        let value = serde_json::to_value(value)
            .map_err(|e| AnalysisError::Fact(format!("fact serialization: {e}")))?;
        self.exported.push(Fact {
            analyzer: self.analyzer.name.to_string(),
            kind: kind.name.to_string(),
            version: kind.schema_version,
            object: Some(path),
            value,
        });
        Ok(())
    }

    /// Attach a fact to the current package.
    pub fn export_package_fact(
        &mut self,
        kind: &FactKind,
        value: &impl Serialize,
    ) -> Result<(), AnalysisError> {
        self.check_kind(kind)?;
        let value = serde_json::to_value(value)
            .map_err(|e| AnalysisError::Fact(format!("fact serialization: {e}")))?;
        self.exported.push(Fact {
            analyzer: self.analyzer.name.to_string(),
            kind: kind.name.to_string(),
            version: kind.schema_version,
            object: None,
            value,
        });
        Ok(())
    }

    /// Look up a fact this analyzer exported on `obj` while analyzing a
    /// dependency package.
    pub fn import_object_fact<T: DeserializeOwned>(
        &self,
        kind: &FactKind,
        obj: ObjId,
    ) -> Option<T> {
        let o = self.res.objects.obj(obj);
        let pkg = o.pkg?;
        let path = object_path(&self.res.types, &self.res.objects, pkg, obj)?;
        let value = self.imported.get(
            &FactKey {
                package: self.res.objects.pkg(pkg).path.clone(),
                object: Some(path),
                analyzer: self.analyzer.name.to_string(),
                kind: kind.name.to_string(),
            },
            kind.schema_version,
        )?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Look up a package fact this analyzer exported on a dependency.
    pub fn import_package_fact<T: DeserializeOwned>(
        &self,
        kind: &FactKind,
        pkg_path: &str,
    ) -> Option<T> {
        let value = self.imported.get(
            &FactKey {
                package: pkg_path.to_string(),
                object: None,
                analyzer: self.analyzer.name.to_string(),
                kind: kind.name.to_string(),
            },
            kind.schema_version,
        )?;
        serde_json::from_value(value.clone()).ok()
    }

    pub(crate) fn take_exported(&mut self) -> Vec<Fact> {
        std::mem::take(&mut self.exported)
    }

    // ------------------------------------------------------------------
    // Flags and files
    // ------------------------------------------------------------------

    /// The value of one of this analyzer's flags, falling back to the
    /// declared default.
    pub fn flag(&self, name: &str) -> Option<&str> {
        let key = format!("{}.{}", self.analyzer.name, name);
        if let Some(v) = self.flags.get(&key) {
            return Some(v);
        }
        self.analyzer
            .flags
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.default)
    }

    /// Read a file through the driver's hook.
    pub fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        (self.read_file)(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{no_result, FlagDef};

    fn run_nothing(_p: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        Ok(no_result())
    }

    static KIND: FactKind = FactKind {
        name: "wrapper",
        schema_version: 1,
    };

    static EXPORTER: Analyzer = Analyzer {
        name: "exporter",
        doc: "",
        flags: &[FlagDef {
            name: "strict",
            doc: "enable strict mode",
            default: "false",
        }],
        requires: &[],
        fact_kinds: &[KIND],
        run_despite_errors: true,
        run: run_nothing,
    };

    fn setup(src: &str) -> (FileSet, Ast, Resolution) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let parsed = vetch_syntax::parse_file(&mut fset, &mut ast, "a.go", src);
        assert!(parsed.errors.is_empty());
        let res = vetch_types::resolve(&ast, &vetch_types::Config::new("example.com/p", "go1.21"));
        (fset, ast, res)
    }

    fn no_read(_: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no files here"))
    }

    #[test]
    fn object_fact_requires_exported_object() {
        let (fset, ast, res) = setup("package p\n\nfunc Exported() {}\nfunc hidden() {}\n");
        let results = HashMap::new();
        let imported = FactBase::new();
        let flags = HashMap::new();
        let mut pass = Pass::new(
            &EXPORTER,
            &fset,
            &ast,
            &res,
            "example.com/p",
            &results,
            &imported,
            &flags,
            &no_read,
        );

        let exported = *res.objects.pkg(res.pkg).scope.get("Exported").unwrap();
        let hidden = *res.objects.pkg(res.pkg).scope.get("hidden").unwrap();

        pass.export_object_fact(&KIND, exported, &true).unwrap();
        let err = pass.export_object_fact(&KIND, hidden, &true).unwrap_err();
        assert!(err.to_string().contains("unexported"), "got {err}");

        let facts = pass.take_exported();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].object.as_deref(), Some("Exported"));
    }

    #[test]
    fn undeclared_fact_kind_rejected() {
        let (fset, ast, res) = setup("package p\n");
        let results = HashMap::new();
        let imported = FactBase::new();
        let flags = HashMap::new();
        let mut pass = Pass::new(
            &EXPORTER,
            &fset,
            &ast,
            &res,
            "example.com/p",
            &results,
            &imported,
            &flags,
            &no_read,
        );
        static OTHER: FactKind = FactKind {
            name: "other",
            schema_version: 1,
        };
        let err = pass.export_package_fact(&OTHER, &1).unwrap_err();
        assert!(err.to_string().contains("does not declare"), "got {err}");
    }

    #[test]
    fn package_fact_round_trips_through_base() {
        let (fset, ast, res) = setup("package p\n");
        let results = HashMap::new();
        let mut imported = FactBase::new();
        let flags = HashMap::new();
        {
            let mut pass = Pass::new(
                &EXPORTER,
                &fset,
                &ast,
                &res,
                "example.com/p",
                &results,
                &imported,
                &flags,
                &no_read,
            );
            pass.export_package_fact(&KIND, &42u32).unwrap();
            let facts = pass.take_exported();
            imported.add_facts("example.com/dep", &facts);
        }
        let pass = Pass::new(
            &EXPORTER,
            &fset,
            &ast,
            &res,
            "example.com/p",
            &results,
            &imported,
            &flags,
            &no_read,
        );
        let got: Option<u32> = pass.import_package_fact(&KIND, "example.com/dep");
        assert_eq!(got, Some(42));
        let missing: Option<u32> = pass.import_package_fact(&KIND, "example.com/other");
        assert_eq!(missing, None);
    }

    #[test]
    fn flag_falls_back_to_default() {
        let (fset, ast, res) = setup("package p\n");
        let results = HashMap::new();
        let imported = FactBase::new();
        let mut flags = HashMap::new();
        flags.insert("exporter.strict".to_string(), "true".to_string());
        let pass = Pass::new(
            &EXPORTER,
            &fset,
            &ast,
            &res,
            "example.com/p",
            &results,
            &imported,
            &flags,
            &no_read,
        );
        assert_eq!(pass.flag("strict"), Some("true"));
        assert_eq!(pass.flag("missing"), None);
    }
}
