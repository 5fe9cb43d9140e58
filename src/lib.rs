//! Vetch: a composable static-analysis framework for Go packages.
//!
//! The engine parses and resolves one package at a time, runs a
//! registry of analyzers over it in dependency order, and reports
//! positioned diagnostics with optional suggested fixes. Cross-package
//! state travels only through serialized facts.
//!
//! The root crate is the CLI front door; the machinery lives in the
//! workspace members and is re-exported here:
//!
//! - [`syntax`]: tokens, scanner, arena AST, parser, file positions
//! - [`types`]: type algebra, objects, resolver, fingerprints
//! - [`inspect`]: the pre-order Inspector, cursors, and type index
//! - [`analyzer`] / [`registry`] / [`pass`] / [`schedule`] / [`facts`] /
//!   [`driver`]: the analyzer framework
//! - [`checks`]: the built-in analyzers
//!
//! # Quick Start
//!
//! ```
//! use vetch::{analyze, CancelToken, FactBase, PackageData, Registry};
//! use vetch::types::Config;
//! use std::collections::HashMap;
//!
//! let registry = Registry::new(&vetch::checks::default_analyzers()).unwrap();
//! let data = PackageData::parse(
//!     &Config::new("example.com/p", "go1.21"),
//!     &[("main.go".to_string(), "package p\n".to_string())],
//! );
//! let outcome = analyze(
//!     &registry,
//!     &data,
//!     &FactBase::new(),
//!     &HashMap::new(),
//!     &vetch::driver::os_read_file,
//!     &CancelToken::new(),
//! );
//! assert_eq!(outcome.diagnostics().count(), 0);
//! ```

// Framework modules, re-exported from vetch-core.
pub use vetch_core::analyzer;
pub use vetch_core::diagnostics;
pub use vetch_core::driver;
pub use vetch_core::error;
pub use vetch_core::facts;
pub use vetch_core::pass;
pub use vetch_core::registry;
pub use vetch_core::schedule;

// The layers below the framework.
pub use vetch_checks as checks;
pub use vetch_inspect as inspect;
pub use vetch_syntax as syntax;
pub use vetch_types as types;

// The working vocabulary, flattened for callers.
pub use vetch_core::{
    analyze, no_result, AnalysisError, Analyzer, AnalyzerValue, CancelToken, Diagnostic,
    DriverOptions, Fact, FactBase, FactFile, FactKind, FlagDef, PackageData, PackageOutcome, Pass,
    Registry, RegistryError, SuggestedFix, TextEdit, Unit, VetchError,
};
