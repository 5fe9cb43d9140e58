//! Analyzer framework for the vetch analysis engine.
//!
//! The pieces, bottom up:
//!
//! - [`diagnostics`]: positioned findings with validated suggested fixes.
//! - [`analyzer`]: the immutable analyzer descriptor and its run contract.
//! - [`registry`]: descriptor validation and topological scheduling.
//! - [`facts`]: cross-package fact storage with hashed, versioned files.
//! - [`pass`]: the per-(analyzer, package) invocation context.
//! - [`schedule`]: running a registry over one parsed package.
//! - [`driver`]: the unit-description protocol, JSON/text output, exit
//!   codes.
//!
//! The framework sees one package at a time; cross-package state travels
//! only through facts.

pub mod analyzer;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod facts;
pub mod pass;
pub mod registry;
pub mod schedule;

pub use analyzer::{no_result, Analyzer, AnalyzerValue, FactKind, FlagDef, RunFn};
pub use diagnostics::{Diagnostic, FixError, SuggestedFix, TextEdit};
pub use driver::{
    main_from, os_read_file, read_unit, run_unit, DriverOptions, JsonDiagnostic, JsonEdit, JsonFix,
    JsonOutput, Unit, UnitFile, UnitImport,
};
pub use error::{AnalysisError, VetchError};
pub use facts::{Fact, FactBase, FactFile, FactKey, FACTS_SCHEMA_VERSION};
pub use pass::{Pass, ReadFileFn};
pub use registry::{Registry, RegistryError};
pub use schedule::{
    analyze, AnalyzerOutcome, CancelToken, PackageData, PackageOutcome, SkipReason,
};
