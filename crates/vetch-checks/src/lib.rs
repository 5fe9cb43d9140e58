//! Built-in analyzers for the vetch analysis engine.
//!
//! Every analyzer here is a uniform client of the framework: it requires
//! [`inspect`] for the shared traversal index, reports through its pass,
//! and keeps quiet on packages with errors unless it explicitly opts in.
//!
//! - [`inspect`] — shared Inspector and TypeIndex (no diagnostics)
//! - [`loopclosure`] — iteration variables captured by escaping literals
//! - [`printf`] — format directive/argument agreement, wrapper facts
//! - [`copylock`] — sync primitives copied by value
//! - [`errorsas`] — bad second argument to errors.As
//! - [`nilfunc`] — functions compared against nil
//! - [`unusedresult`] — discarded results of pure calls
//! - [`tests`] — malformed Test/Benchmark/Fuzz functions
//! - [`rangecontains`] — membership loops replaceable by slices.Contains
//! - [`assign`] — self-assignments

use vetch_core::Analyzer;

pub mod assign;
pub mod copylock;
pub mod errorsas;
pub mod inspect;
pub mod loopclosure;
pub mod nilfunc;
pub mod printf;
pub mod rangecontains;
pub mod tests;
pub mod unusedresult;

mod util;

/// The default registration list, in presentation order. The registry
/// reorders as the requirement graph demands.
pub fn default_analyzers() -> Vec<&'static Analyzer> {
    vec![
        &inspect::ANALYZER,
        &assign::ANALYZER,
        &copylock::ANALYZER,
        &errorsas::ANALYZER,
        &loopclosure::ANALYZER,
        &nilfunc::ANALYZER,
        &printf::ANALYZER,
        &rangecontains::ANALYZER,
        &tests::ANALYZER,
        &unusedresult::ANALYZER,
    ]
}
