//! Analyzer registration and schedule computation.
//!
//! A [`Registry`] is built from an explicit list of analyzers; there is no
//! global registration. Validation happens once, up front: duplicate names,
//! requirements on analyzers missing from the list, requirement cycles, and
//! duplicate fact kinds are all configuration errors that fail before any
//! analysis runs.

use crate::analyzer::Analyzer;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// A configuration error found while validating a registration list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate analyzer name {0:?}")]
    DuplicateName(String),

    #[error("analyzer {analyzer:?} requires {requires:?}, which is not registered")]
    UnknownRequirement { analyzer: String, requires: String },

    #[error("requirement cycle through analyzer {0:?}")]
    Cycle(String),

    #[error("analyzer {analyzer:?} declares duplicate fact kind {kind:?}")]
    DuplicateFactKind { analyzer: String, kind: String },

    #[error("analyzer {analyzer:?} declares duplicate flag {flag:?}")]
    DuplicateFlag { analyzer: String, flag: String },
}

/// A validated set of analyzers in topological schedule order.
#[derive(Debug)]
pub struct Registry {
    order: Vec<&'static Analyzer>,
}

impl Registry {
    /// Validate `analyzers` and compute the schedule.
    ///
    /// The resulting order lists every requirement before its dependents;
    /// among unrelated analyzers, registration order is preserved.
    pub fn new(analyzers: &[&'static Analyzer]) -> Result<Registry, RegistryError> {
        let mut by_name: HashMap<&str, &'static Analyzer> = HashMap::new();
        for a in analyzers {
            if by_name.insert(a.name, a).is_some() {
                return Err(RegistryError::DuplicateName(a.name.to_string()));
            }
            let mut kinds = Vec::new();
            for k in a.fact_kinds {
                if kinds.contains(&k.name) {
                    return Err(RegistryError::DuplicateFactKind {
                        analyzer: a.name.to_string(),
                        kind: k.name.to_string(),
                    });
                }
                kinds.push(k.name);
            }
            let mut flags = Vec::new();
            for f in a.flags {
                if flags.contains(&f.name) {
                    return Err(RegistryError::DuplicateFlag {
                        analyzer: a.name.to_string(),
                        flag: f.name.to_string(),
                    });
                }
                flags.push(f.name);
            }
        }

        // Requirements must resolve within the registration list itself; an
        // analyzer whose requirement was left out is a configuration error
        // even though the static reference still exists.
        for a in analyzers {
            for req in a.requires {
                match by_name.get(req.name) {
                    Some(r) if std::ptr::eq(*r, *req) => {}
                    _ => {
                        return Err(RegistryError::UnknownRequirement {
                            analyzer: a.name.to_string(),
                            requires: req.name.to_string(),
                        })
                    }
                }
            }
        }

        // Depth-first postorder over requires gives the topological order;
        // a gray node seen again is a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(analyzers.len());

        fn visit(
            a: &'static Analyzer,
            marks: &mut HashMap<&str, Mark>,
            order: &mut Vec<&'static Analyzer>,
        ) -> Result<(), RegistryError> {
            match marks.get(a.name).copied().unwrap_or(Mark::White) {
                Mark::Black => return Ok(()),
                Mark::Gray => return Err(RegistryError::Cycle(a.name.to_string())),
                Mark::White => {}
            }
            marks.insert(a.name, Mark::Gray);
            for req in a.requires {
                visit(req, marks, order)?;
            }
            marks.insert(a.name, Mark::Black);
            order.push(a);
            Ok(())
        }

        for a in analyzers {
            visit(a, &mut marks, &mut order)?;
        }

        debug!(
            schedule = ?order.iter().map(|a| a.name).collect::<Vec<_>>(),
            "registry validated"
        );
        Ok(Registry { order })
    }

    /// Analyzers in schedule order.
    pub fn analyzers(&self) -> &[&'static Analyzer] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&'static Analyzer> {
        self.order.iter().copied().find(|a| a.name == name)
    }

    /// All flag definitions, paired with their owning analyzer's name.
    pub fn flags(&self) -> impl Iterator<Item = (&'static str, &'static crate::analyzer::FlagDef)> + use<'_> {
        self.order
            .iter()
            .flat_map(|a| a.flags.iter().map(move |f| (a.name, f)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{no_result, AnalyzerValue, FactKind};
    use crate::error::AnalysisError;
    use crate::pass::Pass;

    fn run_nothing(_pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
        Ok(no_result())
    }

    static A: Analyzer = Analyzer {
        name: "a",
        doc: "base",
        flags: &[],
        requires: &[],
        fact_kinds: &[],
        run_despite_errors: true,
        run: run_nothing,
    };

    static B: Analyzer = Analyzer {
        name: "b",
        doc: "requires a",
        flags: &[],
        requires: &[&A],
        fact_kinds: &[],
        run_despite_errors: true,
        run: run_nothing,
    };

    static C: Analyzer = Analyzer {
        name: "c",
        doc: "requires b and a",
        flags: &[],
        requires: &[&B, &A],
        fact_kinds: &[],
        run_despite_errors: true,
        run: run_nothing,
    };

    #[test]
    fn schedule_lists_requirements_first() {
        let reg = Registry::new(&[&C, &B, &A]).unwrap();
        let names: Vec<_> = reg.analyzers().iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_requirement_is_a_configuration_error() {
        let err = Registry::new(&[&B, &C]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownRequirement {
                analyzer: "b".into(),
                requires: "a".into(),
            }
        );
    }

    #[test]
    fn duplicate_name_rejected() {
        static A2: Analyzer = Analyzer {
            name: "a",
            doc: "imposter",
            flags: &[],
            requires: &[],
            fact_kinds: &[],
            run_despite_errors: true,
            run: run_nothing,
        };
        let err = Registry::new(&[&A, &A2]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("a".into()));
    }

    #[test]
    fn duplicate_fact_kind_rejected() {
        static D: Analyzer = Analyzer {
            name: "d",
            doc: "bad kinds",
            flags: &[],
            requires: &[],
            fact_kinds: &[
                FactKind {
                    name: "k",
                    schema_version: 1,
                },
                FactKind {
                    name: "k",
                    schema_version: 2,
                },
            ],
            run_despite_errors: true,
            run: run_nothing,
        };
        let err = Registry::new(&[&D]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateFactKind {
                analyzer: "d".into(),
                kind: "k".into(),
            }
        );
    }

    #[test]
    fn lookup_by_name() {
        let reg = Registry::new(&[&A, &B]).unwrap();
        assert!(reg.get("a").is_some());
        assert!(reg.get("missing").is_none());
    }
}
