//! The `unusedresult` analyzer.
//!
//! Calling a pure function and discarding its result does nothing; the
//! classic instance is `fmt.Errorf(...)` on its own line where the error
//! was meant to be returned. The set of checked functions is extensible
//! through the `funcs` flag.

use crate::inspect;
use std::collections::HashSet;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, FlagDef, Pass};
use vetch_inspect::{package_object, static_callee};
use vetch_syntax::ast::{NodeKind, NodeTag, TagSet};
use vetch_types::ObjId;

/// Qualified names checked by default.
const DEFAULT_FUNCS: &[(&str, &str)] = &[
    ("fmt", "Sprintf"),
    ("fmt", "Sprint"),
    ("fmt", "Sprintln"),
    ("fmt", "Errorf"),
    ("errors", "New"),
    ("strings", "Repeat"),
    ("strings", "Join"),
    ("strings", "Contains"),
    ("strings", "HasPrefix"),
];

pub static ANALYZER: Analyzer = Analyzer {
    name: "unusedresult",
    doc: "check for unused results of calls to some pure functions\n\n\
          Discarding the result of a side-effect-free call is almost\n\
          always a mistake. The funcs flag adds package-qualified\n\
          function names to the checked set.",
    flags: &[FlagDef {
        name: "funcs",
        doc: "comma-separated list of extra pkgpath.Name functions to check",
        default: "",
    }],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;

    let mut pure: HashSet<ObjId> = DEFAULT_FUNCS
        .iter()
        .filter_map(|&(pkg, name)| package_object(res, pkg, name))
        .collect();
    if let Some(extra) = pass.flag("funcs") {
        for entry in extra.split(',').filter(|s| !s.is_empty()) {
            let Some((pkg, name)) = entry.rsplit_once('.') else {
                return Err(AnalysisError::msg(format!(
                    "unusedresult.funcs: {entry:?} is not of the form pkgpath.Name"
                )));
            };
            if let Some(obj) = package_object(res, pkg, name) {
                pure.insert(obj);
            }
        }
    }

    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::ExprStmt])) {
        let Some(stmt) = c.node() else { continue };
        let NodeKind::ExprStmt { x } = ast.kind(stmt) else {
            continue;
        };
        let call = ast.unparen(*x);
        if !matches!(ast.kind(call), NodeKind::CallExpr { .. }) {
            continue;
        }
        let Some(callee) = static_callee(ast, &res.info, call) else {
            continue;
        };
        if pure.contains(&callee) {
            diags.push(Diagnostic::new(
                ast.pos(stmt),
                ast.end(stmt),
                format!("result of {} call not used", res.objects.describe(callee)),
            ));
        }
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

// ============================================================================
// Tests
// ============================================================================
