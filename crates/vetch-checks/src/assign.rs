//! The `assign` analyzer.
//!
//! `x = x` never does anything; it usually means a typo for a different
//! variable or a forgotten field qualifier. Only side-effect-free shapes
//! (identifiers, field chains, index expressions over them) are
//! compared, by source text.

use crate::inspect;
use crate::util::source_text;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_syntax::ast::{Ast, NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;

pub static ANALYZER: Analyzer = Analyzer {
    name: "assign",
    doc: "check for useless assignments\n\n\
          This checker reports assignments of the form x = x or a[i] =\n\
          a[i]. These are almost always useless, and even when they\n\
          aren't they are usually a mistake.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let fset = pass.fset;

    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::AssignStmt])) {
        let Some(stmt) = c.node() else { continue };
        let NodeKind::AssignStmt { lhs, op, rhs } = ast.kind(stmt) else {
            continue;
        };
        if *op != Token::Assign || lhs.len() != rhs.len() {
            continue;
        }
        for (&l, &r) in lhs.iter().zip(rhs.iter()) {
            if !pure_operand(ast, l) || !pure_operand(ast, r) {
                continue;
            }
            let (Some(lt), Some(rt)) = (source_text(ast, fset, l), source_text(ast, fset, r))
            else {
                continue;
            };
            if lt == rt {
                diags.push(Diagnostic::new(
                    ast.pos(stmt),
                    ast.end(stmt),
                    format!("self-assignment of {lt} to {rt}"),
                ));
            }
        }
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

/// Shapes whose re-evaluation is free of side effects, so textual
/// equality implies a genuine self-assignment.
fn pure_operand(ast: &Ast, e: NodeId) -> bool {
    match ast.kind(e) {
        NodeKind::Ident { .. } | NodeKind::BasicLit { .. } => true,
        NodeKind::SelectorExpr { x, .. } => pure_operand(ast, *x),
        NodeKind::IndexExpr { x, indices } => {
            pure_operand(ast, *x) && indices.iter().all(|&i| pure_operand(ast, i))
        }
        NodeKind::ParenExpr { x } | NodeKind::StarExpr { x } => pure_operand(ast, *x),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
