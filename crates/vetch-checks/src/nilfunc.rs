//! The `nilfunc` analyzer.
//!
//! A declared function's value is never nil, so comparing it against nil
//! is a constant expression; the author almost always meant to call the
//! function first.

use crate::inspect;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_syntax::ast::{NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;
use vetch_types::{ObjKind, Resolution};

pub static ANALYZER: Analyzer = Analyzer {
    name: "nilfunc",
    doc: "check for useless comparisons between functions and nil\n\n\
          A useless comparison is one like f == nil as opposed to\n\
          f() == nil.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;

    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::BinaryExpr])) {
        let Some(node) = c.node() else { continue };
        let NodeKind::BinaryExpr { op, x, y } = ast.kind(node) else {
            continue;
        };
        if !matches!(op, Token::Eql | Token::Neq) {
            continue;
        }
        let func_name = match (func_object(res, ast, *x), func_object(res, ast, *y)) {
            (Some(f), None) if is_nil(ast, res, *y) => f,
            (None, Some(f)) if is_nil(ast, res, *x) => f,
            _ => continue,
        };
        let outcome = if *op == Token::Eql { "false" } else { "true" };
        let op_text = op.text();
        diags.push(Diagnostic::new(
            ast.pos(node),
            ast.end(node),
            format!("comparison of function {func_name} {op_text} nil is always {outcome}"),
        ));
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

/// The declared function behind an identifier or selector, if that is
/// what the operand is. Variables of function type are legitimately
/// nilable and stay exempt.
fn func_object(res: &Resolution, ast: &vetch_syntax::Ast, e: NodeId) -> Option<String> {
    let e = ast.unparen(e);
    let id = match ast.kind(e) {
        NodeKind::Ident { .. } => e,
        NodeKind::SelectorExpr { sel, .. } => *sel,
        _ => return None,
    };
    let obj = res.info.uses.get(&id).copied()?;
    let o = res.objects.obj(obj);
    if o.kind == ObjKind::Func {
        Some(o.name.clone())
    } else {
        None
    }
}

fn is_nil(ast: &vetch_syntax::Ast, res: &Resolution, e: NodeId) -> bool {
    let e = ast.unparen(e);
    match res.info.uses.get(&e) {
        Some(&obj) => res.objects.obj(obj).kind == ObjKind::Nil,
        None => ast.ident_name_opt(e) == Some("nil"),
    }
}

// ============================================================================
// Tests
// ============================================================================
