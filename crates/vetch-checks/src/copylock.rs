//! The `copylock` analyzer.
//!
//! A sync primitive copied by value silently forks its state: the copy
//! and the original stop guarding the same critical section. This
//! analyzer reports values of lock-carrying types (a sync primitive, or
//! any struct or array transitively containing one) that are assigned,
//! passed, returned, or ranged over by value.

use crate::inspect;
use std::collections::HashSet;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_syntax::ast::{NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;
use vetch_types::{Resolution, TypeId, TypeKind};

pub static ANALYZER: Analyzer = Analyzer {
    name: "copylock",
    doc: "check for locks erroneously passed by value\n\n\
          Inadvertently copying a value containing a lock, such as\n\
          sync.Mutex or sync.WaitGroup, may cause both copies to\n\
          malfunction. Generally such values should be referred to\n\
          through a pointer.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

const LOCK_TYPES: &[&str] = &["Mutex", "RWMutex", "WaitGroup", "Once"];

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;
    let mut diags = Vec::new();

    let filter = TagSet::of(&[
        NodeTag::AssignStmt,
        NodeTag::ValueSpec,
        NodeTag::CallExpr,
        NodeTag::RangeStmt,
        NodeTag::FuncDecl,
        NodeTag::FuncLit,
    ]);
    for c in insp.inspector.preorder(filter) {
        let Some(node) = c.node() else { continue };
        match ast.kind(node) {
            NodeKind::AssignStmt { lhs, op, rhs }
                if matches!(op, Token::Assign | Token::Define) =>
            {
                for (&l, &r) in lhs.iter().zip(rhs.iter()) {
                    if let Some(lock) = copied_lock(res, ast, r) {
                        let target = ast
                            .ident_name_opt(ast.unparen(l))
                            .unwrap_or("_")
                            .to_string();
                        diags.push(Diagnostic::new(
                            ast.pos(r),
                            ast.end(r),
                            format!("assignment copies lock value to {target}: {lock}"),
                        ));
                    }
                }
            }
            NodeKind::ValueSpec { names, values, .. } => {
                for (&n, &v) in names.iter().zip(values.iter()) {
                    if let Some(lock) = copied_lock(res, ast, v) {
                        let target = ast.ident_name_opt(n).unwrap_or("_").to_string();
                        diags.push(Diagnostic::new(
                            ast.pos(v),
                            ast.end(v),
                            format!("variable declaration copies lock value to {target}: {lock}"),
                        ));
                    }
                }
            }
            NodeKind::CallExpr { fun, args, .. } => {
                for &arg in args {
                    if let Some(lock) = copied_lock(res, ast, arg) {
                        let callee = callee_label(ast, *fun);
                        diags.push(Diagnostic::new(
                            ast.pos(arg),
                            ast.end(arg),
                            format!("call of {callee} copies lock value: {lock}"),
                        ));
                    }
                }
            }
            NodeKind::RangeStmt { value, define, .. } => {
                // `for _, v := range lockSlice` copies each element.
                if !*define {
                    continue;
                }
                let Some(v) = value else { continue };
                let Some(&obj) = res.info.defs.get(v) else { continue };
                let t = res.objects.obj(obj).ty;
                if let Some(lock) = lock_in_type(res, t) {
                    let name = ast.ident_name_opt(*v).unwrap_or("_").to_string();
                    diags.push(Diagnostic::new(
                        ast.pos(*v),
                        ast.end(*v),
                        format!("range var {name} copies lock: {lock}"),
                    ));
                }
            }
            NodeKind::FuncDecl {
                recv, name, typ, ..
            } => {
                let fname = ast.ident_name_opt(*name).unwrap_or("func").to_string();
                if let Some(recv) = recv {
                    check_fields(res, ast, *recv, &fname, &mut diags);
                }
                check_signature(res, ast, *typ, &fname, &mut diags);
            }
            NodeKind::FuncLit { typ, .. } => {
                check_signature(res, ast, *typ, "func literal", &mut diags);
            }
            _ => {}
        }
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

/// The rhs copies a lock when its type carries one and the expression is
/// an existing value rather than a freshly constructed literal or a call
/// result used for initialization.
fn copied_lock(res: &Resolution, ast: &vetch_syntax::Ast, expr: NodeId) -> Option<String> {
    let inner = ast.unparen(expr);
    match ast.kind(inner) {
        // A composite literal is a brand-new value; moving it is fine.
        NodeKind::CompositeLit { .. } => return None,
        // A call result is also a fresh value.
        NodeKind::CallExpr { .. } => return None,
        NodeKind::Ident { .. }
        | NodeKind::SelectorExpr { .. }
        | NodeKind::StarExpr { .. }
        | NodeKind::IndexExpr { .. } => {}
        _ => return None,
    }
    let t = res.info.type_of(inner)?;
    lock_in_type(res, t)
}

/// Check a function signature's parameter and result fields.
fn check_signature(
    res: &Resolution,
    ast: &vetch_syntax::Ast,
    typ: NodeId,
    fname: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let NodeKind::FuncType {
        params, results, ..
    } = ast.kind(typ)
    else {
        return;
    };
    check_fields(res, ast, *params, fname, diags);
    if let Some(results) = results {
        check_fields(res, ast, *results, fname, diags);
    }
}

fn check_fields(
    res: &Resolution,
    ast: &vetch_syntax::Ast,
    list: NodeId,
    fname: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let NodeKind::FieldList { fields } = ast.kind(list) else {
        return;
    };
    for &f in fields {
        let NodeKind::Field { names, typ, .. } = ast.kind(f) else {
            continue;
        };
        // The declared objects carry the resolved type; unnamed fields
        // fall back to the type expression when it was recorded.
        let mut ty = names
            .iter()
            .find_map(|n| res.info.defs.get(n))
            .map(|&obj| res.objects.obj(obj).ty);
        if ty.is_none() {
            ty = typ.and_then(|t| res.info.type_of(ast.unparen(t)));
        }
        let Some(ty) = ty else { continue };
        if let Some(lock) = lock_in_type(res, ty) {
            diags.push(Diagnostic::new(
                ast.pos(f),
                ast.end(f),
                format!("{fname} passes lock by value: {lock}"),
            ));
        }
    }
}

/// The sync type (or the one buried inside `t`) that makes copying `t`
/// unsafe, rendered for the diagnostic. Pointers stop the search: a
/// pointer to a lock is the intended way to share one.
fn lock_in_type(res: &Resolution, t: TypeId) -> Option<String> {
    let mut seen = HashSet::new();
    lock_search(res, t, &mut seen)
}

fn lock_search(res: &Resolution, t: TypeId, seen: &mut HashSet<TypeId>) -> Option<String> {
    if !seen.insert(t) {
        return None;
    }
    let t = res.types.unalias(t);
    match res.types.kind(t) {
        TypeKind::Named { obj, underlying, .. } => {
            let o = res.objects.obj(*obj);
            if let Some(pkg) = o.pkg {
                if res.objects.pkg(pkg).path == "sync"
                    && LOCK_TYPES.contains(&o.name.as_str())
                {
                    return Some(format!("sync.{}", o.name));
                }
            }
            lock_search(res, *underlying, seen)
        }
        TypeKind::Struct { fields } => fields
            .iter()
            .find_map(|f| lock_search(res, f.ty, seen)),
        TypeKind::Array { elem, .. } => lock_search(res, *elem, seen),
        _ => None,
    }
}

fn callee_label(ast: &vetch_syntax::Ast, fun: NodeId) -> String {
    let fun = ast.unparen(fun);
    match ast.kind(fun) {
        NodeKind::Ident { name } => name.clone(),
        NodeKind::SelectorExpr { sel, .. } => {
            ast.ident_name_opt(*sel).unwrap_or("func").to_string()
        }
        _ => "func".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect;
    use vetch_harness::expect;

    fn check(src: &str) {
        expect(src, &[&inspect::ANALYZER, &ANALYZER]);
    }

    #[test]
    fn assignment_copies_are_flagged() {
        check(
            r#"package p

import "sync"

func f() {
	var mu sync.Mutex
	mu2 := mu // want "assignment copies lock value to mu2: sync.Mutex"
	_ = mu2
}
"#,
        );
    }

    #[test]
    fn fresh_literal_initialization_is_fine() {
        check(
            r#"package p

import "sync"

func f() {
	mu := sync.Mutex{}
	mu.Lock()
	mu.Unlock()
}
"#,
        );
    }

    #[test]
    fn parameters_passing_locks_by_value() {
        check(
            r#"package p

import "sync"

func f(mu sync.Mutex) { // want "f passes lock by value: sync.Mutex"
	mu.Lock()
}

func g(mu *sync.Mutex) {
	mu.Lock()
}
"#,
        );
    }

    #[test]
    fn struct_containing_lock_is_contagious() {
        check(
            r#"package p

import "sync"

type guarded struct {
	mu    sync.Mutex
	count int
}

func f(g guarded) { // want "f passes lock by value: sync.Mutex"
	_ = g
}
"#,
        );
    }

    #[test]
    fn call_arguments_are_checked() {
        check(
            r#"package p

import "sync"

func take(v any) {}

func f() {
	var wg sync.WaitGroup
	take(wg) // want "call of take copies lock value: sync.WaitGroup"
	take(&wg)
}
"#,
        );
    }

    #[test]
    fn range_values_copy_elements() {
        check(
            r#"package p

import "sync"

func f(mus []sync.Mutex) {
	for _, mu := range mus { // want "range var mu copies lock: sync.Mutex"
		_ = mu
	}
}
"#,
        );
    }

    #[test]
    fn pointers_are_the_sanctioned_sharing() {
        check(
            r#"package p

import "sync"

type server struct {
	mu *sync.Mutex
}

func f(s server) {
	s2 := s
	_ = s2
}
"#,
        );
    }
}
