//! Reverse lookup tables from type-checker objects to cursors.
//!
//! Built in one pass over the inspector's event array; memory is
//! proportional to the number of identifiers and allocation happens once
//! per table.

use crate::cursor::Cursor;
use crate::inspector::Inspector;
use std::collections::HashMap;
use vetch_syntax::ast::{Ast, NodeKind, NodeTag};
use vetch_types::{ObjId, ObjKind, Resolution, TypesInfo};

/// Per-object lookup tables over one inspector.
#[derive(Debug, Default)]
pub struct TypeIndex {
    defs: HashMap<ObjId, u32>,
    uses: HashMap<ObjId, Vec<u32>>,
    calls: HashMap<ObjId, Vec<u32>>,
}

impl TypeIndex {
    /// Populate the tables from the inspector's events.
    pub fn new(ins: &Inspector, ast: &Ast, info: &TypesInfo) -> TypeIndex {
        let mut index = TypeIndex::default();
        for c in ins.preorder(vetch_syntax::ast::TagSet::ALL) {
            let Some(node) = c.node() else { continue };
            match c.tag() {
                Some(NodeTag::Ident) => {
                    if let Some(&obj) = info.defs.get(&node) {
                        index.defs.insert(obj, c.index());
                    }
                    if let Some(&obj) = info.uses.get(&node) {
                        index.uses.entry(obj).or_default().push(c.index());
                    }
                }
                Some(NodeTag::CallExpr) => {
                    if let Some(obj) = static_callee(ast, info, node) {
                        index.calls.entry(obj).or_default().push(c.index());
                    }
                }
                _ => {}
            }
        }
        index
    }

    /// The single defining identifier of `obj`, if it is in this package's
    /// syntax.
    pub fn def<'a>(&self, ins: &'a Inspector, obj: ObjId) -> Option<Cursor<'a>> {
        self.defs.get(&obj).map(|&i| cursor_at(ins, i))
    }

    /// All use-site identifier cursors of `obj`, in source order.
    pub fn uses<'a>(&self, ins: &'a Inspector, obj: ObjId) -> Vec<Cursor<'a>> {
        self.uses
            .get(&obj)
            .map(|v| v.iter().map(|&i| cursor_at(ins, i)).collect())
            .unwrap_or_default()
    }

    /// All call expressions whose static callee is `obj`.
    pub fn calls<'a>(&self, ins: &'a Inspector, obj: ObjId) -> Vec<Cursor<'a>> {
        self.calls
            .get(&obj)
            .map(|v| v.iter().map(|&i| cursor_at(ins, i)).collect())
            .unwrap_or_default()
    }

    /// Fast short-circuit: is any of `objs` referenced in the package?
    pub fn used(&self, objs: &[ObjId]) -> bool {
        objs.iter()
            .any(|o| self.uses.contains_key(o) || self.calls.contains_key(o))
    }
}

fn cursor_at(ins: &Inspector, index: u32) -> Cursor<'_> {
    Cursor::new(ins, index)
}

/// The statically resolved callee of a call expression, if any.
pub fn static_callee(ast: &Ast, info: &TypesInfo, call: vetch_syntax::ast::NodeId) -> Option<ObjId> {
    let NodeKind::CallExpr { fun, .. } = ast.kind(call) else {
        return None;
    };
    let fun = ast.unparen(*fun);
    match ast.kind(fun) {
        NodeKind::Ident { .. } => info.uses.get(&fun).copied(),
        NodeKind::SelectorExpr { sel, .. } => info.uses.get(sel).copied(),
        _ => None,
    }
}

// ============================================================================
// Package-level resolution helpers
// ============================================================================

/// Resolve a package-level object by import path and name.
///
/// The current package resolves by its own path; imported packages resolve
/// through their recorded scopes.
pub fn package_object(res: &Resolution, pkg_path: &str, name: &str) -> Option<ObjId> {
    let pkg = res.objects.pkg_by_path(pkg_path)?;
    res.objects.pkg(pkg).scope.get(name).copied()
}

/// Resolve a qualified method selection `pkgPath.typeName.methodName`.
pub fn selection(
    res: &Resolution,
    pkg_path: &str,
    type_name: &str,
    method_name: &str,
) -> Option<ObjId> {
    let tobj = package_object(res, pkg_path, type_name)?;
    if res.objects.obj(tobj).kind != ObjKind::TypeName {
        return None;
    }
    let ty = res.types.unalias(res.objects.obj(tobj).ty);
    let vetch_types::TypeKind::Named { methods, .. } = res.types.kind(ty) else {
        return None;
    };
    methods
        .iter()
        .copied()
        .find(|&m| res.objects.obj(m).name == method_name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vetch_syntax::{parse_file, Ast, FileSet};
    use vetch_types::{resolve, Config};

    fn build(src: &str) -> (Ast, Resolution, Inspector) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let parsed = parse_file(&mut fset, &mut ast, "test.go", src);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let res = resolve(&ast, &Config::new("example.com/p", "go1.21"));
        let ins = Inspector::new(&ast);
        (ast, res, ins)
    }

    const SRC: &str = r#"package p

func helper(n int) int {
	return n + 1
}

func caller() int {
	a := helper(1)
	b := helper(a)
	return b
}
"#;

    #[test]
    fn def_and_uses() {
        let (ast, res, ins) = build(SRC);
        let index = TypeIndex::new(&ins, &ast, &res.info);
        let helper = package_object(&res, "example.com/p", "helper").unwrap();

        let def = index.def(&ins, helper).expect("definition indexed");
        assert_eq!(ast.ident_name(def.node().unwrap()), "helper");

        let uses = index.uses(&ins, helper);
        assert_eq!(uses.len(), 2);
        for u in &uses {
            assert!(u.pos() > def.pos());
        }
    }

    #[test]
    fn calls_resolve_static_callee() {
        let (ast, res, ins) = build(SRC);
        let index = TypeIndex::new(&ins, &ast, &res.info);
        let helper = package_object(&res, "example.com/p", "helper").unwrap();
        let calls = index.calls(&ins, helper);
        assert_eq!(calls.len(), 2);
        for c in calls {
            assert_eq!(c.tag(), Some(NodeTag::CallExpr));
        }
    }

    #[test]
    fn used_short_circuits() {
        let (ast, res, ins) = build(SRC);
        let index = TypeIndex::new(&ins, &ast, &res.info);
        let helper = package_object(&res, "example.com/p", "helper").unwrap();
        let caller = package_object(&res, "example.com/p", "caller").unwrap();
        assert!(index.used(&[helper]));
        // caller is never referenced.
        assert!(!index.used(&[caller]));
        assert!(index.used(&[caller, helper]));
        let _ = ast;
    }

    #[test]
    fn method_selection_resolves() {
        let src = r#"package p

import "sync"

func f() {
	var wg sync.WaitGroup
	wg.Add(1)
}
"#;
        let (ast, res, ins) = build(src);
        let index = TypeIndex::new(&ins, &ast, &res.info);
        let add = selection(&res, "sync", "WaitGroup", "Add").expect("sync.WaitGroup.Add");
        let calls = index.calls(&ins, add);
        assert_eq!(calls.len(), 1);
    }
}
