//! Declared objects and packages.
//!
//! Every declared name resolves to an [`Object`] in an [`ObjectStore`]:
//! variables, constants, functions, type names, package names, builtins,
//! and labels. Packages own a name-to-object scope; the universe scope with
//! the predeclared identifiers is part of the store.

use crate::ty::TypeId;
use std::collections::BTreeMap;
use vetch_syntax::fileset::{Pos, NO_POS};

// ============================================================================
// Ids
// ============================================================================

/// Handle to an object in an [`ObjectStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

impl ObjId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj_{}", self.0)
    }
}

/// Handle to a package in an [`ObjectStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgId(pub u32);

impl PkgId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Object
// ============================================================================

/// Builtin functions of the universe scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Close,
    Copy,
    Delete,
    Len,
    Make,
    New,
    Panic,
    Print,
    Println,
    Recover,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Close => "close",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Recover => "recover",
        }
    }
}

/// Object kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjKind {
    /// A variable, parameter, or struct field.
    Var,
    Const,
    Func,
    TypeName,
    /// A package name bound by an import.
    PkgName(PkgId),
    Builtin(Builtin),
    Label,
    /// The predeclared `nil`.
    Nil,
}

/// A declared object.
#[derive(Debug, Clone)]
pub struct Object {
    pub kind: ObjKind,
    pub name: String,
    /// Owning package; `None` for universe objects.
    pub pkg: Option<PkgId>,
    pub pos: Pos,
    pub ty: TypeId,
}

impl Object {
    /// Exported per the capitalized-name rule. Universe objects are not
    /// exported.
    pub fn is_exported(&self) -> bool {
        self.pkg.is_some()
            && self
                .name
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase())
    }
}

// ============================================================================
// Package
// ============================================================================

/// A package and its top-level scope.
#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub scope: BTreeMap<String, ObjId>,
    /// True for imports with no available declarations: members are
    /// materialized lazily as untyped objects on first reference.
    pub opaque: bool,
}

// ============================================================================
// ObjectStore
// ============================================================================

/// Arena of objects and packages plus the universe scope.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objs: Vec<Object>,
    pkgs: Vec<Package>,
    universe: BTreeMap<String, ObjId>,
}

impl ObjectStore {
    pub fn new() -> Self {
        ObjectStore::default()
    }

    pub fn alloc(&mut self, obj: Object) -> ObjId {
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(obj);
        id
    }

    pub fn obj(&self, id: ObjId) -> &Object {
        &self.objs[id.index()]
    }

    pub fn obj_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objs[id.index()]
    }

    pub fn objects_len(&self) -> usize {
        self.objs.len()
    }

    pub fn alloc_pkg(&mut self, path: impl Into<String>, name: impl Into<String>, opaque: bool) -> PkgId {
        let id = PkgId(self.pkgs.len() as u32);
        self.pkgs.push(Package {
            path: path.into(),
            name: name.into(),
            scope: BTreeMap::new(),
            opaque,
        });
        id
    }

    pub fn pkg(&self, id: PkgId) -> &Package {
        &self.pkgs[id.index()]
    }

    pub fn pkg_mut(&mut self, id: PkgId) -> &mut Package {
        &mut self.pkgs[id.index()]
    }

    /// Find a package by import path.
    pub fn pkg_by_path(&self, path: &str) -> Option<PkgId> {
        self.pkgs
            .iter()
            .position(|p| p.path == path)
            .map(|i| PkgId(i as u32))
    }

    /// Insert an object into a package scope and return its id.
    pub fn declare(&mut self, pkg: PkgId, obj: Object) -> ObjId {
        let name = obj.name.clone();
        let id = self.alloc(obj);
        self.pkg_mut(pkg).scope.insert(name, id);
        id
    }

    /// Look up a package-scope member; for opaque packages, materialize an
    /// untyped placeholder object on first reference.
    pub fn lookup_member(&mut self, pkg: PkgId, name: &str, invalid: TypeId) -> Option<ObjId> {
        if let Some(&id) = self.pkg(pkg).scope.get(name) {
            return Some(id);
        }
        if !self.pkg(pkg).opaque || name.is_empty() {
            return None;
        }
        let obj = Object {
            kind: ObjKind::Func,
            name: name.to_string(),
            pkg: Some(pkg),
            pos: NO_POS,
            ty: invalid,
        };
        Some(self.declare(pkg, obj))
    }

    // ------------------------------------------------------------------
    // Universe
    // ------------------------------------------------------------------

    pub fn declare_universe(&mut self, obj: Object) -> ObjId {
        let name = obj.name.clone();
        let id = self.alloc(obj);
        self.universe.insert(name, id);
        id
    }

    /// Register an already-allocated object under its name in the universe.
    pub fn insert_universe(&mut self, id: ObjId) {
        let name = self.obj(id).name.clone();
        self.universe.insert(name, id);
    }

    pub fn universe_lookup(&self, name: &str) -> Option<ObjId> {
        self.universe.get(name).copied()
    }

    /// `file:line:col`-free debug description, used in a few messages.
    pub fn describe(&self, id: ObjId) -> String {
        let o = self.obj(id);
        match (&o.kind, o.pkg) {
            (ObjKind::PkgName(p), _) => format!("package {}", self.pkg(*p).path),
            (_, Some(p)) => format!("{}.{}", self.pkg(p).path, o.name),
            _ => o.name.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeStore;

    #[test]
    fn exported_follows_capitalization() {
        let mut store = ObjectStore::new();
        let types = TypeStore::new();
        let pkg = store.alloc_pkg("example.com/p", "p", false);
        let hidden = store.declare(
            pkg,
            Object {
                kind: ObjKind::Func,
                name: "helper".into(),
                pkg: Some(pkg),
                pos: NO_POS,
                ty: types.invalid(),
            },
        );
        let shown = store.declare(
            pkg,
            Object {
                kind: ObjKind::Func,
                name: "Helper".into(),
                pkg: Some(pkg),
                pos: NO_POS,
                ty: types.invalid(),
            },
        );
        assert!(!store.obj(hidden).is_exported());
        assert!(store.obj(shown).is_exported());
    }

    #[test]
    fn opaque_packages_materialize_members() {
        let mut store = ObjectStore::new();
        let types = TypeStore::new();
        let pkg = store.alloc_pkg("example.com/dep", "dep", true);
        let a = store.lookup_member(pkg, "Wrapf", types.invalid()).unwrap();
        let b = store.lookup_member(pkg, "Wrapf", types.invalid()).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.obj(a).name, "Wrapf");
    }

    #[test]
    fn non_opaque_missing_member_is_none() {
        let mut store = ObjectStore::new();
        let types = TypeStore::new();
        let pkg = store.alloc_pkg("sync", "sync", false);
        assert!(store.lookup_member(pkg, "Missing", types.invalid()).is_none());
    }
}
