//! Scope-aware resolution: binds identifiers to objects and computes
//! expression types.
//!
//! Resolution runs in phases over the package's files:
//!
//! 1. **Collect**: bind imports per file and enter all package-level names
//!    (types, values, functions) into the package scope, so declaration
//!    order and file order never matter.
//! 2. **Types**: resolve type declarations' underlying types, creating
//!    struct field objects.
//! 3. **Signatures**: compute function and method signatures; methods are
//!    attached to their receiver's named type.
//! 4. **Values**: type package-level const/var specs.
//! 5. **Bodies**: walk every function body with a block-structured scope
//!    chain, recording defs, uses, and expression types.
//!
//! Resolution is deliberately tolerant: anything it cannot type becomes
//! the invalid type without an error, and only genuinely undefined
//! identifiers are recorded as type errors. Analyzers that cannot run on
//! erroneous packages are skipped by the framework, so cheap errors here
//! would silence them for no reason.

use crate::info::{TypeError, TypesInfo};
use crate::object::{Builtin, ObjId, ObjKind, Object, ObjectStore, PkgId};
use crate::stdlib::StdImporter;
use crate::ty::{BasicKind, ChanDir, StructField, TypeId, TypeKind, TypeStore};
use crate::universe::{self, Universe};
use std::collections::HashMap;
use tracing::debug;
use vetch_syntax::ast::{
    Ast, ChanDir as SynChanDir, DeclKeyword, LitKind, NodeId, NodeKind,
};
use vetch_syntax::token::Token;

// ============================================================================
// Config and Resolution
// ============================================================================

/// Resolver configuration for one package.
#[derive(Debug, Clone)]
pub struct Config {
    /// Import path of the package under analysis.
    pub package_path: String,
    /// Package name override; defaults to the files' package clause.
    pub package_name: Option<String>,
    /// Language version applied to files without an explicit entry.
    pub go_version: String,
    /// Per-file language version overrides, keyed by file name.
    pub file_versions: HashMap<String, String>,
}

impl Config {
    pub fn new(package_path: impl Into<String>, go_version: impl Into<String>) -> Self {
        Config {
            package_path: package_path.into(),
            package_name: None,
            go_version: go_version.into(),
            file_versions: HashMap::new(),
        }
    }
}

/// Everything the resolver produced for one package.
#[derive(Debug)]
pub struct Resolution {
    pub types: TypeStore,
    pub objects: ObjectStore,
    pub universe: Universe,
    pub pkg: PkgId,
    pub info: TypesInfo,
}

/// Resolve a package's files.
pub fn resolve(ast: &Ast, cfg: &Config) -> Resolution {
    let mut types = TypeStore::new();
    let mut objects = ObjectStore::new();
    let universe = universe::install(&mut types, &mut objects);
    let importer = StdImporter::new(universe.clone());

    let mut r = Resolver {
        ast,
        cfg,
        types,
        objects,
        universe,
        importer,
        pkg: PkgId(0),
        info: TypesInfo::new(),
        scopes: Vec::new(),
        imports: HashMap::new(),
        current_file: NodeId(0),
        type_specs: Vec::new(),
        value_specs: Vec::new(),
        funcs: Vec::new(),
    };
    r.run();

    Resolution {
        types: r.types,
        objects: r.objects,
        universe: r.universe,
        pkg: r.pkg,
        info: r.info,
    }
}

// ============================================================================
// Resolver
// ============================================================================

struct Resolver<'a> {
    ast: &'a Ast,
    cfg: &'a Config,
    types: TypeStore,
    objects: ObjectStore,
    universe: Universe,
    importer: StdImporter,
    pkg: PkgId,
    info: TypesInfo,
    /// Block scope chain, innermost last.
    scopes: Vec<HashMap<String, ObjId>>,
    /// Per-file import bindings.
    imports: HashMap<NodeId, HashMap<String, ObjId>>,
    current_file: NodeId,

    // Work lists filled by the collect phase.
    type_specs: Vec<(NodeId, NodeId, ObjId)>,
    value_specs: Vec<(NodeId, NodeId, DeclKeyword)>,
    funcs: Vec<(NodeId, NodeId, ObjId)>,
}

impl<'a> Resolver<'a> {
    fn run(&mut self) {
        let files: Vec<_> = self.ast.files().iter().map(|f| f.node).collect();
        if files.is_empty() {
            self.pkg = self
                .objects
                .alloc_pkg(self.cfg.package_path.clone(), "", false);
            return;
        }

        let pkg_name = self.cfg.package_name.clone().unwrap_or_else(|| {
            let NodeKind::File { package, .. } = self.ast.kind(files[0]) else {
                unreachable!()
            };
            self.ast.ident_name(*package).to_string()
        });
        self.pkg = self
            .objects
            .alloc_pkg(self.cfg.package_path.clone(), pkg_name, false);
        debug!(path = %self.cfg.package_path, files = files.len(), "resolving package");

        for entry in self.ast.files() {
            let version = self
                .cfg
                .file_versions
                .get(&entry.name)
                .cloned()
                .unwrap_or_else(|| self.cfg.go_version.clone());
            self.info.file_versions.insert(entry.node, version);
        }

        for &file in &files {
            self.collect_file(file);
        }
        for i in 0..self.type_specs.len() {
            let (file, spec, obj) = self.type_specs[i];
            self.current_file = file;
            self.resolve_type_spec(spec, obj);
        }
        for i in 0..self.funcs.len() {
            let (file, decl, obj) = self.funcs[i];
            self.current_file = file;
            self.resolve_func_signature(decl, obj);
        }
        for i in 0..self.value_specs.len() {
            let (file, spec, keyword) = self.value_specs[i];
            self.current_file = file;
            self.resolve_value_spec(spec, keyword);
        }
        for i in 0..self.funcs.len() {
            let (file, decl, _) = self.funcs[i];
            self.current_file = file;
            self.walk_func_body(decl);
        }
    }

    fn error(&mut self, pos: vetch_syntax::fileset::Pos, message: impl Into<String>) {
        self.info.errors.push(TypeError {
            pos,
            message: message.into(),
        });
    }

    // ------------------------------------------------------------------
    // Phase 1: collection
    // ------------------------------------------------------------------

    fn collect_file(&mut self, file: NodeId) {
        self.current_file = file;
        self.imports.entry(file).or_default();
        let NodeKind::File { decls, .. } = self.ast.kind(file) else {
            return;
        };
        for &decl in decls.clone().iter() {
            match self.ast.kind(decl) {
                NodeKind::GenDecl { keyword, specs } => {
                    let keyword = *keyword;
                    for &spec in specs.clone().iter() {
                        match keyword {
                            DeclKeyword::Import => self.collect_import(file, spec),
                            DeclKeyword::Type => self.collect_type_spec(file, spec),
                            DeclKeyword::Const | DeclKeyword::Var => {
                                self.collect_value_spec(file, spec, keyword)
                            }
                        }
                    }
                }
                NodeKind::FuncDecl { recv, name, .. } => {
                    let recv = *recv;
                    let name = *name;
                    let fname = self.ast.ident_name(name).to_string();
                    let obj = self.objects.alloc(Object {
                        kind: ObjKind::Func,
                        name: fname.clone(),
                        pkg: Some(self.pkg),
                        pos: self.ast.pos(name),
                        ty: self.types.invalid(),
                    });
                    self.info.defs.insert(name, obj);
                    // Methods are reachable through their receiver type, not
                    // the package scope.
                    if recv.is_none() && fname != "_" && fname != "init" {
                        self.objects
                            .pkg_mut(self.pkg)
                            .scope
                            .insert(fname, obj);
                    }
                    self.funcs.push((file, decl, obj));
                }
                _ => {}
            }
        }
    }

    fn collect_import(&mut self, file: NodeId, spec: NodeId) {
        let NodeKind::ImportSpec { name, path } = self.ast.kind(spec) else {
            return;
        };
        let name = *name;
        let path = path.clone();
        let dep = self
            .importer
            .import(&mut self.types, &mut self.objects, &path);
        let local = match name {
            Some(ident) => self.ast.ident_name(ident).to_string(),
            None => self.objects.pkg(dep).name.clone(),
        };
        if local == "_" {
            return;
        }
        let obj = self.objects.alloc(Object {
            kind: ObjKind::PkgName(dep),
            name: local.clone(),
            pkg: Some(self.pkg),
            pos: self.ast.pos(spec),
            ty: self.types.invalid(),
        });
        if let Some(ident) = name {
            self.info.defs.insert(ident, obj);
        }
        self.imports.get_mut(&file).unwrap().insert(local, obj);
    }

    fn collect_type_spec(&mut self, file: NodeId, spec: NodeId) {
        let NodeKind::TypeSpec { name, alias, .. } = self.ast.kind(spec) else {
            return;
        };
        let name = *name;
        let alias = *alias;
        let tname = self.ast.ident_name(name).to_string();
        let obj = self.objects.alloc(Object {
            kind: ObjKind::TypeName,
            name: tname.clone(),
            pkg: Some(self.pkg),
            pos: self.ast.pos(name),
            ty: self.types.invalid(),
        });
        if !alias {
            let invalid = self.types.invalid();
            let named = self.types.alloc(TypeKind::Named {
                obj,
                underlying: invalid,
                type_args: Vec::new(),
                methods: Vec::new(),
            });
            self.objects.obj_mut(obj).ty = named;
        }
        self.info.defs.insert(name, obj);
        if tname != "_" {
            self.objects.pkg_mut(self.pkg).scope.insert(tname, obj);
        }
        self.type_specs.push((file, spec, obj));
    }

    fn collect_value_spec(&mut self, file: NodeId, spec: NodeId, keyword: DeclKeyword) {
        let NodeKind::ValueSpec { names, .. } = self.ast.kind(spec) else {
            return;
        };
        for &name in names.clone().iter() {
            let vname = self.ast.ident_name(name).to_string();
            let kind = if keyword == DeclKeyword::Const {
                ObjKind::Const
            } else {
                ObjKind::Var
            };
            let obj = self.objects.alloc(Object {
                kind,
                name: vname.clone(),
                pkg: Some(self.pkg),
                pos: self.ast.pos(name),
                ty: self.types.invalid(),
            });
            self.info.defs.insert(name, obj);
            if vname != "_" {
                self.objects.pkg_mut(self.pkg).scope.insert(vname, obj);
            }
        }
        self.value_specs.push((file, spec, keyword));
    }

    // ------------------------------------------------------------------
    // Phase 2: type declarations
    // ------------------------------------------------------------------

    fn resolve_type_spec(&mut self, spec: NodeId, obj: ObjId) {
        let NodeKind::TypeSpec {
            type_params,
            alias,
            typ,
            ..
        } = self.ast.kind(spec)
        else {
            return;
        };
        let type_params = *type_params;
        let alias = *alias;
        let typ = *typ;

        self.scopes.push(HashMap::new());
        if let Some(tpl) = type_params {
            self.bind_type_params(tpl);
        }
        let resolved = self.resolve_type_expr(typ);
        self.scopes.pop();

        if alias {
            let a = self.types.alloc(TypeKind::Alias {
                obj,
                actual: resolved,
            });
            self.objects.obj_mut(obj).ty = a;
        } else {
            let named = self.objects.obj(obj).ty;
            self.types.set_named_underlying(named, resolved);
        }
    }

    /// Define type-parameter names from a bracketed field list in the
    /// innermost scope. Returns the created `TypeParam` types in order.
    fn bind_type_params(&mut self, list: NodeId) -> Vec<TypeId> {
        let mut tps = Vec::new();
        let NodeKind::FieldList { fields } = self.ast.kind(list) else {
            return tps;
        };
        let mut index = 0u32;
        for &field in fields.clone().iter() {
            let NodeKind::Field { names, typ, .. } = self.ast.kind(field) else {
                continue;
            };
            let names = names.clone();
            let constraint = *typ;
            for name in names {
                let pname = self.ast.ident_name(name).to_string();
                let tp = self.types.alloc(TypeKind::TypeParam {
                    index,
                    name: pname.clone(),
                });
                tps.push(tp);
                index += 1;
                let obj = self.objects.alloc(Object {
                    kind: ObjKind::TypeName,
                    name: pname.clone(),
                    pkg: Some(self.pkg),
                    pos: self.ast.pos(name),
                    ty: tp,
                });
                self.info.defs.insert(name, obj);
                if pname != "_" {
                    self.scopes.last_mut().unwrap().insert(pname, obj);
                }
            }
            if let Some(c) = constraint {
                let _ = self.resolve_type_expr(c);
            }
        }
        tps
    }

    // ------------------------------------------------------------------
    // Phase 3: signatures
    // ------------------------------------------------------------------

    fn resolve_func_signature(&mut self, decl: NodeId, obj: ObjId) {
        let NodeKind::FuncDecl { recv, typ, .. } = self.ast.kind(decl) else {
            return;
        };
        let recv = *recv;
        let typ = *typ;

        let sig = self.signature_of(typ);
        self.objects.obj_mut(obj).ty = sig;

        if let Some(recv_list) = recv {
            if let Some(base) = self.receiver_base(recv_list) {
                self.types.add_method(base, obj);
            }
        }
    }

    /// The named type a method receiver refers to, if resolvable.
    fn receiver_base(&mut self, recv_list: NodeId) -> Option<TypeId> {
        let NodeKind::FieldList { fields } = self.ast.kind(recv_list) else {
            return None;
        };
        let &field = fields.first()?;
        let NodeKind::Field { typ, .. } = self.ast.kind(field) else {
            return None;
        };
        let typ = (*typ)?;
        let t = self.resolve_type_expr(typ);
        let named = self.types.named_of(t)?;
        Some(self.types.unalias(named))
    }

    /// Compute a `FuncType`'s signature without defining parameter objects.
    fn signature_of(&mut self, ft: NodeId) -> TypeId {
        let NodeKind::FuncType {
            type_params,
            params,
            results,
        } = self.ast.kind(ft)
        else {
            return self.types.invalid();
        };
        let type_params_list = *type_params;
        let params = *params;
        let results = *results;

        self.scopes.push(HashMap::new());
        let mut tps = Vec::new();
        if let Some(tpl) = type_params_list {
            tps = self.bind_type_params(tpl);
        }
        let (param_types, variadic) = self.field_list_types(params);
        let result_types = match results {
            Some(r) => self.field_list_types(r).0,
            None => Vec::new(),
        };
        self.scopes.pop();

        self.types.alloc(TypeKind::Signature {
            params: param_types,
            results: result_types,
            variadic,
            type_params: tps,
        })
    }

    /// Parameter/result types of a field list; one entry per name, or one
    /// per field when unnamed. The second value reports a trailing
    /// ellipsis parameter (already wrapped as a slice).
    fn field_list_types(&mut self, list: NodeId) -> (Vec<TypeId>, bool) {
        let NodeKind::FieldList { fields } = self.ast.kind(list) else {
            return (Vec::new(), false);
        };
        let fields = fields.clone();
        let mut out = Vec::new();
        let mut variadic = false;
        let last = fields.len().saturating_sub(1);
        for (i, &field) in fields.iter().enumerate() {
            let NodeKind::Field { names, typ, .. } = self.ast.kind(field) else {
                continue;
            };
            let names_len = names.len();
            let Some(typ) = *typ else {
                continue;
            };
            let t = if let NodeKind::EllipsisField { elt } = self.ast.kind(typ) {
                let elem = match elt {
                    Some(e) => {
                        let e = *e;
                        self.resolve_type_expr(e)
                    }
                    None => self.types.invalid(),
                };
                if i == last {
                    variadic = true;
                }
                self.types.slice(elem)
            } else {
                self.resolve_type_expr(typ)
            };
            for _ in 0..names_len.max(1) {
                out.push(t);
            }
        }
        (out, variadic)
    }

    // ------------------------------------------------------------------
    // Phase 4: package values
    // ------------------------------------------------------------------

    fn resolve_value_spec(&mut self, spec: NodeId, _keyword: DeclKeyword) {
        let NodeKind::ValueSpec { names, typ, values } = self.ast.kind(spec) else {
            return;
        };
        let names = names.clone();
        let typ = *typ;
        let values = values.clone();

        let declared = typ.map(|t| self.resolve_type_expr(t));
        let value_types: Vec<TypeId> = values.iter().map(|&v| self.walk_expr(v)).collect();

        for (i, &name) in names.iter().enumerate() {
            let Some(&obj) = self.info.defs.get(&name) else {
                continue;
            };
            let t = declared.unwrap_or_else(|| {
                value_types
                    .get(i)
                    .copied()
                    .map(|t| self.default_type(t))
                    .unwrap_or_else(|| self.types.invalid())
            });
            self.objects.obj_mut(obj).ty = t;
        }
    }

    // ------------------------------------------------------------------
    // Phase 5: bodies
    // ------------------------------------------------------------------

    fn walk_func_body(&mut self, decl: NodeId) {
        let NodeKind::FuncDecl {
            recv, typ, body, ..
        } = self.ast.kind(decl)
        else {
            return;
        };
        let recv = *recv;
        let typ = *typ;
        let Some(body) = *body else {
            return;
        };

        self.scopes.push(HashMap::new());
        if let Some(recv_list) = recv {
            self.bind_field_list_vars(recv_list);
        }
        self.bind_signature(typ);
        self.walk_stmt(body);
        self.scopes.pop();
    }

    /// Define receiver/parameter/result objects from a signature in the
    /// current scope.
    fn bind_signature(&mut self, ft: NodeId) {
        let NodeKind::FuncType {
            type_params,
            params,
            results,
        } = self.ast.kind(ft)
        else {
            return;
        };
        let type_params = *type_params;
        let params = *params;
        let results = *results;

        if let Some(tpl) = type_params {
            self.bind_type_params(tpl);
        }
        self.bind_field_list_vars(params);
        if let Some(r) = results {
            self.bind_field_list_vars(r);
        }
    }

    fn bind_field_list_vars(&mut self, list: NodeId) {
        let NodeKind::FieldList { fields } = self.ast.kind(list) else {
            return;
        };
        for &field in fields.clone().iter() {
            let NodeKind::Field { names, typ, .. } = self.ast.kind(field) else {
                continue;
            };
            let names = names.clone();
            let Some(typ) = *typ else { continue };
            let t = if let NodeKind::EllipsisField { elt } = self.ast.kind(typ) {
                let elem = match elt {
                    Some(e) => {
                        let e = *e;
                        self.resolve_type_expr(e)
                    }
                    None => self.types.invalid(),
                };
                self.types.slice(elem)
            } else {
                self.resolve_type_expr(typ)
            };
            for name in names {
                self.define_var(name, t);
            }
        }
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn define_var(&mut self, ident: NodeId, ty: TypeId) -> Option<ObjId> {
        let name = self.ast.ident_name(ident).to_string();
        if name.is_empty() || name == "_" {
            return None;
        }
        let obj = self.objects.alloc(Object {
            kind: ObjKind::Var,
            name: name.clone(),
            pkg: Some(self.pkg),
            pos: self.ast.pos(ident),
            ty,
        });
        self.info.defs.insert(ident, obj);
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name, obj);
            }
            None => {
                self.objects.pkg_mut(self.pkg).scope.insert(name, obj);
            }
        }
        Some(obj)
    }

    fn lookup(&self, name: &str) -> Option<ObjId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&obj) = scope.get(name) {
                return Some(obj);
            }
        }
        if let Some(imports) = self.imports.get(&self.current_file) {
            if let Some(&obj) = imports.get(name) {
                return Some(obj);
            }
        }
        if let Some(&obj) = self.objects.pkg(self.pkg).scope.get(name) {
            return Some(obj);
        }
        self.objects.universe_lookup(name)
    }

    /// Record a use of an identifier and return its type.
    fn use_ident(&mut self, ident: NodeId) -> TypeId {
        let name = self.ast.ident_name(ident).to_string();
        if name.is_empty() || name == "_" {
            return self.types.invalid();
        }
        match self.lookup(&name) {
            Some(obj) => {
                self.info.uses.insert(ident, obj);
                self.objects.obj(obj).ty
            }
            None => {
                self.error(self.ast.pos(ident), format!("undefined: {}", name));
                self.types.invalid()
            }
        }
    }

    // ------------------------------------------------------------------
    // Type expressions
    // ------------------------------------------------------------------

    fn resolve_type_expr(&mut self, node: NodeId) -> TypeId {
        let t = self.resolve_type_expr_inner(node);
        self.info.types.insert(node, t);
        t
    }

    fn resolve_type_expr_inner(&mut self, node: NodeId) -> TypeId {
        match self.ast.kind(node).clone() {
            NodeKind::Ident { ref name } => {
                if name.is_empty() || name == "_" {
                    return self.types.invalid();
                }
                match self.lookup(name) {
                    Some(obj) => {
                        self.info.uses.insert(node, obj);
                        match &self.objects.obj(obj).kind {
                            ObjKind::TypeName => self.objects.obj(obj).ty,
                            _ => self.types.invalid(),
                        }
                    }
                    None => {
                        self.error(self.ast.pos(node), format!("undefined: {}", name));
                        self.types.invalid()
                    }
                }
            }
            NodeKind::SelectorExpr { x, sel } => {
                let x = self.ast.unparen(x);
                if let Some(obj) = self.package_name_of(x) {
                    self.info.uses.insert(x, obj);
                    let ObjKind::PkgName(dep) = self.objects.obj(obj).kind else {
                        return self.types.invalid();
                    };
                    let member_name = self.ast.ident_name(sel).to_string();
                    let invalid = self.types.invalid();
                    if let Some(member) = self.objects.lookup_member(dep, &member_name, invalid) {
                        self.info.uses.insert(sel, member);
                        if self.objects.obj(member).kind == ObjKind::TypeName {
                            return self.objects.obj(member).ty;
                        }
                    }
                }
                self.types.invalid()
            }
            NodeKind::ParenExpr { x } => self.resolve_type_expr(x),
            NodeKind::StarExpr { x } => {
                let inner = self.resolve_type_expr(x);
                self.types.pointer(inner)
            }
            NodeKind::ArrayType { len, elt } => {
                let elem = self.resolve_type_expr(elt);
                match len {
                    None => self.types.slice(elem),
                    Some(l) => {
                        let n = self.const_len(l);
                        self.types.array(n, elem)
                    }
                }
            }
            NodeKind::MapType { key, value } => {
                let k = self.resolve_type_expr(key);
                let v = self.resolve_type_expr(value);
                self.types.map(k, v)
            }
            NodeKind::ChanType { dir, value } => {
                let elem = self.resolve_type_expr(value);
                let dir = match dir {
                    SynChanDir::Both => ChanDir::SendRecv,
                    SynChanDir::Send => ChanDir::SendOnly,
                    SynChanDir::Recv => ChanDir::RecvOnly,
                };
                self.types.chan(dir, elem)
            }
            NodeKind::FuncType { .. } => self.signature_of(node),
            NodeKind::StructType { fields } => self.resolve_struct_type(fields),
            NodeKind::InterfaceType { methods } => self.resolve_interface_type(methods),
            NodeKind::IndexExpr { x, ref indices } => {
                let base = self.resolve_type_expr(x);
                let args: Vec<TypeId> =
                    indices.iter().map(|&a| self.resolve_type_expr(a)).collect();
                self.instantiate(base, args)
            }
            NodeKind::EllipsisField { elt } => {
                let elem = match elt {
                    Some(e) => self.resolve_type_expr(e),
                    None => self.types.invalid(),
                };
                self.types.slice(elem)
            }
            _ => self.types.invalid(),
        }
    }

    fn const_len(&mut self, len: NodeId) -> u64 {
        match self.ast.kind(len) {
            NodeKind::BasicLit {
                lit: LitKind::Int,
                value,
            } => {
                let cleaned: String = value.chars().filter(|&c| c != '_').collect();
                if let Some(hex) = cleaned.strip_prefix("0x").or(cleaned.strip_prefix("0X")) {
                    u64::from_str_radix(hex, 16).unwrap_or(0)
                } else {
                    cleaned.parse().unwrap_or(0)
                }
            }
            _ => {
                // Named constants and expressions are walked for uses but
                // not evaluated.
                let _ = self.walk_expr(len);
                0
            }
        }
    }

    fn resolve_struct_type(&mut self, list: NodeId) -> TypeId {
        let NodeKind::FieldList { fields } = self.ast.kind(list) else {
            return self.types.invalid();
        };
        let fields = fields.clone();
        let pkg_path = self.objects.pkg(self.pkg).path.clone();
        let mut out: Vec<StructField> = Vec::new();
        for field in fields {
            let NodeKind::Field { names, typ, tag } = self.ast.kind(field) else {
                continue;
            };
            let names = names.clone();
            let tag = tag.clone();
            let Some(typ) = *typ else { continue };
            let t = self.resolve_type_expr(typ);
            if names.is_empty() {
                // Embedded field: named after its type.
                let fname = self.embedded_field_name(typ).unwrap_or_default();
                out.push(StructField {
                    name: fname,
                    ty: t,
                    tag,
                    embedded: true,
                    pkg: Some(pkg_path.clone()),
                    obj: None,
                });
            } else {
                for name in names {
                    let fname = self.ast.ident_name(name).to_string();
                    let obj = self.objects.alloc(Object {
                        kind: ObjKind::Var,
                        name: fname.clone(),
                        pkg: Some(self.pkg),
                        pos: self.ast.pos(name),
                        ty: t,
                    });
                    self.info.defs.insert(name, obj);
                    out.push(StructField {
                        name: fname,
                        ty: t,
                        tag: tag.clone(),
                        embedded: false,
                        pkg: Some(pkg_path.clone()),
                        obj: Some(obj),
                    });
                }
            }
        }
        self.types.alloc(TypeKind::Struct { fields: out })
    }

    fn embedded_field_name(&self, typ: NodeId) -> Option<String> {
        match self.ast.kind(typ) {
            NodeKind::Ident { name } => Some(name.clone()),
            NodeKind::SelectorExpr { sel, .. } => {
                self.ast.ident_name_opt(*sel).map(str::to_string)
            }
            NodeKind::StarExpr { x } => self.embedded_field_name(*x),
            NodeKind::IndexExpr { x, .. } => self.embedded_field_name(*x),
            _ => None,
        }
    }

    fn resolve_interface_type(&mut self, list: NodeId) -> TypeId {
        let NodeKind::FieldList { fields } = self.ast.kind(list) else {
            return self.types.invalid();
        };
        let fields = fields.clone();
        let mut methods = Vec::new();
        for field in fields {
            let NodeKind::Field { names, typ, .. } = self.ast.kind(field) else {
                continue;
            };
            let names = names.clone();
            let Some(typ) = *typ else { continue };
            let t = self.resolve_type_expr(typ);
            match names.first() {
                Some(&name) => {
                    let mname = self.ast.ident_name(name).to_string();
                    methods.push((mname, t));
                }
                None => {
                    // Embedded constraint or interface: contributes method
                    // set opacity, represented as a marker entry.
                    if !self.types.is_invalid(t) {
                        methods.push((String::new(), t));
                    }
                }
            }
        }
        self.types.alloc(TypeKind::Interface { methods })
    }

    fn instantiate(&mut self, base: TypeId, args: Vec<TypeId>) -> TypeId {
        let base = self.types.unalias(base);
        match self.types.kind(base) {
            TypeKind::Named {
                obj, underlying, ..
            } => {
                let obj = *obj;
                let underlying = *underlying;
                self.types.alloc(TypeKind::Named {
                    obj,
                    underlying,
                    type_args: args,
                    methods: Vec::new(),
                })
            }
            _ => self.types.invalid(),
        }
    }

    /// The `PkgName` object an expression names, if it is a bare package
    /// identifier not shadowed by a local.
    fn package_name_of(&self, x: NodeId) -> Option<ObjId> {
        let name = self.ast.ident_name_opt(x)?;
        let obj = self.lookup(name)?;
        matches!(self.objects.obj(obj).kind, ObjKind::PkgName(_)).then_some(obj)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn walk_stmt(&mut self, s: NodeId) {
        match self.ast.kind(s).clone() {
            NodeKind::BlockStmt { ref stmts } => {
                self.scopes.push(HashMap::new());
                for &st in stmts {
                    self.walk_stmt(st);
                }
                self.scopes.pop();
            }
            NodeKind::DeclStmt { decl } => self.walk_local_decl(decl),
            NodeKind::EmptyStmt => {}
            NodeKind::LabeledStmt { label, stmt } => {
                let name = self.ast.ident_name(label).to_string();
                let obj = self.objects.alloc(Object {
                    kind: ObjKind::Label,
                    name: name.clone(),
                    pkg: Some(self.pkg),
                    pos: self.ast.pos(label),
                    ty: self.types.invalid(),
                });
                self.info.defs.insert(label, obj);
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name, obj);
                }
                self.walk_stmt(stmt);
            }
            NodeKind::ExprStmt { x } => {
                self.walk_expr(x);
            }
            NodeKind::SendStmt { chan, value } => {
                self.walk_expr(chan);
                self.walk_expr(value);
            }
            NodeKind::IncDecStmt { x, .. } => {
                self.walk_expr(x);
            }
            NodeKind::AssignStmt {
                ref lhs,
                op,
                ref rhs,
            } => {
                if op == Token::Define {
                    self.walk_define(lhs, rhs);
                } else {
                    for &r in rhs {
                        self.walk_expr(r);
                    }
                    for &l in lhs {
                        self.walk_expr(l);
                    }
                }
            }
            NodeKind::GoStmt { call } | NodeKind::DeferStmt { call } => {
                self.walk_expr(call);
            }
            NodeKind::ReturnStmt { ref results } => {
                for &r in results {
                    self.walk_expr(r);
                }
            }
            NodeKind::BranchStmt { label, .. } => {
                if let Some(label) = label {
                    let name = self.ast.ident_name(label).to_string();
                    if let Some(obj) = self.lookup(&name) {
                        self.info.uses.insert(label, obj);
                    }
                }
            }
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                self.walk_expr(cond);
                self.walk_stmt(body);
                if let Some(els) = els {
                    self.walk_stmt(els);
                }
                self.scopes.pop();
            }
            NodeKind::CaseClause {
                ref values,
                ref body,
            } => {
                self.scopes.push(HashMap::new());
                for &v in values {
                    self.walk_expr(v);
                }
                for &st in body {
                    self.walk_stmt(st);
                }
                self.scopes.pop();
            }
            NodeKind::SwitchStmt { init, tag, body } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(tag) = tag {
                    self.walk_expr(tag);
                }
                self.walk_stmt(body);
                self.scopes.pop();
            }
            NodeKind::TypeSwitchStmt { init, assign, body } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                self.walk_type_switch_guard(assign);
                self.walk_stmt(body);
                self.scopes.pop();
            }
            NodeKind::CommClause { comm, ref body } => {
                self.scopes.push(HashMap::new());
                if let Some(comm) = comm {
                    self.walk_stmt(comm);
                }
                for &st in body {
                    self.walk_stmt(st);
                }
                self.scopes.pop();
            }
            NodeKind::SelectStmt { body } => self.walk_stmt(body),
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond);
                }
                if let Some(post) = post {
                    self.walk_stmt(post);
                }
                self.walk_stmt(body);
                self.scopes.pop();
            }
            NodeKind::RangeStmt {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.scopes.push(HashMap::new());
                let tx = self.walk_expr(x);
                let (kt, vt) = self.range_types(tx);
                if define {
                    if let Some(key) = key {
                        self.define_var(key, kt);
                    }
                    if let Some(value) = value {
                        self.define_var(value, vt);
                    }
                } else {
                    if let Some(key) = key {
                        self.walk_expr(key);
                    }
                    if let Some(value) = value {
                        self.walk_expr(value);
                    }
                }
                self.walk_stmt(body);
                self.scopes.pop();
            }
            _ => {}
        }
    }

    fn walk_local_decl(&mut self, decl: NodeId) {
        let NodeKind::GenDecl { keyword, specs } = self.ast.kind(decl) else {
            return;
        };
        let keyword = *keyword;
        for &spec in specs.clone().iter() {
            match keyword {
                DeclKeyword::Const | DeclKeyword::Var => {
                    let NodeKind::ValueSpec { names, typ, values } = self.ast.kind(spec) else {
                        continue;
                    };
                    let names = names.clone();
                    let typ = *typ;
                    let values = values.clone();
                    let declared = typ.map(|t| self.resolve_type_expr(t));
                    let value_types: Vec<TypeId> =
                        values.iter().map(|&v| self.walk_expr(v)).collect();
                    for (i, &name) in names.iter().enumerate() {
                        let t = declared.unwrap_or_else(|| {
                            value_types
                                .get(i)
                                .copied()
                                .map(|t| self.default_type(t))
                                .unwrap_or_else(|| self.types.invalid())
                        });
                        let obj = self.define_var(name, t);
                        if keyword == DeclKeyword::Const {
                            if let Some(obj) = obj {
                                self.objects.obj_mut(obj).kind = ObjKind::Const;
                            }
                        }
                    }
                }
                DeclKeyword::Type => {
                    let NodeKind::TypeSpec {
                        name, alias, typ, ..
                    } = self.ast.kind(spec)
                    else {
                        continue;
                    };
                    let name = *name;
                    let alias = *alias;
                    let typ = *typ;
                    let tname = self.ast.ident_name(name).to_string();
                    let obj = self.objects.alloc(Object {
                        kind: ObjKind::TypeName,
                        name: tname.clone(),
                        pkg: Some(self.pkg),
                        pos: self.ast.pos(name),
                        ty: self.types.invalid(),
                    });
                    self.info.defs.insert(name, obj);
                    if tname != "_" {
                        if let Some(scope) = self.scopes.last_mut() {
                            scope.insert(tname, obj);
                        }
                    }
                    let resolved = self.resolve_type_expr(typ);
                    let ty = if alias {
                        self.types.alloc(TypeKind::Alias {
                            obj,
                            actual: resolved,
                        })
                    } else {
                        self.types.alloc(TypeKind::Named {
                            obj,
                            underlying: resolved,
                            type_args: Vec::new(),
                            methods: Vec::new(),
                        })
                    };
                    self.objects.obj_mut(obj).ty = ty;
                }
                DeclKeyword::Import => {}
            }
        }
    }

    fn walk_type_switch_guard(&mut self, assign: NodeId) {
        match self.ast.kind(assign).clone() {
            NodeKind::AssignStmt {
                ref lhs, ref rhs, ..
            } => {
                if let Some(&r) = rhs.first() {
                    self.walk_expr(r);
                }
                if let Some(&l) = lhs.first() {
                    let any = self.universe.any_type;
                    self.define_var(l, any);
                }
            }
            NodeKind::ExprStmt { x } => {
                self.walk_expr(x);
            }
            _ => {}
        }
    }

    fn walk_define(&mut self, lhs: &[NodeId], rhs: &[NodeId]) {
        let rhs_types: Vec<TypeId> = if rhs.len() == 1 && lhs.len() > 1 {
            let t = self.walk_expr(rhs[0]);
            match self.types.kind(t).clone() {
                TypeKind::Tuple(ts) if ts.len() == lhs.len() => ts,
                _ if lhs.len() == 2 => {
                    // Comma-ok forms: map index, type assertion, channel
                    // receive.
                    vec![t, self.types.basic(BasicKind::Bool)]
                }
                _ => vec![self.types.invalid(); lhs.len()],
            }
        } else {
            let mut ts: Vec<TypeId> = rhs.iter().map(|&r| self.walk_expr(r)).collect();
            ts.resize(lhs.len(), self.types.invalid());
            ts
        };

        for (i, &l) in lhs.iter().enumerate() {
            let t = rhs_types
                .get(i)
                .copied()
                .unwrap_or_else(|| self.types.invalid());
            let t = self.default_type(t);
            let Some(name) = self.ast.ident_name_opt(l) else {
                // Non-identifier on the left of := is a parse-level error;
                // walk it as a use.
                self.walk_expr(l);
                continue;
            };
            let name = name.to_string();
            let already = self
                .scopes
                .last()
                .is_some_and(|scope| scope.contains_key(&name));
            if already {
                // Redeclaration in the same scope: plain assignment.
                self.walk_expr(l);
            } else {
                self.define_var(l, t);
            }
        }
    }

    fn range_types(&mut self, t: TypeId) -> (TypeId, TypeId) {
        let int = self.types.basic(BasicKind::Int);
        let invalid = self.types.invalid();
        let u = self.types.underlying(t);
        match self.types.kind(u).clone() {
            TypeKind::Slice(e) => (int, e),
            TypeKind::Array { elem, .. } => (int, elem),
            TypeKind::Pointer(p) => match self.types.kind(self.types.underlying(p)).clone() {
                TypeKind::Array { elem, .. } => (int, elem),
                _ => (invalid, invalid),
            },
            TypeKind::Map { key, elem } => (key, elem),
            TypeKind::Chan { elem, .. } => (elem, invalid),
            TypeKind::Basic(BasicKind::String) => (int, self.types.basic(BasicKind::Rune)),
            TypeKind::Basic(k) if !k.is_untyped() || k == BasicKind::UntypedInt => (int, invalid),
            TypeKind::Signature { .. } => {
                // Iterator functions: element types are not modeled.
                (invalid, invalid)
            }
            _ => (invalid, invalid),
        }
    }

    fn default_type(&self, t: TypeId) -> TypeId {
        let TypeKind::Basic(k) = self.types.kind(t) else {
            return t;
        };
        match k {
            BasicKind::UntypedBool => self.types.basic(BasicKind::Bool),
            BasicKind::UntypedInt => self.types.basic(BasicKind::Int),
            BasicKind::UntypedRune => self.types.basic(BasicKind::Rune),
            BasicKind::UntypedFloat => self.types.basic(BasicKind::Float64),
            BasicKind::UntypedComplex => self.types.basic(BasicKind::Complex128),
            BasicKind::UntypedString => self.types.basic(BasicKind::String),
            BasicKind::UntypedNil => self.types.invalid(),
            _ => t,
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn walk_expr(&mut self, e: NodeId) -> TypeId {
        if let Some(&t) = self.info.types.get(&e) {
            return t;
        }
        let t = self.walk_expr_inner(e);
        self.info.types.insert(e, t);
        t
    }

    fn walk_expr_inner(&mut self, e: NodeId) -> TypeId {
        match self.ast.kind(e).clone() {
            NodeKind::Ident { .. } => self.use_ident(e),
            NodeKind::BasicLit { lit, .. } => {
                let k = match lit {
                    LitKind::Int => BasicKind::UntypedInt,
                    LitKind::Float => BasicKind::UntypedFloat,
                    LitKind::Imag => BasicKind::UntypedComplex,
                    LitKind::Char => BasicKind::UntypedRune,
                    LitKind::Str => BasicKind::UntypedString,
                };
                self.types.basic(k)
            }
            NodeKind::FuncLit { typ, body } => {
                let sig = self.signature_of(typ);
                self.scopes.push(HashMap::new());
                self.bind_signature(typ);
                self.walk_stmt(body);
                self.scopes.pop();
                sig
            }
            NodeKind::CompositeLit { typ, ref elts } => {
                let t = match typ {
                    Some(t) => self.resolve_type_expr(t),
                    None => self.types.invalid(),
                };
                self.walk_composite_elts(t, elts);
                t
            }
            NodeKind::ParenExpr { x } => self.walk_expr(x),
            NodeKind::SelectorExpr { x, sel } => self.walk_selector(x, sel),
            NodeKind::IndexExpr { x, ref indices } => {
                // A type name base means generic instantiation.
                if self.denotes_type(x) {
                    return self.resolve_type_expr(e);
                }
                let tx = self.walk_expr(x);
                for &i in indices {
                    self.walk_expr(i);
                }
                let u = self.types.underlying(tx);
                match self.types.kind(u).clone() {
                    TypeKind::Slice(e) => e,
                    TypeKind::Array { elem, .. } => elem,
                    TypeKind::Pointer(p) => {
                        match self.types.kind(self.types.underlying(p)).clone() {
                            TypeKind::Array { elem, .. } => elem,
                            _ => self.types.invalid(),
                        }
                    }
                    TypeKind::Map { elem, .. } => elem,
                    TypeKind::Basic(BasicKind::String) => self.types.basic(BasicKind::Byte),
                    _ => self.types.invalid(),
                }
            }
            NodeKind::SliceExpr {
                x, low, high, max, ..
            } => {
                let tx = self.walk_expr(x);
                for part in [low, high, max].into_iter().flatten() {
                    self.walk_expr(part);
                }
                let u = self.types.underlying(tx);
                match self.types.kind(u).clone() {
                    TypeKind::Array { elem, .. } => self.types.slice(elem),
                    TypeKind::Pointer(p) => {
                        match self.types.kind(self.types.underlying(p)).clone() {
                            TypeKind::Array { elem, .. } => self.types.slice(elem),
                            _ => tx,
                        }
                    }
                    _ => tx,
                }
            }
            NodeKind::TypeAssertExpr { x, typ } => {
                self.walk_expr(x);
                match typ {
                    Some(t) => self.resolve_type_expr(t),
                    None => self.types.invalid(),
                }
            }
            NodeKind::CallExpr { fun, ref args, .. } => self.walk_call(fun, args),
            NodeKind::StarExpr { x } => {
                if self.denotes_type(x) {
                    let inner = self.resolve_type_expr(x);
                    return self.types.pointer(inner);
                }
                let tx = self.walk_expr(x);
                match self.types.kind(self.types.underlying(tx)).clone() {
                    TypeKind::Pointer(e) => e,
                    _ => self.types.invalid(),
                }
            }
            NodeKind::UnaryExpr { op, x } => {
                let tx = self.walk_expr(x);
                match op {
                    Token::And => self.types.pointer(tx),
                    Token::Arrow => match self.types.kind(self.types.underlying(tx)).clone() {
                        TypeKind::Chan { elem, .. } => elem,
                        _ => self.types.invalid(),
                    },
                    Token::Not => self.types.basic(BasicKind::Bool),
                    _ => tx,
                }
            }
            NodeKind::BinaryExpr { op, x, y } => {
                let tx = self.walk_expr(x);
                let ty = self.walk_expr(y);
                match op {
                    Token::Eql
                    | Token::Neq
                    | Token::Lss
                    | Token::Leq
                    | Token::Gtr
                    | Token::Geq
                    | Token::LAnd
                    | Token::LOr => self.types.basic(BasicKind::UntypedBool),
                    Token::Shl | Token::Shr => tx,
                    _ => {
                        let untyped_x = matches!(
                            self.types.kind(tx),
                            TypeKind::Basic(k) if k.is_untyped()
                        );
                        let untyped_y = matches!(
                            self.types.kind(ty),
                            TypeKind::Basic(k) if k.is_untyped()
                        );
                        if untyped_x && !untyped_y {
                            ty
                        } else {
                            tx
                        }
                    }
                }
            }
            NodeKind::KeyValueExpr { key, value } => {
                self.walk_expr(key);
                self.walk_expr(value)
            }
            // Type literals in expression position (conversions).
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. } => self.resolve_type_expr(e),
            _ => self.types.invalid(),
        }
    }

    /// Does this expression denote a type (for conversions and generic
    /// instantiation)?
    fn denotes_type(&self, e: NodeId) -> bool {
        let e = self.ast.unparen(e);
        match self.ast.kind(e) {
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. } => true,
            NodeKind::StarExpr { x } => self.denotes_type(*x),
            NodeKind::Ident { name } => self
                .lookup(name)
                .is_some_and(|obj| self.objects.obj(obj).kind == ObjKind::TypeName),
            NodeKind::SelectorExpr { x, sel } => {
                let x = self.ast.unparen(*x);
                let Some(pkg_obj) = self.package_name_of(x) else {
                    return false;
                };
                let ObjKind::PkgName(dep) = self.objects.obj(pkg_obj).kind else {
                    return false;
                };
                let Some(name) = self.ast.ident_name_opt(*sel) else {
                    return false;
                };
                self.objects
                    .pkg(dep)
                    .scope
                    .get(name)
                    .is_some_and(|&m| self.objects.obj(m).kind == ObjKind::TypeName)
            }
            NodeKind::IndexExpr { x, .. } => self.denotes_type(*x),
            _ => false,
        }
    }

    fn walk_composite_elts(&mut self, t: TypeId, elts: &[NodeId]) {
        let u = self.types.underlying(t);
        let struct_fields: Option<Vec<StructField>> = match self.types.kind(u) {
            TypeKind::Struct { fields } => Some(fields.clone()),
            _ => None,
        };
        for &elt in elts {
            match self.ast.kind(elt).clone() {
                NodeKind::KeyValueExpr { key, value } => {
                    let mut field_key = false;
                    if let Some(fields) = &struct_fields {
                        if let Some(kname) = self.ast.ident_name_opt(key) {
                            if let Some(f) = fields.iter().find(|f| f.name == kname) {
                                field_key = true;
                                if let Some(obj) = f.obj {
                                    self.info.uses.insert(key, obj);
                                    self.info.types.insert(key, f.ty);
                                }
                            }
                        }
                    }
                    if !field_key {
                        self.walk_expr(key);
                    }
                    self.walk_expr(value);
                    self.info.types.insert(elt, self.types.invalid());
                }
                _ => {
                    self.walk_expr(elt);
                }
            }
        }
    }

    fn walk_selector(&mut self, x: NodeId, sel: NodeId) -> TypeId {
        let xu = self.ast.unparen(x);

        // Package member access.
        if let Some(pkg_obj) = self.package_name_of(xu) {
            self.info.uses.insert(xu, pkg_obj);
            self.info.types.insert(x, self.types.invalid());
            let ObjKind::PkgName(dep) = self.objects.obj(pkg_obj).kind else {
                return self.types.invalid();
            };
            let Some(name) = self.ast.ident_name_opt(sel) else {
                return self.types.invalid();
            };
            let name = name.to_string();
            let invalid = self.types.invalid();
            match self.objects.lookup_member(dep, &name, invalid) {
                Some(member) => {
                    self.info.uses.insert(sel, member);
                    self.objects.obj(member).ty
                }
                None => {
                    self.error(
                        self.ast.pos(sel),
                        format!("undefined: {}.{}", self.objects.pkg(dep).name, name),
                    );
                    invalid
                }
            }
        } else {
            let tx = self.walk_expr(x);
            self.select_member(tx, sel)
        }
    }

    /// Resolve `sel` against a value of type `tx`: methods first, then
    /// struct fields, then one level of embedded fields.
    fn select_member(&mut self, tx: TypeId, sel: NodeId) -> TypeId {
        let Some(name) = self.ast.ident_name_opt(sel) else {
            return self.types.invalid();
        };
        let name = name.to_string();

        if let Some((obj, t)) = self.find_member(tx, &name, 0) {
            if let Some(obj) = obj {
                self.info.uses.insert(sel, obj);
            }
            return t;
        }
        self.types.invalid()
    }

    fn find_member(&self, tx: TypeId, name: &str, depth: u32) -> Option<(Option<ObjId>, TypeId)> {
        if depth > 4 {
            return None;
        }
        // Methods on the named type (value or pointer receiver alike).
        if let Some(named) = self.types.named_of(tx) {
            if let TypeKind::Named { methods, .. } = self.types.kind(named) {
                for &m in methods {
                    if self.objects.obj(m).name == name {
                        return Some((Some(m), self.objects.obj(m).ty));
                    }
                }
            }
        }
        // Struct fields, behind at most one pointer.
        let base = self.types.deref(tx);
        let u = self.types.underlying(base);
        if let TypeKind::Struct { fields } = self.types.kind(u) {
            for f in fields {
                if f.name == name {
                    return Some((f.obj, f.ty));
                }
            }
            for f in fields {
                if f.embedded {
                    if let Some(found) = self.find_member(f.ty, name, depth + 1) {
                        return Some(found);
                    }
                }
            }
        }
        // Interface methods.
        if let TypeKind::Interface { methods } = self.types.kind(u) {
            for (mname, sig) in methods {
                if mname == name {
                    return Some((None, *sig));
                }
            }
        }
        None
    }

    fn walk_call(&mut self, fun: NodeId, args: &[NodeId]) -> TypeId {
        let funu = self.ast.unparen(fun);

        // Builtin calls have irregular typing.
        if let Some(name) = self.ast.ident_name_opt(funu) {
            if let Some(obj) = self.lookup(name) {
                if let ObjKind::Builtin(b) = self.objects.obj(obj).kind {
                    self.info.uses.insert(funu, obj);
                    self.info.types.insert(fun, self.types.invalid());
                    return self.walk_builtin_call(b, args);
                }
            }
        }

        // Conversion.
        if self.denotes_type(funu) {
            let t = self.resolve_type_expr(funu);
            self.info.types.insert(fun, t);
            for &a in args {
                self.walk_expr(a);
            }
            return t;
        }

        let tf = self.walk_expr(fun);
        for &a in args {
            self.walk_expr(a);
        }
        let u = self.types.underlying(tf);
        match self.types.kind(u).clone() {
            TypeKind::Signature { results, .. } => match results.len() {
                0 => self.types.invalid(),
                1 => results[0],
                _ => self.types.tuple(results),
            },
            _ => self.types.invalid(),
        }
    }

    fn walk_builtin_call(&mut self, b: Builtin, args: &[NodeId]) -> TypeId {
        let int = self.types.basic(BasicKind::Int);
        match b {
            Builtin::Make => {
                let t = match args.first() {
                    Some(&a) => self.resolve_type_expr(a),
                    None => self.types.invalid(),
                };
                for &a in args.iter().skip(1) {
                    self.walk_expr(a);
                }
                t
            }
            Builtin::New => {
                let t = match args.first() {
                    Some(&a) => self.resolve_type_expr(a),
                    None => self.types.invalid(),
                };
                self.types.pointer(t)
            }
            Builtin::Len | Builtin::Cap => {
                for &a in args {
                    self.walk_expr(a);
                }
                int
            }
            Builtin::Append => {
                let t = match args.first() {
                    Some(&a) => self.walk_expr(a),
                    None => self.types.invalid(),
                };
                for &a in args.iter().skip(1) {
                    self.walk_expr(a);
                }
                t
            }
            Builtin::Copy => {
                for &a in args {
                    self.walk_expr(a);
                }
                int
            }
            Builtin::Recover => {
                self.universe.any_type
            }
            Builtin::Close
            | Builtin::Delete
            | Builtin::Panic
            | Builtin::Print
            | Builtin::Println => {
                for &a in args {
                    self.walk_expr(a);
                }
                self.types.invalid()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vetch_syntax::ast::NodeTag;
    use vetch_syntax::{parse_file, Ast, FileSet};

    fn resolve_src(src: &str) -> (FileSet, Ast, Resolution) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let parsed = parse_file(&mut fset, &mut ast, "test.go", src);
        assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
        let cfg = Config::new("example.com/p", "go1.21");
        let res = resolve(&ast, &cfg);
        (fset, ast, res)
    }

    fn find_idents<'b>(ast: &'b Ast, name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        for entry in ast.files() {
            let mut stack = vec![entry.node];
            while let Some(id) = stack.pop() {
                if ast.ident_name_opt(id) == Some(name) {
                    out.push(id);
                }
                ast.visit_children(id, |_, _, c| stack.push(c));
            }
        }
        out.sort();
        out
    }

    mod scoping {
        use super::*;

        #[test]
        fn uses_resolve_to_loop_variable() {
            let src = r#"package p

func f(list []int) {
	for _, v := range list {
		_ = func() int {
			return v
		}
	}
}
"#;
            let (_, ast, res) = resolve_src(src);
            assert!(res.info.errors.is_empty(), "errors: {:?}", res.info.errors);
            let vs = find_idents(&ast, "v");
            assert_eq!(vs.len(), 2);
            let def_obj = res.info.defs.get(&vs[0]).copied();
            let use_obj = res.info.uses.get(&vs[1]).copied();
            assert!(def_obj.is_some());
            assert_eq!(def_obj, use_obj, "closure use must bind the loop var");
        }

        #[test]
        fn shadowing_inner_scope() {
            let src = r#"package p

func f() {
	x := 1
	{
		x := 2
		_ = x
	}
	_ = x
}
"#;
            let (_, ast, res) = resolve_src(src);
            let xs = find_idents(&ast, "x");
            assert_eq!(xs.len(), 4);
            let outer = res.info.defs.get(&xs[0]).copied().unwrap();
            let inner = res.info.defs.get(&xs[1]).copied().unwrap();
            assert_ne!(outer, inner);
            assert_eq!(res.info.uses.get(&xs[2]).copied(), Some(inner));
            assert_eq!(res.info.uses.get(&xs[3]).copied(), Some(outer));
        }

        #[test]
        fn undefined_identifier_is_an_error() {
            let (_, _, res) = resolve_src("package p\n\nfunc f() {\n\t_ = missing\n}\n");
            assert!(res
                .info
                .errors
                .iter()
                .any(|e| e.message == "undefined: missing"));
        }

        #[test]
        fn package_scope_is_order_independent() {
            let src = r#"package p

func f() int {
	return g()
}

func g() int {
	return 0
}
"#;
            let (_, _, res) = resolve_src(src);
            assert!(res.info.errors.is_empty(), "errors: {:?}", res.info.errors);
        }
    }

    mod typing {
        use super::*;

        #[test]
        fn range_over_slice_types_value() {
            let src = r#"package p

func f(items []string) {
	for i, s := range items {
		_ = i
		_ = s
	}
}
"#;
            let (_, ast, res) = resolve_src(src);
            let ss = find_idents(&ast, "s");
            let obj = res.info.defs.get(&ss[0]).copied().unwrap();
            let ty = res.objects.obj(obj).ty;
            assert!(matches!(
                res.types.kind(ty),
                TypeKind::Basic(BasicKind::String)
            ));
        }

        #[test]
        fn method_call_on_stdlib_type_resolves() {
            let src = r#"package p

import "sync"

func f() {
	var wg sync.WaitGroup
	wg.Add(1)
	wg.Done()
	wg.Wait()
}
"#;
            let (_, ast, res) = resolve_src(src);
            assert!(res.info.errors.is_empty(), "errors: {:?}", res.info.errors);
            let adds = find_idents(&ast, "Add");
            let obj = res.info.uses.get(&adds[0]).copied().expect("Add resolved");
            assert_eq!(res.objects.obj(obj).name, "Add");
        }

        #[test]
        fn struct_field_selection() {
            let src = r#"package p

type point struct {
	x int
	y int
}

func f(p point) int {
	return p.x + p.y
}
"#;
            let (_, ast, res) = resolve_src(src);
            assert!(res.info.errors.is_empty(), "errors: {:?}", res.info.errors);
            // Each selector use of x resolves to the field object.
            let xs = find_idents(&ast, "x");
            let field_def = res.info.defs.get(&xs[0]).copied().unwrap();
            let use_obj = res.info.uses.get(&xs[1]).copied().unwrap();
            assert_eq!(field_def, use_obj);
        }

        #[test]
        fn define_defaults_untyped_constants() {
            let src = "package p\n\nfunc f() {\n\tn := 1\n\t_ = n\n}\n";
            let (_, ast, res) = resolve_src(src);
            let ns = find_idents(&ast, "n");
            let obj = res.info.defs.get(&ns[0]).copied().unwrap();
            assert!(matches!(
                res.types.kind(res.objects.obj(obj).ty),
                TypeKind::Basic(BasicKind::Int)
            ));
        }

        #[test]
        fn file_versions_are_recorded() {
            let src = "package p\n";
            let mut fset = FileSet::new();
            let mut ast = Ast::new();
            let parsed = parse_file(&mut fset, &mut ast, "test.go", src);
            let mut cfg = Config::new("example.com/p", "go1.21");
            cfg.file_versions
                .insert("test.go".to_string(), "go1.22".to_string());
            let res = resolve(&ast, &cfg);
            assert_eq!(
                res.info.file_versions.get(&parsed.file).map(String::as_str),
                Some("go1.22")
            );
        }

        #[test]
        fn composite_literal_keys_bind_fields() {
            let src = r#"package p

type opts struct {
	name string
	n    int
}

var defaults = opts{name: "x", n: 3}
"#;
            let (_, ast, res) = resolve_src(src);
            assert!(res.info.errors.is_empty(), "errors: {:?}", res.info.errors);
            let names = find_idents(&ast, "name");
            assert_eq!(names.len(), 2);
            assert_eq!(
                res.info.defs.get(&names[0]).copied(),
                res.info.uses.get(&names[1]).copied()
            );
        }
    }
}
