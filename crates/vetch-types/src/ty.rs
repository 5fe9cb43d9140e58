//! The type algebra: arena-stored types with structural identity.
//!
//! Types are interned in a [`TypeStore`] and addressed by [`TypeId`]; child
//! links are ids so recursive named types need no pointer cycles. Basic
//! types are pre-interned at fixed slots.

use crate::object::{ObjId, ObjectStore};
use std::fmt::Write as _;

// ============================================================================
// TypeId
// ============================================================================

/// Handle to a type in a [`TypeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Kinds of basic (predeclared) types.
///
/// `Byte` and `Rune` are distinct entries that compare identical to `Uint8`
/// and `Int32` but keep their spelling for display and fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    Byte,
    Rune,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::Byte => "byte",
            BasicKind::Rune => "rune",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedComplex => "untyped complex",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedComplex
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// Canonical kind for identity: `byte` folds to `uint8`, `rune` to
    /// `int32`.
    fn canon(self) -> BasicKind {
        match self {
            BasicKind::Byte => BasicKind::Uint8,
            BasicKind::Rune => BasicKind::Int32,
            k => k,
        }
    }
}

/// Channel direction; the discriminant is the fingerprint encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChanDir {
    SendRecv = 0,
    SendOnly = 1,
    RecvOnly = 2,
}

/// One struct field.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: TypeId,
    pub tag: Option<String>,
    pub embedded: bool,
    /// Declaring package path, used to qualify unexported names.
    pub pkg: Option<String>,
    /// The field's object, when the resolver created one.
    pub obj: Option<ObjId>,
}

/// The discriminated union of types.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Invalid,
    Basic(BasicKind),
    /// A defined type. `underlying` starts as `Invalid` and is patched when
    /// the declaration resolves; `methods` accumulate as method declarations
    /// are seen.
    Named {
        obj: ObjId,
        underlying: TypeId,
        type_args: Vec<TypeId>,
        methods: Vec<ObjId>,
    },
    /// `type A = B`.
    Alias { obj: ObjId, actual: TypeId },
    Pointer(TypeId),
    Slice(TypeId),
    Array { len: u64, elem: TypeId },
    Map { key: TypeId, elem: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Struct { fields: Vec<StructField> },
    /// Methods are (name, signature) pairs; an empty list is the empty
    /// interface.
    Interface { methods: Vec<(String, TypeId)> },
    Signature {
        params: Vec<TypeId>,
        results: Vec<TypeId>,
        variadic: bool,
        /// Type parameters, each a `TypeParam` type.
        type_params: Vec<TypeId>,
    },
    /// Multi-value expression type.
    Tuple(Vec<TypeId>),
    TypeParam { index: u32, name: String },
}

// ============================================================================
// TypeStore
// ============================================================================

const BASIC_KINDS: &[BasicKind] = &[
    BasicKind::Invalid,
    BasicKind::Bool,
    BasicKind::Int,
    BasicKind::Int8,
    BasicKind::Int16,
    BasicKind::Int32,
    BasicKind::Int64,
    BasicKind::Uint,
    BasicKind::Uint8,
    BasicKind::Uint16,
    BasicKind::Uint32,
    BasicKind::Uint64,
    BasicKind::Uintptr,
    BasicKind::Float32,
    BasicKind::Float64,
    BasicKind::Complex64,
    BasicKind::Complex128,
    BasicKind::String,
    BasicKind::UnsafePointer,
    BasicKind::Byte,
    BasicKind::Rune,
    BasicKind::UntypedBool,
    BasicKind::UntypedInt,
    BasicKind::UntypedRune,
    BasicKind::UntypedFloat,
    BasicKind::UntypedComplex,
    BasicKind::UntypedString,
    BasicKind::UntypedNil,
];

/// Arena of types. Slot 0 is `Invalid`; basic types occupy the next fixed
/// slots in [`BASIC_KINDS`] order.
#[derive(Debug)]
pub struct TypeStore {
    kinds: Vec<TypeKind>,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    pub fn new() -> Self {
        let mut kinds = vec![TypeKind::Invalid];
        kinds.extend(BASIC_KINDS.iter().skip(1).map(|&k| TypeKind::Basic(k)));
        TypeStore { kinds }
    }

    /// The invalid type.
    pub fn invalid(&self) -> TypeId {
        TypeId(0)
    }

    /// The pre-interned basic type of `kind`.
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        let idx = BASIC_KINDS.iter().position(|&k| k == kind).unwrap();
        if idx == 0 {
            return self.invalid();
        }
        TypeId(idx as u32)
    }

    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    /// Patch a named type's underlying once its declaration resolves.
    pub fn set_named_underlying(&mut self, id: TypeId, underlying: TypeId) {
        match &mut self.kinds[id.index()] {
            TypeKind::Named { underlying: u, .. } => *u = underlying,
            other => panic!("set_named_underlying on {:?}", std::mem::discriminant(other)),
        }
    }

    /// Attach a method to a named type.
    pub fn add_method(&mut self, id: TypeId, method: ObjId) {
        match &mut self.kinds[id.index()] {
            TypeKind::Named { methods, .. } => methods.push(method),
            other => panic!("add_method on {:?}", std::mem::discriminant(other)),
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Slice(elem))
    }

    pub fn array(&mut self, len: u64, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Array { len, elem })
    }

    pub fn map(&mut self, key: TypeId, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Map { key, elem })
    }

    pub fn chan(&mut self, dir: ChanDir, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Chan { dir, elem })
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.alloc(TypeKind::Tuple(elems))
    }

    pub fn signature(&mut self, params: Vec<TypeId>, results: Vec<TypeId>, variadic: bool) -> TypeId {
        self.alloc(TypeKind::Signature {
            params,
            results,
            variadic,
            type_params: Vec::new(),
        })
    }

    pub fn empty_interface(&mut self) -> TypeId {
        self.alloc(TypeKind::Interface {
            methods: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolve aliases to the actual type.
    pub fn unalias(&self, mut id: TypeId) -> TypeId {
        while let TypeKind::Alias { actual, .. } = self.kind(id) {
            id = *actual;
        }
        id
    }

    /// The underlying type: resolves aliases and chains of named types.
    /// Bounded to defend against malformed self-referential declarations.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut id = self.unalias(id);
        for _ in 0..32 {
            match self.kind(id) {
                TypeKind::Named { underlying, .. } => id = self.unalias(*underlying),
                _ => return id,
            }
        }
        id
    }

    /// Strip one level of pointer, after unaliasing.
    pub fn deref(&self, id: TypeId) -> TypeId {
        match self.kind(self.underlying(id)) {
            TypeKind::Pointer(elem) => *elem,
            _ => self.unalias(id),
        }
    }

    pub fn is_invalid(&self, id: TypeId) -> bool {
        matches!(self.kind(self.unalias(id)), TypeKind::Invalid)
    }

    /// The named type (if any) behind pointers and aliases.
    pub fn named_of(&self, id: TypeId) -> Option<TypeId> {
        let id = self.unalias(id);
        match self.kind(id) {
            TypeKind::Named { .. } => Some(id),
            TypeKind::Pointer(elem) => {
                let elem = self.unalias(*elem);
                matches!(self.kind(elem), TypeKind::Named { .. }).then_some(elem)
            }
            _ => None,
        }
    }

    /// Structural identity.
    ///
    /// Named types are identical when they share an origin object and have
    /// pairwise-identical type arguments; everything else is compared
    /// structurally. `byte`/`uint8` and `rune`/`int32` are identical.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.unalias(a);
        let b = self.unalias(b);
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Invalid, TypeKind::Invalid) => true,
            (TypeKind::Basic(x), TypeKind::Basic(y)) => x.canon() == y.canon(),
            (
                TypeKind::Named {
                    obj: oa,
                    type_args: ta,
                    ..
                },
                TypeKind::Named {
                    obj: ob,
                    type_args: tb,
                    ..
                },
            ) => oa == ob && self.all_identical(ta, tb),
            (TypeKind::Pointer(x), TypeKind::Pointer(y)) => self.identical(*x, *y),
            (TypeKind::Slice(x), TypeKind::Slice(y)) => self.identical(*x, *y),
            (
                TypeKind::Array { len: la, elem: ea },
                TypeKind::Array { len: lb, elem: eb },
            ) => la == lb && self.identical(*ea, *eb),
            (
                TypeKind::Map { key: ka, elem: ea },
                TypeKind::Map { key: kb, elem: eb },
            ) => self.identical(*ka, *kb) && self.identical(*ea, *eb),
            (
                TypeKind::Chan { dir: da, elem: ea },
                TypeKind::Chan { dir: db, elem: eb },
            ) => da == db && self.identical(*ea, *eb),
            (TypeKind::Struct { fields: fa }, TypeKind::Struct { fields: fb }) => {
                fa.len() == fb.len()
                    && fa.iter().zip(fb).all(|(x, y)| {
                        x.name == y.name
                            && x.embedded == y.embedded
                            && x.tag == y.tag
                            && self.identical(x.ty, y.ty)
                    })
            }
            (TypeKind::Interface { methods: ma }, TypeKind::Interface { methods: mb }) => {
                ma.len() == mb.len()
                    && ma
                        .iter()
                        .zip(mb)
                        .all(|(x, y)| x.0 == y.0 && self.identical(x.1, y.1))
            }
            (
                TypeKind::Signature {
                    params: pa,
                    results: ra,
                    variadic: va,
                    ..
                },
                TypeKind::Signature {
                    params: pb,
                    results: rb,
                    variadic: vb,
                    ..
                },
            ) => va == vb && self.all_identical(pa, pb) && self.all_identical(ra, rb),
            (TypeKind::Tuple(ta), TypeKind::Tuple(tb)) => self.all_identical(ta, tb),
            (
                TypeKind::TypeParam { index: ia, .. },
                TypeKind::TypeParam { index: ib, .. },
            ) => ia == ib,
            _ => false,
        }
    }

    fn all_identical(&self, a: &[TypeId], b: &[TypeId]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.identical(*x, *y))
    }

    /// Human-readable type string for diagnostics.
    pub fn display(&self, objects: &ObjectStore, id: TypeId) -> String {
        let mut s = String::new();
        self.write_display(objects, id, &mut s, 0);
        s
    }

    fn write_display(&self, objects: &ObjectStore, id: TypeId, out: &mut String, depth: u32) {
        if depth > 8 {
            out.push_str("...");
            return;
        }
        match self.kind(id) {
            TypeKind::Invalid => out.push_str("invalid type"),
            TypeKind::Basic(k) => out.push_str(k.name()),
            TypeKind::Named { obj, type_args, .. } => {
                let o = objects.obj(*obj);
                match o.pkg.map(|p| objects.pkg(p)) {
                    Some(p) if !p.name.is_empty() => {
                        let _ = write!(out, "{}.{}", p.name, o.name);
                    }
                    _ => out.push_str(&o.name),
                }
                if !type_args.is_empty() {
                    out.push('[');
                    for (i, a) in type_args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write_display(objects, *a, out, depth + 1);
                    }
                    out.push(']');
                }
            }
            TypeKind::Alias { actual, .. } => self.write_display(objects, *actual, out, depth + 1),
            TypeKind::Pointer(e) => {
                out.push('*');
                self.write_display(objects, *e, out, depth + 1);
            }
            TypeKind::Slice(e) => {
                out.push_str("[]");
                self.write_display(objects, *e, out, depth + 1);
            }
            TypeKind::Array { len, elem } => {
                let _ = write!(out, "[{}]", len);
                self.write_display(objects, *elem, out, depth + 1);
            }
            TypeKind::Map { key, elem } => {
                out.push_str("map[");
                self.write_display(objects, *key, out, depth + 1);
                out.push(']');
                self.write_display(objects, *elem, out, depth + 1);
            }
            TypeKind::Chan { dir, elem } => {
                match dir {
                    ChanDir::SendRecv => out.push_str("chan "),
                    ChanDir::SendOnly => out.push_str("chan<- "),
                    ChanDir::RecvOnly => out.push_str("<-chan "),
                }
                self.write_display(objects, *elem, out, depth + 1);
            }
            TypeKind::Struct { fields } => {
                out.push_str("struct{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    if !f.embedded {
                        let _ = write!(out, "{} ", f.name);
                    }
                    self.write_display(objects, f.ty, out, depth + 1);
                }
                out.push('}');
            }
            TypeKind::Interface { methods } => {
                if methods.is_empty() {
                    out.push_str("any");
                } else {
                    out.push_str("interface{...}");
                }
            }
            TypeKind::Signature {
                params,
                results,
                variadic,
                ..
            } => {
                out.push_str("func(");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if *variadic && i == params.len() - 1 {
                        out.push_str("...");
                    }
                    self.write_display(objects, *p, out, depth + 1);
                }
                out.push(')');
                match results.len() {
                    0 => {}
                    1 => {
                        out.push(' ');
                        self.write_display(objects, results[0], out, depth + 1);
                    }
                    _ => {
                        out.push_str(" (");
                        for (i, r) in results.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.write_display(objects, *r, out, depth + 1);
                        }
                        out.push(')');
                    }
                }
            }
            TypeKind::Tuple(elems) => {
                out.push('(');
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_display(objects, *e, out, depth + 1);
                }
                out.push(')');
            }
            TypeKind::TypeParam { name, .. } => out.push_str(name),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basics_are_preinterned() {
        let store = TypeStore::new();
        assert_eq!(store.basic(BasicKind::Int), store.basic(BasicKind::Int));
        assert_ne!(store.basic(BasicKind::Int), store.basic(BasicKind::Uint));
        assert!(store.is_invalid(store.invalid()));
    }

    #[test]
    fn byte_is_identical_to_uint8() {
        let store = TypeStore::new();
        assert!(store.identical(store.basic(BasicKind::Byte), store.basic(BasicKind::Uint8)));
        assert!(store.identical(store.basic(BasicKind::Rune), store.basic(BasicKind::Int32)));
        assert!(!store.identical(store.basic(BasicKind::Byte), store.basic(BasicKind::Int8)));
    }

    #[test]
    fn structural_identity() {
        let mut store = TypeStore::new();
        let int = store.basic(BasicKind::Int);
        let string = store.basic(BasicKind::String);
        let s1 = store.slice(int);
        let s2 = store.slice(int);
        let s3 = store.slice(string);
        assert!(store.identical(s1, s2));
        assert!(!store.identical(s1, s3));

        let m1 = store.map(string, int);
        let m2 = store.map(int, string);
        assert!(!store.identical(m1, m2));
    }

    #[test]
    fn deref_and_underlying() {
        let mut store = TypeStore::new();
        let int = store.basic(BasicKind::Int);
        let ptr = store.pointer(int);
        assert_eq!(store.deref(ptr), int);
        assert_eq!(store.deref(int), int);
    }
}
