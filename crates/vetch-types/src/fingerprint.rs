//! Structural type fingerprints: a canonical string form of a type, with a
//! parser and a unifier for approximate-identity queries across generic
//! instantiations.
//!
//! The encoding is an S-expression. For types that contain no interface or
//! type-parameter component ("non-tricky" types), string equality of
//! fingerprints coincides with type identity:
//!
//! ```text
//! encode(x).0 == encode(y).0  <=>  identical(x, y)
//! ```
//!
//! For tricky types the string is a necessary-but-insufficient identity
//! test; exact matching parses both sides into a [`Tree`] and runs
//! [`matches`], a first-order unifier where `(typeparam i)` unifies with
//! any subtree under an occur check.
//!
//! Production rules:
//!
//! | type | encoding |
//! |---|---|
//! | basic `T` | `T` (`byte`, `rune` keep their spelling) |
//! | `unsafe.Pointer` | `(qual "unsafe" Pointer)` |
//! | named `p.N` | `(qual "p" N)`; universe `error`/`comparable` stay bare |
//! | instantiated `N[A, B]` | `(inst <N> <A> <B>)` |
//! | `*T` | `(ptr T)` |
//! | `[]T` | `(slice T)` |
//! | `[n]T` | `(array n T)` |
//! | `map[K]V` | `(map K V)` |
//! | channel | `(chan d T)`, d in {0, 1, 2} |
//! | tuple | `(tuple T ...)` |
//! | signature | `(func (tuple P ...) v? (tuple R ...))`, `v` iff variadic |
//! | struct | `(struct <field> ...)`, each field `name embedded? tag? T`, unexported names as `(qual "pkg" name)` |
//! | non-empty interface | `(interface)` — tricky |
//! | type parameter i | `(typeparam i)` — tricky |
//! | empty interface | `any` |
//! | alias | encoding of the aliased type |
//!
//! Encoding untyped or invalid types is an error; the encoder is for
//! declared object types, not intermediate constant expressions.

use crate::object::{ObjId, ObjectStore};
use crate::ty::{BasicKind, TypeId, TypeKind, TypeStore};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum FingerprintError {
    /// The type has no defined fingerprint (invalid or untyped).
    #[error("cannot fingerprint {0}")]
    Unsupported(String),
    /// The S-expression text is malformed. Never happens on encoder output.
    #[error("fingerprint parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a type. Returns the fingerprint string and whether the type is
/// "tricky" (contains an interface or type-parameter component, so string
/// equality under-approximates identity).
pub fn encode(
    types: &TypeStore,
    objects: &ObjectStore,
    ty: TypeId,
) -> Result<(String, bool), FingerprintError> {
    let mut out = String::new();
    let mut tricky = false;
    enc(types, objects, ty, &mut out, &mut tricky)?;
    Ok((out, tricky))
}

fn enc(
    types: &TypeStore,
    objects: &ObjectStore,
    ty: TypeId,
    out: &mut String,
    tricky: &mut bool,
) -> Result<(), FingerprintError> {
    match types.kind(ty) {
        TypeKind::Invalid => Err(FingerprintError::Unsupported("invalid type".to_string())),
        TypeKind::Basic(k) => {
            if k.is_untyped() {
                return Err(FingerprintError::Unsupported(k.name().to_string()));
            }
            match k {
                BasicKind::UnsafePointer => out.push_str("(qual \"unsafe\" Pointer)"),
                other => out.push_str(other.name()),
            }
            Ok(())
        }
        TypeKind::Alias { actual, .. } => enc(types, objects, *actual, out, tricky),
        TypeKind::Named { obj, type_args, .. } => {
            if type_args.is_empty() {
                enc_named_base(objects, *obj, out);
                Ok(())
            } else {
                out.push_str("(inst ");
                enc_named_base(objects, *obj, out);
                for &a in type_args {
                    out.push(' ');
                    enc(types, objects, a, out, tricky)?;
                }
                out.push(')');
                Ok(())
            }
        }
        TypeKind::Pointer(e) => {
            out.push_str("(ptr ");
            enc(types, objects, *e, out, tricky)?;
            out.push(')');
            Ok(())
        }
        TypeKind::Slice(e) => {
            out.push_str("(slice ");
            enc(types, objects, *e, out, tricky)?;
            out.push(')');
            Ok(())
        }
        TypeKind::Array { len, elem } => {
            let _ = write!(out, "(array {} ", len);
            enc(types, objects, *elem, out, tricky)?;
            out.push(')');
            Ok(())
        }
        TypeKind::Map { key, elem } => {
            out.push_str("(map ");
            enc(types, objects, *key, out, tricky)?;
            out.push(' ');
            enc(types, objects, *elem, out, tricky)?;
            out.push(')');
            Ok(())
        }
        TypeKind::Chan { dir, elem } => {
            let _ = write!(out, "(chan {} ", *dir as u8);
            enc(types, objects, *elem, out, tricky)?;
            out.push(')');
            Ok(())
        }
        TypeKind::Tuple(elems) => {
            out.push_str("(tuple");
            for &e in elems {
                out.push(' ');
                enc(types, objects, e, out, tricky)?;
            }
            out.push(')');
            Ok(())
        }
        TypeKind::Signature {
            params,
            results,
            variadic,
            ..
        } => {
            out.push_str("(func (tuple");
            for &p in params {
                out.push(' ');
                enc(types, objects, p, out, tricky)?;
            }
            out.push(')');
            if *variadic {
                out.push_str(" v");
            }
            out.push_str(" (tuple");
            for &r in results {
                out.push(' ');
                enc(types, objects, r, out, tricky)?;
            }
            out.push_str("))");
            Ok(())
        }
        TypeKind::Struct { fields } => {
            out.push_str("(struct");
            for f in fields {
                out.push(' ');
                let exported = f.name.chars().next().is_some_and(|c| c.is_uppercase());
                if exported || f.pkg.is_none() {
                    out.push_str(&f.name);
                } else {
                    let _ = write!(out, "(qual {:?} {})", f.pkg.as_deref().unwrap_or(""), f.name);
                }
                if f.embedded {
                    out.push_str(" embedded");
                }
                if let Some(tag) = &f.tag {
                    if !tag.is_empty() {
                        let _ = write!(out, " {:?}", tag);
                    }
                }
                out.push(' ');
                enc(types, objects, f.ty, out, tricky)?;
            }
            out.push(')');
            Ok(())
        }
        TypeKind::Interface { methods } => {
            if methods.is_empty() {
                out.push_str("any");
            } else {
                out.push_str("(interface)");
                *tricky = true;
            }
            Ok(())
        }
        TypeKind::TypeParam { index, .. } => {
            let _ = write!(out, "(typeparam {})", index);
            *tricky = true;
            Ok(())
        }
    }
}

fn enc_named_base(objects: &ObjectStore, obj: ObjId, out: &mut String) {
    let o = objects.obj(obj);
    match o.pkg {
        None => out.push_str(&o.name),
        Some(p) => {
            let _ = write!(out, "(qual {:?} {})", objects.pkg(p).path, o.name);
        }
    }
}

// ============================================================================
// Tree and parser
// ============================================================================

/// Parsed fingerprint: an S-expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Int(i64),
    Str(String),
    Sym(String),
    List(Vec<Tree>),
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Int(n) => write!(f, "{}", n),
            Tree::Str(s) => write!(f, "{:?}", s),
            Tree::Sym(s) => f.write_str(s),
            Tree::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parse a fingerprint string back into a [`Tree`].
///
/// Parsing any string produced by [`encode`] succeeds.
pub fn parse(s: &str) -> Result<Tree, FingerprintError> {
    let mut p = TreeParser {
        src: s.as_bytes(),
        pos: 0,
    };
    let t = p.parse_value()?;
    p.skip_ws();
    if p.pos != p.src.len() {
        return Err(FingerprintError::Parse {
            offset: p.pos,
            message: "trailing input".to_string(),
        });
    }
    Ok(t)
}

struct TreeParser<'s> {
    src: &'s [u8],
    pos: usize,
}

impl TreeParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn err(&self, message: impl Into<String>) -> FingerprintError {
        FingerprintError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn parse_value(&mut self) -> Result<Tree, FingerprintError> {
        self.skip_ws();
        match self.src.get(self.pos) {
            None => Err(self.err("unexpected end of input")),
            Some(b'(') => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    match self.src.get(self.pos) {
                        None => return Err(self.err("unclosed list")),
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(Tree::List(items));
                        }
                        _ => items.push(self.parse_value()?),
                    }
                }
            }
            Some(b')') => Err(self.err("unexpected ')'")),
            Some(b'"') => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.src.get(self.pos) {
                        None => return Err(self.err("unterminated string")),
                        Some(b'"') => {
                            self.pos += 1;
                            return Ok(Tree::Str(out));
                        }
                        Some(b'\\') => {
                            self.pos += 1;
                            match self.src.get(self.pos) {
                                Some(&c) => {
                                    out.push(match c {
                                        b'n' => '\n',
                                        b't' => '\t',
                                        other => other as char,
                                    });
                                    self.pos += 1;
                                }
                                None => return Err(self.err("unterminated escape")),
                            }
                        }
                        Some(&c) => {
                            out.push(c as char);
                            self.pos += 1;
                        }
                    }
                }
            }
            Some(&c) if c.is_ascii_digit() || c == b'-' => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|b| b.is_ascii_digit())
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                text.parse()
                    .map(Tree::Int)
                    .map_err(|_| self.err(format!("bad integer {:?}", text)))
            }
            Some(_) => {
                let start = self.pos;
                while self.pos < self.src.len() {
                    let c = self.src[self.pos];
                    if c.is_ascii_whitespace() || c == b'(' || c == b')' || c == b'"' {
                        break;
                    }
                    self.pos += 1;
                }
                if start == self.pos {
                    return Err(self.err("empty symbol"));
                }
                let text = std::str::from_utf8(&self.src[start..self.pos])
                    .map_err(|_| self.err("symbol is not UTF-8"))?;
                Ok(Tree::Sym(text.to_string()))
            }
        }
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// Unify two fingerprint trees.
///
/// Atoms unify when equal; lists unify element-wise; `(typeparam i)`
/// unifies with any subtree under an occur check. Each side has its own
/// binding table, so the same index on the two sides is distinct. Matching
/// is reflexive and symmetric but deliberately NOT transitive: a type
/// parameter can match two types that do not match each other.
pub fn matches(x: &Tree, y: &Tree) -> bool {
    let mut u = Unifier {
        binds: HashMap::new(),
    };
    u.unify(Side::X, x.clone(), Side::Y, y.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    X,
    Y,
}

struct Unifier {
    binds: HashMap<(Side, i64), (Side, Tree)>,
}

fn typeparam_index(t: &Tree) -> Option<i64> {
    let Tree::List(items) = t else { return None };
    match items.as_slice() {
        [Tree::Sym(s), Tree::Int(i)] if s == "typeparam" => Some(*i),
        _ => None,
    }
}

impl Unifier {
    /// Follow variable bindings to a representative term.
    fn resolve(&self, mut side: Side, mut t: Tree) -> (Side, Tree) {
        while let Some(i) = typeparam_index(&t) {
            match self.binds.get(&(side, i)) {
                Some((s, bound)) => {
                    side = *s;
                    t = bound.clone();
                }
                None => break,
            }
        }
        (side, t)
    }

    /// Does `var` occur in the term `(side, t)` after resolution?
    fn occurs(&self, var: (Side, i64), side: Side, t: &Tree) -> bool {
        let (rs, rt) = self.resolve(side, t.clone());
        if let Some(i) = typeparam_index(&rt) {
            return (rs, i) == var;
        }
        if let Tree::List(items) = &rt {
            return items.iter().any(|item| self.occurs(var, rs, item));
        }
        false
    }

    fn unify(&mut self, sx: Side, x: Tree, sy: Side, y: Tree) -> bool {
        let (sx, x) = self.resolve(sx, x);
        let (sy, y) = self.resolve(sy, y);
        match (typeparam_index(&x), typeparam_index(&y)) {
            (Some(i), Some(j)) => {
                // Two unbound variables share a cell.
                if (sx, i) == (sy, j) {
                    return true;
                }
                self.binds.insert((sx, i), (sy, y));
                true
            }
            (Some(i), None) => {
                if self.occurs((sx, i), sy, &y) {
                    return false;
                }
                self.binds.insert((sx, i), (sy, y));
                true
            }
            (None, Some(j)) => {
                if self.occurs((sy, j), sx, &x) {
                    return false;
                }
                self.binds.insert((sy, j), (sx, x));
                true
            }
            (None, None) => match (x, y) {
                (Tree::List(a), Tree::List(b)) => {
                    a.len() == b.len()
                        && a.into_iter()
                            .zip(b)
                            .all(|(ai, bi)| self.unify(sx, ai, sy, bi))
                }
                (a, b) => a == b,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjKind, Object};
    use crate::universe;
    use vetch_syntax::fileset::NO_POS;

    struct Fixture {
        types: TypeStore,
        objects: ObjectStore,
    }

    fn fixture() -> Fixture {
        let mut types = TypeStore::new();
        let mut objects = ObjectStore::new();
        let _ = universe::install(&mut types, &mut objects);
        Fixture { types, objects }
    }

    impl Fixture {
        fn named(&mut self, pkg_path: &str, name: &str) -> TypeId {
            let pkg = self
                .objects
                .pkg_by_path(pkg_path)
                .unwrap_or_else(|| self.objects.alloc_pkg(pkg_path, pkg_path, false));
            let obj = self.objects.declare(
                pkg,
                Object {
                    kind: ObjKind::TypeName,
                    name: name.to_string(),
                    pkg: Some(pkg),
                    pos: NO_POS,
                    ty: self.types.invalid(),
                },
            );
            let empty = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
            let ty = self.types.alloc(TypeKind::Named {
                obj,
                underlying: empty,
                type_args: Vec::new(),
                methods: Vec::new(),
            });
            self.objects.obj_mut(obj).ty = ty;
            ty
        }

        fn encode(&self, ty: TypeId) -> (String, bool) {
            encode(&self.types, &self.objects, ty).expect("encodable")
        }
    }

    mod encoding {
        use super::*;

        #[test]
        fn identical_types_encode_identically() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let a = f.types.slice(int);
            let b = f.types.slice(int);
            assert_eq!(f.encode(a).0, f.encode(b).0);
            assert_eq!(f.encode(a).0, "(slice int)");
        }

        #[test]
        fn map_key_value_order_matters() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let string = f.types.basic(BasicKind::String);
            let m1 = f.types.map(string, int);
            let m2 = f.types.map(int, string);
            assert_ne!(f.encode(m1).0, f.encode(m2).0);
        }

        #[test]
        fn named_and_instantiated() {
            let mut f = fixture();
            let list = f.named("example.com/container", "List");
            assert_eq!(f.encode(list).0, "(qual \"example.com/container\" List)");

            let int = f.types.basic(BasicKind::Int);
            let inst = {
                let TypeKind::Named {
                    obj, underlying, ..
                } = f.types.kind(list).clone()
                else {
                    unreachable!()
                };
                f.types.alloc(TypeKind::Named {
                    obj,
                    underlying,
                    type_args: vec![int],
                    methods: Vec::new(),
                })
            };
            assert_eq!(
                f.encode(inst).0,
                "(inst (qual \"example.com/container\" List) int)"
            );
        }

        #[test]
        fn byte_and_rune_keep_spelling() {
            let f = fixture();
            assert_eq!(f.encode(f.types.basic(BasicKind::Byte)).0, "byte");
            assert_eq!(f.encode(f.types.basic(BasicKind::Rune)).0, "rune");
        }

        #[test]
        fn unsafe_pointer_is_qualified() {
            let f = fixture();
            assert_eq!(
                f.encode(f.types.basic(BasicKind::UnsafePointer)).0,
                "(qual \"unsafe\" Pointer)"
            );
        }

        #[test]
        fn untyped_is_an_error() {
            let f = fixture();
            let untyped = f.types.basic(BasicKind::UntypedInt);
            assert!(encode(&f.types, &f.objects, untyped).is_err());
        }

        #[test]
        fn tricky_flag_for_interfaces_and_typeparams() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let sig = f.types.signature(vec![int], Vec::new(), false);
            let iface = f.types.alloc(TypeKind::Interface {
                methods: vec![("M".to_string(), sig)],
            });
            let (s, tricky) = f.encode(iface);
            assert_eq!(s, "(interface)");
            assert!(tricky);

            let tp = f.types.alloc(TypeKind::TypeParam {
                index: 0,
                name: "T".to_string(),
            });
            let (s, tricky) = f.encode(tp);
            assert_eq!(s, "(typeparam 0)");
            assert!(tricky);

            let empty = f.types.empty_interface();
            let (s, tricky) = f.encode(empty);
            assert_eq!(s, "any");
            assert!(!tricky);
        }

        #[test]
        fn variadic_marker() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let ints = f.types.slice(int);
            let sig = f.types.signature(vec![ints], Vec::new(), true);
            assert_eq!(f.encode(sig).0, "(func (tuple (slice int)) v (tuple))");
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn round_trip_non_tricky() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let string = f.types.basic(BasicKind::String);
            let m = f.types.map(string, int);
            let sl = f.types.slice(m);
            let arr = f.types.array(4, sl);
            let sig = f.types.signature(vec![arr, int], vec![string], false);

            for ty in [int, m, sl, arr, sig] {
                let (s, _) = f.encode(ty);
                let tree = parse(&s).expect("encoder output parses");
                assert_eq!(tree.to_string(), s, "round trip of {s}");
            }
        }

        #[test]
        fn malformed_inputs_error() {
            assert!(parse("(slice int").is_err());
            assert!(parse(")").is_err());
            assert!(parse("(slice int) trailing").is_err());
            assert!(parse("\"open").is_err());
        }
    }

    mod matching {
        use super::*;

        fn tp(i: i64) -> Tree {
            Tree::List(vec![Tree::Sym("typeparam".to_string()), Tree::Int(i)])
        }

        fn list(items: Vec<Tree>) -> Tree {
            Tree::List(items)
        }

        fn sym(s: &str) -> Tree {
            Tree::Sym(s.to_string())
        }

        #[test]
        fn reflexive_and_symmetric() {
            let mut f = fixture();
            let int = f.types.basic(BasicKind::Int);
            let sl = f.types.slice(int);
            let t = parse(&f.encode(sl).0).unwrap();
            assert!(matches(&t, &t));

            let a = list(vec![sym("slice"), tp(0)]);
            let b = list(vec![sym("slice"), sym("int")]);
            assert_eq!(matches(&a, &b), matches(&b, &a));
            assert!(matches(&a, &b));
        }

        #[test]
        fn typeparam_unifies_with_concrete_type() {
            // func[T any](T) vs func(*int)
            let generic = list(vec![
                sym("func"),
                list(vec![sym("tuple"), tp(0)]),
                list(vec![sym("tuple")]),
            ]);
            let concrete = list(vec![
                sym("func"),
                list(vec![sym("tuple"), list(vec![sym("ptr"), sym("int")])]),
                list(vec![sym("tuple")]),
            ]);
            assert!(matches(&generic, &concrete));
        }

        #[test]
        fn occur_check_rejects_cyclic_binding() {
            // func[T any](T, T) vs func[U any](U, *U)
            let x = list(vec![
                sym("func"),
                list(vec![sym("tuple"), tp(0), tp(0)]),
                list(vec![sym("tuple")]),
            ]);
            let y = list(vec![
                sym("func"),
                list(vec![
                    sym("tuple"),
                    tp(0),
                    list(vec![sym("ptr"), tp(0)]),
                ]),
                list(vec![sym("tuple")]),
            ]);
            assert!(!matches(&x, &y));
        }

        #[test]
        fn matching_is_not_transitive() {
            let a = list(vec![sym("slice"), tp(0)]);
            let b = list(vec![sym("slice"), sym("int")]);
            let c = list(vec![sym("slice"), sym("string")]);
            assert!(matches(&a, &b));
            assert!(matches(&a, &c));
            assert!(!matches(&b, &c), "matching must not be transitive");
        }

        #[test]
        fn same_side_params_stay_consistent() {
            // func[T](T, T) vs func(int, string) must fail: one variable
            // cannot take two values.
            let x = list(vec![sym("tuple"), tp(0), tp(0)]);
            let y = list(vec![sym("tuple"), sym("int"), sym("string")]);
            assert!(!matches(&x, &y));
            let y2 = list(vec![sym("tuple"), sym("int"), sym("int")]);
            assert!(matches(&x, &y2));
        }
    }
}
