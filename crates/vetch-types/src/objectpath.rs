//! Stable object paths within a package.
//!
//! Facts are keyed by `(package path, object path)`; the object path must be
//! stable across builds, so it is derived from declared names only:
//!
//! - package-level object `F` -> `F`
//! - method `M` on type `T` -> `T.M`
//! - field `F` of type `T`'s struct -> `T.F`
//!
//! Local objects have no path.

use crate::object::{ObjId, ObjectStore, PkgId};
use crate::ty::{TypeKind, TypeStore};

/// Compute the stable path of `obj` within its package, or `None` for
/// objects without one (locals, universe objects).
pub fn object_path(
    types: &TypeStore,
    objects: &ObjectStore,
    pkg: PkgId,
    obj: ObjId,
) -> Option<String> {
    let o = objects.obj(obj);
    if o.pkg != Some(pkg) {
        return None;
    }

    // Direct package-scope member.
    if objects.pkg(pkg).scope.get(&o.name) == Some(&obj) {
        return Some(o.name.clone());
    }

    // Method or field of a package-level named type.
    for (tname, &tobj) in &objects.pkg(pkg).scope {
        let ty = objects.obj(tobj).ty;
        let TypeKind::Named {
            underlying,
            methods,
            ..
        } = types.kind(types.unalias(ty))
        else {
            continue;
        };
        if methods.contains(&obj) {
            return Some(format!("{}.{}", tname, o.name));
        }
        if let TypeKind::Struct { fields } = types.kind(*underlying) {
            if fields.iter().any(|f| f.obj == Some(obj)) {
                return Some(format!("{}.{}", tname, o.name));
            }
        }
    }
    None
}

/// Resolve an object path back to an object, the inverse of
/// [`object_path`].
pub fn object_for_path(
    types: &TypeStore,
    objects: &mut ObjectStore,
    pkg: PkgId,
    path: &str,
) -> Option<ObjId> {
    match path.split_once('.') {
        None => {
            let invalid = types.invalid();
            objects.lookup_member(pkg, path, invalid)
        }
        Some((tname, member)) => {
            let &tobj = objects.pkg(pkg).scope.get(tname)?;
            let ty = objects.obj(tobj).ty;
            let TypeKind::Named {
                underlying,
                methods,
                ..
            } = types.kind(types.unalias(ty))
            else {
                return None;
            };
            for &m in methods {
                if objects.obj(m).name == member {
                    return Some(m);
                }
            }
            if let TypeKind::Struct { fields } = types.kind(*underlying) {
                for f in fields {
                    if f.name == member {
                        return f.obj;
                    }
                }
            }
            None
        }
    }
}
