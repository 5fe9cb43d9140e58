//! The universe scope: predeclared types, constants, and builtins.

use crate::object::{Builtin, ObjId, ObjKind, Object, ObjectStore};
use crate::ty::{BasicKind, TypeKind, TypeStore};
use vetch_syntax::fileset::NO_POS;

/// Handles to the universe objects the resolver and analyzers care about.
#[derive(Debug, Clone)]
pub struct Universe {
    pub error_type: crate::ty::TypeId,
    pub any_type: crate::ty::TypeId,
    pub error_obj: ObjId,
    pub comparable_obj: ObjId,
}

/// Populate the universe scope of `objects`, creating the predeclared
/// types in `types`.
pub fn install(types: &mut TypeStore, objects: &mut ObjectStore) -> Universe {
    // Predeclared basic type names.
    for kind in [
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
        BasicKind::Byte,
        BasicKind::Rune,
    ] {
        let ty = types.basic(kind);
        objects.declare_universe(Object {
            kind: ObjKind::TypeName,
            name: kind.name().to_string(),
            pkg: None,
            pos: NO_POS,
            ty,
        });
    }

    // error: named interface type with an Err-shaped method set.
    let error_obj = objects.alloc(Object {
        kind: ObjKind::TypeName,
        name: "error".to_string(),
        pkg: None,
        pos: NO_POS,
        ty: types.invalid(), // patched below
    });
    let string_ty = types.basic(BasicKind::String);
    let error_method = types.signature(Vec::new(), vec![string_ty], false);
    let error_iface = types.alloc(TypeKind::Interface {
        methods: vec![("Error".to_string(), error_method)],
    });
    let error_type = types.alloc(TypeKind::Named {
        obj: error_obj,
        underlying: error_iface,
        type_args: Vec::new(),
        methods: Vec::new(),
    });
    objects.obj_mut(error_obj).ty = error_type;
    objects.insert_universe(error_obj);

    // any: alias for the empty interface.
    let any_type = types.empty_interface();
    objects.declare_universe(Object {
        kind: ObjKind::TypeName,
        name: "any".to_string(),
        pkg: None,
        pos: NO_POS,
        ty: any_type,
    });

    // comparable: constraint interface, opaque here.
    let comparable_iface = types.alloc(TypeKind::Interface {
        methods: vec![("==".to_string(), types.invalid())],
    });
    let comparable_obj = objects.alloc(Object {
        kind: ObjKind::TypeName,
        name: "comparable".to_string(),
        pkg: None,
        pos: NO_POS,
        ty: types.invalid(),
    });
    let comparable_type = types.alloc(TypeKind::Named {
        obj: comparable_obj,
        underlying: comparable_iface,
        type_args: Vec::new(),
        methods: Vec::new(),
    });
    objects.obj_mut(comparable_obj).ty = comparable_type;
    objects.insert_universe(comparable_obj);

    // Constants and nil.
    let untyped_bool = types.basic(BasicKind::UntypedBool);
    for name in ["true", "false"] {
        objects.declare_universe(Object {
            kind: ObjKind::Const,
            name: name.to_string(),
            pkg: None,
            pos: NO_POS,
            ty: untyped_bool,
        });
    }
    objects.declare_universe(Object {
        kind: ObjKind::Const,
        name: "iota".to_string(),
        pkg: None,
        pos: NO_POS,
        ty: types.basic(BasicKind::UntypedInt),
    });
    objects.declare_universe(Object {
        kind: ObjKind::Nil,
        name: "nil".to_string(),
        pkg: None,
        pos: NO_POS,
        ty: types.basic(BasicKind::UntypedNil),
    });

    // Builtins.
    for b in [
        Builtin::Append,
        Builtin::Cap,
        Builtin::Close,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Len,
        Builtin::Make,
        Builtin::New,
        Builtin::Panic,
        Builtin::Print,
        Builtin::Println,
        Builtin::Recover,
    ] {
        objects.declare_universe(Object {
            kind: ObjKind::Builtin(b),
            name: b.name().to_string(),
            pkg: None,
            pos: NO_POS,
            ty: types.invalid(),
        });
    }

    Universe {
        error_type,
        any_type,
        error_obj,
        comparable_obj,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_names_resolve() {
        let mut types = TypeStore::new();
        let mut objects = ObjectStore::new();
        let u = install(&mut types, &mut objects);

        for name in ["int", "string", "error", "any", "nil", "true", "len", "append"] {
            assert!(objects.universe_lookup(name).is_some(), "missing {name}");
        }
        assert!(objects.universe_lookup("loop").is_none());

        let err = objects.universe_lookup("error").unwrap();
        assert_eq!(objects.obj(err).kind, ObjKind::TypeName);
        assert!(matches!(
            types.kind(u.error_type),
            TypeKind::Named { .. }
        ));
    }
}
