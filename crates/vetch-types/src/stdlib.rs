//! Curated models of the standard-library surface analyzers rely on.
//!
//! The resolver sees one package at a time, so imports are satisfied from a
//! table of known signatures rather than real declarations. The table covers
//! the types and functions the built-in analyzers reason about: the testing
//! context, sync primitives, errgroup, the fmt print family, and the errors
//! helpers. Unknown import paths become opaque packages whose members are
//! materialized lazily with unknown types.

use crate::object::{ObjId, ObjKind, Object, ObjectStore, PkgId};
use crate::ty::{BasicKind, TypeId, TypeKind, TypeStore};
use crate::universe::Universe;
use vetch_syntax::fileset::NO_POS;

/// Import resolution against the model table.
pub struct StdImporter {
    universe: Universe,
}

impl StdImporter {
    pub fn new(universe: Universe) -> Self {
        StdImporter { universe }
    }

    /// Resolve `path` to a package, building the model on first use.
    /// Never fails: unknown paths yield opaque packages.
    pub fn import(
        &mut self,
        types: &mut TypeStore,
        objects: &mut ObjectStore,
        path: &str,
    ) -> PkgId {
        if let Some(p) = objects.pkg_by_path(path) {
            return p;
        }
        let mut b = Builder {
            types,
            objects,
            universe: &self.universe,
        };
        match path {
            "testing" => b.testing(),
            "sync" => b.sync(),
            "golang.org/x/sync/errgroup" => b.errgroup(),
            "fmt" => b.fmt(),
            "errors" => b.errors(),
            "os" => b.os(),
            "io" => b.io(),
            "strings" => b.strings(),
            _ => {
                let name = path.rsplit('/').next().unwrap_or(path).to_string();
                objects.alloc_pkg(path, name, true)
            }
        }
    }
}

struct Builder<'a> {
    types: &'a mut TypeStore,
    objects: &'a mut ObjectStore,
    universe: &'a Universe,
}

impl Builder<'_> {
    fn basic(&self, k: BasicKind) -> TypeId {
        self.types.basic(k)
    }

    fn any_slice(&mut self) -> TypeId {
        let any = self.universe.any_type;
        self.types.slice(any)
    }

    fn sig(&mut self, params: Vec<TypeId>, results: Vec<TypeId>, variadic: bool) -> TypeId {
        self.types.signature(params, results, variadic)
    }

    /// Declare a package-level named type with the given underlying.
    fn named(&mut self, pkg: PkgId, name: &str, underlying: TypeId) -> TypeId {
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
        let ty = self.types.alloc(TypeKind::Named {
            obj,
            underlying,
            type_args: Vec::new(),
            methods: Vec::new(),
        });
        self.objects.obj_mut(obj).ty = ty;
        ty
    }

    fn method(&mut self, pkg: PkgId, recv: TypeId, name: &str, sig: TypeId) -> ObjId {
        let obj = self.objects.alloc(Object {
            kind: ObjKind::Func,
            name: name.to_string(),
            pkg: Some(pkg),
            pos: NO_POS,
            ty: sig,
        });
        self.types.add_method(recv, obj);
        obj
    }

    fn func(&mut self, pkg: PkgId, name: &str, sig: TypeId) -> ObjId {
        self.objects.declare(
            pkg,
            Object {
                kind: ObjKind::Func,
                name: name.to_string(),
                pkg: Some(pkg),
                pos: NO_POS,
                ty: sig,
            },
        )
    }

    // ------------------------------------------------------------------
    // Package models
    // ------------------------------------------------------------------

    fn testing(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("testing", "testing", false);
        let string = self.basic(BasicKind::String);
        let bool_ = self.basic(BasicKind::Bool);
        let args = self.any_slice();

        let empty = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let t = self.named(pkg, "T", empty);
        let b = self.named(pkg, "B", empty);
        let f = self.named(pkg, "F", empty);
        let ptr_t = self.types.pointer(t);
        let ptr_b = self.types.pointer(b);

        // Shared by T and B: logging and failure reporting.
        for recv in [t, b, f] {
            let log = self.sig(vec![args], Vec::new(), true);
            self.method(pkg, recv, "Log", log);
            let logf = self.sig(vec![string, args], Vec::new(), true);
            self.method(pkg, recv, "Logf", logf);
            let fatal = self.sig(vec![args], Vec::new(), true);
            self.method(pkg, recv, "Fatal", fatal);
            let fatalf = self.sig(vec![string, args], Vec::new(), true);
            self.method(pkg, recv, "Fatalf", fatalf);
            let error = self.sig(vec![args], Vec::new(), true);
            self.method(pkg, recv, "Error", error);
            let errorf = self.sig(vec![string, args], Vec::new(), true);
            self.method(pkg, recv, "Errorf", errorf);
            let nullary = self.sig(Vec::new(), Vec::new(), false);
            self.method(pkg, recv, "Helper", nullary);
            let nullary2 = self.sig(Vec::new(), Vec::new(), false);
            self.method(pkg, recv, "FailNow", nullary2);
            let skip = self.sig(vec![args], Vec::new(), true);
            self.method(pkg, recv, "Skip", skip);
        }

        // T: subtests and parallelism.
        let subtest_fn = self.sig(vec![ptr_t], Vec::new(), false);
        let run = self.sig(vec![string, subtest_fn], vec![bool_], false);
        self.method(pkg, t, "Run", run);
        let parallel = self.sig(Vec::new(), Vec::new(), false);
        self.method(pkg, t, "Parallel", parallel);
        let setenv = self.sig(vec![string, string], Vec::new(), false);
        self.method(pkg, t, "Setenv", setenv);

        // B: sub-benchmarks and timers.
        let subbench_fn = self.sig(vec![ptr_b], Vec::new(), false);
        let brun = self.sig(vec![string, subbench_fn], vec![bool_], false);
        self.method(pkg, b, "Run", brun);
        for name in ["ResetTimer", "StartTimer", "StopTimer", "ReportAllocs"] {
            let s = self.sig(Vec::new(), Vec::new(), false);
            self.method(pkg, b, name, s);
        }

        // F: fuzz targets.
        let add = self.sig(vec![args], Vec::new(), true);
        self.method(pkg, f, "Add", add);
        let fuzz_fn = self.universe.any_type;
        let fuzz = self.sig(vec![fuzz_fn], Vec::new(), false);
        self.method(pkg, f, "Fuzz", fuzz);

        pkg
    }

    fn sync(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("sync", "sync", false);
        let int = self.basic(BasicKind::Int);

        let empty = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let wg = self.named(pkg, "WaitGroup", empty);
        let add = self.sig(vec![int], Vec::new(), false);
        self.method(pkg, wg, "Add", add);
        let done = self.sig(Vec::new(), Vec::new(), false);
        self.method(pkg, wg, "Done", done);
        let wait = self.sig(Vec::new(), Vec::new(), false);
        self.method(pkg, wg, "Wait", wait);

        let empty2 = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let mutex = self.named(pkg, "Mutex", empty2);
        for name in ["Lock", "Unlock", "TryLock"] {
            let s = self.sig(Vec::new(), Vec::new(), false);
            self.method(pkg, mutex, name, s);
        }

        let empty3 = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let rw = self.named(pkg, "RWMutex", empty3);
        for name in ["Lock", "Unlock", "RLock", "RUnlock"] {
            let s = self.sig(Vec::new(), Vec::new(), false);
            self.method(pkg, rw, name, s);
        }

        let empty4 = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let once = self.named(pkg, "Once", empty4);
        let nullary = self.sig(Vec::new(), Vec::new(), false);
        let do_sig = self.sig(vec![nullary], Vec::new(), false);
        self.method(pkg, once, "Do", do_sig);

        pkg
    }

    fn errgroup(&mut self) -> PkgId {
        let pkg = self
            .objects
            .alloc_pkg("golang.org/x/sync/errgroup", "errgroup", false);
        let err = self.universe.error_type;
        let int = self.basic(BasicKind::Int);

        let empty = self.types.alloc(TypeKind::Struct { fields: Vec::new() });
        let group = self.named(pkg, "Group", empty);
        let task = self.sig(Vec::new(), vec![err], false);
        let go = self.sig(vec![task], Vec::new(), false);
        self.method(pkg, group, "Go", go);
        let wait = self.sig(Vec::new(), vec![err], false);
        self.method(pkg, group, "Wait", wait);
        let setlimit = self.sig(vec![int], Vec::new(), false);
        self.method(pkg, group, "SetLimit", setlimit);

        pkg
    }

    fn fmt(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("fmt", "fmt", false);
        let string = self.basic(BasicKind::String);
        let int = self.basic(BasicKind::Int);
        let err = self.universe.error_type;
        let args = self.any_slice();

        // Writer-taking variants use the io.Writer model.
        let io = {
            let mut importer = StdImporter::new(self.universe.clone());
            importer.import(self.types, self.objects, "io")
        };
        let writer = self
            .objects
            .pkg(io)
            .scope
            .get("Writer")
            .map(|&o| self.objects.obj(o).ty)
            .unwrap_or_else(|| self.types.invalid());

        let printf = self.sig(vec![string, args], vec![int, err], true);
        self.func(pkg, "Printf", printf);
        let print = self.sig(vec![args], vec![int, err], true);
        self.func(pkg, "Print", print);
        let println = self.sig(vec![args], vec![int, err], true);
        self.func(pkg, "Println", println);
        let sprintf = self.sig(vec![string, args], vec![string], true);
        self.func(pkg, "Sprintf", sprintf);
        let sprint = self.sig(vec![args], vec![string], true);
        self.func(pkg, "Sprint", sprint);
        let sprintln = self.sig(vec![args], vec![string], true);
        self.func(pkg, "Sprintln", sprintln);
        let errorf = self.sig(vec![string, args], vec![err], true);
        self.func(pkg, "Errorf", errorf);
        let fprintf = self.sig(vec![writer, string, args], vec![int, err], true);
        self.func(pkg, "Fprintf", fprintf);
        let fprintln = self.sig(vec![writer, args], vec![int, err], true);
        self.func(pkg, "Fprintln", fprintln);

        pkg
    }

    fn errors(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("errors", "errors", false);
        let string = self.basic(BasicKind::String);
        let bool_ = self.basic(BasicKind::Bool);
        let err = self.universe.error_type;
        let any = self.universe.any_type;

        let new = self.sig(vec![string], vec![err], false);
        self.func(pkg, "New", new);
        let as_ = self.sig(vec![err, any], vec![bool_], false);
        self.func(pkg, "As", as_);
        let is = self.sig(vec![err, err], vec![bool_], false);
        self.func(pkg, "Is", is);
        let unwrap = self.sig(vec![err], vec![err], false);
        self.func(pkg, "Unwrap", unwrap);
        let join = {
            let errs = self.types.slice(err);
            self.sig(vec![errs], vec![err], true)
        };
        self.func(pkg, "Join", join);

        pkg
    }

    fn os(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("os", "os", false);
        let int = self.basic(BasicKind::Int);
        let string = self.basic(BasicKind::String);

        let exit = self.sig(vec![int], Vec::new(), false);
        self.func(pkg, "Exit", exit);
        let getenv = self.sig(vec![string], vec![string], false);
        self.func(pkg, "Getenv", getenv);

        pkg
    }

    fn io(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("io", "io", false);
        let int = self.basic(BasicKind::Int);
        let err = self.universe.error_type;
        let byte = self.basic(BasicKind::Byte);
        let bytes = self.types.slice(byte);

        let write = self.sig(vec![bytes], vec![int, err], false);
        let iface = self.types.alloc(TypeKind::Interface {
            methods: vec![("Write".to_string(), write)],
        });
        self.named(pkg, "Writer", iface);

        pkg
    }

    fn strings(&mut self) -> PkgId {
        let pkg = self.objects.alloc_pkg("strings", "strings", false);
        let string = self.basic(BasicKind::String);
        let bool_ = self.basic(BasicKind::Bool);
        let int = self.basic(BasicKind::Int);
        let strings_ = self.types.slice(string);

        let contains = self.sig(vec![string, string], vec![bool_], false);
        self.func(pkg, "Contains", contains);
        let hasprefix = self.sig(vec![string, string], vec![bool_], false);
        self.func(pkg, "HasPrefix", hasprefix);
        let index = self.sig(vec![string, string], vec![int], false);
        self.func(pkg, "Index", index);
        let join = self.sig(vec![strings_, string], vec![string], false);
        self.func(pkg, "Join", join);
        let split = self.sig(vec![string, string], vec![strings_], false);
        self.func(pkg, "Split", split);
        let repeat = self.sig(vec![string, int], vec![string], false);
        self.func(pkg, "Repeat", repeat);

        pkg
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe;

    fn setup() -> (TypeStore, ObjectStore, StdImporter) {
        let mut types = TypeStore::new();
        let mut objects = ObjectStore::new();
        let u = universe::install(&mut types, &mut objects);
        (types, objects, StdImporter::new(u))
    }

    #[test]
    fn testing_t_has_run_and_parallel() {
        let (mut types, mut objects, mut imp) = setup();
        let pkg = imp.import(&mut types, &mut objects, "testing");
        let t = *objects.pkg(pkg).scope.get("T").unwrap();
        let t_ty = objects.obj(t).ty;
        let TypeKind::Named { methods, .. } = types.kind(t_ty) else {
            panic!("T not named");
        };
        let names: Vec<&str> = methods.iter().map(|&m| objects.obj(m).name.as_str()).collect();
        assert!(names.contains(&"Run"));
        assert!(names.contains(&"Parallel"));
    }

    #[test]
    fn import_is_cached() {
        let (mut types, mut objects, mut imp) = setup();
        let a = imp.import(&mut types, &mut objects, "sync");
        let b = imp.import(&mut types, &mut objects, "sync");
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_path_is_opaque() {
        let (mut types, mut objects, mut imp) = setup();
        let pkg = imp.import(&mut types, &mut objects, "example.com/internal/logging");
        assert!(objects.pkg(pkg).opaque);
        assert_eq!(objects.pkg(pkg).name, "logging");
        let _ = &mut types;
    }

    #[test]
    fn fmt_printf_signature_is_variadic() {
        let (mut types, mut objects, mut imp) = setup();
        let pkg = imp.import(&mut types, &mut objects, "fmt");
        let printf = *objects.pkg(pkg).scope.get("Printf").unwrap();
        let TypeKind::Signature {
            params, variadic, ..
        } = types.kind(objects.obj(printf).ty)
        else {
            panic!("Printf not a signature");
        };
        assert!(*variadic);
        assert_eq!(params.len(), 2);
    }
}
