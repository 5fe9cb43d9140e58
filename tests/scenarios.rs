//! The literal cross-crate scenarios: analyzer scheduling, loop-closure
//! behavior under different language versions, and fingerprint identity
//! through the public crate surface.

use std::collections::HashMap;
use vetch::types::fingerprint::{encode, matches, parse};
use vetch::types::{BasicKind, ObjectStore, TypeStore};
use vetch::{
    analyze, no_result, AnalysisError, Analyzer, AnalyzerValue, CancelToken, FactBase,
    PackageData, Pass, Registry, RegistryError,
};
use vetch_harness::{expect_fixture, Fixture};

// ============================================================================
// Scheduling: A <- B <- C, with C also requiring A directly
// ============================================================================

fn run_ok(_pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    Ok(no_result())
}

static A: Analyzer = Analyzer {
    name: "a",
    doc: "",
    flags: &[],
    requires: &[],
    fact_kinds: &[],
    run_despite_errors: true,
    run: run_ok,
};
static B: Analyzer = Analyzer {
    name: "b",
    doc: "",
    flags: &[],
    requires: &[&A],
    fact_kinds: &[],
    run_despite_errors: true,
    run: run_ok,
};
static C: Analyzer = Analyzer {
    name: "c",
    doc: "",
    flags: &[],
    requires: &[&B, &A],
    fact_kinds: &[],
    run_despite_errors: true,
    run: run_ok,
};

#[test]
fn diamond_requirements_run_in_order_exactly_once() {
    let registry = Registry::new(&[&C, &A, &B]).unwrap();
    let order: Vec<_> = registry.analyzers().iter().map(|a| a.name).collect();
    assert_eq!(order, vec!["a", "b", "c"]);

    let data = PackageData::parse(
        &vetch::types::Config::new("example.com/p", "go1.21"),
        &[("main.go".to_string(), "package p\n".to_string())],
    );
    let outcome = analyze(
        &registry,
        &data,
        &FactBase::new(),
        &HashMap::new(),
        &vetch::driver::os_read_file,
        &CancelToken::new(),
    );
    assert_eq!(outcome.outcomes.len(), 3);
    assert!(outcome.outcomes.iter().all(|o| o.ran()));
}

#[test]
fn unregistered_requirement_is_a_configuration_error() {
    let err = Registry::new(&[&B, &C]).unwrap_err();
    assert!(matches!(err, RegistryError::UnknownRequirement { .. }));
}

// ============================================================================
// Loop closure under language versions
// ============================================================================

const CAPTURE: &str = r#"package p

func f(list []int) {
	for _, v := range list {
		go func() {
			println(v) // want "loop variable v captured by func literal"
		}()
		x := 0
		_ = x
	}
}
"#;

#[test]
fn prefix_version_flags_the_capture_past_benign_statements() {
    expect_fixture(
        &Fixture::new("example.com/p", "go1.21").file("main.go", CAPTURE),
        &vetch::checks::default_analyzers(),
    );
}

#[test]
fn fixed_version_is_silent() {
    let quiet = CAPTURE.replace(" // want \"loop variable v captured by func literal\"", "");
    expect_fixture(
        &Fixture::new("example.com/p", "go1.22").file("main.go", quiet),
        &vetch::checks::default_analyzers(),
    );
}

// ============================================================================
// Fingerprint identity
// ============================================================================

#[test]
fn fingerprint_string_identity_for_simple_types() {
    let mut types = TypeStore::new();
    let objects = ObjectStore::new();
    let int = types.basic(BasicKind::Int);
    let string = types.basic(BasicKind::String);

    let ints_a = types.slice(int);
    let ints_b = types.slice(int);
    let (fa, _) = encode(&types, &objects, ints_a).unwrap();
    let (fb, _) = encode(&types, &objects, ints_b).unwrap();
    assert_eq!(fa, fb);

    let si = types.map(string, int);
    let is = types.map(int, string);
    let (fsi, _) = encode(&types, &objects, si).unwrap();
    let (fis, _) = encode(&types, &objects, is).unwrap();
    assert_ne!(fsi, fis);
}

#[test]
fn generic_signature_unifies_with_concrete_instantiation() {
    let mut types = TypeStore::new();
    let objects = ObjectStore::new();
    let int = types.basic(BasicKind::Int);

    // func[T any](T) against func(*int).
    let tp = types.alloc(vetch::types::TypeKind::TypeParam {
        index: 0,
        name: "T".to_string(),
    });
    let generic = types.signature(vec![tp], vec![], false);
    let ptr_int = types.pointer(int);
    let concrete = types.signature(vec![ptr_int], vec![], false);

    let (fg, tricky) = encode(&types, &objects, generic).unwrap();
    assert!(tricky);
    let (fc, _) = encode(&types, &objects, concrete).unwrap();
    let tg = parse(&fg).unwrap();
    let tc = parse(&fc).unwrap();
    assert!(matches(&tg, &tc));
    assert!(matches(&tc, &tg));
}

#[test]
fn occur_check_rejects_self_referential_unification() {
    let mut types = TypeStore::new();
    let objects = ObjectStore::new();

    // func[T any](T, T) against func[U any](U, *U).
    let t = types.alloc(vetch::types::TypeKind::TypeParam {
        index: 0,
        name: "T".to_string(),
    });
    let left = types.signature(vec![t, t], vec![], false);

    let u = types.alloc(vetch::types::TypeKind::TypeParam {
        index: 0,
        name: "U".to_string(),
    });
    let ptr_u = types.pointer(u);
    let right = types.signature(vec![u, ptr_u], vec![], false);

    let (fl, _) = encode(&types, &objects, left).unwrap();
    let (fr, _) = encode(&types, &objects, right).unwrap();
    let tl = parse(&fl).unwrap();
    let tr = parse(&fr).unwrap();
    assert!(!matches(&tl, &tr));
    assert!(!matches(&tr, &tl));
}
