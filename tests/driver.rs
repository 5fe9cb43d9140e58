//! End-to-end driver tests: unit description in, diagnostics and facts
//! out, through the public crate surface.

use std::collections::HashMap;
use vetch::driver::{run_unit, JsonOutput, Unit, UnitFile, UnitImport};
use vetch::{DriverOptions, Registry};

fn unit(package_path: &str, files: &[(&str, &str)]) -> Unit {
    Unit {
        package_path: package_path.to_string(),
        package_name: None,
        go_version: "go1.21".to_string(),
        files: files
            .iter()
            .map(|&(name, src)| UnitFile {
                name: name.to_string(),
                source: Some(src.to_string()),
                path: None,
                go_version: None,
            })
            .collect(),
        imports: vec![],
        facts_output: None,
        diagnostics_output: None,
    }
}

fn run(unit: &Unit, opts: &DriverOptions) -> (i32, String, String) {
    let registry = Registry::new(&vetch::checks::default_analyzers()).unwrap();
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = run_unit(
        &registry,
        unit,
        opts,
        &vetch::driver::os_read_file,
        &mut out,
        &mut err,
    )
    .unwrap();
    (
        code,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

const LOOPY: &str = r#"package p

func f(list []int) {
	for _, v := range list {
		defer func() {
			println(v)
		}()
	}
}
"#;

#[test]
fn text_mode_reports_and_exits_nonzero() {
    let unit = unit("example.com/p", &[("main.go", LOOPY)]);
    let (code, out, err) = run(&unit, &DriverOptions::default());
    assert_eq!(code, 1);
    assert!(out.is_empty());
    assert!(
        err.contains("main.go:6:12: loop variable v captured by func literal"),
        "stderr: {err}"
    );
}

#[test]
fn json_mode_exits_zero_and_structures_diagnostics() {
    let unit = unit("example.com/p", &[("main.go", LOOPY)]);
    let opts = DriverOptions {
        json: true,
        ..Default::default()
    };
    let (code, out, _) = run(&unit, &opts);
    assert_eq!(code, 0);
    let parsed: JsonOutput = serde_json::from_str(&out).unwrap();
    let diags = &parsed["example.com/p"]["loopclosure"];
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("captured by func literal"));
    assert!(diags[0].posn.starts_with("main.go:6:12"));
}

#[test]
fn context_lines_show_source_windows() {
    let unit = unit("example.com/p", &[("main.go", LOOPY)]);
    let opts = DriverOptions {
        context: Some(1),
        ..Default::default()
    };
    let (code, _, err) = run(&unit, &opts);
    assert_eq!(code, 1);
    assert!(err.contains("println(v)"), "stderr: {err}");
}

#[test]
fn clean_package_is_silent() {
    let unit = unit("example.com/p", &[("main.go", "package p\n\nfunc f() {}\n")]);
    let (code, out, err) = run(&unit, &DriverOptions::default());
    assert_eq!(code, 0);
    assert!(out.is_empty());
    assert!(err.is_empty());
}

#[test]
fn per_file_version_gates_the_loop_check() {
    let mut u = unit("example.com/p", &[]);
    u.files = vec![UnitFile {
        name: "main.go".to_string(),
        source: Some(LOOPY.to_string()),
        path: None,
        go_version: Some("go1.22".to_string()),
    }];
    let (code, _, err) = run(&u, &DriverOptions::default());
    assert_eq!(code, 0, "stderr: {err}");
}

#[test]
fn printf_wrapper_facts_travel_between_units() {
    let dir = tempfile::tempdir().unwrap();
    let facts_path = dir.path().join("log.facts");
    let facts_str = facts_path.to_str().unwrap().to_string();

    let mut dep = unit(
        "example.com/log",
        &[(
            "log.go",
            r#"package log

import "fmt"

func Logf(format string, args ...any) {
	fmt.Printf(format, args...)
}
"#,
        )],
    );
    dep.facts_output = Some(facts_str.clone());
    let (code, _, err) = run(&dep, &DriverOptions::default());
    assert_eq!(code, 0, "stderr: {err}");
    assert!(facts_path.exists());

    let mut user = unit(
        "example.com/app",
        &[(
            "app.go",
            r#"package app

import "example.com/log"

func f() {
	log.Logf("%d and %d", 1)
}
"#,
        )],
    );
    user.imports = vec![UnitImport {
        path: "example.com/log".to_string(),
        facts: Some(facts_str),
    }];
    let (code, _, err) = run(&user, &DriverOptions::default());
    assert_eq!(code, 1);
    assert!(
        err.contains("reads 2 args, but call has 1"),
        "stderr: {err}"
    );
}

#[test]
fn analyzer_flags_reach_their_analyzer() {
    let u = unit(
        "example.com/p",
        &[(
            "main.go",
            r#"package p

func pure(n int) int { return n + 1 }

func f() {
	pure(1)
}
"#,
        )],
    );
    let mut flags = HashMap::new();
    flags.insert(
        "unusedresult.funcs".to_string(),
        "example.com/p.pure".to_string(),
    );
    let opts = DriverOptions {
        flags,
        ..Default::default()
    };
    let (code, _, err) = run(&u, &opts);
    assert_eq!(code, 1);
    assert!(
        err.contains("result of example.com/p.pure call not used"),
        "stderr: {err}"
    );
}
