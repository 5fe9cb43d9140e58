//! The `tests` analyzer.
//!
//! Test, benchmark, and fuzz functions are discovered by name and
//! signature; a near-miss compiles fine and silently never runs. This
//! analyzer reports malformed names and signatures for `Test*`,
//! `Benchmark*`, and `Fuzz*` functions in `_test.go` files.

use crate::inspect;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_syntax::ast::{Ast, NodeId, NodeKind};
use vetch_types::{Resolution, TypeKind};

pub static ANALYZER: Analyzer = Analyzer {
    name: "tests",
    doc: "check for common mistaken usages of tests and examples\n\n\
          The tests checker walks Test, Benchmark, and Fuzz functions\n\
          checking malformed names and wrong signatures.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    // The inspect requirement keeps the schedule uniform; file-scoped
    // declaration lists are all this check needs.
    let _ = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;

    let mut diags = Vec::new();
    for entry in ast.files() {
        if !entry.name.ends_with("_test.go") {
            continue;
        }
        let NodeKind::File { decls, .. } = ast.kind(entry.node) else {
            continue;
        };
        for &decl in decls {
            let NodeKind::FuncDecl {
                recv: None,
                name,
                typ,
                ..
            } = ast.kind(decl)
            else {
                continue;
            };
            let fname = ast.ident_name_opt(*name).unwrap_or_default().to_string();
            for (prefix, param) in [("Test", "T"), ("Benchmark", "B"), ("Fuzz", "F")] {
                let Some(rest) = fname.strip_prefix(prefix) else {
                    continue;
                };
                check_one(ast, res, &fname, prefix, rest, param, *name, *typ, &mut diags);
                break;
            }
        }
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

#[allow(clippy::too_many_arguments)]
fn check_one(
    ast: &Ast,
    res: &Resolution,
    fname: &str,
    prefix: &str,
    rest: &str,
    param: &str,
    name: NodeId,
    typ: NodeId,
    diags: &mut Vec<Diagnostic>,
) {
    // TestXxx, not Testxxx; a bare Test/Benchmark/Fuzz is allowed.
    if rest.chars().next().is_some_and(|c| c.is_lowercase()) {
        diags.push(Diagnostic::new(
            ast.pos(name),
            ast.end(name),
            format!(
                "{fname} has malformed name: first letter after '{prefix}' must not be lowercase"
            ),
        ));
        return;
    }
    if !well_formed_signature(ast, res, typ, param) {
        let short = param.to_lowercase();
        diags.push(Diagnostic::new(
            ast.pos(name),
            ast.end(name),
            format!("{fname} should be of the form func {fname}({short} *testing.{param})"),
        ));
    }
}

/// Exactly one parameter of type `*testing.{T,B,F}`, no results, no type
/// parameters.
fn well_formed_signature(ast: &Ast, res: &Resolution, typ: NodeId, param: &str) -> bool {
    let NodeKind::FuncType {
        type_params,
        params,
        results,
    } = ast.kind(typ)
    else {
        return false;
    };
    if type_params.is_some() || results.is_some() {
        return false;
    }
    let NodeKind::FieldList { fields } = ast.kind(*params) else {
        return false;
    };
    if fields.len() != 1 {
        return false;
    }
    let NodeKind::Field { names, .. } = ast.kind(fields[0]) else {
        return false;
    };
    if names.len() > 1 {
        return false;
    }
    // The declared object's resolved type must be *testing.{param}.
    let Some(&obj) = names.first().and_then(|n| res.info.defs.get(n)) else {
        // Unnamed context parameters are rare but legal; accept the
        // declared type expression shape instead.
        return param_type_shape(ast, fields[0], param);
    };
    let t = res.types.unalias(res.objects.obj(obj).ty);
    let TypeKind::Pointer(elem) = res.types.kind(t) else {
        return false;
    };
    let TypeKind::Named { obj: tobj, .. } = res.types.kind(res.types.unalias(*elem)) else {
        return false;
    };
    let o = res.objects.obj(*tobj);
    o.name == param
        && o.pkg
            .is_some_and(|p| res.objects.pkg(p).path == "testing")
}

fn param_type_shape(ast: &Ast, field: NodeId, param: &str) -> bool {
    let NodeKind::Field { typ: Some(t), .. } = ast.kind(field) else {
        return false;
    };
    let NodeKind::StarExpr { x } = ast.kind(*t) else {
        return false;
    };
    let NodeKind::SelectorExpr { x: pkg, sel } = ast.kind(ast.unparen(*x)) else {
        return false;
    };
    ast.ident_name_opt(ast.unparen(*pkg)) == Some("testing")
        && ast.ident_name_opt(*sel) == Some(param)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect;
    use vetch_harness::{expect_fixture, Fixture};

    fn check(src: &str) {
        expect_fixture(
            &Fixture::new("example.com/fix", "go1.21").file("main_test.go", src),
            &[&inspect::ANALYZER, &ANALYZER],
        );
    }

    #[test]
    fn lowercase_after_prefix_is_malformed() {
        check(
            r#"package p

import "testing"

func Testfoo(t *testing.T) {} // want "Testfoo has malformed name: first letter after 'Test' must not be lowercase"

func TestFoo(t *testing.T) {}
"#,
        );
    }

    #[test]
    fn wrong_parameter_types_are_flagged() {
        check(
            r#"package p

import "testing"

func TestBadParam(b *testing.B) {} // want "TestBadParam should be of the form func TestBadParam\\(t \\*testing.T\\)"

func BenchmarkGood(b *testing.B) {}
"#,
        );
    }

    #[test]
    fn extra_parameters_are_flagged() {
        check(
            r#"package p

import "testing"

func TestTooMany(t *testing.T, extra int) {} // want "should be of the form"
"#,
        );
    }

    #[test]
    fn results_are_flagged() {
        check(
            r#"package p

import "testing"

func FuzzBad(f *testing.F) error { return nil } // want "should be of the form"
"#,
        );
    }

    #[test]
    fn non_test_files_are_ignored() {
        expect_fixture(
            &Fixture::new("example.com/fix", "go1.21").file(
                "main.go",
                r#"package p

func Testfoo(x int) {}
"#,
            ),
            &[&inspect::ANALYZER, &ANALYZER],
        );
    }

    #[test]
    fn methods_are_not_test_functions() {
        check(
            r#"package p

type suite struct{}

func (s suite) TestHelper(x int) {}
"#,
        );
    }
}
