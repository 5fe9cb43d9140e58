//! The `errorsas` analyzer.
//!
//! `errors.As(err, target)` writes through `target`, so the second
//! argument must be a non-nil pointer. Passing the error itself, a plain
//! value, or a literal nil panics at run time; all three shapes are
//! detectable statically.

use crate::inspect;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_inspect::{package_object, static_callee};
use vetch_syntax::ast::{NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;
use vetch_types::TypeKind;

pub static ANALYZER: Analyzer = Analyzer {
    name: "errorsas",
    doc: "report passing non-pointer or non-error values to errors.As\n\n\
          The errorsas analysis reports calls to errors.As where the\n\
          second argument is not a pointer to a type implementing error.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

const MESSAGE: &str =
    "second argument to errors.As must be a non-nil pointer to either a type that implements \
     error, or to any interface type";

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;
    let Some(errors_as) = package_object(res, "errors", "As") else {
        return Ok(no_result());
    };

    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::CallExpr])) {
        let Some(call) = c.node() else { continue };
        if static_callee(ast, &res.info, call) != Some(errors_as) {
            continue;
        }
        let NodeKind::CallExpr { args, .. } = ast.kind(call) else {
            continue;
        };
        if args.len() != 2 {
            continue;
        }
        let target = ast.unparen(args[1]);

        if ast.ident_name_opt(target) == Some("nil") {
            diags.push(Diagnostic::new(
                ast.pos(target),
                ast.end(target),
                "second argument to errors.As must not be nil",
            ));
            continue;
        }
        // Taking an address is a pointer by construction.
        if matches!(ast.kind(target), NodeKind::UnaryExpr { op: Token::And, .. }) {
            continue;
        }
        let Some(t) = res.info.type_of(target) else {
            continue;
        };
        let t = res.types.unalias(t);
        if res.types.is_invalid(t) {
            continue;
        }
        if !matches!(res.types.kind(res.types.underlying(t)), TypeKind::Pointer(_)) {
            diags.push(Diagnostic::new(ast.pos(target), ast.end(target), MESSAGE));
        }
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect;
    use vetch_harness::expect;

    fn check(src: &str) {
        expect(src, &[&inspect::ANALYZER, &ANALYZER]);
    }

    #[test]
    fn address_of_target_is_fine() {
        check(
            r#"package p

import "errors"

type myError struct{}

func f(err error) {
	var target *myError
	if errors.As(err, &target) {
		_ = target
	}
}
"#,
        );
    }

    #[test]
    fn passing_the_error_itself_is_flagged() {
        check(
            r#"package p

import "errors"

func f(err error) {
	errors.As(err, err) // want "second argument to errors.As must be a non-nil pointer"
}
"#,
        );
    }

    #[test]
    fn literal_nil_is_flagged() {
        check(
            r#"package p

import "errors"

func f(err error) {
	errors.As(err, nil) // want "second argument to errors.As must not be nil"
}
"#,
        );
    }

    #[test]
    fn pointer_variable_is_fine() {
        check(
            r#"package p

import "errors"

type myError struct{}

func f(err error, target *myError) {
	errors.As(err, target)
}
"#,
        );
    }
}
