//! The `rangecontains` analyzer.
//!
//! Modernizer: a hand-written membership loop
//!
//! ```text
//! for _, v := range haystack {
//!     if v == needle {
//!         return true
//!     }
//! }
//! return false
//! ```
//!
//! says `slices.Contains(haystack, needle)` the long way. The whole
//! loop-and-return sequence is matched so the suggested fix can replace
//! both statements without changing behavior.

use crate::inspect;
use crate::util::source_text;
use vetch_core::{
    no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass, SuggestedFix, TextEdit,
};
use vetch_inspect::Cursor;
use vetch_syntax::ast::{Ast, NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;
use vetch_types::{ObjId, TypesInfo};

pub static ANALYZER: Analyzer = Analyzer {
    name: "rangecontains",
    doc: "simplify hand-written contains loops with slices.Contains\n\n\
          A range loop whose body only tests equality against one value\n\
          and returns true, followed by return false, is replaced by a\n\
          single slices.Contains call.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let fset = pass.fset;
    let info = &pass.res.info;

    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::RangeStmt])) {
        let Some(found) = match_contains_loop(ast, info, c) else {
            continue;
        };
        let (Some(haystack), Some(needle)) = (
            source_text(ast, fset, found.haystack),
            source_text(ast, fset, found.needle),
        ) else {
            continue;
        };
        let replacement = format!("return slices.Contains({haystack}, {needle})");
        diags.push(
            Diagnostic::new(
                ast.pos(found.range_stmt),
                ast.end(found.range_stmt),
                "Loop can be simplified using slices.Contains",
            )
            .with_category("rangecontains")
            .with_fix(SuggestedFix {
                message: "Replace loop by call to slices.Contains".to_string(),
                edits: vec![TextEdit {
                    pos: ast.pos(found.range_stmt),
                    end: ast.end(found.trailing_return),
                    new_text: replacement,
                }],
            }),
        );
    }

    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

struct ContainsLoop {
    range_stmt: NodeId,
    trailing_return: NodeId,
    haystack: NodeId,
    needle: NodeId,
}

fn match_contains_loop(ast: &Ast, info: &TypesInfo, c: Cursor<'_>) -> Option<ContainsLoop> {
    let range_stmt = c.node()?;
    let NodeKind::RangeStmt {
        key,
        value: Some(value),
        define: true,
        x,
        body,
    } = ast.kind(range_stmt)
    else {
        return None;
    };
    // The key must be discarded; the element variable is what the loop
    // compares.
    if key.is_some_and(|k| ast.ident_name_opt(k) != Some("_")) {
        return None;
    }
    let elem_obj = info.defs.get(value).copied()?;

    // Body: exactly `if v == needle { return true }`.
    let NodeKind::BlockStmt { stmts } = ast.kind(*body) else {
        return None;
    };
    let [only] = stmts.as_slice() else { return None };
    let NodeKind::IfStmt {
        init: None,
        cond,
        body: if_body,
        els: None,
    } = ast.kind(*only)
    else {
        return None;
    };
    let needle = equality_other_side(ast, info, *cond, elem_obj)?;
    if !is_return_bool(ast, *if_body, "true") {
        return None;
    }

    // The loop must be directly followed by `return false`.
    let next = c.next_sibling()?;
    let trailing_return = next.node()?;
    if !is_bare_return_bool(ast, trailing_return, "false") {
        return None;
    }

    Some(ContainsLoop {
        range_stmt,
        trailing_return,
        haystack: *x,
        needle,
    })
}

/// For `cond` of the form `v == e` or `e == v`, the other side. The
/// needle must not itself mention the element variable.
fn equality_other_side(
    ast: &Ast,
    info: &TypesInfo,
    cond: NodeId,
    elem: ObjId,
) -> Option<NodeId> {
    let NodeKind::BinaryExpr {
        op: Token::Eql,
        x,
        y,
    } = ast.kind(ast.unparen(cond))
    else {
        return None;
    };
    let is_elem = |e: NodeId| info.uses.get(&ast.unparen(e)) == Some(&elem);
    let mentions_elem = |e: NodeId| {
        let mut work = vec![e];
        while let Some(n) = work.pop() {
            if info.uses.get(&n) == Some(&elem) {
                return true;
            }
            ast.visit_children(n, |_, _, c| work.push(c));
        }
        false
    };
    match (is_elem(*x), is_elem(*y)) {
        (true, false) if !mentions_elem(*y) => Some(*y),
        (false, true) if !mentions_elem(*x) => Some(*x),
        _ => None,
    }
}

/// A block consisting solely of `return <lit>`.
fn is_return_bool(ast: &Ast, block: NodeId, lit: &str) -> bool {
    let NodeKind::BlockStmt { stmts } = ast.kind(block) else {
        return false;
    };
    match stmts.as_slice() {
        [only] => is_bare_return_bool(ast, *only, lit),
        _ => false,
    }
}

fn is_bare_return_bool(ast: &Ast, stmt: NodeId, lit: &str) -> bool {
    let NodeKind::ReturnStmt { results } = ast.kind(stmt) else {
        return false;
    };
    match results.as_slice() {
        [only] => ast.ident_name_opt(ast.unparen(*only)) == Some(lit),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect;
    use vetch_core::FactBase;
    use vetch_harness::{expect, run_fixture, Fixture};

    fn check(src: &str) {
        expect(src, &[&inspect::ANALYZER, &ANALYZER]);
    }

    #[test]
    fn classic_contains_loop_is_reported() {
        check(
            r#"package p

func contains(xs []int, target int) bool {
	for _, x := range xs { // want "Loop can be simplified using slices.Contains"
		if x == target {
			return true
		}
	}
	return false
}
"#,
        );
    }

    #[test]
    fn reversed_operands_match_too() {
        check(
            r#"package p

func contains(xs []string, target string) bool {
	for _, x := range xs { // want "slices.Contains"
		if target == x {
			return true
		}
	}
	return false
}
"#,
        );
    }

    #[test]
    fn extra_loop_work_disqualifies() {
        check(
            r#"package p

func count(xs []int, target int) bool {
	n := 0
	for _, x := range xs {
		n++
		if x == target {
			return true
		}
	}
	_ = n
	return false
}
"#,
        );
    }

    #[test]
    fn missing_trailing_return_disqualifies() {
        check(
            r#"package p

func find(xs []int, target int) bool {
	found := false
	for _, x := range xs {
		if x == target {
			return true
		}
	}
	return found
}
"#,
        );
    }

    #[test]
    fn fix_replaces_loop_and_return() {
        let fixture = Fixture::new("example.com/fix", "go1.21").file(
            "main.go",
            "package p\n\nfunc contains(xs []int, target int) bool {\n\tfor _, x := range xs {\n\t\tif x == target {\n\t\t\treturn true\n\t\t}\n\t}\n\treturn false\n}\n",
        );
        let (outcome, data) = run_fixture(&fixture, &[&inspect::ANALYZER, &ANALYZER], &FactBase::new());
        let diags: Vec<_> = outcome.diagnostics().collect();
        assert_eq!(diags.len(), 1);
        let fix = &diags[0].1.fixes[0];
        assert_eq!(fix.edits.len(), 1);
        let edit = &fix.edits[0];
        assert_eq!(edit.new_text, "return slices.Contains(xs, target)");

        // Applying the edit yields the simplified function.
        let entry = &data.ast.files()[0];
        let file = data.fset.file_containing(edit.pos).unwrap();
        let mut src = entry.source.clone();
        src.replace_range(file.offset(edit.pos)..file.offset(edit.end), &edit.new_text);
        assert!(src.contains("return slices.Contains(xs, target)\n}"), "got {src}");
        assert!(!src.contains("for _, x"));
    }
}
