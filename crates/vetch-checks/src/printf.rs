//! The `printf` analyzer.
//!
//! Checks calls to the formatted-print family for directive/argument
//! agreement: a format directive that reads past the supplied arguments,
//! surplus arguments with no directives to consume them, and unknown
//! verbs are all reported.
//!
//! A function that forwards its own format string and variadic arguments
//! to a formatted printer is itself printf-like. Wrappers found in the
//! current package are checked immediately; exported wrappers carry a
//! fact so calls in importing packages are checked the same way.

use crate::inspect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, FactKind, Pass};
use vetch_inspect::{package_object, selection, static_callee};
use vetch_syntax::ast::{LitKind, NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::unquote;
use vetch_types::ObjId;

pub static WRAPPER: FactKind = FactKind {
    name: "printfWrapper",
    schema_version: 1,
};

/// Exported on printf-like functions: which parameter is the format
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WrapperFact {
    pub format_arg: usize,
}

pub static ANALYZER: Analyzer = Analyzer {
    name: "printf",
    doc: "check consistency of Printf format strings and arguments\n\n\
          Calls to the fmt print family, testing's formatted helpers, and\n\
          user-defined wrappers are checked for unknown verbs and for\n\
          argument counts that disagree with the format's directives.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[WRAPPER],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    let ast = pass.ast;
    let res = pass.res;

    // The seed set of known formatted printers.
    let mut format_arg: HashMap<ObjId, usize> = HashMap::new();
    for (name, idx) in [("Printf", 0), ("Sprintf", 0), ("Errorf", 0), ("Fprintf", 1)] {
        if let Some(obj) = package_object(res, "fmt", name) {
            format_arg.insert(obj, idx);
        }
    }
    for recv in ["T", "B", "F"] {
        for name in ["Logf", "Fatalf", "Errorf"] {
            if let Some(obj) = selection(res, "testing", recv, name) {
                format_arg.insert(obj, 0);
            }
        }
    }

    // Find this package's wrappers. A second sweep catches wrappers of
    // wrappers declared later in the file list.
    let mut wrappers: Vec<(ObjId, usize)> = Vec::new();
    for _ in 0..2 {
        for c in insp.inspector.preorder(TagSet::of(&[NodeTag::FuncDecl])) {
            let Some(decl) = c.node() else { continue };
            if let Some((obj, idx)) = wrapper_shape(pass, decl, &format_arg) {
                if format_arg.insert(obj, idx).is_none() {
                    wrappers.push((obj, idx));
                }
            }
        }
    }
    for &(obj, idx) in &wrappers {
        if res.objects.obj(obj).is_exported() {
            pass.export_object_fact(&WRAPPER, obj, &WrapperFact { format_arg: idx })?;
        }
    }

    // Check every call against the combined set.
    let mut diags = Vec::new();
    for c in insp.inspector.preorder(TagSet::of(&[NodeTag::CallExpr])) {
        let Some(call) = c.node() else { continue };
        let Some(callee) = static_callee(ast, &res.info, call) else {
            continue;
        };
        let idx = match format_arg.get(&callee).copied() {
            Some(idx) => idx,
            None => match pass.import_object_fact::<WrapperFact>(&WRAPPER, callee) {
                Some(fact) => fact.format_arg,
                None => continue,
            },
        };
        check_call(pass, call, callee, idx, &mut diags);
    }
    for d in diags {
        pass.report(d);
    }
    Ok(no_result())
}

// ============================================================================
// Wrapper detection
// ============================================================================

/// Match `func F(..., format string, args ...T)` whose body forwards
/// `format` and `args...` to a known formatted printer. Returns the
/// function object and the format parameter's index.
fn wrapper_shape(
    pass: &Pass<'_>,
    decl: NodeId,
    known: &HashMap<ObjId, usize>,
) -> Option<(ObjId, usize)> {
    let ast = pass.ast;
    let res = pass.res;
    let NodeKind::FuncDecl {
        name, typ, body, ..
    } = ast.kind(decl)
    else {
        return None;
    };
    let body = (*body)?;
    let fobj = res.info.defs.get(name).copied()?;

    // Flatten the parameter objects in declaration order.
    let NodeKind::FuncType { params, .. } = ast.kind(*typ) else {
        return None;
    };
    let NodeKind::FieldList { fields } = ast.kind(*params) else {
        return None;
    };
    let mut param_objs = Vec::new();
    let mut variadic_last = false;
    for &f in fields {
        let NodeKind::Field { names, typ, .. } = ast.kind(f) else {
            return None;
        };
        variadic_last = matches!(
            typ.map(|t| ast.kind(t)),
            Some(NodeKind::EllipsisField { .. })
        );
        for &n in names {
            param_objs.push(res.info.defs.get(&n).copied()?);
        }
    }
    if !variadic_last || param_objs.len() < 2 {
        return None;
    }
    let args_obj = *param_objs.last()?;
    let format_obj = param_objs[param_objs.len() - 2];

    // A forwarding call anywhere in the body qualifies.
    let mut work = vec![body];
    while let Some(n) = work.pop() {
        if let NodeKind::CallExpr {
            args,
            has_ellipsis: true,
            ..
        } = ast.kind(n)
        {
            if let Some(callee) = static_callee(ast, &res.info, n) {
                if let Some(&idx) = known.get(&callee) {
                    let fwd_format = args
                        .get(idx)
                        .is_some_and(|&a| res.info.uses.get(&ast.unparen(a)) == Some(&format_obj));
                    let fwd_args = args
                        .last()
                        .is_some_and(|&a| res.info.uses.get(&ast.unparen(a)) == Some(&args_obj));
                    if fwd_format && fwd_args {
                        return Some((fobj, param_objs.len() - 2));
                    }
                }
            }
        }
        ast.visit_children(n, |_, _, c| work.push(c));
    }
    None
}

// ============================================================================
// Call checking
// ============================================================================

fn check_call(
    pass: &Pass<'_>,
    call: NodeId,
    callee: ObjId,
    format_idx: usize,
    diags: &mut Vec<Diagnostic>,
) {
    let ast = pass.ast;
    let res = pass.res;
    let NodeKind::CallExpr {
        args, has_ellipsis, ..
    } = ast.kind(call)
    else {
        return;
    };
    // Forwarded argument lists have unknowable length.
    if *has_ellipsis {
        return;
    }
    let Some(&format_arg) = args.get(format_idx) else {
        return;
    };
    let format_arg = ast.unparen(format_arg);
    let NodeKind::BasicLit { lit, value } = ast.kind(format_arg) else {
        // Non-constant format strings are not checkable.
        return;
    };
    if *lit != LitKind::Str {
        return;
    }
    let format = unquote(value);
    let name = res.objects.describe(callee);

    let parsed = parse_directives(&format);
    if let Some(verb) = parsed.unknown_verb {
        diags.push(Diagnostic::new(
            ast.pos(format_arg),
            ast.end(format_arg),
            format!("{name} format {value} has unknown verb %{verb}"),
        ));
        return;
    }

    let got = args.len() - format_idx - 1;
    if parsed.reads == 0 && got > 0 {
        diags.push(Diagnostic::new(
            ast.pos(call),
            ast.end(call),
            format!("{name} call has arguments but no formatting directives"),
        ));
    } else if parsed.reads != got {
        diags.push(Diagnostic::new(
            ast.pos(call),
            ast.end(call),
            format!(
                "{name} format {value} reads {} {}, but call has {got}",
                parsed.reads,
                plural(parsed.reads, "arg", "args"),
            ),
        ));
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

// ============================================================================
// Directive parsing
// ============================================================================

const VERBS: &str = "vTtbcdoOqxXUeEfFgGspw%";

#[derive(Debug, Default, PartialEq)]
struct Directives {
    /// How many arguments the directives consume (`*` counts too).
    reads: usize,
    unknown_verb: Option<char>,
}

fn parse_directives(format: &str) -> Directives {
    let mut out = Directives::default();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        // Flags.
        while matches!(chars.peek(), Some('+' | '-' | '#' | ' ' | '0')) {
            chars.next();
        }
        // Width.
        if chars.peek() == Some(&'*') {
            chars.next();
            out.reads += 1;
        } else {
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
        }
        // Precision.
        if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                out.reads += 1;
            } else {
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                }
            }
        }
        match chars.next() {
            Some('%') => {}
            Some(v) if VERBS.contains(v) => out.reads += 1,
            Some(v) => {
                if out.unknown_verb.is_none() {
                    out.unknown_verb = Some(v);
                }
            }
            None => {}
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
