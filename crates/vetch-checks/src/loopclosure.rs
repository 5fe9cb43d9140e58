//! The `loopclosure` analyzer.
//!
//! Before the per-iteration loop-variable change (go1.22), a function
//! literal that runs after the current iteration — launched with `go`,
//! scheduled with `defer`, handed to an errgroup's `Go`, or registered as
//! a parallel subtest — observes the final value of any captured
//! iteration variable rather than the per-iteration value.
//!
//! Launch sites are only provable when nothing that could block, panic,
//! or jump runs between the launch and the end of the iteration, so the
//! loop body is scanned in reverse: a launch is reported only while the
//! statement suffix after it is skippable (see [`Checker::skippable_stmt`]).
//! Loop nesting keeps a stack of iteration-variable frames; a nested loop
//! whose header is itself not skippable starts over with an empty stack,
//! because the header may have altered control flow in ways the prover
//! cannot see through.

use crate::inspect;
use std::collections::HashMap;
use tracing::debug;
use vetch_core::{no_result, AnalysisError, Analyzer, AnalyzerValue, Diagnostic, Pass};
use vetch_inspect::{selection, static_callee};
use vetch_syntax::ast::{Ast, BranchKind, NodeId, NodeKind, NodeTag, TagSet};
use vetch_syntax::Token;
use vetch_types::{file_uses_version, ObjId, ObjKind, Resolution, TypeKind};

pub static ANALYZER: Analyzer = Analyzer {
    name: "loopclosure",
    doc: "check references to loop variables from within nested functions\n\n\
          Reports locations where a function literal that escapes the\n\
          current loop iteration references an iteration variable, for\n\
          files whose language version predates go1.22.",
    flags: &[],
    requires: &[&inspect::ANALYZER],
    fact_kinds: &[],
    run_despite_errors: false,
    run,
};

fn run(pass: &mut Pass<'_>) -> Result<AnalyzerValue, AnalysisError> {
    let insp = inspect::of(pass)?;
    // No loops, nothing to prove.
    if insp
        .inspector
        .preorder(TagSet::of(&[NodeTag::ForStmt, NodeTag::RangeStmt]))
        .next()
        .is_none()
    {
        return Ok(no_result());
    }

    let ast = pass.ast;
    let res = pass.res;
    let mut check = Checker {
        ast,
        res,
        run_method: selection(res, "testing", "T", "Run"),
        parallel_method: selection(res, "testing", "T", "Parallel"),
        errgroup_go: selection(res, "golang.org/x/sync/errgroup", "Group", "Go"),
        wg_add: selection(res, "sync", "WaitGroup", "Add"),
        wg_done: selection(res, "sync", "WaitGroup", "Done"),
        stack: VarStack::default(),
        memo: HashMap::new(),
        out: Vec::new(),
    };

    for entry in ast.files() {
        if file_uses_version(&res.info, entry.node, "go1.22") {
            debug!(file = %entry.name, "skipped: per-iteration loop variables");
            continue;
        }
        let NodeKind::File { decls, .. } = ast.kind(entry.node) else {
            continue;
        };
        for &decl in decls {
            check.top_decl(decl);
        }
    }

    for d in check.out {
        pass.report(d);
    }
    Ok(no_result())
}

// ============================================================================
// Loop-variable stack
// ============================================================================

/// Iteration-variable frames for the enclosing loops, with a counting
/// multiset so the same object appearing in several nested frames (a
/// reused variable) stays live until its outermost frame pops.
#[derive(Debug, Default)]
struct VarStack {
    frames: Vec<Vec<ObjId>>,
    counts: HashMap<ObjId, u32>,
}

impl VarStack {
    fn push_frame(&mut self, vars: Vec<ObjId>) {
        for &v in &vars {
            *self.counts.entry(v).or_insert(0) += 1;
        }
        self.frames.push(vars);
    }

    fn pop_frame(&mut self) {
        let Some(vars) = self.frames.pop() else { return };
        for v in vars {
            if let Some(n) = self.counts.get_mut(&v) {
                *n -= 1;
                if *n == 0 {
                    self.counts.remove(&v);
                }
            }
        }
    }

    fn contains(&self, obj: ObjId) -> bool {
        self.counts.contains_key(&obj)
    }

    fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

// ============================================================================
// Checker
// ============================================================================

struct Checker<'a> {
    ast: &'a Ast,
    res: &'a Resolution,
    run_method: Option<ObjId>,
    parallel_method: Option<ObjId>,
    errgroup_go: Option<ObjId>,
    wg_add: Option<ObjId>,
    wg_done: Option<ObjId>,
    stack: VarStack,
    /// Per-statement skippability, context-free and so shared.
    memo: HashMap<NodeId, bool>,
    out: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn top_decl(&mut self, decl: NodeId) {
        match self.ast.kind(decl) {
            NodeKind::FuncDecl {
                body: Some(body), ..
            } => self.scan_stmt(*body, true),
            // Function literals in package-level initializers.
            NodeKind::GenDecl { .. } => self.find_lits(decl),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Reverse scan
    // ------------------------------------------------------------------

    /// Scan a statement list in reverse. `live` is true while every
    /// statement after the current one is skippable, i.e. while a launch
    /// here still provably escapes the iteration.
    fn scan_stmts(&mut self, stmts: &[NodeId], mut live: bool) {
        for &s in stmts.iter().rev() {
            self.scan_stmt(s, live);
            live = live && self.skippable_stmt(s);
        }
    }

    fn scan_stmt(&mut self, s: NodeId, live: bool) {
        match self.ast.kind(s) {
            NodeKind::GoStmt { call } | NodeKind::DeferStmt { call } => {
                if live && !self.stack.is_empty() {
                    self.check_launch(*call);
                }
                self.find_lits(s);
            }
            NodeKind::ExprStmt { x } => {
                if live && !self.stack.is_empty() {
                    let call = self.ast.unparen(*x);
                    if let Some(body) = self.errgroup_launch(call) {
                        self.report_captured(body);
                    }
                }
                self.find_lits(s);
            }
            NodeKind::BlockStmt { stmts } => self.scan_stmts(stmts, live),
            NodeKind::LabeledStmt { stmt, .. } => self.scan_stmt(*stmt, live),
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            } => {
                if let Some(init) = init {
                    self.scan_stmt(*init, false);
                }
                self.find_lits(*cond);
                self.scan_stmt(*body, live);
                if let Some(els) = els {
                    self.scan_stmt(*els, live);
                }
            }
            NodeKind::ForStmt { .. } | NodeKind::RangeStmt { .. } => self.scan_loop(s, live),
            NodeKind::SwitchStmt { init, tag, body } => {
                if let Some(init) = init {
                    self.scan_stmt(*init, false);
                }
                if let Some(tag) = tag {
                    self.find_lits(*tag);
                }
                self.scan_clauses(*body, live);
            }
            NodeKind::TypeSwitchStmt { init, assign, body } => {
                if let Some(init) = init {
                    self.scan_stmt(*init, false);
                }
                self.find_lits(*assign);
                self.scan_clauses(*body, live);
            }
            NodeKind::SelectStmt { body } => {
                let NodeKind::BlockStmt { stmts } = self.ast.kind(*body) else {
                    return;
                };
                for &clause in stmts {
                    let NodeKind::CommClause { comm, body } = self.ast.kind(clause) else {
                        continue;
                    };
                    if let Some(comm) = comm {
                        self.scan_stmt(*comm, false);
                    }
                    self.scan_stmts(body, live);
                }
            }
            _ => self.find_lits(s),
        }
    }

    /// Scan every case clause of a switch body; each clause's tail is
    /// examined like a loop-body tail.
    fn scan_clauses(&mut self, body: NodeId, live: bool) {
        let NodeKind::BlockStmt { stmts } = self.ast.kind(body) else {
            return;
        };
        for &clause in stmts {
            let NodeKind::CaseClause { values, body } = self.ast.kind(clause) else {
                continue;
            };
            for &v in values {
                self.find_lits(v);
            }
            self.scan_stmts(body, live);
        }
    }

    // ------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------

    fn scan_loop(&mut self, s: NodeId, live: bool) {
        let (vars, header_ok, body) = match self.ast.kind(s) {
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                // The iteration variables are the ones the post statement
                // updates.
                let mut vars = Vec::new();
                if let Some(post) = post {
                    match self.ast.kind(*post) {
                        NodeKind::AssignStmt { lhs, .. } => {
                            for &l in lhs {
                                self.add_var(&mut vars, l);
                            }
                        }
                        NodeKind::IncDecStmt { x, .. } => self.add_var(&mut vars, *x),
                        _ => {}
                    }
                }
                let header_ok = self.skippable_stmt_opt(*init)
                    && cond.map_or(true, |c| self.skippable_expr(c))
                    && self.skippable_stmt_opt(*post);
                for part in [init, cond, post].into_iter().flatten() {
                    self.find_lits(*part);
                }
                (vars, header_ok, *body)
            }
            NodeKind::RangeStmt {
                key,
                value,
                define,
                x,
                body,
            } => {
                let mut vars = Vec::new();
                if *define {
                    if let Some(k) = key {
                        self.add_var(&mut vars, *k);
                    }
                    if let Some(v) = value {
                        self.add_var(&mut vars, *v);
                    }
                }
                let header_ok = self.skippable_expr(*x)
                    && key.map_or(true, |k| self.skippable_expr(k))
                    && value.map_or(true, |v| self.skippable_expr(v));
                self.find_lits(*x);
                (vars, header_ok, *body)
            }
            _ => return,
        };
        let NodeKind::BlockStmt { stmts } = self.ast.kind(body) else {
            return;
        };

        // Outer frames survive into the body only when this loop sits in
        // a provable tail position and its own header is benign.
        if live && header_ok {
            self.stack.push_frame(vars);
            self.scan_body(stmts);
            self.stack.pop_frame();
        } else {
            let saved = std::mem::take(&mut self.stack);
            self.stack.push_frame(vars);
            self.scan_body(stmts);
            self.stack.pop_frame();
            self.stack = saved;
        }
    }

    fn scan_body(&mut self, stmts: &[NodeId]) {
        self.scan_stmts(stmts, true);
        self.check_subtests(stmts);
    }

    fn add_var(&mut self, vars: &mut Vec<ObjId>, expr: NodeId) {
        let id = self.ast.unparen(expr);
        let Some(name) = self.ast.ident_name_opt(id) else {
            return;
        };
        if name == "_" {
            return;
        }
        let Some(obj) = self.res.info.obj_of(id) else {
            return;
        };
        if self.res.objects.obj(obj).kind == ObjKind::Var {
            vars.push(obj);
        }
    }

    // ------------------------------------------------------------------
    // Launch detection
    // ------------------------------------------------------------------

    /// A `go` or `defer` whose callee is written as a function literal.
    fn check_launch(&mut self, call: NodeId) {
        let NodeKind::CallExpr { fun, .. } = self.ast.kind(call) else {
            return;
        };
        let fun = self.ast.unparen(*fun);
        if let NodeKind::FuncLit { body, .. } = self.ast.kind(fun) {
            self.report_captured(*body);
        }
    }

    /// `g.Go(func() error { ... })` for an errgroup-style group.
    fn errgroup_launch(&self, call: NodeId) -> Option<NodeId> {
        let NodeKind::CallExpr { args, .. } = self.ast.kind(call) else {
            return None;
        };
        let callee = static_callee(self.ast, &self.res.info, call)?;
        if Some(callee) != self.errgroup_go || args.len() != 1 {
            return None;
        }
        match self.ast.kind(self.ast.unparen(args[0])) {
            NodeKind::FuncLit { body, .. } => Some(*body),
            _ => None,
        }
    }

    /// Flag every use of a stacked iteration variable inside `root`.
    fn report_captured(&mut self, root: NodeId) {
        let mut work = vec![root];
        while let Some(n) = work.pop() {
            if let NodeKind::Ident { name } = self.ast.kind(n) {
                if let Some(&obj) = self.res.info.uses.get(&n) {
                    if self.stack.contains(obj) {
                        self.out.push(Diagnostic::new(
                            self.ast.pos(n),
                            self.ast.end(n),
                            format!("loop variable {name} captured by func literal"),
                        ));
                    }
                }
            }
            self.ast.visit_children(n, |_, _, c| work.push(c));
        }
    }

    // ------------------------------------------------------------------
    // Parallel subtests
    // ------------------------------------------------------------------

    /// Scan the loop body's statements for `t.Run(name, func(t *T) {...})`
    /// subtests that opt into parallelism. Statements after the
    /// `t.Parallel()` call run outside the iteration; a labeled statement
    /// resets the scan because a jump may reorder control flow.
    fn check_subtests(&mut self, stmts: &[NodeId]) {
        // Both methods must have resolved, or an unresolvable callee
        // would compare equal to the missing model.
        if self.stack.is_empty() || self.run_method.is_none() || self.parallel_method.is_none() {
            return;
        }
        for &s in stmts {
            let NodeKind::ExprStmt { x } = self.ast.kind(s) else {
                continue;
            };
            let call = self.ast.unparen(*x);
            let NodeKind::CallExpr { args, .. } = self.ast.kind(call) else {
                continue;
            };
            if static_callee(self.ast, &self.res.info, call) != self.run_method
                || args.len() != 2
            {
                continue;
            }
            let NodeKind::FuncLit { typ, body } = self.ast.kind(self.ast.unparen(args[1])) else {
                continue;
            };
            let Some(t_param) = self.lit_context_param(*typ) else {
                continue;
            };
            let NodeKind::BlockStmt { stmts } = self.ast.kind(*body) else {
                continue;
            };

            let mut after_parallel = false;
            for &stmt in stmts {
                if matches!(self.ast.kind(stmt), NodeKind::LabeledStmt { .. }) {
                    after_parallel = false;
                    continue;
                }
                if after_parallel {
                    self.report_captured(stmt);
                    continue;
                }
                if self.is_parallel_call(stmt, t_param) {
                    after_parallel = true;
                }
            }
        }
    }

    /// The literal's own testing-context parameter object.
    fn lit_context_param(&self, typ: NodeId) -> Option<ObjId> {
        let NodeKind::FuncType { params, .. } = self.ast.kind(typ) else {
            return None;
        };
        let NodeKind::FieldList { fields } = self.ast.kind(*params) else {
            return None;
        };
        let NodeKind::Field { names, .. } = self.ast.kind(*fields.first()?) else {
            return None;
        };
        self.res.info.defs.get(names.first()?).copied()
    }

    /// `t.Parallel()` on exactly the given testing-context object.
    fn is_parallel_call(&self, stmt: NodeId, t_param: ObjId) -> bool {
        let NodeKind::ExprStmt { x } = self.ast.kind(stmt) else {
            return false;
        };
        let call = self.ast.unparen(*x);
        if static_callee(self.ast, &self.res.info, call) != self.parallel_method {
            return false;
        }
        let NodeKind::CallExpr { fun, .. } = self.ast.kind(call) else {
            return false;
        };
        let NodeKind::SelectorExpr { x: recv, .. } = self.ast.kind(self.ast.unparen(*fun)) else {
            return false;
        };
        let recv = self.ast.unparen(*recv);
        self.res.info.uses.get(&recv) == Some(&t_param)
    }

    // ------------------------------------------------------------------
    // Nested literals
    // ------------------------------------------------------------------

    /// Analyze loops inside function literals anywhere under `n`. The
    /// literal is a new function: its body starts with an empty variable
    /// stack.
    fn find_lits(&mut self, n: NodeId) {
        let mut kids = Vec::new();
        self.ast.visit_children(n, |_, _, c| kids.push(c));
        for c in kids {
            if let NodeKind::FuncLit { body, .. } = self.ast.kind(c) {
                let saved = std::mem::take(&mut self.stack);
                self.scan_stmt(*body, true);
                self.stack = saved;
            } else {
                self.find_lits(c);
            }
        }
    }

    // ------------------------------------------------------------------
    // The skippable prover
    // ------------------------------------------------------------------

    fn skippable_stmt_opt(&mut self, s: Option<NodeId>) -> bool {
        s.map_or(true, |s| self.skippable_stmt(s))
    }

    /// True when the statement provably cannot halt, block, panic, or
    /// jump anywhere unexpected. Memoized per statement node.
    fn skippable_stmt(&mut self, s: NodeId) -> bool {
        if let Some(&v) = self.memo.get(&s) {
            return v;
        }
        let v = self.skippable_stmt_uncached(s);
        self.memo.insert(s, v);
        v
    }

    fn skippable_stmt_uncached(&mut self, s: NodeId) -> bool {
        match self.ast.kind(s) {
            NodeKind::EmptyStmt => true,
            NodeKind::BlockStmt { stmts } => stmts.iter().all(|&s| self.skippable_stmt(s)),
            NodeKind::AssignStmt { lhs, op, rhs } => {
                // Division and shift assignments may panic.
                matches!(
                    op,
                    Token::Assign
                        | Token::Define
                        | Token::AddAssign
                        | Token::SubAssign
                        | Token::MulAssign
                        | Token::AndAssign
                        | Token::OrAssign
                        | Token::XorAssign
                        | Token::AndNotAssign
                ) && lhs.iter().chain(rhs).all(|&e| self.skippable_expr(e))
            }
            NodeKind::BranchStmt { keyword, label } => match keyword {
                BranchKind::Continue => label.is_none(),
                BranchKind::Fallthrough => true,
                _ => false,
            },
            NodeKind::ExprStmt { x } => {
                let x = self.ast.unparen(*x);
                match self.ast.kind(x) {
                    NodeKind::CallExpr { .. } => self.skippable_call(x),
                    // The bare `x.(type)` guard of a type switch.
                    NodeKind::TypeAssertExpr { x, typ: None } => self.skippable_expr(*x),
                    _ => false,
                }
            }
            // The launch itself is not run here; its arguments are.
            NodeKind::DeferStmt { call } | NodeKind::GoStmt { call } => {
                match self.ast.kind(*call) {
                    NodeKind::CallExpr { args, .. } => {
                        args.iter().all(|&a| self.skippable_expr(a))
                    }
                    _ => false,
                }
            }
            NodeKind::IncDecStmt { x, .. } => self.skippable_expr(*x),
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            } => {
                self.skippable_stmt_opt(*init)
                    && self.skippable_expr(*cond)
                    && self.skippable_stmt(*body)
                    && els.map_or(true, |e| self.skippable_stmt(e))
            }
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                self.skippable_stmt_opt(*init)
                    && cond.map_or(true, |c| self.skippable_expr(c))
                    && self.skippable_stmt_opt(*post)
                    && self.skippable_stmt(*body)
            }
            NodeKind::RangeStmt {
                key, value, x, body, ..
            } => {
                self.skippable_expr(*x)
                    && key.map_or(true, |k| self.skippable_expr(k))
                    && value.map_or(true, |v| self.skippable_expr(v))
                    && self.skippable_stmt(*body)
            }
            NodeKind::SwitchStmt { init, tag, body } => {
                self.skippable_stmt_opt(*init)
                    && tag.map_or(true, |t| self.skippable_expr(t))
                    && self.skippable_stmt(*body)
            }
            NodeKind::TypeSwitchStmt { init, assign, body } => {
                self.skippable_stmt_opt(*init)
                    && self.skippable_stmt(*assign)
                    && self.skippable_stmt(*body)
            }
            NodeKind::CaseClause { values, body } => {
                values.iter().all(|&v| self.skippable_expr(v))
                    && body.iter().all(|&s| self.skippable_stmt(s))
            }
            // A select blocks; everything unlisted stays conservative.
            _ => false,
        }
    }

    fn skippable_expr(&mut self, e: NodeId) -> bool {
        match self.ast.kind(e) {
            NodeKind::BasicLit { .. } | NodeKind::Ident { .. } => true,
            NodeKind::ParenExpr { x } => self.skippable_expr(*x),
            NodeKind::BinaryExpr { op, x, y } => {
                // Division, remainder, and shifts may panic.
                !matches!(op, Token::Quo | Token::Rem | Token::Shl | Token::Shr)
                    && self.skippable_expr(*x)
                    && self.skippable_expr(*y)
            }
            NodeKind::UnaryExpr { op, x } => {
                // `<-` blocks; a dereference is a StarExpr and may panic.
                matches!(
                    op,
                    Token::Add | Token::Sub | Token::Not | Token::Xor | Token::And
                ) && self.skippable_expr(*x)
            }
            NodeKind::SelectorExpr { x, .. } => {
                // Field access through a pointer may panic on nil.
                self.skippable_expr(*x) && self.is_struct_valued(*x)
            }
            NodeKind::TypeAssertExpr { x, typ: None } => self.skippable_expr(*x),
            NodeKind::CompositeLit { elts, .. } => {
                self.is_struct_valued(e)
                    && elts.iter().all(|&el| match self.ast.kind(el) {
                        NodeKind::KeyValueExpr { value, .. } => self.skippable_expr(*value),
                        _ => false,
                    })
            }
            NodeKind::CallExpr { .. } => self.skippable_call(e),
            _ => false,
        }
    }

    fn skippable_call(&mut self, call: NodeId) -> bool {
        let NodeKind::CallExpr { args, .. } = self.ast.kind(call) else {
            return false;
        };
        let Some(callee) = static_callee(self.ast, &self.res.info, call) else {
            return false;
        };
        match &self.res.objects.obj(callee).kind {
            ObjKind::Builtin(b) => {
                use vetch_types::Builtin::*;
                matches!(b, Append | Cap | Copy | Delete | Len | New)
                    && args.iter().all(|&a| self.skippable_expr(a))
            }
            // Bookkeeping on a wait group neither blocks nor panics in
            // well-formed code.
            _ => Some(callee) == self.wg_add || Some(callee) == self.wg_done,
        }
    }

    fn is_struct_valued(&self, e: NodeId) -> bool {
        let Some(t) = self.res.info.type_of(e) else {
            return false;
        };
        matches!(
            self.res.types.kind(self.res.types.underlying(t)),
            TypeKind::Struct { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ANALYZER;
    use crate::inspect;
    use vetch_harness::{expect, expect_fixture, Fixture};

    fn check(src: &str) {
        expect(src, &[&inspect::ANALYZER, &ANALYZER]);
    }

    mod launches {
        use super::*;

        #[test]
        fn defer_captures_range_value() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		defer func() {
			println(v) // want "loop variable v captured by func literal"
		}()
	}
}
"#,
            );
        }

        #[test]
        fn go_captures_key_and_value() {
            check(
                r#"package p

func f(list []int) {
	for i, v := range list {
		go func() {
			println(i) // want "loop variable i captured by func literal"
			println(v) // want "loop variable v captured by func literal"
		}()
	}
}
"#,
            );
        }

        #[test]
        fn three_clause_loop_variable() {
            check(
                r#"package p

func f(n int) {
	for i := 0; i < n; i++ {
		go func() {
			println(i) // want "loop variable i captured by func literal"
		}()
	}
}
"#,
            );
        }

        #[test]
        fn argument_passing_is_safe() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		go func(v int) {
			println(v)
		}(v)
	}
}
"#,
            );
        }

        #[test]
        fn synchronous_literal_is_safe() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		func() {
			println(v)
		}()
	}
}
"#,
            );
        }

        #[test]
        fn errgroup_go_is_a_launch() {
            check(
                r#"package p

import "golang.org/x/sync/errgroup"

func f(list []int) {
	var g errgroup.Group
	for _, v := range list {
		g.Go(func() error {
			println(v) // want "loop variable v captured by func literal"
			return nil
		})
	}
}
"#,
            );
        }
    }

    mod versions {
        use super::*;

        #[test]
        fn fixed_language_version_is_quiet() {
            let src = r#"package p

func f(list []int) {
	for _, v := range list {
		defer func() {
			println(v)
		}()
	}
}
"#;
            expect_fixture(
                &Fixture::new("example.com/fix", "go1.22").file("main.go", src),
                &[&inspect::ANALYZER, &ANALYZER],
            );
        }

        #[test]
        fn per_file_version_override_wins() {
            let src = r#"package p

func f(list []int) {
	for _, v := range list {
		defer func() { println(v) }()
	}
}
"#;
            expect_fixture(
                &Fixture::new("example.com/fix", "go1.21")
                    .file("main.go", src)
                    .file_version("main.go", "go1.23"),
                &[&inspect::ANALYZER, &ANALYZER],
            );
        }
    }

    mod skippable {
        use super::*;

        #[test]
        fn benign_trailing_statements_are_traversed() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		go func() {
			println(v) // want "loop variable v captured by func literal"
		}()
		x := 0
		_ = x
	}
}
"#,
            );
        }

        #[test]
        fn channel_receive_breaks_the_chain() {
            check(
                r#"package p

func f(list []int, ch chan int) {
	for _, v := range list {
		go func() {
			println(v)
		}()
		<-ch
	}
}
"#,
            );
        }

        #[test]
        fn waitgroup_bookkeeping_is_skippable() {
            check(
                r#"package p

import "sync"

func f(list []int) {
	var wg sync.WaitGroup
	for _, v := range list {
		go func() {
			println(v) // want "loop variable v captured by func literal"
		}()
		wg.Add(1)
	}
	wg.Wait()
}
"#,
            );
        }

        #[test]
        fn waitgroup_wait_is_not_skippable() {
            check(
                r#"package p

import "sync"

func f(list []int) {
	var wg sync.WaitGroup
	for _, v := range list {
		go func() {
			println(v)
		}()
		wg.Wait()
	}
}
"#,
            );
        }

        #[test]
        fn division_assignment_is_not_skippable() {
            check(
                r#"package p

func f(list []int, d int) {
	x := 100
	for _, v := range list {
		go func() {
			println(v)
		}()
		x /= d
	}
	_ = x
}
"#,
            );
        }

        #[test]
        fn unlabeled_continue_is_skippable() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		go func() {
			println(v) // want "loop variable v captured by func literal"
		}()
		continue
	}
}
"#,
            );
        }
    }

    mod last_statement {
        use super::*;

        #[test]
        fn both_if_branches_are_tails() {
            check(
                r#"package p

func f(list []int, cond bool) {
	for _, v := range list {
		if cond {
			go func() {
				println(v) // want "loop variable v captured by func literal"
			}()
		} else {
			defer func() {
				println(v) // want "loop variable v captured by func literal"
			}()
		}
	}
}
"#,
            );
        }

        #[test]
        fn every_switch_case_is_a_tail() {
            check(
                r#"package p

func f(list []int, mode int) {
	for _, v := range list {
		switch mode {
		case 0:
			go func() {
				println(v) // want "loop variable v captured by func literal"
			}()
		default:
			go func() {
				println(v) // want "loop variable v captured by func literal"
			}()
		}
	}
}
"#,
            );
        }

        #[test]
        fn launch_before_the_tail_is_not_provable() {
            check(
                r#"package p

func f(list []int, ch chan int) {
	for _, v := range list {
		go func() {
			println(v)
		}()
		ch <- 1
		go func() {
			println(v) // want "loop variable v captured by func literal"
		}()
	}
}
"#,
            );
        }
    }

    mod nesting {
        use super::*;

        #[test]
        fn inner_and_outer_variables_both_flagged() {
            check(
                r#"package p

func f(outer, inner []int) {
	for _, v := range outer {
		for _, w := range inner {
			go func() {
				println(v) // want "loop variable v captured by func literal"
				println(w) // want "loop variable w captured by func literal"
			}()
		}
	}
}
"#,
            );
        }

        #[test]
        fn blocking_inner_header_resets_outer_frames() {
            check(
                r#"package p

func f(outer []int, next func() []int) {
	for _, v := range outer {
		for _, w := range next() {
			go func() {
				println(v)
				println(w) // want "loop variable w captured by func literal"
			}()
		}
	}
}
"#,
            );
        }

        #[test]
        fn inner_loop_after_blocking_statement_keeps_its_own_vars() {
            check(
                r#"package p

func f(outer, inner []int, ch chan int) {
	for _, v := range outer {
		for _, w := range inner {
			go func() {
				println(v)
				println(w) // want "loop variable w captured by func literal"
			}()
		}
		<-ch
	}
}
"#,
            );
        }

        #[test]
        fn literal_body_gets_a_fresh_stack() {
            check(
                r#"package p

func f(list []int) {
	for _, v := range list {
		handler := func() {
			for _, w := range list {
				go func() {
					println(v)
					println(w) // want "loop variable w captured by func literal"
				}()
			}
		}
		handler()
	}
}
"#,
            );
        }
    }

    mod subtests {
        use super::*;

        #[test]
        fn capture_after_parallel_is_flagged() {
            check(
                r#"package p

import "testing"

func TestAll(t *testing.T, tests []struct{ name string }) {
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			t.Parallel()
			println(tc.name) // want "loop variable tc captured by func literal"
		})
	}
}
"#,
            );
        }

        #[test]
        fn capture_before_parallel_is_safe() {
            check(
                r#"package p

import "testing"

func TestAll(t *testing.T, tests []struct{ name string }) {
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			println(tc.name)
			t.Parallel()
		})
	}
}
"#,
            );
        }

        #[test]
        fn label_resets_the_parallel_state() {
            check(
                r#"package p

import "testing"

func TestAll(t *testing.T, tests []struct{ name string }) {
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			t.Parallel()
		retry:
			println(tc.name)
			goto retry
		})
	}
}
"#,
            );
        }

        #[test]
        fn parallel_on_the_outer_context_does_not_count() {
            check(
                r#"package p

import "testing"

func TestAll(t *testing.T, tests []struct{ name string }) {
	for _, tc := range tests {
		t.Run(tc.name, func(sub *testing.T) {
			t.Parallel()
			println(tc.name)
		})
	}
}
"#,
            );
        }

        #[test]
        fn subtest_anywhere_in_the_body_is_checked() {
            check(
                r#"package p

import "testing"

func TestAll(t *testing.T, tests []struct{ name string }, ch chan int) {
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			t.Parallel()
			println(tc.name) // want "loop variable tc captured by func literal"
		})
		<-ch
	}
}
"#,
            );
        }
    }
}
