// reference.rs — Reference resolution pre-pass and reachability marking
//
// `resolve_references` walks the top-level statements once and binds every
// global declaration (functions, structures, aliases, variables, resources,
// constant buffers and their members) in the global scope, so uses that
// textually precede a declaration still resolve. It does not resolve uses,
// compute types, or check semantics. Block-scoped declarations are bound by
// the decorator in textual order.
//
// `resolve_global_types` then resolves the types written in those global
// declarations against the global scope alone.
//
// `mark_reachable` runs after decoration and flags every declaration the
// entry point transitively depends on.
//
// Preconditions: `resolve_references` and `resolve_global_types` run once,
//   in that order, with only the global scope open. `mark_reachable` runs on a decorated program.
// Postconditions: every global declaration has a name binding (or a
//   redefinition report); reachable declarations have `reachable == true`.
// Failure modes: redefinitions are reported through the analyzer.
// Side effects: sets `is_global` on global variables.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::analyzer::Analyzer;
use crate::ast::*;
use crate::id::{DeclId, ExprId, StmtId};
use crate::types::TypeDenoter;

// ── Pre-pass ────────────────────────────────────────────────────────────────

fn global_decls(program: &Program) -> Vec<DeclId> {
    program
        .global_stmts
        .iter()
        .filter_map(|s| match &program[*s].kind {
            StmtKind::Decl(decls) => Some(decls.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

pub fn resolve_references(cx: &mut Analyzer<'_>) {
    for decl in global_decls(cx.program()) {
        let members = match &mut cx.program_mut()[decl].kind {
            DeclKind::Var(var) => {
                var.is_global = true;
                Vec::new()
            }
            DeclKind::Buffer(buffer) => buffer.members.clone(),
            _ => Vec::new(),
        };
        cx.register(decl);
        for member in members {
            if let Some(var) = cx.program_mut().var_mut(member) {
                var.is_global = true;
            }
            cx.register(member);
        }
    }
    debug!(
        globals = cx.program().global_stmts.len(),
        "forward references registered"
    );
}

/// Resolve the type names written in global declarations (variable types,
/// function signatures, structure and buffer members, aliases) while only
/// the global scope is open. Results are memoized on the declarations.
pub fn resolve_global_types(cx: &mut Analyzer<'_>) {
    for decl in global_decls(cx.program()) {
        let vars = match &cx.program()[decl].kind {
            DeclKind::Var(_) => vec![decl],
            DeclKind::Function(func) => func.params.clone(),
            DeclKind::Struct(strukt) => strukt.members.clone(),
            DeclKind::Buffer(buffer) => buffer.members.clone(),
            DeclKind::Alias(_) | DeclKind::Texture(_) | DeclKind::Sampler(_) => Vec::new(),
        };
        let span = cx.program()[decl].span;
        cx.resolve_alias(decl, span);
        cx.resolve_function_return(decl);
        for var in vars {
            cx.resolve_var_type(var);
        }
    }
    trace!("global declaration types resolved");
}

// ── Reachability ────────────────────────────────────────────────────────────

/// Flag the entry point and everything it transitively references.
pub fn mark_reachable(program: &mut Program, entry: DeclId) {
    let owners: HashMap<DeclId, DeclId> = program
        .decls
        .iter()
        .enumerate()
        .filter_map(|(i, d)| match &d.kind {
            DeclKind::Buffer(b) => Some((DeclId::from_index(i), b.members.clone())),
            _ => None,
        })
        .flat_map(|(buffer, members)| members.into_iter().map(move |m| (m, buffer)))
        .collect();

    let mut work = vec![entry];
    while let Some(decl) = work.pop() {
        if program[decl].reachable {
            continue;
        }
        program[decl].reachable = true;
        let mut walker = Walker {
            program: &*program,
            found: Vec::new(),
        };
        walker.decl(decl);
        let found = walker.found;
        if let Some(buffer) = owners.get(&decl) {
            work.push(*buffer);
        }
        work.extend(found.into_iter().filter(|d| !program[*d].reachable));
    }
}

/// Collects the declarations one declaration refers to.
struct Walker<'p> {
    program: &'p Program,
    found: Vec<DeclId>,
}

impl Walker<'_> {
    fn ty(&mut self, ty: Option<&TypeDenoter>) {
        if let Some(strukt) = ty.and_then(|t| t.struct_decl()) {
            self.found.push(strukt);
        }
    }

    fn decl(&mut self, decl: DeclId) {
        let program = self.program;
        match &program[decl].kind {
            DeclKind::Var(var) => {
                self.ty(var.resolved_type.as_ref());
                if let Some(init) = var.initializer {
                    self.expr(init);
                }
            }
            DeclKind::Function(func) => {
                self.ty(func.resolved_return.as_ref());
                self.found.extend(func.params.iter().copied());
                if let Some(body) = func.body {
                    self.stmt(body);
                }
            }
            DeclKind::Struct(strukt) => {
                self.found.extend(strukt.base_decl);
                self.found.extend(strukt.members.iter().copied());
            }
            DeclKind::Alias(alias) => self.ty(alias.resolved_type.as_ref()),
            DeclKind::Buffer(_) | DeclKind::Texture(_) | DeclKind::Sampler(_) => {}
        }
    }

    fn stmt(&mut self, stmt: StmtId) {
        let program = self.program;
        match &program[stmt].kind {
            StmtKind::Null | StmtKind::CtrlTransfer(_) => {}
            StmtKind::CodeBlock(stmts) => stmts.iter().for_each(|s| self.stmt(*s)),
            StmtKind::Decl(decls) => {
                for d in decls {
                    self.found.push(*d);
                }
            }
            StmtKind::For {
                init,
                cond,
                iteration,
                body,
            } => {
                if let Some(init) = init {
                    self.stmt(*init);
                }
                cond.iter().chain(iteration).for_each(|e| self.expr(*e));
                self.stmt(*body);
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.expr(*cond);
                self.stmt(*body);
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.expr(*cond);
                self.stmt(*then_body);
                if let Some(e) = else_body {
                    self.stmt(*e);
                }
            }
            StmtKind::Switch { selector, cases } => {
                self.expr(*selector);
                for case in cases {
                    if let Some(label) = case.label {
                        self.expr(label);
                    }
                    case.stmts.iter().for_each(|s| self.stmt(*s));
                }
            }
            StmtKind::Expr(e) => self.expr(*e),
            StmtKind::Return { expr, .. } => {
                if let Some(e) = expr {
                    self.expr(*e);
                }
            }
        }
    }

    fn expr(&mut self, expr: ExprId) {
        let program = self.program;
        self.ty(program[expr].ty.as_ref());
        match &program[expr].kind {
            ExprKind::Literal { .. } => {}
            ExprKind::Ident { symbol, .. } => self.found.extend(symbol.decl()),
            ExprKind::Call(call) => {
                if let CallTarget::Function(f) = call.target {
                    self.found.push(f);
                }
                if let Callee::Method { object, .. } = call.callee {
                    self.expr(object);
                }
                call.args.iter().for_each(|a| self.expr(*a));
            }
            ExprKind::Cast { expr, .. }
            | ExprKind::Unary { expr, .. }
            | ExprKind::PostUnary { expr, .. }
            | ExprKind::Bracket(expr) => self.expr(*expr),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs, .. } => {
                self.expr(*lhs);
                self.expr(*rhs);
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(*cond);
                self.expr(*then_expr);
                self.expr(*else_expr);
            }
            ExprKind::List(items) | ExprKind::Initializer(items) => {
                items.iter().for_each(|e| self.expr(*e))
            }
            ExprKind::Member { base, .. } => self.expr(*base),
            ExprKind::Index { base, indices } => {
                self.expr(*base);
                indices.iter().for_each(|e| self.expr(*e));
            }
        }
    }
}
