// builder.rs — Programmatic construction of syntax trees
//
// The crate has no parser; trees come from an external front end (as JSON)
// or from this builder. Every node receives a fresh synthetic span so that
// reports point at distinct, ordered locations.
//
// Preconditions: handles passed back in came from the same builder.
// Postconditions: `finish` returns a program whose global statements are in
//   the order they were added, with every annotation field at its default.
// Failure modes: none.
// Side effects: none.

use crate::ast::*;
use crate::id::{DeclId, ExprId, StmtId};
use crate::types::{SamplerKind, TextureKind, TypeDenoter};

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    offset: usize,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn span(&mut self, len: usize) -> Span {
        let start = self.offset;
        self.offset += len.max(1) + 1;
        Span::new(start, start + len.max(1))
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        let span = self.span(name.len());
        Ident::new(name, span)
    }

    pub fn type_spec(&mut self, denoter: TypeDenoter) -> TypeSpec {
        let span = self.span(denoter.to_string().len());
        TypeSpec::new(denoter, span)
    }

    pub fn semantic(&mut self, name: &str) -> Semantic {
        Semantic {
            name: name.to_string(),
            span: self.span(name.len()),
        }
    }

    pub fn register_slot(&mut self, slot: &str) -> Register {
        Register {
            slot: slot.to_string(),
            span: self.span(slot.len()),
        }
    }

    /// Mutable access to a node added earlier.
    pub fn decl_mut(&mut self, decl: DeclId) -> &mut Decl {
        &mut self.program[decl]
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn finish(mut self) -> Program {
        self.program.span = Span::new(0, self.offset);
        self.program
    }

    // ── Expressions ─────────────────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.span(4);
        self.program.push_expr(Expr {
            kind,
            span,
            ty: None,
        })
    }

    pub fn literal(&mut self, kind: LiteralKind, value: &str) -> ExprId {
        self.expr(ExprKind::Literal {
            kind,
            value: value.to_string(),
        })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.literal(LiteralKind::Int, &value.to_string())
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.literal(LiteralKind::Float, &format!("{:?}", value))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.literal(LiteralKind::Bool, if value { "true" } else { "false" })
    }

    pub fn name(&mut self, name: &str) -> ExprId {
        let ident = self.ident(name);
        self.expr(ExprKind::Ident {
            ident,
            symbol: SymbolRef::Unresolved,
        })
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        let callee = Callee::Ident(self.ident(name));
        self.call_with(callee, args)
    }

    pub fn method_call(&mut self, object: ExprId, name: &str, args: Vec<ExprId>) -> ExprId {
        let name = self.ident(name);
        self.call_with(Callee::Method { object, name }, args)
    }

    pub fn construct(&mut self, ty: TypeDenoter, args: Vec<ExprId>) -> ExprId {
        let spec = self.type_spec(ty);
        self.call_with(Callee::Constructor(spec), args)
    }

    fn call_with(&mut self, callee: Callee, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call(FunctionCall {
            callee,
            args,
            target: CallTarget::Unresolved,
        }))
    }

    pub fn cast(&mut self, ty: TypeDenoter, expr: ExprId) -> ExprId {
        let type_spec = self.type_spec(ty);
        self.expr(ExprKind::Cast { type_spec, expr })
    }

    pub fn unary(&mut self, op: UnaryOp, expr: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, expr })
    }

    pub fn post_unary(&mut self, op: UnaryOp, expr: ExprId) -> ExprId {
        self.expr(ExprKind::PostUnary { op, expr })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn assign(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.assign_op(AssignOp::Set, lhs, rhs)
    }

    pub fn assign_op(&mut self, op: AssignOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Assign { op, lhs, rhs })
    }

    pub fn ternary(&mut self, cond: ExprId, then_expr: ExprId, else_expr: ExprId) -> ExprId {
        self.expr(ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn bracket(&mut self, inner: ExprId) -> ExprId {
        self.expr(ExprKind::Bracket(inner))
    }

    pub fn initializer(&mut self, items: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Initializer(items))
    }

    pub fn member(&mut self, base: ExprId, member: &str) -> ExprId {
        let member = self.ident(member);
        self.expr(ExprKind::Member { base, member })
    }

    pub fn index(&mut self, base: ExprId, indices: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Index { base, indices })
    }

    // ── Declarations ────────────────────────────────────────────────────────

    pub fn decl(&mut self, name: &str, kind: DeclKind) -> DeclId {
        let ident = self.ident(name);
        let span = ident.span;
        self.program.push_decl(Decl {
            ident,
            kind,
            span,
            reachable: false,
        })
    }

    pub fn var(&mut self, name: &str, ty: TypeDenoter) -> DeclId {
        self.var_with(name, ty, |_| {})
    }

    /// A variable customized by `edit` (modifiers, semantics, initializer).
    pub fn var_with(&mut self, name: &str, ty: TypeDenoter, edit: impl FnOnce(&mut VarDecl)) -> DeclId {
        let mut var = VarDecl::new(self.type_spec(ty));
        edit(&mut var);
        self.decl(name, DeclKind::Var(var))
    }

    /// A variable bound through the given semantics.
    pub fn io_var(&mut self, name: &str, ty: TypeDenoter, semantics: &[&str]) -> DeclId {
        let semantics: Vec<Semantic> = semantics.iter().map(|s| self.semantic(s)).collect();
        self.var_with(name, ty, |v| v.semantics = semantics)
    }

    pub fn function(
        &mut self,
        name: &str,
        ret: TypeDenoter,
        params: Vec<DeclId>,
        body: Option<StmtId>,
    ) -> DeclId {
        self.function_with(name, ret, params, body, |_| {})
    }

    pub fn function_with(
        &mut self,
        name: &str,
        ret: TypeDenoter,
        params: Vec<DeclId>,
        body: Option<StmtId>,
        edit: impl FnOnce(&mut FunctionDecl),
    ) -> DeclId {
        let mut func = FunctionDecl::new(self.type_spec(ret), params, body);
        edit(&mut func);
        self.decl(name, DeclKind::Function(func))
    }

    /// A function whose return value is bound through `semantic`.
    pub fn entry_function(
        &mut self,
        name: &str,
        ret: TypeDenoter,
        semantic: &str,
        params: Vec<DeclId>,
        body: StmtId,
    ) -> DeclId {
        let semantic = self.semantic(semantic);
        self.function_with(name, ret, params, Some(body), |f| {
            f.return_semantic = Some(semantic)
        })
    }

    pub fn structure(&mut self, name: &str, members: Vec<DeclId>) -> DeclId {
        self.decl(name, DeclKind::Struct(StructDecl::new(members)))
    }

    pub fn derived_structure(&mut self, name: &str, base: &str, members: Vec<DeclId>) -> DeclId {
        let mut strukt = StructDecl::new(members);
        strukt.base = Some(self.ident(base));
        self.decl(name, DeclKind::Struct(strukt))
    }

    pub fn alias(&mut self, name: &str, ty: TypeDenoter) -> DeclId {
        let type_spec = self.type_spec(ty);
        self.decl(
            name,
            DeclKind::Alias(AliasDecl {
                type_spec,
                resolved_type: None,
            }),
        )
    }

    pub fn texture(&mut self, name: &str, kind: TextureKind, register: Option<&str>) -> DeclId {
        let register = register.map(|r| self.register_slot(r));
        self.decl(
            name,
            DeclKind::Texture(TextureDecl {
                kind,
                element: None,
                register,
            }),
        )
    }

    pub fn sampler(&mut self, name: &str, kind: SamplerKind, register: Option<&str>) -> DeclId {
        let register = register.map(|r| self.register_slot(r));
        self.decl(name, DeclKind::Sampler(SamplerDecl { kind, register }))
    }

    pub fn buffer(&mut self, name: &str, members: Vec<DeclId>, register: Option<&str>) -> DeclId {
        let register = register.map(|r| self.register_slot(r));
        self.decl(name, DeclKind::Buffer(BufferDecl { members, register }))
    }

    // ── Statements ──────────────────────────────────────────────────────────

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        let span = self.span(2);
        self.program.push_stmt(Stmt { kind, span })
    }

    pub fn null(&mut self) -> StmtId {
        self.stmt(StmtKind::Null)
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::CodeBlock(stmts))
    }

    pub fn decl_stmt(&mut self, decls: Vec<DeclId>) -> StmtId {
        self.stmt(StmtKind::Decl(decls))
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn ret(&mut self, expr: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return {
            expr,
            end_of_function: false,
            in_entry_point: false,
        })
    }

    pub fn if_else(&mut self, cond: ExprId, then_body: StmtId, else_body: Option<StmtId>) -> StmtId {
        self.stmt(StmtKind::If {
            cond,
            then_body,
            else_body,
        })
    }

    pub fn for_loop(
        &mut self,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        iteration: Option<ExprId>,
        body: StmtId,
    ) -> StmtId {
        self.stmt(StmtKind::For {
            init,
            cond,
            iteration,
            body,
        })
    }

    pub fn while_loop(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn switch(&mut self, selector: ExprId, cases: Vec<SwitchCase>) -> StmtId {
        self.stmt(StmtKind::Switch { selector, cases })
    }

    pub fn ctrl(&mut self, transfer: CtrlTransfer) -> StmtId {
        self.stmt(StmtKind::CtrlTransfer(transfer))
    }

    // ── Top level ───────────────────────────────────────────────────────────

    /// Append a declaration statement to the global statement list.
    pub fn global(&mut self, decl: DeclId) -> StmtId {
        let stmt = self.decl_stmt(vec![decl]);
        self.program.global_stmts.push(stmt);
        stmt
    }

    pub fn global_stmt(&mut self, stmt: StmtId) {
        self.program.global_stmts.push(stmt);
    }
}
