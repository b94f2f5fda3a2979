// analyzer.rs — Base analysis engine
//
// `Analyzer` is the per-invocation context of one decoration pass. It owns
// the symbol table, the function-declaration level and function-call stacks,
// and the report sink, and exposes the primitives a dialect `Decorator`
// drives: scoped registration and lookup, overload resolution, type-denoter
// resolution with alias expansion, structural expression typing, and cast
// validation.
//
// Preconditions: `program` is an undecorated tree from a parser or builder.
// Postconditions: after `decorate_ast`, resolved-symbol links, type
//   denoters, and semantic tags are written into the tree's annotation
//   fields; the return value is true iff no error report was submitted.
// Failure modes: source-level problems are reported and recovered with
//   `TypeDenoter::Error` / `SymbolRef::Error` placeholders. Engine-state
//   corruption returns `InternalFault` and aborts the pass.
// Side effects: submits reports to the sink; emits `tracing` events.

use tracing::{debug, trace};

use crate::ast::*;
use crate::config::{ShaderInput, ShaderOutput};
use crate::diag::{codes, DiagCode, DiagLevel, Diagnostic, InternalFault, ReportSink};
use crate::hlsl::HlslDecorator;
use crate::id::{DeclId, ExprId, StmtId};
use crate::intrinsics::TextureObject;
use crate::overload::{select_overload, OverloadError};
use crate::reference;
use crate::symbol_table::{
    Conflict, OverrideAction, Registered, Symbol, SymbolError, SymbolTable,
};
use crate::types::*;

// ── Public API ──────────────────────────────────────────────────────────────

/// Dialect-specific full traversal, driven by `Analyzer::decorate_ast`.
pub trait Decorator {
    fn decorate_primary(
        &mut self,
        cx: &mut Analyzer<'_>,
        input: &ShaderInput,
        output: &ShaderOutput,
    ) -> Result<(), InternalFault>;
}

/// Result of decorating a program with the HLSL decorator.
#[derive(Debug)]
pub struct DecorateResult {
    /// True iff no error-severity report was produced.
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decorate `program` in place with the HLSL decorator, collecting reports.
pub fn decorate(
    program: &mut Program,
    input: &ShaderInput,
    output: &ShaderOutput,
) -> Result<DecorateResult, InternalFault> {
    let mut diagnostics = Vec::new();
    let success = {
        let mut cx = Analyzer::new(program, &mut diagnostics);
        cx.decorate_ast(&mut HlslDecorator::new(), input, output)?
    };
    Ok(DecorateResult {
        success,
        diagnostics,
    })
}

// ── Engine state ────────────────────────────────────────────────────────────

pub struct Analyzer<'a> {
    program: &'a mut Program,
    sink: &'a mut dyn ReportSink,
    symbols: SymbolTable<DeclId>,
    error_count: usize,
    warnings_enabled: bool,
    /// Nesting depth of function declarations being traversed.
    func_decl_level: u32,
    /// Level at which the entry point was entered, while inside it.
    entry_level: Option<u32>,
    /// Calls whose arguments are being analyzed, innermost last.
    call_stack: Vec<ExprId>,
    /// Aliases currently being expanded.
    alias_stack: Vec<DeclId>,
}

impl<'a> Analyzer<'a> {
    pub fn new(program: &'a mut Program, sink: &'a mut dyn ReportSink) -> Self {
        Analyzer {
            program,
            sink,
            symbols: SymbolTable::new(),
            error_count: 0,
            warnings_enabled: true,
            func_decl_level: 0,
            entry_level: None,
            call_stack: Vec::new(),
            alias_stack: Vec::new(),
        }
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        self.program
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Run the whole pass: reference resolution, then the decorator.
    pub fn decorate_ast(
        &mut self,
        decorator: &mut dyn Decorator,
        input: &ShaderInput,
        output: &ShaderOutput,
    ) -> Result<bool, InternalFault> {
        debug!(
            entry_point = %input.entry_point,
            target = %input.shader_target,
            "decoration started"
        );
        self.warnings_enabled = output.warnings;

        self.open_scope();
        reference::resolve_references(self);
        reference::resolve_global_types(self);
        decorator.decorate_primary(self, input, output)?;
        self.close_scope()?;
        self.check_balanced()?;

        if let Some(entry) = self.program.entry_point {
            reference::mark_reachable(self.program, entry);
        }

        let success = self.error_count == 0;
        debug!(errors = self.error_count, success, "decoration finished");
        Ok(success)
    }

    fn check_balanced(&self) -> Result<(), InternalFault> {
        if self.symbols.depth() != 0 {
            return Err(InternalFault::UnbalancedState(format!(
                "{} scope(s) still open",
                self.symbols.depth()
            )));
        }
        if self.func_decl_level != 0 || self.entry_level.is_some() {
            return Err(InternalFault::UnbalancedState(format!(
                "function declaration level {}",
                self.func_decl_level
            )));
        }
        if !self.call_stack.is_empty() {
            return Err(InternalFault::UnbalancedState(format!(
                "{} function call(s) still active",
                self.call_stack.len()
            )));
        }
        Ok(())
    }

    // ── Reports ─────────────────────────────────────────────────────────────

    /// Submit a report. Warnings are dropped when the output spec disables them.
    pub fn submit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
        } else if !self.warnings_enabled {
            return;
        }
        debug!(report = %diagnostic, "report submitted");
        self.sink.submit(diagnostic);
    }

    pub fn error(&mut self, code: DiagCode, span: Span, message: impl Into<String>) {
        self.submit(Diagnostic::new(DiagLevel::Error, Some(span), message).with_code(code));
    }

    pub fn warning(&mut self, code: DiagCode, span: Span, message: impl Into<String>) {
        self.submit(Diagnostic::new(DiagLevel::Warning, Some(span), message).with_code(code));
    }

    pub fn error_undeclared_ident(&mut self, ident: &Ident) {
        self.error(
            codes::UNDECLARED_IDENT,
            ident.span,
            format!("undeclared identifier '{}'", ident.name),
        );
    }

    /// Warn when `stmt` is a lone `;` used as the body of `construct`.
    pub fn warning_on_null_stmt(&mut self, stmt: StmtId, construct: &str) {
        if matches!(self.program[stmt].kind, StmtKind::Null) {
            let span = self.program[stmt].span;
            self.warning(
                codes::NULL_STATEMENT,
                span,
                format!("{} has a null statement body", construct),
            );
        }
    }

    // ── Scopes and symbols ──────────────────────────────────────────────────

    pub fn open_scope(&mut self) {
        self.symbols.open_scope();
        trace!(depth = self.symbols.depth(), "scope opened");
    }

    pub fn close_scope(&mut self) -> Result<(), InternalFault> {
        self.symbols.close_scope()?;
        trace!(depth = self.symbols.depth(), "scope closed");
        Ok(())
    }

    /// Bind a declaration under its own name in the innermost scope.
    /// Returns false if the declaration was rejected.
    pub fn register(&mut self, decl: DeclId) -> bool {
        let program = &*self.program;
        let name = program[decl].ident.name.clone();
        let overloadable = program[decl].kind.is_overloadable();
        let outcome = self.symbols.register(&name, decl, overloadable, |conflict| {
            override_policy(program, decl, conflict)
        });
        match outcome {
            Ok(Registered::Ignored) => false,
            Ok(Registered::Bound) | Ok(Registered::Replaced(_)) => true,
            Err(SymbolError::Redefinition { name, existing }) => {
                let previous = self.program[existing].ident.span;
                let span = self.program[decl].ident.span;
                self.submit(
                    Diagnostic::new(
                        DiagLevel::Error,
                        Some(span),
                        format!("redefinition of '{}'", name),
                    )
                    .with_code(codes::REDEFINITION)
                    .with_related(previous, "previous declaration here"),
                );
                false
            }
        }
    }

    /// Silent lookup.
    pub fn lookup(&self, name: &str) -> Option<&Symbol<DeclId>> {
        self.symbols.fetch(name)
    }

    /// Lookup that reports an undeclared identifier on failure.
    pub fn fetch(&mut self, ident: &Ident) -> Option<Symbol<DeclId>> {
        let found = self.symbols.fetch(&ident.name).cloned();
        if found.is_none() {
            self.error_undeclared_ident(ident);
        }
        found
    }

    /// Resolve a name to a structure or alias declaration.
    pub fn fetch_type(&mut self, ident: &Ident) -> Option<DeclId> {
        let Some(symbol) = self.symbols.fetch(&ident.name).cloned() else {
            self.error(
                codes::UNDECLARED_TYPE,
                ident.span,
                format!("undeclared type '{}'", ident.name),
            );
            return None;
        };
        match symbol.single() {
            Some(decl)
                if matches!(
                    self.program[decl].kind,
                    DeclKind::Struct(_) | DeclKind::Alias(_)
                ) =>
            {
                Some(decl)
            }
            _ => {
                self.error(
                    codes::TYPE_MISMATCH,
                    ident.span,
                    format!("'{}' does not name a type", ident.name),
                );
                None
            }
        }
    }

    /// Overload resolution of a call to `ident` with the given argument types.
    pub fn fetch_function_decl(&mut self, ident: &Ident, args: &[TypeDenoter]) -> Option<DeclId> {
        let Some(symbol) = self.symbols.fetch(&ident.name).cloned() else {
            self.error(
                codes::NO_MATCHING_OVERLOAD,
                ident.span,
                format!("call to undeclared function '{}'", ident.name),
            );
            return None;
        };
        let functions: Vec<DeclId> = symbol
            .candidates()
            .iter()
            .copied()
            .filter(|d| self.program.function(*d).is_some())
            .collect();
        if functions.is_empty() {
            let what = self.program[symbol.candidates()[0]].kind.describe();
            self.error(
                codes::TYPE_MISMATCH,
                ident.span,
                format!("'{}' is a {}, not a function", ident.name, what),
            );
            return None;
        }
        if args.iter().any(TypeDenoter::is_error) {
            return None;
        }

        let mut candidates = Vec::with_capacity(functions.len());
        for func in functions {
            let params = self.param_types(func);
            candidates.push((func, params));
        }
        let call = format!(
            "{}({})",
            ident.name,
            args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
        match select_overload(&candidates, args) {
            Ok(decl) => Some(decl),
            Err(OverloadError::NoMatch { .. }) => {
                let listed: Vec<String> = candidates
                    .iter()
                    .map(|(d, params)| signature(self.program.name_of(*d), params))
                    .collect();
                self.submit(
                    Diagnostic::new(
                        DiagLevel::Error,
                        Some(ident.span),
                        format!("no matching overload for call to '{}'", call),
                    )
                    .with_code(codes::NO_MATCHING_OVERLOAD)
                    .with_hint(format!("candidates are: {}", listed.join(", "))),
                );
                None
            }
            Err(OverloadError::Ambiguous(tied)) => {
                let mut diag = Diagnostic::new(
                    DiagLevel::Error,
                    Some(ident.span),
                    format!("ambiguous call to overloaded function '{}'", call),
                )
                .with_code(codes::AMBIGUOUS_CALL);
                for decl in tied {
                    diag = diag.with_related(self.program[decl].span, "candidate declared here");
                }
                self.submit(diag);
                None
            }
        }
    }

    /// Resolve a name to a structure declaration, looking through aliases.
    pub fn fetch_struct_decl_from_ident(&mut self, ident: &Ident) -> Option<DeclId> {
        let decl = self.fetch_type(ident)?;
        let ty = match &self.program[decl].kind {
            DeclKind::Struct(_) => return Some(decl),
            DeclKind::Alias(_) => self.resolve_alias(decl, ident.span),
            _ => TypeDenoter::Error,
        };
        match ty {
            TypeDenoter::Struct { decl, .. } => Some(decl),
            TypeDenoter::Error => None,
            other => {
                self.error(
                    codes::TYPE_MISMATCH,
                    ident.span,
                    format!("'{}' names '{}', not a structure", ident.name, other),
                );
                None
            }
        }
    }

    /// Resolve a type denoter to the structure it names.
    pub fn fetch_struct_decl_from_type_denoter(
        &mut self,
        denoter: &TypeDenoter,
        span: Span,
    ) -> Option<DeclId> {
        match self.analyze_type_denoter(denoter, span) {
            TypeDenoter::Struct { decl, .. } => Some(decl),
            TypeDenoter::Error => None,
            other => {
                self.error(
                    codes::TYPE_MISMATCH,
                    span,
                    format!("type '{}' is not a structure", other),
                );
                None
            }
        }
    }

    // ── Function declaration and call context ───────────────────────────────

    pub fn push_function_decl_level(&mut self, is_entry_point: bool) {
        self.func_decl_level += 1;
        if is_entry_point {
            self.entry_level = Some(self.func_decl_level);
        }
        trace!(
            level = self.func_decl_level,
            is_entry_point,
            "function declaration entered"
        );
    }

    pub fn pop_function_decl_level(&mut self) -> Result<(), InternalFault> {
        if self.func_decl_level == 0 {
            return Err(InternalFault::FunctionLevelUnderflow);
        }
        match self.entry_level {
            Some(entry) if entry == self.func_decl_level => self.entry_level = None,
            Some(entry) if entry > self.func_decl_level => {
                return Err(InternalFault::EntryLevelMismatch {
                    entry,
                    current: self.func_decl_level,
                })
            }
            _ => {}
        }
        self.func_decl_level -= 1;
        trace!(level = self.func_decl_level, "function declaration left");
        Ok(())
    }

    pub fn inside_function_decl(&self) -> bool {
        self.func_decl_level > 0
    }

    pub fn inside_entry_point(&self) -> bool {
        self.entry_level.is_some()
    }

    pub fn push_function_call(&mut self, call: ExprId) {
        self.call_stack.push(call);
    }

    pub fn pop_function_call(&mut self) -> Result<(), InternalFault> {
        self.call_stack
            .pop()
            .map(|_| ())
            .ok_or(InternalFault::CallStackUnderflow)
    }

    /// The innermost call whose arguments are being analyzed.
    pub fn active_function_call(&self) -> Option<ExprId> {
        self.call_stack.last().copied()
    }

    // ── Type denoters ───────────────────────────────────────────────────────

    /// Resolve every unresolved name inside `denoter`.
    pub fn analyze_type_denoter(&mut self, denoter: &TypeDenoter, span: Span) -> TypeDenoter {
        match denoter {
            TypeDenoter::Named(name) => self.analyze_alias_type_denoter(name, span),
            TypeDenoter::Array { base, dims } => {
                let base = self.analyze_type_denoter(base, span);
                if base.is_error() {
                    TypeDenoter::Error
                } else {
                    nest_array(base, dims.clone())
                }
            }
            other => other.clone(),
        }
    }

    /// Resolve a bare type name to its structure, or expand it as an alias.
    pub fn analyze_alias_type_denoter(&mut self, name: &str, span: Span) -> TypeDenoter {
        let Some(decl) = self.symbols.fetch(name).and_then(Symbol::single) else {
            self.error(
                codes::UNDECLARED_TYPE,
                span,
                format!("undeclared type '{}'", name),
            );
            return TypeDenoter::Error;
        };
        let kind = &self.program[decl].kind;
        let describe = kind.describe();
        let is_struct = matches!(kind, DeclKind::Struct(_));
        let is_alias = matches!(kind, DeclKind::Alias(_));
        if is_struct {
            TypeDenoter::Struct {
                ident: name.to_string(),
                decl,
            }
        } else if is_alias {
            self.resolve_alias(decl, span)
        } else {
            self.error(
                codes::TYPE_MISMATCH,
                span,
                format!("'{}' is a {}, not a type", name, describe),
            );
            TypeDenoter::Error
        }
    }

    /// Expanded type of an alias declaration (memoized).
    pub fn resolve_alias(&mut self, decl: DeclId, span: Span) -> TypeDenoter {
        let DeclKind::Alias(alias) = &self.program[decl].kind else {
            return TypeDenoter::Error;
        };
        if let Some(ty) = &alias.resolved_type {
            return ty.clone();
        }
        let spec = alias.type_spec.clone();
        if self.alias_stack.contains(&decl) {
            let name = self.program.name_of(decl).to_string();
            self.error(
                codes::UNDECLARED_TYPE,
                span,
                format!("type alias '{}' refers to itself", name),
            );
            return TypeDenoter::Error;
        }
        self.alias_stack.push(decl);
        let ty = self.analyze_type_denoter(&spec.denoter, spec.span);
        self.alias_stack.pop();
        if let DeclKind::Alias(alias) = &mut self.program[decl].kind {
            alias.resolved_type = Some(ty.clone());
        }
        ty
    }

    /// Resolved type of a variable, including its array dimensions (memoized).
    pub fn resolve_var_type(&mut self, decl: DeclId) -> TypeDenoter {
        let Some(var) = self.program.var(decl) else {
            return TypeDenoter::Error;
        };
        if let Some(ty) = &var.resolved_type {
            return ty.clone();
        }
        let spec = var.type_spec.clone();
        let dim_exprs = var.array_dims.clone();

        let base = self.analyze_type_denoter(&spec.denoter, spec.span);
        let ty = if dim_exprs.is_empty() || base.is_error() {
            base
        } else {
            let dims = dim_exprs
                .iter()
                .map(|dim| dim.and_then(|e| self.const_int(e)))
                .collect();
            nest_array(base, dims)
        };
        if let Some(var) = self.program.var_mut(decl) {
            var.resolved_type = Some(ty.clone());
        }
        ty
    }

    /// Resolved return type of a function (memoized).
    pub fn resolve_function_return(&mut self, decl: DeclId) -> TypeDenoter {
        let Some(func) = self.program.function(decl) else {
            return TypeDenoter::Error;
        };
        if let Some(ty) = &func.resolved_return {
            return ty.clone();
        }
        let spec = func.return_type.clone();
        let ty = self.analyze_type_denoter(&spec.denoter, spec.span);
        if let Some(func) = self.program.function_mut(decl) {
            func.resolved_return = Some(ty.clone());
        }
        ty
    }

    /// Resolved parameter types of a function.
    pub fn param_types(&mut self, decl: DeclId) -> Vec<TypeDenoter> {
        let params = self
            .program
            .function(decl)
            .map(|f| f.params.clone())
            .unwrap_or_default();
        params.into_iter().map(|p| self.resolve_var_type(p)).collect()
    }

    /// Value of an integer constant expression, for array dimensions.
    fn const_int(&self, expr: ExprId) -> Option<u32> {
        match &self.program[expr].kind {
            ExprKind::Literal {
                kind: LiteralKind::Int | LiteralKind::UInt,
                value,
            } => value.trim_end_matches(['u', 'U']).parse().ok(),
            ExprKind::Bracket(inner) => self.const_int(*inner),
            ExprKind::Ident { ident, .. } => {
                let decl = self.symbols.fetch(&ident.name)?.single()?;
                let var = self.program.var(decl)?;
                if !var.has_storage(StorageClass::Const) {
                    return None;
                }
                self.const_int(var.initializer?)
            }
            _ => None,
        }
    }

    // ── Expression typing ───────────────────────────────────────────────────

    /// Type of an expression, computed once and memoized on the node.
    pub fn get_expr_type_denoter(&mut self, expr: ExprId) -> TypeDenoter {
        if let Some(ty) = &self.program[expr].ty {
            return ty.clone();
        }
        let ty = self.derive_expr_type(expr);
        self.program[expr].ty = Some(ty.clone());
        ty
    }

    /// Preset the memoized type of an expression.
    pub fn set_expr_type(&mut self, expr: ExprId, ty: TypeDenoter) {
        self.program[expr].ty = Some(ty);
    }

    fn derive_expr_type(&mut self, expr: ExprId) -> TypeDenoter {
        let span = self.program[expr].span;
        match self.program[expr].kind.clone() {
            ExprKind::Literal { kind, .. } => literal_type(kind),
            ExprKind::Ident { symbol, .. } => match symbol {
                SymbolRef::Decl(decl) => self.decl_value_type(decl),
                SymbolRef::Unresolved | SymbolRef::Error => TypeDenoter::Error,
            },
            ExprKind::Call(call) => match call.target {
                CallTarget::Function(decl) => self.resolve_function_return(decl),
                CallTarget::Constructor(ty) => ty,
                CallTarget::Intrinsic(_) | CallTarget::Unresolved | CallTarget::Error => {
                    TypeDenoter::Error
                }
            },
            ExprKind::Cast { type_spec, expr } => {
                let dst = self.analyze_type_denoter(&type_spec.denoter, type_spec.span);
                let src = self.get_expr_type_denoter(expr);
                self.validate_type_cast(&src, &dst, span);
                dst
            }
            ExprKind::Unary { op, expr } | ExprKind::PostUnary { op, expr } => {
                self.unary_type(op, expr, span)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let a = self.get_expr_type_denoter(lhs);
                let b = self.get_expr_type_denoter(rhs);
                self.binary_type(op, &a, &b, span)
            }
            ExprKind::Assign { op, lhs, rhs } => self.assign_type(op, lhs, rhs, span),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.ternary_type(cond, then_expr, else_expr, span),
            ExprKind::Bracket(inner) => self.get_expr_type_denoter(inner),
            ExprKind::List(items) => {
                let mut last = TypeDenoter::Error;
                for item in items {
                    last = self.get_expr_type_denoter(item);
                }
                last
            }
            ExprKind::Initializer(items) => {
                let types: Vec<TypeDenoter> =
                    items.iter().map(|i| self.get_expr_type_denoter(*i)).collect();
                match types.first() {
                    Some(first) if !first.is_error() => {
                        TypeDenoter::array(first.clone(), vec![Some(types.len() as u32)])
                    }
                    _ => TypeDenoter::Error,
                }
            }
            ExprKind::Member { base, member } => self.member_type(base, &member),
            ExprKind::Index { base, indices } => self.index_type(base, &indices, span),
        }
    }

    fn decl_value_type(&mut self, decl: DeclId) -> TypeDenoter {
        match &self.program[decl].kind {
            DeclKind::Var(_) => self.resolve_var_type(decl),
            DeclKind::Texture(t) => TypeDenoter::Texture(t.kind),
            DeclKind::Sampler(s) => TypeDenoter::Sampler(s.kind),
            _ => TypeDenoter::Error,
        }
    }

    fn unary_type(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> TypeDenoter {
        let ty = self.get_expr_type_denoter(operand);
        if ty.is_error() {
            return TypeDenoter::Error;
        }
        let Some(dt) = ty.as_base().filter(|dt| *dt != DataType::String) else {
            self.error(
                codes::TYPE_MISMATCH,
                span,
                format!("invalid operand type '{}' for unary operator '{}'", ty, op.symbol()),
            );
            return TypeDenoter::Error;
        };
        match op {
            UnaryOp::Not => TypeDenoter::Base(dt.with_scalar(ScalarType::Bool)),
            UnaryOp::BitNot if !dt.scalar_type().is_some_and(ScalarType::is_integral) => {
                self.error(
                    codes::TYPE_MISMATCH,
                    span,
                    format!("operator '~' requires an integral operand, but got '{}'", ty),
                );
                TypeDenoter::Error
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                self.check_lvalue(operand);
                ty
            }
            _ => ty,
        }
    }

    fn binary_type(&mut self, op: BinaryOp, a: &TypeDenoter, b: &TypeDenoter, span: Span) -> TypeDenoter {
        if a.is_error() || b.is_error() {
            return TypeDenoter::Error;
        }
        let common = match (a.as_base(), b.as_base()) {
            (Some(x), Some(y)) if x != DataType::String && y != DataType::String => {
                common_base_type(x, y)
            }
            _ => None,
        };
        let Some(common) = common else {
            self.error(
                codes::TYPE_MISMATCH,
                span,
                format!(
                    "invalid operand types '{}' and '{}' for binary operator '{}'",
                    a,
                    b,
                    op.symbol()
                ),
            );
            return TypeDenoter::Error;
        };
        match op.class() {
            BinaryClass::Arithmetic => TypeDenoter::Base(common),
            BinaryClass::Comparison | BinaryClass::Logical => {
                TypeDenoter::Base(common.with_scalar(ScalarType::Bool))
            }
            BinaryClass::Bitwise => {
                if common.scalar_type().is_some_and(ScalarType::is_integral) {
                    TypeDenoter::Base(common)
                } else {
                    self.error(
                        codes::TYPE_MISMATCH,
                        span,
                        format!(
                            "operator '{}' requires integral operands, but got '{}' and '{}'",
                            op.symbol(),
                            a,
                            b
                        ),
                    );
                    TypeDenoter::Error
                }
            }
        }
    }

    fn assign_type(&mut self, op: AssignOp, lhs: ExprId, rhs: ExprId, span: Span) -> TypeDenoter {
        let target = self.get_expr_type_denoter(lhs);
        let value = self.get_expr_type_denoter(rhs);
        self.check_lvalue(lhs);
        match op.binary() {
            Some(bin) => {
                self.binary_type(bin, &target, &value, span);
            }
            None => {
                self.check_implicit_conversion(&value, &target, span);
            }
        }
        target
    }

    fn ternary_type(&mut self, cond: ExprId, then_expr: ExprId, else_expr: ExprId, span: Span) -> TypeDenoter {
        let cond_ty = self.get_expr_type_denoter(cond);
        self.check_condition(&cond_ty, self.program[cond].span);
        let a = self.get_expr_type_denoter(then_expr);
        let b = self.get_expr_type_denoter(else_expr);
        if a.is_error() || b.is_error() {
            return TypeDenoter::Error;
        }
        if a == b {
            return a;
        }
        if let (Some(x), Some(y)) = (a.as_base(), b.as_base()) {
            if let Some(common) = common_base_type(x, y) {
                return TypeDenoter::Base(common);
            }
        }
        self.error(
            codes::TYPE_MISMATCH,
            span,
            format!("incompatible types '{}' and '{}' in conditional expression", a, b),
        );
        TypeDenoter::Error
    }

    fn member_type(&mut self, base: ExprId, member: &Ident) -> TypeDenoter {
        let base_ty = self.get_expr_type_denoter(base);
        match &base_ty {
            TypeDenoter::Error => TypeDenoter::Error,
            TypeDenoter::Struct { ident, decl } => match self.program.struct_member(*decl, &member.name) {
                Some(m) => self.resolve_var_type(m),
                None => {
                    self.error(
                        codes::INVALID_MEMBER,
                        member.span,
                        format!("'{}' has no member named '{}'", ident, member.name),
                    );
                    TypeDenoter::Error
                }
            },
            TypeDenoter::Base(dt) => match swizzle_type(*dt, &member.name) {
                Some(t) => TypeDenoter::Base(t),
                None => {
                    self.error(
                        codes::INVALID_MEMBER,
                        member.span,
                        format!("invalid swizzle '{}' on type '{}'", member.name, base_ty),
                    );
                    TypeDenoter::Error
                }
            },
            other => {
                self.error(
                    codes::INVALID_MEMBER,
                    member.span,
                    format!("type '{}' has no member named '{}'", other, member.name),
                );
                TypeDenoter::Error
            }
        }
    }

    fn index_type(&mut self, base: ExprId, indices: &[ExprId], span: Span) -> TypeDenoter {
        let mut ty = self.get_expr_type_denoter(base);
        let texture = self.texture_object(base);
        for index in indices {
            let index_ty = self.get_expr_type_denoter(*index);
            let scalar_index = index_ty.is_error() || index_ty.as_base().is_some_and(DataType::is_scalar);
            if texture.is_none() && !scalar_index {
                let index_span = self.program[*index].span;
                self.error(
                    codes::TYPE_MISMATCH,
                    index_span,
                    format!("subscript must be a scalar, but is '{}'", index_ty),
                );
            }
            ty = match &ty {
                TypeDenoter::Error => return TypeDenoter::Error,
                TypeDenoter::Array { .. } => ty.subscripted(1).unwrap_or(TypeDenoter::Error),
                TypeDenoter::Base(DataType::Vector(s, _)) => TypeDenoter::scalar(*s),
                TypeDenoter::Base(DataType::Matrix(s, _, cols)) => {
                    TypeDenoter::Base(DataType::vector_or_scalar(*s, *cols))
                }
                TypeDenoter::Texture(_) => match texture {
                    Some(tex) => TypeDenoter::Base(tex.element),
                    None => TypeDenoter::Error,
                },
                other => {
                    self.error(
                        codes::TYPE_MISMATCH,
                        span,
                        format!("cannot subscript a value of type '{}'", other),
                    );
                    return TypeDenoter::Error;
                }
            };
        }
        ty
    }

    /// The texture declaration an expression refers to, if any.
    pub fn texture_object(&self, expr: ExprId) -> Option<TextureObject> {
        match &self.program[expr].kind {
            ExprKind::Bracket(inner) => self.texture_object(*inner),
            ExprKind::Ident {
                symbol: SymbolRef::Decl(decl),
                ..
            } => match &self.program[*decl].kind {
                DeclKind::Texture(t) => Some(TextureObject {
                    kind: t.kind,
                    element: t.element.unwrap_or(DataType::Vector(ScalarType::Float, 4)),
                }),
                // Texture-typed parameters carry no element type; assume float4.
                DeclKind::Var(_) => match self.program.var_type(*decl) {
                    Some(TypeDenoter::Texture(kind)) => Some(TextureObject {
                        kind: *kind,
                        element: DataType::Vector(ScalarType::Float, 4),
                    }),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    // ── Validation ──────────────────────────────────────────────────────────

    /// Accept identical or convertible denoters; otherwise report and
    /// return false. The destination stays authoritative either way.
    pub fn validate_type_cast(&mut self, src: &TypeDenoter, dst: &TypeDenoter, span: Span) -> bool {
        if src.is_error() || dst.is_error() || can_cast(src, dst, &*self.program) {
            return true;
        }
        self.error(
            codes::INVALID_CAST,
            span,
            format!("invalid type cast from '{}' to '{}'", src, dst),
        );
        false
    }

    /// Check an implicit conversion (assignment, argument, return value).
    pub fn check_implicit_conversion(&mut self, from: &TypeDenoter, to: &TypeDenoter, span: Span) -> bool {
        if from.is_error() || to.is_error() {
            return true;
        }
        if !implicitly_assignable(from, to) {
            self.error(
                codes::TYPE_MISMATCH,
                span,
                format!("cannot convert from '{}' to '{}'", from, to),
            );
            return false;
        }
        if is_implicit_truncation(from, to) {
            self.warning(
                codes::IMPLICIT_TRUNCATION,
                span,
                format!("implicit truncation of vector type '{}' to '{}'", from, to),
            );
        }
        true
    }

    /// Check a variable initializer, descending into `{ ... }` lists.
    pub fn check_initializer(&mut self, target: &TypeDenoter, init: ExprId) {
        let span = self.program[init].span;
        let ExprKind::Initializer(items) = &self.program[init].kind else {
            let from = self.get_expr_type_denoter(init);
            self.check_implicit_conversion(&from, target, span);
            return;
        };
        let items = items.clone();
        let element = match target {
            TypeDenoter::Array { .. } => target.subscripted(1),
            _ => None,
        };
        for item in items {
            match &element {
                Some(el) => self.check_initializer(el, item),
                None => {
                    self.get_expr_type_denoter(item);
                }
            }
        }
    }

    /// Conditions must be scalars or vectors.
    pub fn check_condition(&mut self, ty: &TypeDenoter, span: Span) {
        let ok = ty.is_error() || ty.as_base().is_some_and(|dt| !matches!(dt, DataType::String));
        if !ok {
            self.error(
                codes::TYPE_MISMATCH,
                span,
                format!("condition must be a scalar or vector, but is '{}'", ty),
            );
        }
    }

    /// Report when `expr` cannot be assigned to. Returns true if it can.
    pub fn check_lvalue(&mut self, expr: ExprId) -> bool {
        match self.lvalue_status(expr) {
            Ok(()) => true,
            Err(None) => false,
            Err(Some(message)) => {
                let span = self.program[expr].span;
                self.error(codes::NOT_ASSIGNABLE, span, message);
                false
            }
        }
    }

    /// `Err(None)` when the root already failed and was reported.
    fn lvalue_status(&self, expr: ExprId) -> Result<(), Option<String>> {
        match &self.program[expr].kind {
            ExprKind::Bracket(inner) => self.lvalue_status(*inner),
            ExprKind::Ident { ident, symbol } => {
                let SymbolRef::Decl(decl) = symbol else {
                    return Err(None);
                };
                match &self.program[*decl].kind {
                    DeclKind::Var(v) if v.has_storage(StorageClass::Const) => Err(Some(format!(
                        "cannot assign to const variable '{}'",
                        ident.name
                    ))),
                    DeclKind::Var(_) => Ok(()),
                    DeclKind::Texture(t)
                        if matches!(t.kind, TextureKind::RWTexture2D | TextureKind::RWBuffer) =>
                    {
                        Ok(())
                    }
                    other => Err(Some(format!(
                        "cannot assign to {} '{}'",
                        other.describe(),
                        ident.name
                    ))),
                }
            }
            ExprKind::Member { base, member } => {
                let vector_base = self.program[*base]
                    .ty
                    .as_ref()
                    .and_then(TypeDenoter::as_base)
                    .is_some_and(|dt| !matches!(dt, DataType::Matrix(..)));
                if vector_base && has_repeated_components(&member.name) {
                    return Err(Some(format!(
                        "swizzle '{}' with repeated components is not assignable",
                        member.name
                    )));
                }
                self.lvalue_status(*base)
            }
            ExprKind::Index { base, .. } => self.lvalue_status(*base),
            _ => Err(Some("expression is not assignable".to_string())),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// How a new binding treats a visible one with the same name.
fn override_policy(program: &Program, new: DeclId, conflict: Conflict<DeclId>) -> OverrideAction {
    match (&program[new].kind, &program[conflict.existing].kind) {
        (DeclKind::Function(a), DeclKind::Function(b)) => {
            if !same_signature(program, a, b) {
                OverrideAction::Accept
            } else if b.is_prototype() {
                OverrideAction::Replace
            } else if a.is_prototype() {
                OverrideAction::Ignore
            } else {
                OverrideAction::Redefinition
            }
        }
        (DeclKind::Texture(a), DeclKind::Texture(b)) if conflict.same_scope && a.kind == b.kind => {
            OverrideAction::Ignore
        }
        (DeclKind::Sampler(a), DeclKind::Sampler(b)) if conflict.same_scope && a.kind == b.kind => {
            OverrideAction::Ignore
        }
        _ if conflict.same_scope => OverrideAction::Redefinition,
        _ => OverrideAction::Accept,
    }
}

/// Parameter lists compared by their written types.
fn same_signature(program: &Program, a: &FunctionDecl, b: &FunctionDecl) -> bool {
    let written = |p: &DeclId| {
        program
            .var(*p)
            .map(|v| (v.type_spec.denoter.clone(), v.array_dims.len()))
    };
    a.params.len() == b.params.len()
        && a.params.iter().map(written).eq(b.params.iter().map(written))
}

fn signature(name: &str, params: &[TypeDenoter]) -> String {
    let params: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("{}({})", name, params.join(", "))
}

fn literal_type(kind: LiteralKind) -> TypeDenoter {
    match kind {
        LiteralKind::Bool => TypeDenoter::bool(),
        LiteralKind::Int => TypeDenoter::int(),
        LiteralKind::UInt => TypeDenoter::scalar(ScalarType::UInt),
        LiteralKind::Half => TypeDenoter::scalar(ScalarType::Half),
        LiteralKind::Float => TypeDenoter::float(),
        LiteralKind::Double => TypeDenoter::scalar(ScalarType::Double),
        LiteralKind::String => TypeDenoter::Base(DataType::String),
    }
}

/// Wrap `base` in `outer` array dimensions, outermost first.
fn nest_array(base: TypeDenoter, mut outer: Vec<Option<u32>>) -> TypeDenoter {
    match base {
        TypeDenoter::Array { base, dims } => {
            outer.extend(dims);
            TypeDenoter::Array { base, dims: outer }
        }
        other => TypeDenoter::array(other, outer),
    }
}

/// Implicit conversion, extended element-wise to arrays of equal shape.
fn implicitly_assignable(from: &TypeDenoter, to: &TypeDenoter) -> bool {
    match (from, to) {
        (
            TypeDenoter::Array { base: b0, dims: d0 },
            TypeDenoter::Array { base: b1, dims: d1 },
        ) => {
            d0.len() == d1.len()
                && d0
                    .iter()
                    .zip(d1)
                    .all(|(x, y)| x.is_none() || y.is_none() || x == y)
                && implicitly_assignable(b0, b1)
        }
        _ => implicit_rank(from, to).is_some(),
    }
}

/// Result type of a swizzle or matrix member selection.
pub fn swizzle_type(dt: DataType, swizzle: &str) -> Option<DataType> {
    match dt {
        DataType::Scalar(s) | DataType::Vector(s, _) => {
            let n = match dt {
                DataType::Vector(_, n) => n as usize,
                _ => 1,
            };
            if !(1..=4).contains(&swizzle.len()) {
                return None;
            }
            let within = |set: &str| {
                swizzle
                    .chars()
                    .all(|c| set.find(c).is_some_and(|i| i < n))
            };
            (within("xyzw") || within("rgba"))
                .then(|| DataType::vector_or_scalar(s, swizzle.len() as u8))
        }
        DataType::Matrix(s, rows, cols) => {
            let count = matrix_swizzle_len(swizzle, rows, cols)?;
            Some(DataType::vector_or_scalar(s, count))
        }
        DataType::String => None,
    }
}

/// Number of elements in `_m00_m11` (zero-based) or `_11_22` (one-based).
fn matrix_swizzle_len(swizzle: &str, rows: u8, cols: u8) -> Option<u8> {
    let mut rest = swizzle;
    let mut count = 0u8;
    while !rest.is_empty() {
        let (row, col, tail) = if let Some(t) = rest.strip_prefix("_m") {
            let b = t.as_bytes();
            if b.len() < 2 {
                return None;
            }
            let row = (b[0] as char).to_digit(10)?;
            let col = (b[1] as char).to_digit(10)?;
            (row, col, &t[2..])
        } else if let Some(t) = rest.strip_prefix('_') {
            let b = t.as_bytes();
            if b.len() < 2 {
                return None;
            }
            let row = (b[0] as char).to_digit(10)?.checked_sub(1)?;
            let col = (b[1] as char).to_digit(10)?.checked_sub(1)?;
            (row, col, &t[2..])
        } else {
            return None;
        };
        if row >= rows as u32 || col >= cols as u32 {
            return None;
        }
        count += 1;
        if count > 4 {
            return None;
        }
        rest = tail;
    }
    (count > 0).then_some(count)
}

fn has_repeated_components(swizzle: &str) -> bool {
    let mut seen = [false; 256];
    swizzle.bytes().any(|b| std::mem::replace(&mut seen[b as usize], true))
}
