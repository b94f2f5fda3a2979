// hlsl.rs — HLSL dialect decorator
//
// Full traversal of an HLSL program on top of the base analyzer. Binds
// block-scoped declarations in textual order, resolves every identifier
// and call, classifies the entry point's inputs and outputs by semantic,
// and enforces the dialect's context rules (resources only as arguments,
// `discard` only in fragment shaders, `break` only inside loops or switches).
//
// Preconditions: the reference pre-pass has bound every global declaration.
// Postconditions: every identifier has a `SymbolRef`, every call a
//   `CallTarget`, every visited expression a memoized type; the entry point
//   (if found) carries its input and output bindings.
// Failure modes: source problems are reported and recovered locally;
//   only unbalanced analyzer state escapes as `InternalFault`.
// Side effects: writes annotations into the program; submits reports.

use tracing::debug;

use crate::analyzer::{Analyzer, Decorator};
use crate::ast::*;
use crate::config::{InputShaderVersion, ShaderInput, ShaderModel, ShaderOutput, ShaderTarget};
use crate::diag::{codes, DiagLevel, Diagnostic, InternalFault};
use crate::id::{DeclId, ExprId, StmtId};
use crate::intrinsics::{self, IntrinsicEntry, TextureObject};
use crate::semantic::{legacy_system_value, parse_semantic, IndexedSemantic, IoDirection, SystemValue};
use crate::types::{DataType, TextureKind, TypeDenoter};

/// Statement a `break` or `continue` may leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Breakable {
    Loop,
    Switch,
}

/// Entry-point bindings collected while walking parameters and members.
#[derive(Debug, Default)]
struct Bindings {
    inputs: Vec<EntryBinding>,
    outputs: Vec<EntryBinding>,
}

impl Bindings {
    fn list_mut(&mut self, direction: IoDirection) -> &mut Vec<EntryBinding> {
        match direction {
            IoDirection::Input => &mut self.inputs,
            IoDirection::Output => &mut self.outputs,
        }
    }
}

pub struct HlslDecorator {
    target: ShaderTarget,
    version: InputShaderVersion,
    model: ShaderModel,
    entry: Option<DeclId>,
    /// Enclosing function declarations.
    functions: Vec<DeclId>,
    breakables: Vec<Breakable>,
    /// Index bases currently being visited; a resource is allowed there.
    resource_slots: Vec<ExprId>,
    /// Structures being flattened into entry-point bindings.
    struct_stack: Vec<DeclId>,
}

impl Default for HlslDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for HlslDecorator {
    fn decorate_primary(
        &mut self,
        cx: &mut Analyzer<'_>,
        input: &ShaderInput,
        _output: &ShaderOutput,
    ) -> Result<(), InternalFault> {
        self.target = input.shader_target;
        self.version = input.shader_version;
        self.model = input.shader_model;
        self.entry = self.find_entry_point(cx, &input.entry_point);

        for stmt in cx.program().global_stmts.clone() {
            let decls = match &cx.program()[stmt].kind {
                StmtKind::Decl(decls) => Some(decls.clone()),
                _ => None,
            };
            match decls {
                Some(decls) => {
                    for decl in decls {
                        self.visit_decl(cx, decl, true)?;
                    }
                }
                None => self.visit_stmt(cx, stmt)?,
            }
        }
        Ok(())
    }
}

impl HlslDecorator {
    pub fn new() -> Self {
        HlslDecorator {
            target: ShaderTarget::Vertex,
            version: InputShaderVersion::Hlsl5,
            model: ShaderModel::default(),
            entry: None,
            functions: Vec::new(),
            breakables: Vec::new(),
            resource_slots: Vec::new(),
            struct_stack: Vec::new(),
        }
    }

    /// The unique function definition named `name`.
    fn find_entry_point(&mut self, cx: &mut Analyzer<'_>, name: &str) -> Option<DeclId> {
        let program = cx.program();
        let definitions: Vec<DeclId> = cx
            .lookup(name)
            .map(|symbol| symbol.candidates().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|d| program.function(*d).is_some_and(|f| !f.is_prototype()))
            .collect();
        match definitions.as_slice() {
            [entry] => {
                debug!(entry_point = name, decl = %entry, "entry point selected");
                Some(*entry)
            }
            [] => {
                let span = cx.program().span;
                cx.error(
                    codes::ENTRY_POINT_NOT_FOUND,
                    span,
                    format!("entry point '{}' not found", name),
                );
                None
            }
            [first, ..] => {
                let span = cx.program()[*first].ident.span;
                cx.error(
                    codes::ENTRY_POINT_NOT_FOUND,
                    span,
                    format!("entry point '{}' is ambiguous: it has several overloads", name),
                );
                None
            }
        }
    }

    // ── Declarations ────────────────────────────────────────────────────────

    fn visit_decl(&mut self, cx: &mut Analyzer<'_>, decl: DeclId, global: bool) -> Result<(), InternalFault> {
        match cx.program()[decl].kind.clone() {
            DeclKind::Var(var) => self.visit_var_decl(cx, decl, var, global)?,
            DeclKind::Function(func) => self.visit_function_decl(cx, decl, func, global)?,
            DeclKind::Struct(strukt) => self.visit_struct_decl(cx, decl, strukt, global),
            DeclKind::Alias(_) => {
                let span = cx.program()[decl].span;
                cx.resolve_alias(decl, span);
                if !global {
                    cx.register(decl);
                }
            }
            DeclKind::Texture(texture) => {
                self.require_global(cx, decl, global);
                if let Some(register) = &texture.register {
                    let prefix = match texture.kind {
                        TextureKind::RWTexture2D | TextureKind::RWBuffer => 'u',
                        _ => 't',
                    };
                    check_register(cx, register, prefix, "a texture");
                }
                if !global {
                    cx.register(decl);
                }
            }
            DeclKind::Sampler(sampler) => {
                if let Some(register) = &sampler.register {
                    check_register(cx, register, 's', "a sampler");
                }
                if !global {
                    cx.register(decl);
                }
            }
            DeclKind::Buffer(buffer) => {
                self.require_global(cx, decl, global);
                if let Some(register) = &buffer.register {
                    check_register(cx, register, 'b', "a constant buffer");
                }
                for member in buffer.members {
                    let ty = cx.resolve_var_type(member);
                    reject_void(cx, member, &ty);
                }
                if !global {
                    cx.register(decl);
                }
            }
        }
        Ok(())
    }

    fn require_global(&self, cx: &mut Analyzer<'_>, decl: DeclId, global: bool) {
        if !global {
            let d = &cx.program()[decl];
            let message = format!("{} '{}' must be declared at global scope", d.kind.describe(), d.ident.name);
            let span = d.ident.span;
            cx.error(codes::INVALID_CONTEXT, span, message);
        }
    }

    fn visit_var_decl(
        &mut self,
        cx: &mut Analyzer<'_>,
        decl: DeclId,
        var: VarDecl,
        global: bool,
    ) -> Result<(), InternalFault> {
        for dim in var.array_dims.iter().flatten() {
            self.visit_expr(cx, *dim)?;
        }
        let ty = cx.resolve_var_type(decl);
        reject_void(cx, decl, &ty);
        if let Some(init) = var.initializer {
            self.visit_expr(cx, init)?;
            cx.check_initializer(&ty, init);
        }
        if !global {
            cx.register(decl);
        }
        Ok(())
    }

    fn visit_function_decl(
        &mut self,
        cx: &mut Analyzer<'_>,
        decl: DeclId,
        func: FunctionDecl,
        global: bool,
    ) -> Result<(), InternalFault> {
        if !global || cx.inside_function_decl() {
            let ident = cx.program()[decl].ident.clone();
            cx.error(
                codes::INVALID_CONTEXT,
                ident.span,
                format!("function '{}' cannot be declared inside another function", ident.name),
            );
            return Ok(());
        }
        let is_entry = self.entry == Some(decl);
        cx.resolve_function_return(decl);

        cx.push_function_decl_level(is_entry);
        self.functions.push(decl);
        cx.open_scope();

        for param in &func.params {
            self.visit_param(cx, *param)?;
        }
        if is_entry {
            self.decorate_entry_point(cx, decl);
        }
        if let Some(body) = func.body {
            let outer = std::mem::take(&mut self.breakables);
            self.visit_stmt(cx, body)?;
            self.breakables = outer;
            self.analyze_end_of_scopes(cx, decl, body);
        }

        cx.close_scope()?;
        self.functions.pop();
        cx.pop_function_decl_level()
    }

    fn visit_param(&mut self, cx: &mut Analyzer<'_>, param: DeclId) -> Result<(), InternalFault> {
        let ty = cx.resolve_var_type(param);
        reject_void(cx, param, &ty);
        let default = cx.program().var(param).and_then(|v| v.initializer);
        if let Some(init) = default {
            self.visit_expr(cx, init)?;
            cx.check_initializer(&ty, init);
        }
        cx.register(param);
        Ok(())
    }

    fn visit_struct_decl(&mut self, cx: &mut Analyzer<'_>, decl: DeclId, strukt: StructDecl, global: bool) {
        let name = cx.program().name_of(decl).to_string();
        if let Some(base) = &strukt.base {
            match cx.fetch_struct_decl_from_ident(base) {
                Some(found) if found == decl => {
                    cx.error(
                        codes::TYPE_MISMATCH,
                        base.span,
                        format!("structure '{}' cannot inherit from itself", name),
                    );
                }
                Some(found) => {
                    if let Some(s) = cx.program_mut().struct_decl_mut(decl) {
                        s.base_decl = Some(found);
                    }
                }
                None => {}
            }
        }

        let mut seen: Vec<(String, DeclId)> = match cx.program().struct_decl(decl).and_then(|s| s.base_decl) {
            Some(base) => cx
                .program()
                .all_struct_members(base)
                .into_iter()
                .map(|m| (cx.program().name_of(m).to_string(), m))
                .collect(),
            None => Vec::new(),
        };
        for member in strukt.members {
            let ty = cx.resolve_var_type(member);
            reject_void(cx, member, &ty);
            let ident = cx.program()[member].ident.clone();
            if ty.struct_decl() == Some(decl) {
                cx.error(
                    codes::TYPE_MISMATCH,
                    ident.span,
                    format!("structure '{}' cannot contain itself", name),
                );
            }
            match seen.iter().find(|(n, _)| *n == ident.name) {
                Some((_, previous)) => {
                    let previous = cx.program()[*previous].ident.span;
                    cx.submit(
                        Diagnostic::new(
                            DiagLevel::Error,
                            Some(ident.span),
                            format!("duplicate member '{}' in structure '{}'", ident.name, name),
                        )
                        .with_code(codes::DUPLICATE_MEMBER)
                        .with_related(previous, "previous member here"),
                    );
                }
                None => seen.push((ident.name, member)),
            }
        }
        if !global {
            cx.register(decl);
        }
    }

    // ── Entry point ─────────────────────────────────────────────────────────

    fn decorate_entry_point(&mut self, cx: &mut Analyzer<'_>, func: DeclId) {
        debug!(entry_point = cx.program().name_of(func), "decorating entry point");
        let mut bindings = Bindings::default();
        let params = cx.program().function(func).map(|f| f.params.clone()).unwrap_or_default();

        for param in params {
            let Some(var) = cx.program().var(param) else {
                continue;
            };
            if var.has_storage(StorageClass::Uniform) {
                continue;
            }
            let modifier = var.modifier;
            if modifier.is_input() {
                self.decorate_entry_var(cx, param, IoDirection::Input, None, &mut bindings);
            }
            if modifier.is_output() {
                self.decorate_entry_var(cx, param, IoDirection::Output, None, &mut bindings);
            }
        }

        let ret = cx.resolve_function_return(func);
        let span = cx.program()[func].ident.span;
        match ret.struct_decl() {
            Some(strukt) => self.decorate_entry_struct(cx, strukt, IoDirection::Output, span, &mut bindings),
            None if ret.is_void() || ret.is_error() => {}
            None => self.decorate_return_semantic(cx, func, &mut bindings),
        }

        let writes_position = bindings
            .outputs
            .iter()
            .any(|b| b.semantic.as_system_value() == Some(SystemValue::Position));
        let name = cx.program().name_of(func).to_string();
        let program = cx.program_mut();
        program.entry_point = Some(func);
        if let Some(f) = program.function_mut(func) {
            f.is_entry_point = true;
            f.entry_inputs = bindings.inputs;
            f.entry_outputs = bindings.outputs;
        }
        if self.target == ShaderTarget::Vertex && !writes_position {
            cx.warning(
                codes::MISSING_POSITION_OUTPUT,
                span,
                format!("vertex shader entry point '{}' does not write SV_Position", name),
            );
        }
    }

    fn decorate_entry_var(
        &mut self,
        cx: &mut Analyzer<'_>,
        var: DeclId,
        direction: IoDirection,
        parent: Option<DeclId>,
        bindings: &mut Bindings,
    ) {
        let ty = cx.resolve_var_type(var);
        if let Some(v) = cx.program_mut().var_mut(var) {
            match direction {
                IoDirection::Input => v.io.input = true,
                IoDirection::Output => v.io.output = true,
            }
        }
        let span = cx.program()[var].ident.span;
        let element = match &ty {
            TypeDenoter::Array { base, .. } => base.as_ref(),
            other => other,
        };
        match element {
            TypeDenoter::Error | TypeDenoter::Texture(_) | TypeDenoter::Sampler(_) => return,
            TypeDenoter::Struct { .. } => {
                if let Some(strukt) = cx.fetch_struct_decl_from_type_denoter(element, span) {
                    self.decorate_entry_struct(cx, strukt, direction, span, bindings);
                }
                return;
            }
            _ => {}
        }

        let first_visit = analyze_semantics(cx, var);
        let Some(semantic) = cx
            .program()
            .var(var)
            .and_then(VarDecl::binding_semantic)
            .cloned()
        else {
            if first_visit {
                let name = cx.program().name_of(var).to_string();
                cx.error(
                    codes::MISSING_SEMANTIC,
                    span,
                    format!("missing semantic for entry point {} '{}'", direction, name),
                );
            }
            return;
        };
        let semantic = self.effective_semantic(semantic, direction);
        if let (Some(parent), true) = (parent, semantic.is_system_value()) {
            if let Some(s) = cx.program_mut().struct_decl_mut(parent) {
                if !s.system_value_members.contains(&var) {
                    s.system_value_members.push(var);
                }
            }
        }
        self.bind(cx, Some(var), semantic, direction, span, bindings);
    }

    fn decorate_entry_struct(
        &mut self,
        cx: &mut Analyzer<'_>,
        strukt: DeclId,
        direction: IoDirection,
        span: Span,
        bindings: &mut Bindings,
    ) {
        if self.struct_stack.contains(&strukt) {
            let name = cx.program().name_of(strukt).to_string();
            cx.error(
                codes::INVALID_ENTRY_PARAM,
                span,
                format!("recursive structure '{}' in entry point interface", name),
            );
            return;
        }
        if let Some(s) = cx.program_mut().struct_decl_mut(strukt) {
            match direction {
                IoDirection::Input => s.io.input = true,
                IoDirection::Output => s.io.output = true,
            }
        }
        self.struct_stack.push(strukt);
        for member in cx.program().all_struct_members(strukt) {
            self.decorate_entry_var(cx, member, direction, Some(strukt), bindings);
        }
        self.struct_stack.pop();
    }

    fn decorate_return_semantic(&mut self, cx: &mut Analyzer<'_>, func: DeclId, bindings: &mut Bindings) {
        let span = cx.program()[func].ident.span;
        let Some(written) = cx.program().function(func).and_then(|f| f.return_semantic.clone()) else {
            let name = cx.program().name_of(func).to_string();
            cx.error(
                codes::MISSING_SEMANTIC,
                span,
                format!("missing semantic for return value of entry point '{}'", name),
            );
            return;
        };
        let parsed = match parse_semantic(&written.name) {
            Ok(parsed) => parsed,
            Err(e) => {
                cx.error(codes::INVALID_SYSTEM_VALUE, written.span, e.to_string());
                return;
            }
        };
        if let Some(f) = cx.program_mut().function_mut(func) {
            if parsed.is_system_value() {
                f.return_system_semantic = Some(parsed.clone());
            } else {
                f.return_user_semantic = Some(parsed.clone());
            }
        }
        let semantic = self.effective_semantic(parsed, IoDirection::Output);
        self.bind(cx, None, semantic, IoDirection::Output, written.span, bindings);
    }

    /// Legacy names act as system values in HLSL 3 sources.
    fn effective_semantic(&self, semantic: IndexedSemantic, direction: IoDirection) -> IndexedSemantic {
        if self.version != InputShaderVersion::Hlsl3 {
            return semantic;
        }
        match legacy_system_value(&semantic, self.target, direction) {
            Some(sv) => IndexedSemantic::system_value(sv, semantic.index),
            None => semantic,
        }
    }

    /// Check stage legality and uniqueness, then record the binding.
    fn bind(
        &self,
        cx: &mut Analyzer<'_>,
        decl: Option<DeclId>,
        semantic: IndexedSemantic,
        direction: IoDirection,
        span: Span,
        bindings: &mut Bindings,
    ) {
        if let Some(sv) = semantic.as_system_value() {
            if !sv.is_valid_for(self.target, direction) {
                cx.error(
                    codes::INVALID_SYSTEM_VALUE,
                    span,
                    format!(
                        "semantic '{}' is not valid as {} {}",
                        semantic, self.target, direction
                    ),
                );
                return;
            }
        }
        let list = bindings.list_mut(direction);
        match list.iter().find(|b| b.semantic == semantic) {
            Some(previous) => {
                let previous_span = match previous.decl {
                    Some(d) => cx.program()[d].ident.span,
                    None => span,
                };
                cx.submit(
                    Diagnostic::new(
                        DiagLevel::Error,
                        Some(span),
                        format!("duplicate {} semantic '{}'", direction, semantic),
                    )
                    .with_code(codes::DUPLICATE_BINDING)
                    .with_related(previous_span, "first bound here"),
                );
            }
            None => list.push(EntryBinding { decl, semantic }),
        }
    }

    // ── Statements ──────────────────────────────────────────────────────────

    fn visit_stmt(&mut self, cx: &mut Analyzer<'_>, stmt: StmtId) -> Result<(), InternalFault> {
        let span = cx.program()[stmt].span;
        match cx.program()[stmt].kind.clone() {
            StmtKind::Null => {}
            StmtKind::CodeBlock(stmts) => {
                cx.open_scope();
                for s in stmts {
                    self.visit_stmt(cx, s)?;
                }
                cx.close_scope()?;
            }
            StmtKind::Decl(decls) => {
                for decl in decls {
                    self.visit_decl(cx, decl, false)?;
                }
            }
            StmtKind::For {
                init,
                cond,
                iteration,
                body,
            } => {
                cx.open_scope();
                if let Some(init) = init {
                    self.visit_stmt(cx, init)?;
                }
                if let Some(cond) = cond {
                    self.visit_condition(cx, cond)?;
                }
                if let Some(iteration) = iteration {
                    self.visit_expr(cx, iteration)?;
                }
                cx.warning_on_null_stmt(body, "for loop");
                self.visit_body(cx, body, Breakable::Loop)?;
                cx.close_scope()?;
            }
            StmtKind::While { cond, body } => {
                self.visit_condition(cx, cond)?;
                cx.warning_on_null_stmt(body, "while loop");
                self.visit_body(cx, body, Breakable::Loop)?;
            }
            StmtKind::DoWhile { body, cond } => {
                self.visit_body(cx, body, Breakable::Loop)?;
                self.visit_condition(cx, cond)?;
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.visit_condition(cx, cond)?;
                cx.warning_on_null_stmt(then_body, "if statement");
                self.visit_stmt(cx, then_body)?;
                if let Some(else_body) = else_body {
                    cx.warning_on_null_stmt(else_body, "else statement");
                    self.visit_stmt(cx, else_body)?;
                }
            }
            StmtKind::Switch { selector, cases } => {
                self.visit_expr(cx, selector)?;
                let ty = cx.get_expr_type_denoter(selector);
                let integral = ty.is_error()
                    || matches!(ty.as_base(), Some(DataType::Scalar(s)) if s.is_integral());
                if !integral {
                    let selector_span = cx.program()[selector].span;
                    cx.error(
                        codes::TYPE_MISMATCH,
                        selector_span,
                        format!("switch selector must be an integral scalar, but is '{}'", ty),
                    );
                }
                cx.open_scope();
                self.breakables.push(Breakable::Switch);
                for case in cases {
                    if let Some(label) = case.label {
                        self.visit_expr(cx, label)?;
                    }
                    for s in case.stmts {
                        self.visit_stmt(cx, s)?;
                    }
                }
                self.breakables.pop();
                cx.close_scope()?;
            }
            StmtKind::Expr(expr) => {
                self.visit_expr(cx, expr)?;
                let ty = cx.get_expr_type_denoter(expr);
                if !ty.is_error() && !has_side_effects(cx.program(), expr) {
                    cx.warning(codes::NO_EFFECT, span, "expression statement has no effect");
                }
            }
            StmtKind::Return { expr, .. } => self.visit_return(cx, stmt, expr)?,
            StmtKind::CtrlTransfer(transfer) => self.visit_ctrl_transfer(cx, transfer, span),
        }
        Ok(())
    }

    fn visit_body(&mut self, cx: &mut Analyzer<'_>, body: StmtId, kind: Breakable) -> Result<(), InternalFault> {
        self.breakables.push(kind);
        let result = self.visit_stmt(cx, body);
        self.breakables.pop();
        result
    }

    fn visit_condition(&mut self, cx: &mut Analyzer<'_>, cond: ExprId) -> Result<(), InternalFault> {
        self.visit_expr(cx, cond)?;
        let ty = cx.get_expr_type_denoter(cond);
        let span = cx.program()[cond].span;
        cx.check_condition(&ty, span);
        Ok(())
    }

    fn visit_return(&mut self, cx: &mut Analyzer<'_>, stmt: StmtId, expr: Option<ExprId>) -> Result<(), InternalFault> {
        if let Some(e) = expr {
            self.visit_expr(cx, e)?;
        }
        let span = cx.program()[stmt].span;
        let Some(&func) = self.functions.last() else {
            cx.error(codes::INVALID_CONTEXT, span, "return statement outside of a function");
            return Ok(());
        };
        let ret = cx.resolve_function_return(func);
        let name = cx.program().name_of(func).to_string();
        match expr {
            Some(e) => {
                let ty = cx.get_expr_type_denoter(e);
                let expr_span = cx.program()[e].span;
                if ret.is_void() {
                    if !ty.is_error() && !ty.is_void() {
                        cx.error(
                            codes::TYPE_MISMATCH,
                            expr_span,
                            format!("void function '{}' must not return a value", name),
                        );
                    }
                } else {
                    cx.check_implicit_conversion(&ty, &ret, expr_span);
                }
            }
            None if !ret.is_void() && !ret.is_error() => {
                cx.error(
                    codes::TYPE_MISMATCH,
                    span,
                    format!("function '{}' must return a value of type '{}'", name, ret),
                );
            }
            None => {}
        }
        let in_entry = cx.inside_entry_point();
        if let StmtKind::Return { in_entry_point, .. } = &mut cx.program_mut()[stmt].kind {
            *in_entry_point = in_entry;
        }
        Ok(())
    }

    fn visit_ctrl_transfer(&mut self, cx: &mut Analyzer<'_>, transfer: CtrlTransfer, span: Span) {
        match transfer {
            CtrlTransfer::Break if self.breakables.is_empty() => {
                cx.error(codes::INVALID_CONTEXT, span, "'break' outside of a loop or switch");
            }
            CtrlTransfer::Continue if !self.breakables.contains(&Breakable::Loop) => {
                cx.error(codes::INVALID_CONTEXT, span, "'continue' outside of a loop");
            }
            CtrlTransfer::Discard if self.target != ShaderTarget::Fragment => {
                cx.error(
                    codes::INVALID_CONTEXT,
                    span,
                    format!("'discard' is not allowed in a {}", self.target),
                );
            }
            _ => {}
        }
    }

    /// Tag terminal returns and require a return on every path of a
    /// value-returning function.
    fn analyze_end_of_scopes(&mut self, cx: &mut Analyzer<'_>, func: DeclId, body: StmtId) {
        mark_end_of_function(cx.program_mut(), body);
        let ret = cx.resolve_function_return(func);
        if ret.is_void() || ret.is_error() || stmt_returns(cx.program(), body) {
            return;
        }
        let ident = cx.program()[func].ident.clone();
        cx.error(
            codes::MISSING_RETURN,
            ident.span,
            format!("not all control paths of '{}' return a value", ident.name),
        );
    }

    // ── Expressions ─────────────────────────────────────────────────────────

    fn visit_expr(&mut self, cx: &mut Analyzer<'_>, expr: ExprId) -> Result<(), InternalFault> {
        match cx.program()[expr].kind.clone() {
            ExprKind::Literal { .. } => {}
            ExprKind::Ident { ident, .. } => self.visit_ident(cx, expr, &ident),
            ExprKind::Call(call) => self.visit_call(cx, expr, call)?,
            ExprKind::Cast { expr: inner, .. }
            | ExprKind::Unary { expr: inner, .. }
            | ExprKind::PostUnary { expr: inner, .. }
            | ExprKind::Bracket(inner) => self.visit_expr(cx, inner)?,
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs, .. } => {
                self.visit_expr(cx, lhs)?;
                self.visit_expr(cx, rhs)?;
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cx, cond)?;
                self.visit_expr(cx, then_expr)?;
                self.visit_expr(cx, else_expr)?;
            }
            ExprKind::List(items) | ExprKind::Initializer(items) => {
                for item in items {
                    self.visit_expr(cx, item)?;
                }
            }
            ExprKind::Member { base, .. } => self.visit_expr(cx, base)?,
            ExprKind::Index { base, indices } => {
                self.resource_slots.push(base);
                let visited = self.visit_expr(cx, base);
                self.resource_slots.pop();
                visited?;
                for index in indices {
                    self.visit_expr(cx, index)?;
                }
            }
        }
        cx.get_expr_type_denoter(expr);
        Ok(())
    }

    fn visit_ident(&mut self, cx: &mut Analyzer<'_>, expr: ExprId, ident: &Ident) {
        let Some(symbol) = cx.fetch(ident) else {
            set_symbol(cx, expr, SymbolRef::Error);
            cx.set_expr_type(expr, TypeDenoter::Error);
            return;
        };
        let decl = symbol.candidates()[0];
        set_symbol(cx, expr, SymbolRef::Decl(decl));

        let misuse = match &cx.program()[decl].kind {
            DeclKind::Var(_) => None,
            DeclKind::Function(_) => Some((
                codes::TYPE_MISMATCH,
                format!("function '{}' cannot be used as a value", ident.name),
            )),
            DeclKind::Struct(_) | DeclKind::Alias(_) => Some((
                codes::TYPE_MISMATCH,
                format!("type name '{}' cannot be used as a value", ident.name),
            )),
            DeclKind::Buffer(_) => Some((
                codes::TYPE_MISMATCH,
                format!("constant buffer '{}' cannot be used as a value", ident.name),
            )),
            kind @ (DeclKind::Texture(_) | DeclKind::Sampler(_)) => {
                if self.resource_operand(cx, expr) {
                    None
                } else {
                    Some((
                        codes::RESOURCE_MISUSE,
                        format!(
                            "{} '{}' can only be used as a function argument or method object",
                            kind.describe(),
                            ident.name
                        ),
                    ))
                }
            }
        };
        if let Some((code, message)) = misuse {
            cx.error(code, ident.span, message);
            cx.set_expr_type(expr, TypeDenoter::Error);
        }
    }

    /// Whether `expr` sits where a texture or sampler may appear.
    fn resource_operand(&self, cx: &Analyzer<'_>, expr: ExprId) -> bool {
        let program = cx.program();
        let is_expr = |slot: ExprId| unbracket(program, slot) == expr;
        if self.resource_slots.last().is_some_and(|slot| is_expr(*slot)) {
            return true;
        }
        cx.active_function_call()
            .is_some_and(|call| match &program[call].kind {
                ExprKind::Call(c) => {
                    c.args.iter().any(|arg| is_expr(*arg))
                        || matches!(c.callee, Callee::Method { object, .. } if is_expr(object))
                }
                _ => false,
            })
    }

    fn visit_call(&mut self, cx: &mut Analyzer<'_>, expr: ExprId, call: FunctionCall) -> Result<(), InternalFault> {
        cx.push_function_call(expr);
        if let Callee::Method { object, .. } = &call.callee {
            self.visit_expr(cx, *object)?;
        }
        for arg in &call.args {
            self.visit_expr(cx, *arg)?;
        }
        cx.pop_function_call()?;

        let args: Vec<TypeDenoter> = call
            .args
            .iter()
            .map(|a| cx.get_expr_type_denoter(*a))
            .collect();
        let span = cx.program()[expr].span;
        let (target, ty) = match &call.callee {
            Callee::Constructor(spec) => self.resolve_constructor(cx, spec, &args, span),
            Callee::Ident(ident) => self.resolve_named_call(cx, ident, &call.args, &args),
            Callee::Method { object, name } => self.resolve_method_call(cx, *object, name, &call.args, &args),
        };
        if let ExprKind::Call(c) = &mut cx.program_mut()[expr].kind {
            c.target = target;
        }
        cx.set_expr_type(expr, ty);
        Ok(())
    }

    fn resolve_named_call(
        &mut self,
        cx: &mut Analyzer<'_>,
        ident: &Ident,
        arg_exprs: &[ExprId],
        args: &[TypeDenoter],
    ) -> (CallTarget, TypeDenoter) {
        let program = cx.program();
        let user_function = cx
            .lookup(&ident.name)
            .is_some_and(|s| s.candidates().iter().any(|d| program.function(*d).is_some()));
        if !user_function {
            if let Some(entry) = intrinsics::lookup(&ident.name) {
                return self.resolve_intrinsic(cx, entry, ident.span, arg_exprs, args, None);
            }
        }
        match cx.fetch_function_decl(ident, args) {
            Some(func) => {
                let params = cx.program().function(func).map(|f| f.params.clone()).unwrap_or_default();
                for (param, arg) in params.iter().zip(arg_exprs) {
                    let writes = cx.program().var(*param).is_some_and(|v| v.modifier.is_output());
                    if writes {
                        cx.check_lvalue(*arg);
                    }
                }
                (CallTarget::Function(func), cx.resolve_function_return(func))
            }
            None => (CallTarget::Error, TypeDenoter::Error),
        }
    }

    fn resolve_method_call(
        &mut self,
        cx: &mut Analyzer<'_>,
        object: ExprId,
        name: &Ident,
        arg_exprs: &[ExprId],
        args: &[TypeDenoter],
    ) -> (CallTarget, TypeDenoter) {
        let object_ty = cx.get_expr_type_denoter(object);
        if object_ty.is_error() {
            return (CallTarget::Error, TypeDenoter::Error);
        }
        let Some(texture) = cx.texture_object(object) else {
            cx.error(
                codes::INVALID_MEMBER,
                name.span,
                format!("type '{}' has no method '{}'", object_ty, name.name),
            );
            return (CallTarget::Error, TypeDenoter::Error);
        };
        let Some(entry) = intrinsics::lookup_method(&name.name) else {
            cx.error(
                codes::INVALID_MEMBER,
                name.span,
                format!("'{}' has no method '{}'", texture.kind.name(), name.name),
            );
            return (CallTarget::Error, TypeDenoter::Error);
        };
        self.resolve_intrinsic(cx, entry, name.span, arg_exprs, args, Some(texture))
    }

    fn resolve_intrinsic(
        &mut self,
        cx: &mut Analyzer<'_>,
        entry: &IntrinsicEntry,
        span: Span,
        arg_exprs: &[ExprId],
        args: &[TypeDenoter],
        object: Option<TextureObject>,
    ) -> (CallTarget, TypeDenoter) {
        if self.model < entry.min_model {
            cx.error(
                codes::SHADER_MODEL,
                span,
                format!(
                    "intrinsic '{}' requires shader model {} or higher, but the target is {}",
                    entry.name, entry.min_model, self.model
                ),
            );
        }
        match entry.check_call(args, object) {
            Ok(ty) => {
                for (i, arg) in arg_exprs.iter().enumerate() {
                    if entry.class_of(i).is_some_and(|c| c.is_output()) {
                        cx.check_lvalue(*arg);
                    }
                }
                (CallTarget::Intrinsic(entry.intrinsic), ty)
            }
            Err(e) => {
                cx.error(codes::INTRINSIC_ARGS, span, e.to_string());
                (CallTarget::Error, TypeDenoter::Error)
            }
        }
    }

    fn resolve_constructor(
        &mut self,
        cx: &mut Analyzer<'_>,
        spec: &TypeSpec,
        args: &[TypeDenoter],
        span: Span,
    ) -> (CallTarget, TypeDenoter) {
        let ty = cx.analyze_type_denoter(&spec.denoter, spec.span);
        if ty.is_error() {
            return (CallTarget::Error, TypeDenoter::Error);
        }
        let Some(dt) = ty.as_base().filter(|dt| *dt != DataType::String) else {
            cx.error(
                codes::TYPE_MISMATCH,
                spec.span,
                format!("cannot construct a value of type '{}'", ty),
            );
            return (CallTarget::Error, TypeDenoter::Error);
        };
        if args.iter().any(TypeDenoter::is_error) {
            return (CallTarget::Constructor(ty.clone()), ty);
        }
        let expected = dt.component_count().unwrap_or(0);
        let counts: Option<Vec<u32>> = args
            .iter()
            .map(|a| a.as_base().and_then(DataType::component_count))
            .collect();
        match counts {
            None => {
                cx.error(
                    codes::TYPE_MISMATCH,
                    span,
                    format!("constructor '{}' takes only numeric arguments", ty),
                );
                return (CallTarget::Error, TypeDenoter::Error);
            }
            Some(counts) => {
                let total: u32 = counts.iter().sum();
                if total != expected && counts != [1] {
                    cx.error(
                        codes::TYPE_MISMATCH,
                        span,
                        format!(
                            "constructor '{}' expects {} component(s), but got {}",
                            ty, expected, total
                        ),
                    );
                    return (CallTarget::Error, TypeDenoter::Error);
                }
            }
        }
        (CallTarget::Constructor(ty.clone()), ty)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn set_symbol(cx: &mut Analyzer<'_>, expr: ExprId, resolved: SymbolRef) {
    if let ExprKind::Ident { symbol, .. } = &mut cx.program_mut()[expr].kind {
        *symbol = resolved;
    }
}

fn reject_void(cx: &mut Analyzer<'_>, decl: DeclId, ty: &TypeDenoter) {
    if ty.is_void() {
        let ident = cx.program()[decl].ident.clone();
        cx.error(
            codes::TYPE_MISMATCH,
            ident.span,
            format!("'{}' cannot have type 'void'", ident.name),
        );
    }
}

/// A register slot is the expected letter followed by a slot number.
fn check_register(cx: &mut Analyzer<'_>, register: &Register, prefix: char, what: &str) {
    let mut chars = register.slot.chars();
    let letter_ok = chars.next().is_some_and(|c| c.eq_ignore_ascii_case(&prefix));
    let rest = chars.as_str();
    if letter_ok && !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        return;
    }
    cx.submit(
        Diagnostic::new(
            DiagLevel::Error,
            Some(register.span),
            format!("invalid register '{}' for {}", register.slot, what),
        )
        .with_code(codes::INVALID_REGISTER)
        .with_hint(format!("expected '{}' followed by a slot number", prefix)),
    );
}

/// Parse the written semantics of `var` once. Returns true on the first call.
fn analyze_semantics(cx: &mut Analyzer<'_>, var: DeclId) -> bool {
    let Some(v) = cx.program().var(var) else {
        return false;
    };
    if v.semantics_analyzed {
        return false;
    }
    let written = v.semantics.clone();
    let name = cx.program().name_of(var).to_string();
    let mut system: Option<IndexedSemantic> = None;
    let mut user: Option<IndexedSemantic> = None;

    for semantic in written {
        let parsed = match parse_semantic(&semantic.name) {
            Ok(parsed) => parsed,
            Err(e) => {
                cx.error(codes::INVALID_SYSTEM_VALUE, semantic.span, e.to_string());
                continue;
            }
        };
        let (slot, what) = if parsed.is_system_value() {
            (&mut system, "system value")
        } else {
            (&mut user, "user-defined")
        };
        match slot.as_ref() {
            Some(previous) => {
                let message = format!("'{}' already has {} semantic '{}'", name, what, previous);
                cx.error(codes::CONFLICTING_SEMANTIC, semantic.span, message);
            }
            None => *slot = Some(parsed),
        }
    }

    if let Some(v) = cx.program_mut().var_mut(var) {
        v.system_semantic = system;
        v.user_semantic = user;
        v.semantics_analyzed = true;
    }
    true
}

/// Expression statements that do something.
fn has_side_effects(program: &Program, expr: ExprId) -> bool {
    match &program[expr].kind {
        ExprKind::Call(_) | ExprKind::Assign { .. } | ExprKind::PostUnary { .. } => true,
        ExprKind::Unary { op, .. } => matches!(op, UnaryOp::Inc | UnaryOp::Dec),
        ExprKind::Bracket(inner) => has_side_effects(program, *inner),
        ExprKind::List(items) => items.iter().any(|e| has_side_effects(program, *e)),
        ExprKind::Ternary {
            then_expr,
            else_expr,
            ..
        } => has_side_effects(program, *then_expr) || has_side_effects(program, *else_expr),
        _ => false,
    }
}

/// Flag returns in tail position of a function body.
fn mark_end_of_function(program: &mut Program, stmt: StmtId) {
    let next: Vec<StmtId> = match &mut program[stmt].kind {
        StmtKind::Return {
            end_of_function, ..
        } => {
            *end_of_function = true;
            Vec::new()
        }
        StmtKind::CodeBlock(stmts) => stmts.last().copied().into_iter().collect(),
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => std::iter::once(*then_body).chain(*else_body).collect(),
        _ => Vec::new(),
    };
    for s in next {
        mark_end_of_function(program, s);
    }
}

/// Whether every path through `stmt` ends in `return` or `discard`.
fn stmt_returns(program: &Program, stmt: StmtId) -> bool {
    match &program[stmt].kind {
        StmtKind::Return { .. } | StmtKind::CtrlTransfer(CtrlTransfer::Discard) => true,
        StmtKind::CodeBlock(stmts) => stmts.iter().any(|s| stmt_returns(program, *s)),
        StmtKind::If {
            then_body,
            else_body: Some(else_body),
            ..
        } => stmt_returns(program, *then_body) && stmt_returns(program, *else_body),
        StmtKind::DoWhile { body, .. } => stmt_returns(program, *body),
        StmtKind::For { cond: None, .. } => true,
        StmtKind::For { cond: Some(cond), .. } | StmtKind::While { cond, .. } => {
            is_literal_true(program, *cond)
        }
        StmtKind::Switch { cases, .. } => {
            cases.iter().any(|c| c.label.is_none())
                && cases
                    .iter()
                    .all(|c| c.stmts.is_empty() || c.stmts.iter().any(|s| stmt_returns(program, *s)))
        }
        _ => false,
    }
}

/// `expr` with any enclosing parentheses removed.
fn unbracket(program: &Program, mut expr: ExprId) -> ExprId {
    while let ExprKind::Bracket(inner) = program[expr].kind {
        expr = inner;
    }
    expr
}

/// Whether `expr` is the constant `true`, possibly parenthesized.
fn is_literal_true(program: &Program, expr: ExprId) -> bool {
    matches!(
        &program[unbracket(program, expr)].kind,
        ExprKind::Literal { kind: LiteralKind::Bool, value } if value == "true"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(program: &mut Program, kind: StmtKind) -> StmtId {
        program.push_stmt(Stmt {
            kind,
            span: Span::default(),
        })
    }

    fn ret(program: &mut Program) -> StmtId {
        stmt(
            program,
            StmtKind::Return {
                expr: None,
                end_of_function: false,
                in_entry_point: false,
            },
        )
    }

    fn literal(program: &mut Program) -> ExprId {
        program.push_expr(Expr {
            kind: ExprKind::Literal {
                kind: LiteralKind::Bool,
                value: "true".into(),
            },
            span: Span::default(),
            ty: None,
        })
    }

    #[test]
    fn both_branches_must_return() {
        let mut program = Program::new();
        let cond = literal(&mut program);
        let then_body = ret(&mut program);
        let one_sided = stmt(
            &mut program,
            StmtKind::If {
                cond,
                then_body,
                else_body: None,
            },
        );
        assert!(!stmt_returns(&program, one_sided));

        let else_body = ret(&mut program);
        let both = stmt(
            &mut program,
            StmtKind::If {
                cond,
                then_body,
                else_body: Some(else_body),
            },
        );
        assert!(stmt_returns(&program, both));
    }

    #[test]
    fn constant_true_loops_never_fall_through() {
        let mut program = Program::new();
        let cond = literal(&mut program);
        let body = ret(&mut program);
        let endless = stmt(&mut program, StmtKind::While { cond, body });
        assert!(stmt_returns(&program, endless));

        let wrapped = program.push_expr(Expr {
            kind: ExprKind::Bracket(cond),
            span: Span::default(),
            ty: None,
        });
        let endless_for = stmt(
            &mut program,
            StmtKind::For {
                init: None,
                cond: Some(wrapped),
                iteration: None,
                body,
            },
        );
        assert!(stmt_returns(&program, endless_for));

        let other = program.push_expr(Expr {
            kind: ExprKind::Literal {
                kind: LiteralKind::Bool,
                value: "false".into(),
            },
            span: Span::default(),
            ty: None,
        });
        let bounded = stmt(&mut program, StmtKind::While { cond: other, body });
        assert!(!stmt_returns(&program, bounded));
    }

    #[test]
    fn tail_returns_are_marked() {
        let mut program = Program::new();
        let early = ret(&mut program);
        let cond = literal(&mut program);
        let guarded = stmt(
            &mut program,
            StmtKind::If {
                cond,
                then_body: early,
                else_body: None,
            },
        );
        let last = ret(&mut program);
        let body = stmt(&mut program, StmtKind::CodeBlock(vec![guarded, last]));
        mark_end_of_function(&mut program, body);
        let flag = |p: &Program, s: StmtId| match p[s].kind {
            StmtKind::Return {
                end_of_function, ..
            } => end_of_function,
            _ => false,
        };
        assert!(flag(&program, last));
        assert!(!flag(&program, early));
    }

    #[test]
    fn literal_statement_has_no_effect() {
        let mut program = Program::new();
        let e = literal(&mut program);
        assert!(!has_side_effects(&program, e));
    }
}
