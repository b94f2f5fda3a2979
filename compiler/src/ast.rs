// ast.rs — Arena syntax tree for HLSL-style shader programs
//
// The tree is produced by an external parser (or `builder::ProgramBuilder`)
// and decorated in place by the analyzer. Nodes live in three arenas owned
// by `Program` and refer to each other through `id` handles, never through
// ownership, so the symbol table and the call stack can hold handles freely.
//
// Fields below an `// annotations` marker are written by analysis; a parser
// leaves them at their defaults.
//
// Preconditions: every handle stored in a node indexes the same program;
//   trees from outside sources are checked with `Program::validate_handles`.
// Postconditions: none (data-only module).
// Failure modes: indexing with a foreign handle panics.
// Side effects: none.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{DeclId, ExprId, StmtId};
use crate::intrinsics::Intrinsic;
use crate::semantic::IndexedSemantic;
use crate::types::{DataType, SamplerKind, StructLayout, TextureKind, TypeDenoter};

/// Byte-offset span into the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An identifier with its source text and span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

// ── Root ────────────────────────────────────────────────────────────────────

/// A complete translation unit: node arenas plus the top-level statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub stmts: Vec<Stmt>,
    pub exprs: Vec<Expr>,
    /// Top-level statements in source order.
    pub global_stmts: Vec<StmtId>,
    pub span: Span,

    // annotations
    /// The function selected as the shader entry point.
    #[serde(default)]
    pub entry_point: Option<DeclId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_decl(&mut self, decl: Decl) -> DeclId {
        self.decls.push(decl);
        DeclId::from_index(self.decls.len() - 1)
    }

    pub fn push_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.push(stmt);
        StmtId::from_index(self.stmts.len() - 1)
    }

    pub fn push_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId::from_index(self.exprs.len() - 1)
    }

    pub fn var(&self, id: DeclId) -> Option<&VarDecl> {
        match &self[id].kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn var_mut(&mut self, id: DeclId) -> Option<&mut VarDecl> {
        match &mut self[id].kind {
            DeclKind::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn function(&self, id: DeclId) -> Option<&FunctionDecl> {
        match &self[id].kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn function_mut(&mut self, id: DeclId) -> Option<&mut FunctionDecl> {
        match &mut self[id].kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn struct_decl(&self, id: DeclId) -> Option<&StructDecl> {
        match &self[id].kind {
            DeclKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn struct_decl_mut(&mut self, id: DeclId) -> Option<&mut StructDecl> {
        match &mut self[id].kind {
            DeclKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Name of a declaration.
    pub fn name_of(&self, id: DeclId) -> &str {
        &self[id].ident.name
    }

    /// Resolved (or, before analysis, syntactic) type of a variable.
    pub fn var_type(&self, id: DeclId) -> Option<&TypeDenoter> {
        self.var(id)
            .map(|v| v.resolved_type.as_ref().unwrap_or(&v.type_spec.denoter))
    }

    /// All members of a structure, inherited ones first.
    pub fn all_struct_members(&self, strukt: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut next = Some(strukt);
        while let Some(id) = next {
            if chain.contains(&id) {
                break;
            }
            chain.push(id);
            next = self.struct_decl(id).and_then(|s| s.base_decl);
        }
        chain
            .iter()
            .rev()
            .filter_map(|id| self.struct_decl(*id))
            .flat_map(|s| s.members.iter().copied())
            .collect()
    }

    /// Find a structure member by name, searching inherited members too.
    pub fn struct_member(&self, strukt: DeclId, member: &str) -> Option<DeclId> {
        self.all_struct_members(strukt)
            .into_iter()
            .find(|m| self.name_of(*m) == member)
    }
}

impl Index<DeclId> for Program {
    type Output = Decl;

    fn index(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }
}

impl IndexMut<DeclId> for Program {
    fn index_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }
}

impl Index<StmtId> for Program {
    type Output = Stmt;

    fn index(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }
}

impl IndexMut<StmtId> for Program {
    fn index_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }
}

impl Index<ExprId> for Program {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }
}

impl IndexMut<ExprId> for Program {
    fn index_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }
}

// ── Handle validation ───────────────────────────────────────────────────────

/// Deepest node nesting accepted by `Program::validate_handles`.
pub const MAX_NESTING: usize = 512;

/// A structural defect in a deserialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("{owner} refers to {target}, which does not exist")]
    Dangling { owner: String, target: String },
    #[error("{0} contains itself")]
    Cycle(String),
    #[error("{0} is nested more than {max} levels deep", max = MAX_NESTING)]
    TooDeep(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Decl(DeclId),
    Stmt(StmtId),
    Expr(ExprId),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Decl(id) => write!(f, "declaration {}", id),
            Node::Stmt(id) => write!(f, "statement {}", id),
            Node::Expr(id) => write!(f, "expression {}", id),
        }
    }
}

impl Program {
    /// Check that every handle indexes this program and that the syntax tree
    /// is acyclic and at most `MAX_NESTING` levels deep. Nodes may be shared.
    pub fn validate_handles(&self) -> Result<(), HandleError> {
        let nodes: Vec<Node> = (0..self.decls.len())
            .map(|i| Node::Decl(DeclId::from_index(i)))
            .chain((0..self.stmts.len()).map(|i| Node::Stmt(StmtId::from_index(i))))
            .chain((0..self.exprs.len()).map(|i| Node::Expr(ExprId::from_index(i))))
            .collect();

        let roots = self
            .global_stmts
            .iter()
            .map(|s| Node::Stmt(*s))
            .chain(self.entry_point.map(Node::Decl));
        for root in roots {
            self.check_exists("program".to_string(), root)?;
        }
        for node in &nodes {
            for target in self.children(*node).into_iter().chain(self.annotation_refs(*node)) {
                self.check_exists(node.to_string(), target)?;
            }
        }

        // Iterative depth-first walk; `Open` nodes are on the current path and
        // a finished node records the height of the subtree below it.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done(usize),
        }
        let slot = |node: Node| match node {
            Node::Decl(id) => id.index(),
            Node::Stmt(id) => self.decls.len() + id.index(),
            Node::Expr(id) => self.decls.len() + self.stmts.len() + id.index(),
        };
        let mut marks = vec![Mark::New; nodes.len()];
        for start in &nodes {
            if marks[slot(*start)] != Mark::New {
                continue;
            }
            let mut path: Vec<(Node, Vec<Node>)> = vec![(*start, self.children(*start))];
            marks[slot(*start)] = Mark::Open;
            while let Some((node, pending)) = path.last_mut() {
                let node = *node;
                let Some(child) = pending.pop() else {
                    let height = 1 + self
                        .children(node)
                        .into_iter()
                        .map(|c| match marks[slot(c)] {
                            Mark::Done(h) => h,
                            Mark::New | Mark::Open => 0,
                        })
                        .max()
                        .unwrap_or(0);
                    if height > MAX_NESTING {
                        return Err(HandleError::TooDeep(node.to_string()));
                    }
                    marks[slot(node)] = Mark::Done(height);
                    path.pop();
                    continue;
                };
                match marks[slot(child)] {
                    Mark::Done(_) => {}
                    Mark::Open => return Err(HandleError::Cycle(child.to_string())),
                    Mark::New => {
                        marks[slot(child)] = Mark::Open;
                        path.push((child, self.children(child)));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_exists(&self, owner: String, target: Node) -> Result<(), HandleError> {
        let exists = match target {
            Node::Decl(id) => id.index() < self.decls.len(),
            Node::Stmt(id) => id.index() < self.stmts.len(),
            Node::Expr(id) => id.index() < self.exprs.len(),
        };
        if exists {
            Ok(())
        } else {
            Err(HandleError::Dangling {
                owner,
                target: target.to_string(),
            })
        }
    }

    /// Nodes owned by `node` in the tree.
    fn children(&self, node: Node) -> Vec<Node> {
        let decls = |ids: &[DeclId]| ids.iter().map(|d| Node::Decl(*d)).collect::<Vec<_>>();
        let stmts = |ids: &[StmtId]| ids.iter().map(|s| Node::Stmt(*s)).collect::<Vec<_>>();
        let exprs = |ids: &[ExprId]| ids.iter().map(|e| Node::Expr(*e)).collect::<Vec<_>>();
        let opt_stmt = |id: &Option<StmtId>| id.map(Node::Stmt);
        let opt_expr = |id: &Option<ExprId>| id.map(Node::Expr);

        match node {
            Node::Decl(id) => match &self.decls[id.index()].kind {
                DeclKind::Var(var) => var
                    .array_dims
                    .iter()
                    .flatten()
                    .map(|e| Node::Expr(*e))
                    .chain(opt_expr(&var.initializer))
                    .collect(),
                DeclKind::Function(func) => {
                    let mut out = decls(&func.params);
                    out.extend(opt_stmt(&func.body));
                    out
                }
                DeclKind::Struct(strukt) => decls(&strukt.members),
                DeclKind::Buffer(buffer) => decls(&buffer.members),
                DeclKind::Alias(_) | DeclKind::Texture(_) | DeclKind::Sampler(_) => Vec::new(),
            },
            Node::Stmt(id) => match &self.stmts[id.index()].kind {
                StmtKind::Null | StmtKind::CtrlTransfer(_) => Vec::new(),
                StmtKind::CodeBlock(ids) => stmts(ids),
                StmtKind::Decl(ids) => decls(ids),
                StmtKind::For {
                    init,
                    cond,
                    iteration,
                    body,
                } => opt_stmt(init)
                    .into_iter()
                    .chain(opt_expr(cond))
                    .chain(opt_expr(iteration))
                    .chain([Node::Stmt(*body)])
                    .collect(),
                StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                    vec![Node::Expr(*cond), Node::Stmt(*body)]
                }
                StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                } => [Node::Expr(*cond), Node::Stmt(*then_body)]
                    .into_iter()
                    .chain(opt_stmt(else_body))
                    .collect(),
                StmtKind::Switch { selector, cases } => {
                    let mut out = vec![Node::Expr(*selector)];
                    for case in cases {
                        out.extend(opt_expr(&case.label));
                        out.extend(stmts(&case.stmts));
                    }
                    out
                }
                StmtKind::Expr(expr) => vec![Node::Expr(*expr)],
                StmtKind::Return { expr, .. } => opt_expr(expr).into_iter().collect(),
            },
            Node::Expr(id) => match &self.exprs[id.index()].kind {
                ExprKind::Literal { .. } | ExprKind::Ident { .. } => Vec::new(),
                ExprKind::Call(call) => {
                    let mut out = match &call.callee {
                        Callee::Method { object, .. } => vec![Node::Expr(*object)],
                        Callee::Ident(_) | Callee::Constructor(_) => Vec::new(),
                    };
                    out.extend(exprs(&call.args));
                    out
                }
                ExprKind::Cast { expr, .. }
                | ExprKind::Unary { expr, .. }
                | ExprKind::PostUnary { expr, .. }
                | ExprKind::Bracket(expr) => vec![Node::Expr(*expr)],
                ExprKind::Binary { lhs, rhs, .. } | ExprKind::Assign { lhs, rhs, .. } => {
                    vec![Node::Expr(*lhs), Node::Expr(*rhs)]
                }
                ExprKind::Ternary {
                    cond,
                    then_expr,
                    else_expr,
                } => exprs(&[*cond, *then_expr, *else_expr]),
                ExprKind::List(items) | ExprKind::Initializer(items) => exprs(items),
                ExprKind::Member { base, .. } => vec![Node::Expr(*base)],
                ExprKind::Index { base, indices } => {
                    let mut out = vec![Node::Expr(*base)];
                    out.extend(exprs(indices));
                    out
                }
            },
        }
    }

    /// Declarations named by analysis annotations; these may point anywhere.
    fn annotation_refs(&self, node: Node) -> Vec<Node> {
        match node {
            Node::Decl(id) => match &self.decls[id.index()].kind {
                DeclKind::Struct(strukt) => strukt
                    .base_decl
                    .iter()
                    .chain(&strukt.system_value_members)
                    .map(|d| Node::Decl(*d))
                    .collect(),
                DeclKind::Function(func) => func
                    .entry_inputs
                    .iter()
                    .chain(&func.entry_outputs)
                    .filter_map(|b| b.decl.map(Node::Decl))
                    .collect(),
                _ => Vec::new(),
            },
            Node::Stmt(_) => Vec::new(),
            Node::Expr(id) => match &self.exprs[id.index()].kind {
                ExprKind::Ident { symbol, .. } => symbol.decl().map(Node::Decl).into_iter().collect(),
                ExprKind::Call(FunctionCall {
                    target: CallTarget::Function(decl),
                    ..
                }) => vec![Node::Decl(*decl)],
                _ => Vec::new(),
            },
        }
    }
}

impl StructLayout for Program {
    fn struct_member_types(&self, decl: DeclId) -> Vec<TypeDenoter> {
        self.all_struct_members(decl)
            .iter()
            .filter_map(|m| self.var_type(*m).cloned())
            .collect()
    }
}

// ── Declarations ────────────────────────────────────────────────────────────

/// A named entity that can be introduced into a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decl {
    pub ident: Ident,
    pub kind: DeclKind,
    pub span: Span,

    // annotations
    /// Set when the declaration is reachable from the entry point.
    #[serde(default)]
    pub reachable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Var(VarDecl),
    Function(FunctionDecl),
    Struct(StructDecl),
    Alias(AliasDecl),
    Texture(TextureDecl),
    Sampler(SamplerDecl),
    Buffer(BufferDecl),
}

impl DeclKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DeclKind::Var(_) => "variable",
            DeclKind::Function(_) => "function",
            DeclKind::Struct(_) => "structure",
            DeclKind::Alias(_) => "type alias",
            DeclKind::Texture(_) => "texture",
            DeclKind::Sampler(_) => "sampler",
            DeclKind::Buffer(_) => "constant buffer",
        }
    }

    /// Functions may share a name with other functions.
    pub fn is_overloadable(&self) -> bool {
        matches!(self, DeclKind::Function(_))
    }
}

/// Syntactic type spelling with its span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub denoter: TypeDenoter,
    pub span: Span,
}

impl TypeSpec {
    pub fn new(denoter: TypeDenoter, span: Span) -> Self {
        TypeSpec { denoter, span }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModifier {
    #[default]
    In,
    Out,
    InOut,
}

impl InputModifier {
    pub fn is_output(self) -> bool {
        matches!(self, InputModifier::Out | InputModifier::InOut)
    }

    pub fn is_input(self) -> bool {
        matches!(self, InputModifier::In | InputModifier::InOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    Uniform,
    Static,
    Const,
    Extern,
    GroupShared,
}

/// A `: NAME` binding as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semantic {
    pub name: String,
    pub span: Span,
}

/// A `: register(t0)` slot annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub slot: String,
    pub span: Span,
}

/// Shader-stage direction flags of an entry-point variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoFlags {
    pub input: bool,
    pub output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub type_spec: TypeSpec,
    #[serde(default)]
    pub modifier: InputModifier,
    #[serde(default)]
    pub storage: Vec<StorageClass>,
    /// `None` entries are unsized dimensions (`a[]`).
    #[serde(default)]
    pub array_dims: Vec<Option<ExprId>>,
    #[serde(default)]
    pub semantics: Vec<Semantic>,
    #[serde(default)]
    pub register: Option<Register>,
    #[serde(default)]
    pub initializer: Option<ExprId>,

    // annotations
    #[serde(default)]
    pub resolved_type: Option<TypeDenoter>,
    #[serde(default)]
    pub system_semantic: Option<IndexedSemantic>,
    #[serde(default)]
    pub user_semantic: Option<IndexedSemantic>,
    #[serde(default)]
    pub semantics_analyzed: bool,
    #[serde(default)]
    pub io: IoFlags,
    #[serde(default)]
    pub is_global: bool,
}

impl VarDecl {
    pub fn new(type_spec: TypeSpec) -> Self {
        VarDecl {
            type_spec,
            modifier: InputModifier::In,
            storage: Vec::new(),
            array_dims: Vec::new(),
            semantics: Vec::new(),
            register: None,
            initializer: None,
            resolved_type: None,
            system_semantic: None,
            user_semantic: None,
            semantics_analyzed: false,
            io: IoFlags::default(),
            is_global: false,
        }
    }

    pub fn has_storage(&self, class: StorageClass) -> bool {
        self.storage.contains(&class)
    }

    /// The single semantic the variable is bound through: system value first.
    pub fn binding_semantic(&self) -> Option<&IndexedSemantic> {
        self.system_semantic.as_ref().or(self.user_semantic.as_ref())
    }
}

/// One classified entry-point input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBinding {
    /// The leaf variable, or `None` for the function's own return value.
    pub decl: Option<DeclId>,
    pub semantic: IndexedSemantic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub return_type: TypeSpec,
    pub params: Vec<DeclId>,
    #[serde(default)]
    pub return_semantic: Option<Semantic>,
    /// Code block statement; `None` for a prototype.
    #[serde(default)]
    pub body: Option<StmtId>,

    // annotations
    #[serde(default)]
    pub resolved_return: Option<TypeDenoter>,
    #[serde(default)]
    pub return_system_semantic: Option<IndexedSemantic>,
    #[serde(default)]
    pub return_user_semantic: Option<IndexedSemantic>,
    #[serde(default)]
    pub is_entry_point: bool,
    #[serde(default)]
    pub entry_inputs: Vec<EntryBinding>,
    #[serde(default)]
    pub entry_outputs: Vec<EntryBinding>,
}

impl FunctionDecl {
    pub fn new(return_type: TypeSpec, params: Vec<DeclId>, body: Option<StmtId>) -> Self {
        FunctionDecl {
            return_type,
            params,
            return_semantic: None,
            body,
            resolved_return: None,
            return_system_semantic: None,
            return_user_semantic: None,
            is_entry_point: false,
            entry_inputs: Vec::new(),
            entry_outputs: Vec::new(),
        }
    }

    pub fn is_prototype(&self) -> bool {
        self.body.is_none()
    }

    pub fn return_denoter(&self) -> &TypeDenoter {
        self.resolved_return
            .as_ref()
            .unwrap_or(&self.return_type.denoter)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    /// `struct B : A { ... }` inherits the members of `A`.
    #[serde(default)]
    pub base: Option<Ident>,
    pub members: Vec<DeclId>,

    // annotations
    #[serde(default)]
    pub base_decl: Option<DeclId>,
    #[serde(default)]
    pub io: IoFlags,
    /// Members bound through a system-value semantic.
    #[serde(default)]
    pub system_value_members: Vec<DeclId>,
}

impl StructDecl {
    pub fn new(members: Vec<DeclId>) -> Self {
        StructDecl {
            base: None,
            members,
            base_decl: None,
            io: IoFlags::default(),
            system_value_members: Vec::new(),
        }
    }
}

/// `typedef <type> <ident>;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasDecl {
    pub type_spec: TypeSpec,

    // annotations
    #[serde(default)]
    pub resolved_type: Option<TypeDenoter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureDecl {
    pub kind: TextureKind,
    /// Element type (`Texture2D<float2>`); `float4` when omitted.
    #[serde(default)]
    pub element: Option<DataType>,
    #[serde(default)]
    pub register: Option<Register>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerDecl {
    pub kind: SamplerKind,
    #[serde(default)]
    pub register: Option<Register>,
}

/// `cbuffer <ident> { members }`; members are visible at global scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferDecl {
    pub members: Vec<DeclId>,
    #[serde(default)]
    pub register: Option<Register>,
}

// ── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    /// A lone `;`.
    Null,
    CodeBlock(Vec<StmtId>),
    /// One or more declarations of any kind.
    Decl(Vec<DeclId>),
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        iteration: Option<ExprId>,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    If {
        cond: ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    },
    Switch {
        selector: ExprId,
        cases: Vec<SwitchCase>,
    },
    Expr(ExprId),
    Return {
        expr: Option<ExprId>,
        // annotations
        #[serde(default)]
        end_of_function: bool,
        #[serde(default)]
        in_entry_point: bool,
    },
    CtrlTransfer(CtrlTransfer),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub label: Option<ExprId>,
    pub stmts: Vec<StmtId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtrlTransfer {
    Break,
    Continue,
    Discard,
}

// ── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,

    // annotations
    /// Memoized result of type computation.
    #[serde(default)]
    pub ty: Option<TypeDenoter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralKind {
    Bool,
    Int,
    UInt,
    Half,
    Float,
    Double,
    String,
}

/// What an identifier use resolved to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolRef {
    #[default]
    Unresolved,
    Decl(DeclId),
    /// Resolution failed and was already reported.
    Error,
}

impl SymbolRef {
    pub fn decl(self) -> Option<DeclId> {
        match self {
            SymbolRef::Decl(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    /// `name(args)`: user function or intrinsic.
    Ident(Ident),
    /// `object.name(args)`: texture method.
    Method { object: ExprId, name: Ident },
    /// `float3(args)`: type constructor.
    Constructor(TypeSpec),
}

/// What a call resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTarget {
    #[default]
    Unresolved,
    Function(DeclId),
    Intrinsic(Intrinsic),
    Constructor(TypeDenoter),
    /// Resolution failed and was already reported.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub callee: Callee,
    pub args: Vec<ExprId>,

    // annotations
    #[serde(default)]
    pub target: CallTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Inc,
    Dec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryClass {
    Arithmetic,
    Comparison,
    Logical,
    Bitwise,
}

impl BinaryOp {
    pub fn class(self) -> BinaryClass {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                BinaryClass::Arithmetic
            }
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => BinaryClass::Comparison,
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => BinaryClass::Logical,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                BinaryClass::Bitwise
            }
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
            AssignOp::BitXor => Some(BinaryOp::BitXor),
            AssignOp::Shl => Some(BinaryOp::Shl),
            AssignOp::Shr => Some(BinaryOp::Shr),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Literal {
        kind: LiteralKind,
        value: String,
    },
    Ident {
        ident: Ident,
        // annotations
        #[serde(default)]
        symbol: SymbolRef,
    },
    Call(FunctionCall),
    Cast {
        type_spec: TypeSpec,
        expr: ExprId,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    /// `expr++` / `expr--`.
    PostUnary {
        op: UnaryOp,
        expr: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Assign {
        op: AssignOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Ternary {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Bracket(ExprId),
    /// Comma-separated sequence; evaluates to its last element.
    List(Vec<ExprId>),
    /// `{ a, b, c }`.
    Initializer(Vec<ExprId>),
    Member {
        base: ExprId,
        member: Ident,
    },
    Index {
        base: ExprId,
        indices: Vec<ExprId>,
    },
}

impl ExprKind {
    /// Expressions that may appear on the left of an assignment.
    pub fn is_lvalue_form(&self) -> bool {
        matches!(
            self,
            ExprKind::Ident { .. } | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}
