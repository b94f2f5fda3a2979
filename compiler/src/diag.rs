// diag.rs — Unified diagnostics model
//
// Provides the report record submitted by the analysis engine, the stable
// diagnostic codes, and the minimal sink interface the engine writes into.
// Formatting beyond `Display` belongs to the front end.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0100`, `W0001`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable codes, grouped by error class.
pub mod codes {
    use super::DiagCode;

    // Name resolution
    pub const UNDECLARED_IDENT: DiagCode = DiagCode("E0100");
    pub const REDEFINITION: DiagCode = DiagCode("E0101");
    pub const UNDECLARED_TYPE: DiagCode = DiagCode("E0102");

    // Overload resolution
    pub const NO_MATCHING_OVERLOAD: DiagCode = DiagCode("E0110");
    pub const AMBIGUOUS_CALL: DiagCode = DiagCode("E0111");

    // Types
    pub const TYPE_MISMATCH: DiagCode = DiagCode("E0200");
    pub const INVALID_CAST: DiagCode = DiagCode("E0201");
    pub const RESOURCE_MISUSE: DiagCode = DiagCode("E0202");
    pub const NOT_ASSIGNABLE: DiagCode = DiagCode("E0203");
    pub const INVALID_MEMBER: DiagCode = DiagCode("E0204");
    pub const INTRINSIC_ARGS: DiagCode = DiagCode("E0205");
    pub const SHADER_MODEL: DiagCode = DiagCode("E0206");

    // Semantic binding
    pub const MISSING_SEMANTIC: DiagCode = DiagCode("E0300");
    pub const CONFLICTING_SEMANTIC: DiagCode = DiagCode("E0301");
    pub const INVALID_SYSTEM_VALUE: DiagCode = DiagCode("E0302");
    pub const DUPLICATE_BINDING: DiagCode = DiagCode("E0303");
    pub const INVALID_REGISTER: DiagCode = DiagCode("E0304");

    // Entry point and structure
    pub const ENTRY_POINT_NOT_FOUND: DiagCode = DiagCode("E0310");
    pub const INVALID_ENTRY_PARAM: DiagCode = DiagCode("E0311");
    pub const MISSING_RETURN: DiagCode = DiagCode("E0320");
    pub const INVALID_CONTEXT: DiagCode = DiagCode("E0321");
    pub const DUPLICATE_MEMBER: DiagCode = DiagCode("E0322");

    // Warnings
    pub const NULL_STATEMENT: DiagCode = DiagCode("W0001");
    pub const NO_EFFECT: DiagCode = DiagCode("W0002");
    pub const IMPLICIT_TRUNCATION: DiagCode = DiagCode("W0003");
    pub const MISSING_POSITION_OUTPUT: DiagCode = DiagCode("W0004");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A report submitted by the analysis engine.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Source position of the originating node, if it has one.
    pub span: Option<Span>,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, or related spans.
    pub fn new(level: DiagLevel, span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(span) = &self.span {
            write!(f, " (at {}..{})", span.start, span.end)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Report sink ──────────────────────────────────────────────────────────

/// Destination for reports produced during analysis.
pub trait ReportSink {
    fn submit(&mut self, diagnostic: Diagnostic);
}

impl ReportSink for Vec<Diagnostic> {
    fn submit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// True if any report in `diagnostics` has error severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

// ── Internal faults ──────────────────────────────────────────────────────

/// Engine-state corruption. Never caused by source text; aborts the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalFault {
    #[error("internal: scope closed while no scope was open")]
    ScopeUnderflow,
    #[error("internal: function declaration level popped below zero")]
    FunctionLevelUnderflow,
    #[error("internal: entry point level {entry} left while at level {current}")]
    EntryLevelMismatch { entry: u32, current: u32 },
    #[error("internal: function call stack popped while empty")]
    CallStackUnderflow,
    #[error("internal: analysis ended in an unbalanced state ({0})")]
    UnbalancedState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, None, "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_span() {
        let d = Diagnostic::new(DiagLevel::Warning, Some(dummy_span()), "empty body")
            .with_code(codes::NULL_STATEMENT);
        assert_eq!(format!("{d}"), "warning[W0001]: empty body (at 0..1)");
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::new(DiagLevel::Error, Some(dummy_span()), "redefinition of 'x'")
            .with_code(codes::REDEFINITION)
            .with_hint("rename one of the declarations")
            .with_related(dummy_span(), "previous declaration here");

        assert_eq!(d.code, Some(codes::REDEFINITION));
        assert_eq!(d.hint.as_deref(), Some("rename one of the declarations"));
        assert_eq!(d.related_spans.len(), 1);
    }

    #[test]
    fn vec_sink_collects_and_detects_errors() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.submit(Diagnostic::new(DiagLevel::Warning, None, "w"));
        assert!(!has_errors(&sink));
        sink.submit(Diagnostic::new(DiagLevel::Error, None, "e"));
        assert!(has_errors(&sink));
    }

    #[test]
    fn internal_fault_messages() {
        let fault = InternalFault::EntryLevelMismatch { entry: 2, current: 1 };
        assert_eq!(
            fault.to_string(),
            "internal: entry point level 2 left while at level 1"
        );
    }
}
