// semantic.rs — Semantic tags: parsing, system values, stage legality
//
// A semantic binds a variable to a shader input/output slot. Written names
// split into a base and a trailing decimal index (`TEXCOORD3`). Names with
// the `SV_` prefix are system values drawn from a fixed set; everything else
// is user-defined and compared case-insensitively.
//
// Preconditions: none (pure functions).
// Postconditions: parsed user-defined names are upper-cased.
// Failure modes: empty base names and unknown `SV_` names are rejected.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ShaderTarget;

// ── System values ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemValue {
    ClipDistance,
    Coverage,
    CullDistance,
    Depth,
    DispatchThreadID,
    DomainLocation,
    GroupID,
    GroupIndex,
    GroupThreadID,
    GSInstanceID,
    InsideTessFactor,
    InstanceID,
    IsFrontFace,
    OutputControlPointID,
    Position,
    PrimitiveID,
    RenderTargetArrayIndex,
    SampleIndex,
    StencilRef,
    Target,
    TessFactor,
    VertexID,
    ViewportArrayIndex,
}

const SYSTEM_VALUES: &[(&str, SystemValue)] = &[
    ("ClipDistance", SystemValue::ClipDistance),
    ("Coverage", SystemValue::Coverage),
    ("CullDistance", SystemValue::CullDistance),
    ("Depth", SystemValue::Depth),
    ("DispatchThreadID", SystemValue::DispatchThreadID),
    ("DomainLocation", SystemValue::DomainLocation),
    ("GroupID", SystemValue::GroupID),
    ("GroupIndex", SystemValue::GroupIndex),
    ("GroupThreadID", SystemValue::GroupThreadID),
    ("GSInstanceID", SystemValue::GSInstanceID),
    ("InsideTessFactor", SystemValue::InsideTessFactor),
    ("InstanceID", SystemValue::InstanceID),
    ("IsFrontFace", SystemValue::IsFrontFace),
    ("OutputControlPointID", SystemValue::OutputControlPointID),
    ("Position", SystemValue::Position),
    ("PrimitiveID", SystemValue::PrimitiveID),
    ("RenderTargetArrayIndex", SystemValue::RenderTargetArrayIndex),
    ("SampleIndex", SystemValue::SampleIndex),
    ("StencilRef", SystemValue::StencilRef),
    ("Target", SystemValue::Target),
    ("TessFactor", SystemValue::TessFactor),
    ("VertexID", SystemValue::VertexID),
    ("ViewportArrayIndex", SystemValue::ViewportArrayIndex),
];

impl SystemValue {
    fn from_suffix(suffix: &str) -> Option<SystemValue> {
        SYSTEM_VALUES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(suffix))
            .map(|(_, sv)| *sv)
    }

    pub fn name(self) -> &'static str {
        SYSTEM_VALUES
            .iter()
            .find(|(_, sv)| *sv == self)
            .map(|(name, _)| *name)
            .unwrap_or("Unknown")
    }

    /// Whether the system value may appear on `target` in `direction`.
    pub fn is_valid_for(self, target: ShaderTarget, direction: IoDirection) -> bool {
        use IoDirection::{Input, Output};
        use ShaderTarget::*;
        match self {
            SystemValue::Position => matches!(
                (target, direction),
                (Vertex, Output)
                    | (TessControl, _)
                    | (TessEvaluation, _)
                    | (Geometry, _)
                    | (Fragment, Input)
            ),
            SystemValue::Target | SystemValue::Depth | SystemValue::StencilRef => {
                (target, direction) == (Fragment, Output)
            }
            SystemValue::Coverage => target == Fragment,
            SystemValue::IsFrontFace | SystemValue::SampleIndex => {
                (target, direction) == (Fragment, Input)
            }
            SystemValue::VertexID | SystemValue::InstanceID => {
                (target, direction) == (Vertex, Input)
            }
            SystemValue::PrimitiveID => match direction {
                Input => matches!(target, TessControl | TessEvaluation | Geometry | Fragment),
                Output => target == Geometry,
            },
            SystemValue::DispatchThreadID
            | SystemValue::GroupID
            | SystemValue::GroupIndex
            | SystemValue::GroupThreadID => (target, direction) == (Compute, Input),
            SystemValue::ClipDistance
            | SystemValue::CullDistance
            | SystemValue::RenderTargetArrayIndex
            | SystemValue::ViewportArrayIndex => target != Compute,
            SystemValue::TessFactor | SystemValue::InsideTessFactor => matches!(
                (target, direction),
                (TessControl, Output) | (TessEvaluation, Input)
            ),
            SystemValue::DomainLocation => (target, direction) == (TessEvaluation, Input),
            SystemValue::OutputControlPointID => (target, direction) == (TessControl, Input),
            SystemValue::GSInstanceID => (target, direction) == (Geometry, Input),
        }
    }
}

/// Direction of an entry-point binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoDirection {
    Input,
    Output,
}

impl fmt::Display for IoDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoDirection::Input => f.write_str("input"),
            IoDirection::Output => f.write_str("output"),
        }
    }
}

// ── Indexed semantic ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    SystemValue(SystemValue),
    UserDefined(String),
}

/// A parsed semantic: kind plus slot index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedSemantic {
    pub kind: SemanticKind,
    pub index: u32,
}

impl IndexedSemantic {
    pub fn system_value(sv: SystemValue, index: u32) -> Self {
        IndexedSemantic {
            kind: SemanticKind::SystemValue(sv),
            index,
        }
    }

    pub fn user_defined(name: impl Into<String>, index: u32) -> Self {
        IndexedSemantic {
            kind: SemanticKind::UserDefined(name.into()),
            index,
        }
    }

    pub fn is_system_value(&self) -> bool {
        matches!(self.kind, SemanticKind::SystemValue(_))
    }

    pub fn as_system_value(&self) -> Option<SystemValue> {
        match self.kind {
            SemanticKind::SystemValue(sv) => Some(sv),
            SemanticKind::UserDefined(_) => None,
        }
    }
}

impl fmt::Display for IndexedSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SemanticKind::SystemValue(sv) => write!(f, "SV_{}", sv.name())?,
            SemanticKind::UserDefined(name) => write!(f, "{}", name)?,
        }
        if self.index > 0 {
            write!(f, "{}", self.index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("invalid semantic '{0}'")]
    Empty(String),
    #[error("unknown system value semantic '{0}'")]
    UnknownSystemValue(String),
}

/// Parse a written semantic name.
pub fn parse_semantic(written: &str) -> Result<IndexedSemantic, SemanticError> {
    let base = written.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &written[base.len()..];
    if base.is_empty() {
        return Err(SemanticError::Empty(written.to_string()));
    }
    let index = if digits.is_empty() {
        0
    } else {
        digits
            .parse::<u32>()
            .map_err(|_| SemanticError::Empty(written.to_string()))?
    };

    let upper = base.to_ascii_uppercase();
    if let Some(suffix) = upper.strip_prefix("SV_") {
        let sv = SystemValue::from_suffix(suffix)
            .ok_or_else(|| SemanticError::UnknownSystemValue(written.to_string()))?;
        return Ok(IndexedSemantic::system_value(sv, index));
    }
    Ok(IndexedSemantic::user_defined(upper, index))
}

/// Legacy (shader model 3 era) names that act as system values at the
/// entry-point boundary of the given stage and direction.
pub fn legacy_system_value(
    semantic: &IndexedSemantic,
    target: ShaderTarget,
    direction: IoDirection,
) -> Option<SystemValue> {
    let SemanticKind::UserDefined(name) = &semantic.kind else {
        return None;
    };
    match (name.as_str(), target, direction) {
        ("POSITION", ShaderTarget::Vertex, IoDirection::Output) => Some(SystemValue::Position),
        ("VPOS", ShaderTarget::Fragment, IoDirection::Input) => Some(SystemValue::Position),
        ("VFACE", ShaderTarget::Fragment, IoDirection::Input) => Some(SystemValue::IsFrontFace),
        ("COLOR", ShaderTarget::Fragment, IoDirection::Output) => Some(SystemValue::Target),
        ("DEPTH", ShaderTarget::Fragment, IoDirection::Output) => Some(SystemValue::Depth),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_semantic_without_index() {
        assert_eq!(
            parse_semantic("POSITION"),
            Ok(IndexedSemantic::user_defined("POSITION", 0))
        );
    }

    #[test]
    fn user_semantic_is_upper_cased_and_indexed() {
        assert_eq!(
            parse_semantic("TexCoord3"),
            Ok(IndexedSemantic::user_defined("TEXCOORD", 3))
        );
    }

    #[test]
    fn system_value_is_case_insensitive() {
        assert_eq!(
            parse_semantic("sv_target1"),
            Ok(IndexedSemantic::system_value(SystemValue::Target, 1))
        );
        assert_eq!(
            parse_semantic("SV_Position"),
            Ok(IndexedSemantic::system_value(SystemValue::Position, 0))
        );
    }

    #[test]
    fn unknown_system_value_rejected() {
        assert_eq!(
            parse_semantic("SV_Bogus"),
            Err(SemanticError::UnknownSystemValue("SV_Bogus".to_string()))
        );
    }

    #[test]
    fn digits_only_rejected() {
        assert!(matches!(parse_semantic("42"), Err(SemanticError::Empty(_))));
    }

    #[test]
    fn display_reconstructs_name() {
        assert_eq!(
            IndexedSemantic::system_value(SystemValue::Target, 2).to_string(),
            "SV_Target2"
        );
        assert_eq!(IndexedSemantic::user_defined("NORMAL", 0).to_string(), "NORMAL");
    }

    #[test]
    fn stage_legality() {
        use IoDirection::*;
        assert!(SystemValue::Target.is_valid_for(ShaderTarget::Fragment, Output));
        assert!(!SystemValue::Target.is_valid_for(ShaderTarget::Vertex, Output));
        assert!(SystemValue::Position.is_valid_for(ShaderTarget::Vertex, Output));
        assert!(!SystemValue::Position.is_valid_for(ShaderTarget::Vertex, Input));
        assert!(SystemValue::VertexID.is_valid_for(ShaderTarget::Vertex, Input));
        assert!(SystemValue::DispatchThreadID.is_valid_for(ShaderTarget::Compute, Input));
        assert!(!SystemValue::DispatchThreadID.is_valid_for(ShaderTarget::Fragment, Input));
    }

    #[test]
    fn legacy_names_map_by_stage() {
        let color = IndexedSemantic::user_defined("COLOR", 0);
        assert_eq!(
            legacy_system_value(&color, ShaderTarget::Fragment, IoDirection::Output),
            Some(SystemValue::Target)
        );
        assert_eq!(
            legacy_system_value(&color, ShaderTarget::Vertex, IoDirection::Output),
            None
        );
    }
}
