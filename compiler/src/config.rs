// config.rs — Shader input/output specifications
//
// Opaque configuration values consumed read-only by the dialect decorator:
// which function is the entry point, which pipeline stage it targets, which
// source dialect version and shader model the source is written against,
// and which reports the caller wants to see.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Shader stage ─────────────────────────────────────────────────────────

/// Pipeline stage the entry point is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderTarget {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderTarget::Vertex => "vertex shader",
            ShaderTarget::TessControl => "tessellation-control shader",
            ShaderTarget::TessEvaluation => "tessellation-evaluation shader",
            ShaderTarget::Geometry => "geometry shader",
            ShaderTarget::Fragment => "fragment shader",
            ShaderTarget::Compute => "compute shader",
        };
        f.write_str(name)
    }
}

// ── Source dialect version ───────────────────────────────────────────────

/// Version of the HLSL dialect the source is written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InputShaderVersion {
    Hlsl3,
    Hlsl4,
    Hlsl5,
}

// ── Shader model ─────────────────────────────────────────────────────────

/// Target shader model, `major.minor` (e.g. `5.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

impl ShaderModel {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for ShaderModel {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ShaderModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').unwrap_or((s, "0"));
        let major = major
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid shader model '{s}'"))?;
        let minor = minor
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid shader model '{s}'"))?;
        Ok(ShaderModel { major, minor })
    }
}

// ── Input / output specifications ────────────────────────────────────────

/// Source-side configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderInput {
    /// Name of the entry-point function.
    pub entry_point: String,
    pub shader_target: ShaderTarget,
    pub shader_version: InputShaderVersion,
    pub shader_model: ShaderModel,
}

impl Default for ShaderInput {
    fn default() -> Self {
        ShaderInput {
            entry_point: "main".to_string(),
            shader_target: ShaderTarget::Vertex,
            shader_version: InputShaderVersion::Hlsl5,
            shader_model: ShaderModel::default(),
        }
    }
}

impl ShaderInput {
    pub fn new(entry_point: impl Into<String>, shader_target: ShaderTarget) -> Self {
        ShaderInput {
            entry_point: entry_point.into(),
            shader_target,
            ..Default::default()
        }
    }
}

/// Output-side configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderOutput {
    /// When false, warning reports are not submitted at all.
    pub warnings: bool,
}

impl Default for ShaderOutput {
    fn default() -> Self {
        ShaderOutput { warnings: true }
    }
}
