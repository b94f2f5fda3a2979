// shdc — Shader Decoration Compiler
//
// Library root. Semantic analysis of HLSL-style shader syntax trees: name
// binding, type checking, and entry-point interface classification.

pub mod analyzer;
pub mod ast;
pub mod builder;
pub mod config;
pub mod diag;
pub mod dump;
pub mod hlsl;
pub mod id;
pub mod intrinsics;
pub mod overload;
pub mod reference;
pub mod semantic;
pub mod symbol_table;
pub mod types;

pub use analyzer::{decorate, Analyzer, DecorateResult, Decorator};
pub use config::{ShaderInput, ShaderOutput};
