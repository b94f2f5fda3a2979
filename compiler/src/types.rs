// types.rs — Type denoters, conversion ranks, and cast rules
//
// A type denoter is the resolved, structural description of a type, distinct
// from its syntactic spelling. `TypeDenoter::Named` is the only unresolved
// form; the analyzer replaces it with the structure or aliased denoter it
// names. `TypeDenoter::Error` is the placeholder for a type that already
// failed to resolve: every rule below accepts it silently so that one root
// cause yields one report.
//
// Preconditions: none (pure functions over denoters).
// Postconditions: rank and cast predicates are deterministic.
// Failure modes: none; predicates return `None` / `false` on mismatch.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::DeclId;

// ── Scalars ─────────────────────────────────────────────────────────────────

/// Scalar element types, ordered by widening rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Int,
    UInt,
    Half,
    Float,
    Double,
}

impl ScalarType {
    /// Widening rank: a conversion to a strictly higher rank is a promotion.
    /// bool → int → uint → half → float → double
    fn rank(self) -> u8 {
        match self {
            ScalarType::Bool => 0,
            ScalarType::Int => 1,
            ScalarType::UInt => 2,
            ScalarType::Half => 3,
            ScalarType::Float => 4,
            ScalarType::Double => 5,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, ScalarType::Bool | ScalarType::Int | ScalarType::UInt)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Half => "half",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }

    /// The wider of two scalar types.
    pub fn max(self, other: ScalarType) -> ScalarType {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }
}

// ── Data types ──────────────────────────────────────────────────────────────

/// Built-in value types: scalars, vectors (2..=4), matrices (1..=4 × 1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Scalar(ScalarType),
    Vector(ScalarType, u8),
    Matrix(ScalarType, u8, u8),
    String,
}

impl DataType {
    pub fn scalar_type(self) -> Option<ScalarType> {
        match self {
            DataType::Scalar(s) | DataType::Vector(s, _) | DataType::Matrix(s, _, _) => Some(s),
            DataType::String => None,
        }
    }

    /// Total number of scalar components.
    pub fn component_count(self) -> Option<u32> {
        match self {
            DataType::Scalar(_) => Some(1),
            DataType::Vector(_, n) => Some(n as u32),
            DataType::Matrix(_, r, c) => Some(r as u32 * c as u32),
            DataType::String => None,
        }
    }

    /// Same shape with a different element type.
    pub fn with_scalar(self, scalar: ScalarType) -> DataType {
        match self {
            DataType::Scalar(_) => DataType::Scalar(scalar),
            DataType::Vector(_, n) => DataType::Vector(scalar, n),
            DataType::Matrix(_, r, c) => DataType::Matrix(scalar, r, c),
            DataType::String => DataType::String,
        }
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, DataType::Scalar(_))
    }

    /// Vector of `n` elements, collapsing `n == 1` to a scalar.
    pub fn vector_or_scalar(scalar: ScalarType, n: u8) -> DataType {
        if n <= 1 {
            DataType::Scalar(scalar)
        } else {
            DataType::Vector(scalar, n)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Scalar(s) => write!(f, "{}", s.name()),
            DataType::Vector(s, n) => write!(f, "{}{}", s.name(), n),
            DataType::Matrix(s, r, c) => write!(f, "{}{}x{}", s.name(), r, c),
            DataType::String => write!(f, "string"),
        }
    }
}

// ── Resource types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture2DMS,
    Texture3D,
    TextureCube,
    TextureCubeArray,
    Buffer,
    RWTexture2D,
    RWBuffer,
}

impl TextureKind {
    /// Number of coordinate components taken by `Sample`.
    pub fn sample_coord_dims(self) -> u8 {
        match self {
            TextureKind::Texture1D | TextureKind::Buffer | TextureKind::RWBuffer => 1,
            TextureKind::Texture1DArray
            | TextureKind::Texture2D
            | TextureKind::Texture2DMS
            | TextureKind::RWTexture2D => 2,
            TextureKind::Texture2DArray | TextureKind::Texture3D | TextureKind::TextureCube => 3,
            TextureKind::TextureCubeArray => 4,
        }
    }

    /// Number of integer components taken by `Load` (location plus mip level
    /// where the resource has mips).
    pub fn load_coord_dims(self) -> u8 {
        match self {
            TextureKind::Buffer | TextureKind::RWBuffer => 1,
            TextureKind::Texture2DMS | TextureKind::RWTexture2D => 2,
            other => other.sample_coord_dims() + 1,
        }
    }

    /// Whether the resource can be filtered through a sampler.
    pub fn is_sampleable(self) -> bool {
        !matches!(
            self,
            TextureKind::Buffer
                | TextureKind::RWBuffer
                | TextureKind::Texture2DMS
                | TextureKind::RWTexture2D
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureKind::Texture1D => "Texture1D",
            TextureKind::Texture1DArray => "Texture1DArray",
            TextureKind::Texture2D => "Texture2D",
            TextureKind::Texture2DArray => "Texture2DArray",
            TextureKind::Texture2DMS => "Texture2DMS",
            TextureKind::Texture3D => "Texture3D",
            TextureKind::TextureCube => "TextureCube",
            TextureKind::TextureCubeArray => "TextureCubeArray",
            TextureKind::Buffer => "Buffer",
            TextureKind::RWTexture2D => "RWTexture2D",
            TextureKind::RWBuffer => "RWBuffer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerKind {
    SamplerState,
    SamplerComparisonState,
    /// Legacy combined samplers (`sampler1D`, `sampler2D`, ...).
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
}

impl SamplerKind {
    pub fn is_legacy(self) -> bool {
        matches!(
            self,
            SamplerKind::Sampler1D
                | SamplerKind::Sampler2D
                | SamplerKind::Sampler3D
                | SamplerKind::SamplerCube
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SamplerKind::SamplerState => "SamplerState",
            SamplerKind::SamplerComparisonState => "SamplerComparisonState",
            SamplerKind::Sampler1D => "sampler1D",
            SamplerKind::Sampler2D => "sampler2D",
            SamplerKind::Sampler3D => "sampler3D",
            SamplerKind::SamplerCube => "samplerCUBE",
        }
    }
}

// ── Type denoter ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDenoter {
    Void,
    Base(DataType),
    Texture(TextureKind),
    Sampler(SamplerKind),
    /// A user type name not yet resolved to a structure or alias.
    Named(String),
    Struct {
        ident: String,
        decl: DeclId,
    },
    /// Array with one entry per dimension; `None` for an unsized dimension.
    Array {
        base: Box<TypeDenoter>,
        dims: Vec<Option<u32>>,
    },
    /// Placeholder for a type that already failed to resolve.
    Error,
}

impl TypeDenoter {
    pub fn scalar(scalar: ScalarType) -> Self {
        TypeDenoter::Base(DataType::Scalar(scalar))
    }

    pub fn vector(scalar: ScalarType, n: u8) -> Self {
        TypeDenoter::Base(DataType::Vector(scalar, n))
    }

    pub fn matrix(scalar: ScalarType, rows: u8, cols: u8) -> Self {
        TypeDenoter::Base(DataType::Matrix(scalar, rows, cols))
    }

    pub fn bool() -> Self {
        Self::scalar(ScalarType::Bool)
    }

    pub fn int() -> Self {
        Self::scalar(ScalarType::Int)
    }

    pub fn float() -> Self {
        Self::scalar(ScalarType::Float)
    }

    pub fn named(ident: impl Into<String>) -> Self {
        TypeDenoter::Named(ident.into())
    }

    pub fn array(base: TypeDenoter, dims: Vec<Option<u32>>) -> Self {
        TypeDenoter::Array {
            base: Box::new(base),
            dims,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeDenoter::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDenoter::Void)
    }

    pub fn as_base(&self) -> Option<DataType> {
        match self {
            TypeDenoter::Base(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Struct declaration this denoter refers to, looking through arrays.
    pub fn struct_decl(&self) -> Option<DeclId> {
        match self {
            TypeDenoter::Struct { decl, .. } => Some(*decl),
            TypeDenoter::Array { base, .. } => base.struct_decl(),
            _ => None,
        }
    }

    /// Element type after applying `count` subscripts to an array.
    pub fn subscripted(&self, count: usize) -> Option<TypeDenoter> {
        match self {
            TypeDenoter::Array { base, dims } if count <= dims.len() => {
                if count == dims.len() {
                    Some((**base).clone())
                } else {
                    Some(TypeDenoter::Array {
                        base: base.clone(),
                        dims: dims[count..].to_vec(),
                    })
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeDenoter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDenoter::Void => write!(f, "void"),
            TypeDenoter::Base(dt) => write!(f, "{}", dt),
            TypeDenoter::Texture(kind) => write!(f, "{}", kind.name()),
            TypeDenoter::Sampler(kind) => write!(f, "{}", kind.name()),
            TypeDenoter::Named(ident) => write!(f, "{}", ident),
            TypeDenoter::Struct { ident, .. } => write!(f, "struct {}", ident),
            TypeDenoter::Array { base, dims } => {
                write!(f, "{}", base)?;
                for dim in dims {
                    match dim {
                        Some(n) => write!(f, "[{}]", n)?,
                        None => write!(f, "[]")?,
                    }
                }
                Ok(())
            }
            TypeDenoter::Error => write!(f, "<error>"),
        }
    }
}

// ── Conversion ranks ────────────────────────────────────────────────────────

/// Cost of an implicit conversion, used to order overload candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConversionRank {
    /// Identical types.
    Exact,
    /// Scalar widening along the rank chain, same shape.
    Promotion,
    /// Any other implicit conversion: narrowing, splat, truncation.
    Conversion,
}

fn scalar_rank(from: ScalarType, to: ScalarType) -> ConversionRank {
    if from == to {
        ConversionRank::Exact
    } else if from.rank() < to.rank() {
        ConversionRank::Promotion
    } else {
        ConversionRank::Conversion
    }
}

/// Shape part of an implicit conversion between built-in types.
fn shape_rank(from: DataType, to: DataType) -> Option<ConversionRank> {
    use DataType::*;
    match (from, to) {
        (Scalar(_), Scalar(_)) => Some(ConversionRank::Exact),
        (Vector(_, a), Vector(_, b)) if a == b => Some(ConversionRank::Exact),
        (Matrix(_, r0, c0), Matrix(_, r1, c1)) if r0 == r1 && c0 == c1 => {
            Some(ConversionRank::Exact)
        }
        // Splat a scalar across all components.
        (Scalar(_), Vector(..)) | (Scalar(_), Matrix(..)) => Some(ConversionRank::Conversion),
        // Truncation keeps the leading components.
        (Vector(..), Scalar(_)) | (Matrix(..), Scalar(_)) => Some(ConversionRank::Conversion),
        (Vector(_, a), Vector(_, b)) if b < a => Some(ConversionRank::Conversion),
        (Matrix(_, r0, c0), Matrix(_, r1, c1)) if r1 <= r0 && c1 <= c0 => {
            Some(ConversionRank::Conversion)
        }
        _ => None,
    }
}

/// Rank of the implicit conversion from `from` to `to`, or `None` if no
/// implicit conversion exists.
pub fn implicit_rank(from: &TypeDenoter, to: &TypeDenoter) -> Option<ConversionRank> {
    if from.is_error() || to.is_error() || from == to {
        return Some(ConversionRank::Exact);
    }
    match (from, to) {
        (TypeDenoter::Base(DataType::String), _) | (_, TypeDenoter::Base(DataType::String)) => None,
        (TypeDenoter::Base(a), TypeDenoter::Base(b)) => {
            let shape = shape_rank(*a, *b)?;
            let scalar = scalar_rank(a.scalar_type()?, b.scalar_type()?);
            Some(shape.max(scalar))
        }
        _ => None,
    }
}

/// True if converting `from` to `to` implicitly drops vector components.
pub fn is_implicit_truncation(from: &TypeDenoter, to: &TypeDenoter) -> bool {
    match (from.as_base(), to.as_base()) {
        (Some(DataType::Vector(_, a)), Some(DataType::Vector(_, b))) => b < a,
        (Some(DataType::Vector(..)), Some(DataType::Scalar(_))) => true,
        (Some(DataType::Matrix(_, r0, c0)), Some(DataType::Matrix(_, r1, c1))) => {
            r1 < r0 || c1 < c0
        }
        _ => false,
    }
}

// ── Cast validation ─────────────────────────────────────────────────────────

/// Access to structure layouts, needed to compare structures by shape.
pub trait StructLayout {
    /// Resolved member types of a structure, in declaration order.
    fn struct_member_types(&self, decl: DeclId) -> Vec<TypeDenoter>;
}

/// Explicit cast rule: everything implicit, plus vector ↔ matrix reshapes of
/// the same component count and structurally equivalent structures.
pub fn can_cast(from: &TypeDenoter, to: &TypeDenoter, layout: &dyn StructLayout) -> bool {
    if implicit_rank(from, to).is_some() {
        return true;
    }
    match (from, to) {
        (TypeDenoter::Base(a), TypeDenoter::Base(b)) => {
            let reshapable = matches!(
                (a, b),
                (DataType::Vector(..), DataType::Matrix(..))
                    | (DataType::Matrix(..), DataType::Vector(..))
            );
            reshapable && a.component_count() == b.component_count()
        }
        (TypeDenoter::Struct { decl: a, .. }, TypeDenoter::Struct { decl: b, .. }) => {
            structurally_equivalent(*a, *b, layout, 0)
        }
        (
            TypeDenoter::Array { base: b0, dims: d0 },
            TypeDenoter::Array { base: b1, dims: d1 },
        ) => d0 == d1 && can_cast(b0, b1, layout),
        _ => false,
    }
}

const MAX_STRUCT_DEPTH: usize = 32;

fn structurally_equivalent(a: DeclId, b: DeclId, layout: &dyn StructLayout, depth: usize) -> bool {
    if a == b {
        return true;
    }
    if depth > MAX_STRUCT_DEPTH {
        return false;
    }
    let ma = layout.struct_member_types(a);
    let mb = layout.struct_member_types(b);
    ma.len() == mb.len()
        && ma.iter().zip(&mb).all(|(x, y)| match (x, y) {
            (TypeDenoter::Struct { decl: da, .. }, TypeDenoter::Struct { decl: db, .. }) => {
                structurally_equivalent(*da, *db, layout, depth + 1)
            }
            _ => x == y,
        })
}

// ── Operator typing helpers ─────────────────────────────────────────────────

/// Common type of two built-in operands: the wider scalar with the smaller
/// compatible shape. `None` when the shapes cannot be combined.
pub fn common_base_type(a: DataType, b: DataType) -> Option<DataType> {
    use DataType::*;
    let scalar = a.scalar_type()?.max(b.scalar_type()?);
    let shape = match (a, b) {
        (Scalar(_), other) | (other, Scalar(_)) => other,
        (Vector(_, n), Vector(_, m)) => Vector(scalar, n.min(m)),
        (Matrix(_, r0, c0), Matrix(_, r1, c1)) => Matrix(scalar, r0.min(r1), c0.min(c1)),
        _ => return None,
    };
    Some(shape.with_scalar(scalar))
}
