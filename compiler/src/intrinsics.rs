// intrinsics.rs — HLSL intrinsic and texture-method signature table
//
// Each entry fixes the arity, a per-argument class constraint, the return
// type rule, and the minimum shader model of one built-in. Argument classes
// are deliberately coarse: numeric arguments convert implicitly, so only
// category mismatches (resource vs. value, vector shapes for `cross`, texture
// coordinate widths) are rejected here.
//
// Preconditions: argument types are already computed (may be `Error`).
// Postconditions: `check_call` returns the call's result type or the first
//   violated constraint.
// Failure modes: wrong arity, argument outside its class, incompatible
//   `mul` shapes, too-narrow texture coordinates.
// Side effects: none.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ShaderModel;
use crate::types::{common_base_type, DataType, SamplerKind, ScalarType, TextureKind, TypeDenoter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intrinsic {
    Abs,
    Acos,
    All,
    Any,
    AsFloat,
    AsInt,
    AsUInt,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Clamp,
    Clip,
    Cos,
    CountBits,
    Cross,
    Ddx,
    Ddy,
    Degrees,
    Determinant,
    Distance,
    Dot,
    Exp,
    Exp2,
    FirstBitHigh,
    Floor,
    Fmod,
    Frac,
    GroupMemoryBarrierWithGroupSync,
    InterlockedAdd,
    Length,
    Lerp,
    Log,
    Log2,
    Mad,
    Max,
    Min,
    Mul,
    Normalize,
    Pow,
    Radians,
    Reflect,
    Refract,
    ReverseBits,
    Round,
    Rsqrt,
    Saturate,
    Sign,
    Sin,
    Sincos,
    Smoothstep,
    Sqrt,
    Step,
    Tan,
    Tanh,
    Tex2D,
    Tex2DLod,
    TexCube,
    Transpose,
    Trunc,
    TextureSample,
    TextureSampleLevel,
    TextureSampleGrad,
    TextureSampleCmp,
    TextureLoad,
    TextureGetDimensions,
}

/// Constraint on one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgClass {
    /// Any scalar, vector, or matrix value.
    Numeric,
    /// Scalar or vector with integral elements.
    Integral,
    /// Exactly three components.
    Vector3,
    /// A square matrix.
    SquareMatrix,
    /// A sampler state object (not a legacy combined sampler).
    SamplerState,
    /// A comparison sampler state.
    ComparisonSampler,
    /// A legacy combined sampler (`sampler2D`, ...).
    LegacySampler,
    /// Texture coordinate sized for the called-on texture's `Sample`.
    SampleCoord,
    /// Integer location sized for the called-on texture's `Load`.
    LoadCoord,
    /// Numeric l-value written by the intrinsic.
    OutNumeric,
}

impl ArgClass {
    pub fn is_output(self) -> bool {
        matches!(self, ArgClass::OutNumeric)
    }

    fn describe(self) -> &'static str {
        match self {
            ArgClass::Numeric | ArgClass::OutNumeric => "a numeric value",
            ArgClass::Integral => "an integral value",
            ArgClass::Vector3 => "a 3-component vector",
            ArgClass::SquareMatrix => "a square matrix",
            ArgClass::SamplerState => "a SamplerState",
            ArgClass::ComparisonSampler => "a SamplerComparisonState",
            ArgClass::LegacySampler => "a legacy sampler",
            ArgClass::SampleCoord => "a texture coordinate",
            ArgClass::LoadCoord => "an integer texture location",
        }
    }
}

/// How the result type derives from the arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnRule {
    Void,
    /// Type of argument `n`.
    SameAs(usize),
    /// Common type of all arguments.
    Common,
    /// Scalar of argument `n`'s element type.
    ScalarOf(usize),
    /// Shape of argument `n` with the given element type.
    ShapeOf(usize, ScalarType),
    Fixed(DataType),
    /// Matrix/vector product rules.
    Mul,
    Transpose,
    /// Element type of the called-on texture.
    TextureElement,
}

#[derive(Debug, Clone, Copy)]
pub struct IntrinsicEntry {
    pub intrinsic: Intrinsic,
    pub name: &'static str,
    pub params: &'static [ArgClass],
    /// Additional trailing arguments of the last class allowed.
    pub extra: u8,
    pub returns: ReturnRule,
    pub min_model: ShaderModel,
}

const SM2: ShaderModel = ShaderModel::new(2, 0);
const SM4: ShaderModel = ShaderModel::new(4, 0);
const SM5: ShaderModel = ShaderModel::new(5, 0);

const FLOAT: DataType = DataType::Scalar(ScalarType::Float);
const FLOAT4: DataType = DataType::Vector(ScalarType::Float, 4);

macro_rules! entry {
    ($intr:ident, $name:literal, [$($arg:ident),*], $ret:expr, $model:expr) => {
        entry!($intr, $name, [$($arg),*], 0, $ret, $model)
    };
    ($intr:ident, $name:literal, [$($arg:ident),*], $extra:literal, $ret:expr, $model:expr) => {
        IntrinsicEntry {
            intrinsic: Intrinsic::$intr,
            name: $name,
            params: &[$(ArgClass::$arg),*],
            extra: $extra,
            returns: $ret,
            min_model: $model,
        }
    };
}

use ReturnRule::*;

static INTRINSICS: &[IntrinsicEntry] = &[
    entry!(Abs, "abs", [Numeric], SameAs(0), SM2),
    entry!(Acos, "acos", [Numeric], SameAs(0), SM2),
    entry!(All, "all", [Numeric], Fixed(DataType::Scalar(ScalarType::Bool)), SM2),
    entry!(Any, "any", [Numeric], Fixed(DataType::Scalar(ScalarType::Bool)), SM2),
    entry!(AsFloat, "asfloat", [Numeric], ShapeOf(0, ScalarType::Float), SM4),
    entry!(AsInt, "asint", [Numeric], ShapeOf(0, ScalarType::Int), SM4),
    entry!(AsUInt, "asuint", [Numeric], ShapeOf(0, ScalarType::UInt), SM4),
    entry!(Asin, "asin", [Numeric], SameAs(0), SM2),
    entry!(Atan, "atan", [Numeric], SameAs(0), SM2),
    entry!(Atan2, "atan2", [Numeric, Numeric], Common, SM2),
    entry!(Ceil, "ceil", [Numeric], SameAs(0), SM2),
    entry!(Clamp, "clamp", [Numeric, Numeric, Numeric], Common, SM2),
    entry!(Clip, "clip", [Numeric], Void, SM2),
    entry!(Cos, "cos", [Numeric], SameAs(0), SM2),
    entry!(CountBits, "countbits", [Integral], ShapeOf(0, ScalarType::UInt), SM5),
    entry!(Cross, "cross", [Vector3, Vector3], Common, SM2),
    entry!(Ddx, "ddx", [Numeric], SameAs(0), SM2),
    entry!(Ddy, "ddy", [Numeric], SameAs(0), SM2),
    entry!(Degrees, "degrees", [Numeric], SameAs(0), SM2),
    entry!(Determinant, "determinant", [SquareMatrix], ScalarOf(0), SM2),
    entry!(Distance, "distance", [Numeric, Numeric], ScalarOf(0), SM2),
    entry!(Dot, "dot", [Numeric, Numeric], ScalarOf(0), SM2),
    entry!(Exp, "exp", [Numeric], SameAs(0), SM2),
    entry!(Exp2, "exp2", [Numeric], SameAs(0), SM2),
    entry!(FirstBitHigh, "firstbithigh", [Integral], ShapeOf(0, ScalarType::Int), SM5),
    entry!(Floor, "floor", [Numeric], SameAs(0), SM2),
    entry!(Fmod, "fmod", [Numeric, Numeric], Common, SM2),
    entry!(Frac, "frac", [Numeric], SameAs(0), SM2),
    entry!(GroupMemoryBarrierWithGroupSync, "GroupMemoryBarrierWithGroupSync", [], Void, SM5),
    entry!(InterlockedAdd, "InterlockedAdd", [OutNumeric, Integral, OutNumeric], Void, SM5),
    entry!(Length, "length", [Numeric], ScalarOf(0), SM2),
    entry!(Lerp, "lerp", [Numeric, Numeric, Numeric], Common, SM2),
    entry!(Log, "log", [Numeric], SameAs(0), SM2),
    entry!(Log2, "log2", [Numeric], SameAs(0), SM2),
    entry!(Mad, "mad", [Numeric, Numeric, Numeric], Common, SM5),
    entry!(Max, "max", [Numeric, Numeric], Common, SM2),
    entry!(Min, "min", [Numeric, Numeric], Common, SM2),
    entry!(Mul, "mul", [Numeric, Numeric], Mul, SM2),
    entry!(Normalize, "normalize", [Numeric], SameAs(0), SM2),
    entry!(Pow, "pow", [Numeric, Numeric], Common, SM2),
    entry!(Radians, "radians", [Numeric], SameAs(0), SM2),
    entry!(Reflect, "reflect", [Numeric, Numeric], SameAs(0), SM2),
    entry!(Refract, "refract", [Numeric, Numeric, Numeric], SameAs(0), SM2),
    entry!(ReverseBits, "reversebits", [Integral], SameAs(0), SM5),
    entry!(Round, "round", [Numeric], SameAs(0), SM2),
    entry!(Rsqrt, "rsqrt", [Numeric], SameAs(0), SM2),
    entry!(Saturate, "saturate", [Numeric], SameAs(0), SM2),
    entry!(Sign, "sign", [Numeric], ShapeOf(0, ScalarType::Int), SM2),
    entry!(Sin, "sin", [Numeric], SameAs(0), SM2),
    entry!(Sincos, "sincos", [Numeric, OutNumeric, OutNumeric], Void, SM2),
    entry!(Smoothstep, "smoothstep", [Numeric, Numeric, Numeric], Common, SM2),
    entry!(Sqrt, "sqrt", [Numeric], SameAs(0), SM2),
    entry!(Step, "step", [Numeric, Numeric], Common, SM2),
    entry!(Tan, "tan", [Numeric], SameAs(0), SM2),
    entry!(Tanh, "tanh", [Numeric], SameAs(0), SM2),
    entry!(Tex2D, "tex2D", [LegacySampler, Numeric], Fixed(FLOAT4), SM2),
    entry!(Tex2DLod, "tex2Dlod", [LegacySampler, Numeric], Fixed(FLOAT4), SM2),
    entry!(TexCube, "texCUBE", [LegacySampler, Numeric], Fixed(FLOAT4), SM2),
    entry!(Transpose, "transpose", [Numeric], Transpose, SM2),
    entry!(Trunc, "trunc", [Numeric], SameAs(0), SM2),
];

static TEXTURE_METHODS: &[IntrinsicEntry] = &[
    entry!(TextureSample, "Sample", [SamplerState, SampleCoord], TextureElement, SM4),
    entry!(TextureSampleLevel, "SampleLevel", [SamplerState, SampleCoord, Numeric], TextureElement, SM4),
    entry!(TextureSampleGrad, "SampleGrad", [SamplerState, SampleCoord, Numeric, Numeric], TextureElement, SM4),
    entry!(TextureSampleCmp, "SampleCmp", [ComparisonSampler, SampleCoord, Numeric], Fixed(FLOAT), SM4),
    entry!(TextureLoad, "Load", [LoadCoord], TextureElement, SM4),
    entry!(TextureGetDimensions, "GetDimensions", [OutNumeric], 3, Void, SM4),
];

fn index_table(table: &'static [IntrinsicEntry]) -> HashMap<&'static str, &'static IntrinsicEntry> {
    table.iter().map(|e| (e.name, e)).collect()
}

/// Look up a free-function intrinsic by name.
pub fn lookup(name: &str) -> Option<&'static IntrinsicEntry> {
    static MAP: OnceLock<HashMap<&'static str, &'static IntrinsicEntry>> = OnceLock::new();
    MAP.get_or_init(|| index_table(INTRINSICS)).get(name).copied()
}

/// Look up a texture method by name.
pub fn lookup_method(name: &str) -> Option<&'static IntrinsicEntry> {
    static MAP: OnceLock<HashMap<&'static str, &'static IntrinsicEntry>> = OnceLock::new();
    MAP.get_or_init(|| index_table(TEXTURE_METHODS)).get(name).copied()
}

// ── Call checking ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrinsicError {
    #[error("'{name}' expects {expected} argument(s), but got {found}")]
    Arity {
        name: &'static str,
        expected: String,
        found: usize,
    },
    #[error("argument {index} of '{name}' must be {expected}, but is '{found}'")]
    Argument {
        name: &'static str,
        index: usize,
        expected: &'static str,
        found: TypeDenoter,
    },
    #[error("texture coordinate for '{name}' needs {required} component(s), but has {found}")]
    CoordWidth {
        name: &'static str,
        required: u8,
        found: u32,
    },
    #[error("'{name}' cannot be called on a {texture}")]
    NotSampleable {
        name: &'static str,
        texture: &'static str,
    },
    #[error("incompatible operand types '{lhs}' and '{rhs}' for '{name}'")]
    Shapes {
        name: &'static str,
        lhs: TypeDenoter,
        rhs: TypeDenoter,
    },
}

/// The texture a method is called on.
#[derive(Debug, Clone, Copy)]
pub struct TextureObject {
    pub kind: TextureKind,
    pub element: DataType,
}

impl IntrinsicEntry {
    fn arity_ok(&self, found: usize) -> bool {
        let min = self.params.len();
        found >= min && found <= min + self.extra as usize
    }

    fn arity_text(&self) -> String {
        let min = self.params.len();
        if self.extra == 0 {
            min.to_string()
        } else {
            format!("{} to {}", min, min + self.extra as usize)
        }
    }

    /// Class constraining argument `index`.
    pub fn class_of(&self, index: usize) -> Option<ArgClass> {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
    }

    /// Validate argument types and compute the result type.
    pub fn check_call(
        &self,
        args: &[TypeDenoter],
        object: Option<TextureObject>,
    ) -> Result<TypeDenoter, IntrinsicError> {
        if !self.arity_ok(args.len()) {
            return Err(IntrinsicError::Arity {
                name: self.name,
                expected: self.arity_text(),
                found: args.len(),
            });
        }
        if let Some(tex) = object {
            let samples = matches!(
                self.intrinsic,
                Intrinsic::TextureSample
                    | Intrinsic::TextureSampleLevel
                    | Intrinsic::TextureSampleGrad
                    | Intrinsic::TextureSampleCmp
            );
            if samples && !tex.kind.is_sampleable() {
                return Err(IntrinsicError::NotSampleable {
                    name: self.name,
                    texture: tex.kind.name(),
                });
            }
        }
        for (index, arg) in args.iter().enumerate() {
            let Some(class) = self.class_of(index) else {
                continue;
            };
            self.check_arg(index, class, arg, object)?;
        }
        self.result_type(args, object)
    }

    fn check_arg(
        &self,
        index: usize,
        class: ArgClass,
        arg: &TypeDenoter,
        object: Option<TextureObject>,
    ) -> Result<(), IntrinsicError> {
        if arg.is_error() {
            return Ok(());
        }
        let bad = || IntrinsicError::Argument {
            name: self.name,
            index: index + 1,
            expected: class.describe(),
            found: arg.clone(),
        };
        let base = arg.as_base().filter(|dt| *dt != DataType::String);
        let ok = match class {
            ArgClass::Numeric | ArgClass::OutNumeric => base.is_some(),
            ArgClass::Integral => base
                .filter(|dt| !matches!(dt, DataType::Matrix(..)))
                .and_then(DataType::scalar_type)
                .is_some_and(ScalarType::is_integral),
            ArgClass::Vector3 => base.and_then(DataType::component_count) == Some(3),
            ArgClass::SquareMatrix => matches!(base, Some(DataType::Matrix(_, r, c)) if r == c),
            ArgClass::SamplerState => matches!(arg, TypeDenoter::Sampler(SamplerKind::SamplerState)),
            ArgClass::ComparisonSampler => {
                matches!(arg, TypeDenoter::Sampler(SamplerKind::SamplerComparisonState))
            }
            ArgClass::LegacySampler => matches!(arg, TypeDenoter::Sampler(k) if k.is_legacy()),
            ArgClass::SampleCoord | ArgClass::LoadCoord => {
                let Some(dt) = base else {
                    return Err(bad());
                };
                if class == ArgClass::LoadCoord
                    && !dt.scalar_type().is_some_and(ScalarType::is_integral)
                {
                    return Err(bad());
                }
                let required = object.map_or(1, |tex| {
                    if class == ArgClass::SampleCoord {
                        tex.kind.sample_coord_dims()
                    } else {
                        tex.kind.load_coord_dims()
                    }
                });
                let found = dt.component_count().unwrap_or(0);
                if found < required as u32 {
                    return Err(IntrinsicError::CoordWidth {
                        name: self.name,
                        required,
                        found,
                    });
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(bad())
        }
    }

    fn result_type(
        &self,
        args: &[TypeDenoter],
        object: Option<TextureObject>,
    ) -> Result<TypeDenoter, IntrinsicError> {
        if args.iter().any(TypeDenoter::is_error) {
            return Ok(TypeDenoter::Error);
        }
        let base_of = |n: usize| args.get(n).and_then(TypeDenoter::as_base);
        let ty = match self.returns {
            ReturnRule::Void => TypeDenoter::Void,
            ReturnRule::SameAs(n) => args.get(n).cloned().unwrap_or(TypeDenoter::Error),
            ReturnRule::Common => {
                let mut common = base_of(0);
                for n in 1..args.len() {
                    common = match (common, base_of(n)) {
                        (Some(a), Some(b)) => common_base_type(a, b),
                        _ => None,
                    };
                }
                match common {
                    Some(dt) => TypeDenoter::Base(dt),
                    None => {
                        return Err(IntrinsicError::Shapes {
                            name: self.name,
                            lhs: args[0].clone(),
                            rhs: args.last().cloned().unwrap_or(TypeDenoter::Error),
                        })
                    }
                }
            }
            ReturnRule::ScalarOf(n) => base_of(n)
                .and_then(DataType::scalar_type)
                .map(TypeDenoter::scalar)
                .unwrap_or(TypeDenoter::Error),
            ReturnRule::ShapeOf(n, scalar) => base_of(n)
                .map(|dt| TypeDenoter::Base(dt.with_scalar(scalar)))
                .unwrap_or(TypeDenoter::Error),
            ReturnRule::Fixed(dt) => TypeDenoter::Base(dt),
            ReturnRule::Mul => match (base_of(0), base_of(1)) {
                (Some(a), Some(b)) => match mul_result(a, b) {
                    Some(dt) => TypeDenoter::Base(dt),
                    None => {
                        return Err(IntrinsicError::Shapes {
                            name: self.name,
                            lhs: args[0].clone(),
                            rhs: args[1].clone(),
                        })
                    }
                },
                _ => TypeDenoter::Error,
            },
            ReturnRule::Transpose => match base_of(0) {
                Some(DataType::Matrix(s, r, c)) => TypeDenoter::matrix(s, c, r),
                Some(dt) => TypeDenoter::Base(dt),
                None => TypeDenoter::Error,
            },
            ReturnRule::TextureElement => TypeDenoter::Base(
                object.map_or(FLOAT4, |tex| tex.element),
            ),
        };
        Ok(ty)
    }
}

/// Result shape of `mul(a, b)`.
pub fn mul_result(a: DataType, b: DataType) -> Option<DataType> {
    use DataType::*;
    let scalar = a.scalar_type()?.max(b.scalar_type()?);
    match (a, b) {
        (Scalar(_), other) | (other, Scalar(_)) => Some(other.with_scalar(scalar)),
        (Vector(_, n), Vector(_, m)) if n == m => Some(Scalar(scalar)),
        (Vector(_, n), Matrix(_, r, c)) if n == r => Some(DataType::vector_or_scalar(scalar, c)),
        (Matrix(_, r, c), Vector(_, n)) if c == n => Some(DataType::vector_or_scalar(scalar, r)),
        (Matrix(_, r0, c0), Matrix(_, r1, c1)) if c0 == r1 => Some(Matrix(scalar, r0, c1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(n: u8) -> TypeDenoter {
        if n == 1 {
            TypeDenoter::float()
        } else {
            TypeDenoter::vector(ScalarType::Float, n)
        }
    }

    #[test]
    fn lookup_free_and_method() {
        assert_eq!(lookup("dot").map(|e| e.intrinsic), Some(Intrinsic::Dot));
        assert!(lookup("Sample").is_none());
        assert_eq!(
            lookup_method("Sample").map(|e| e.intrinsic),
            Some(Intrinsic::TextureSample)
        );
    }

    #[test]
    fn dot_returns_scalar() {
        let e = lookup("dot").unwrap();
        assert_eq!(e.check_call(&[f(3), f(3)], None), Ok(TypeDenoter::float()));
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let e = lookup("dot").unwrap();
        assert!(matches!(
            e.check_call(&[f(3)], None),
            Err(IntrinsicError::Arity { found: 1, .. })
        ));
    }

    #[test]
    fn cross_requires_three_components() {
        let e = lookup("cross").unwrap();
        assert!(e.check_call(&[f(3), f(3)], None).is_ok());
        assert!(matches!(
            e.check_call(&[f(4), f(3)], None),
            Err(IntrinsicError::Argument { index: 1, .. })
        ));
    }

    #[test]
    fn mul_shapes() {
        let m44 = DataType::Matrix(ScalarType::Float, 4, 4);
        let v4 = DataType::Vector(ScalarType::Float, 4);
        let v3 = DataType::Vector(ScalarType::Float, 3);
        assert_eq!(mul_result(v4, m44), Some(v4));
        assert_eq!(mul_result(m44, v4), Some(v4));
        assert_eq!(mul_result(v3, m44), None);
        assert_eq!(
            mul_result(DataType::Scalar(ScalarType::Int), v3),
            Some(v3)
        );
    }

    #[test]
    fn sample_checks_sampler_and_coordinate_width() {
        let e = lookup_method("Sample").unwrap();
        let tex = TextureObject {
            kind: TextureKind::Texture2D,
            element: DataType::Vector(ScalarType::Float, 4),
        };
        let sampler = TypeDenoter::Sampler(SamplerKind::SamplerState);
        assert_eq!(
            e.check_call(&[sampler.clone(), f(2)], Some(tex)),
            Ok(f(4))
        );
        assert!(matches!(
            e.check_call(&[sampler, f(1)], Some(tex)),
            Err(IntrinsicError::CoordWidth { required: 2, found: 1, .. })
        ));
        assert!(matches!(
            e.check_call(&[f(2), f(2)], Some(tex)),
            Err(IntrinsicError::Argument { index: 1, .. })
        ));
    }

    #[test]
    fn load_requires_integral_location() {
        let e = lookup_method("Load").unwrap();
        let tex = TextureObject {
            kind: TextureKind::Texture2D,
            element: DataType::Vector(ScalarType::Float, 4),
        };
        let int3 = TypeDenoter::vector(ScalarType::Int, 3);
        assert_eq!(e.check_call(&[int3], Some(tex)), Ok(f(4)));
        assert!(e.check_call(&[f(3)], Some(tex)).is_err());
    }

    #[test]
    fn get_dimensions_accepts_variable_outputs() {
        let e = lookup_method("GetDimensions").unwrap();
        let u = TypeDenoter::scalar(ScalarType::UInt);
        assert!(e.check_call(&[u.clone(), u.clone()], None).is_ok());
        assert!(e.check_call(&vec![u.clone(); 4], None).is_ok());
        assert!(e.check_call(&vec![u; 5], None).is_err());
    }

    #[test]
    fn error_arguments_do_not_cascade() {
        let e = lookup("normalize").unwrap();
        assert_eq!(e.check_call(&[TypeDenoter::Error], None), Ok(TypeDenoter::Error));
    }

    #[test]
    fn shader_model_requirements() {
        assert_eq!(lookup("mad").unwrap().min_model, ShaderModel::new(5, 0));
        assert_eq!(lookup("sin").unwrap().min_model, ShaderModel::new(2, 0));
    }
}
