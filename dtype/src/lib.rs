//! Scalar data types for lowered statements.
//!
//! Every `Expression` node of the iteration/expression tree carries the type of
//! the value it assigns. Stencil kernels only ever deal with scalar element
//! types, so unlike general tensor dtypes there are no vector, pointer or image
//! variants here.


/// Scalar element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(strum::AsRefStr, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    Bool,

    Int8,
    Int16,
    Int32,
    Int64,

    UInt8,
    UInt16,
    UInt32,
    UInt64,

    Float16,
    #[default]
    Float32,
    Float64,

    /// Index type for loop counters and subscript arithmetic.
    Index,
}
