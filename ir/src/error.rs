use snafu::Snafu;

use crate::{Dimension, Expr};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Equation lhs is neither an array access nor a scalar symbol.
    #[snafu(display("equation lhs must be an indexed access or a symbol, got {lhs}"))]
    NonAssignableLhs { lhs: Expr },

    /// Binary interval operation over two different dimensions.
    #[snafu(display("interval dimension mismatch: {lhs} vs {rhs}"))]
    DimensionMismatch { lhs: Dimension, rhs: Dimension },

    /// A box was given two intervals over the same dimension.
    #[snafu(display("duplicate dimension {dim} in box"))]
    DuplicateDimension { dim: Dimension },

    /// Access arity does not match the function's dimensions.
    #[snafu(display("index arity mismatch for {function}: expected {expected} indices, got {actual}"))]
    IndexArityMismatch { function: String, expected: usize, actual: usize },

    /// Stepping dimensions must step over a root dimension.
    #[snafu(display("stepping dimension {name} cannot have derived parent {parent}"))]
    InvalidParent { name: String, parent: Dimension },

    /// Only stepping dimensions carry a buffer depth.
    #[snafu(display("dimension {dim} is not a stepping dimension"))]
    NotStepping { dim: Dimension },

    /// Modulo buffers need at least one slot.
    #[snafu(display("modulo depth must be positive, got {modulo}"))]
    InvalidModulo { modulo: usize },
}
