//! Symbolic core of the Tessera stencil compiler.
//!
//! This crate holds the values the clustering and IET passes operate on:
//! iteration dimensions, symbolic expressions, equations with their data
//! spaces, and the dependence analysis used to decide what can be fused.
//!
//! # Module Organization
//!
//! - [`dimension`] - Dimensions, their kinds and the interning registry
//! - [`expr`] - Canonicalising symbolic expressions
//! - [`function`] - Arrays read and written by equations
//! - [`interval`] - Interval, box and schedule algebra
//! - [`stencil`] - Access offsets per dimension
//! - [`equation`] - Equations and data-space derivation
//! - [`scope`] - Flow, anti and output dependences
//! - [`ordering`] - Partial-order merging
//! - [`error`] - Error types and result handling

pub mod dimension;
pub mod equation;
pub mod error;
pub mod expr;
pub mod function;
pub mod interval;
pub mod ordering;
pub mod prelude;
pub mod scope;
pub mod stencil;


pub use dimension::{DEFAULT_MODULO, Dimension, DimensionKind, DimensionRegistry, Limits};
pub use equation::Eq;
pub use error::{Error, Result};
pub use expr::{ConstFloat, Expr, Indexed, Symbol, SymbolKind};
pub use function::{Function, FunctionKind};
pub use interval::{Interval, IntervalBox, Schedule, ScheduleKey, time_first};
pub use ordering::partial_order;
pub use scope::{Access, AccessMode, Dependence, DependenceKind, DependenceSet, Scope, Storage};
pub use stencil::Stencil;

pub use tessera_dtype::DType;
