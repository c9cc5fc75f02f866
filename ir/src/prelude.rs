//! Common imports for building equations:
//!
//! ```rust,ignore
//! use tessera_ir::prelude::*;
//! ```

pub use crate::dimension::{Dimension, DimensionRegistry};
pub use crate::equation::Eq;
pub use crate::expr::{Expr, Symbol};
pub use crate::function::{Function, FunctionKind};
pub use crate::interval::{Interval, IntervalBox, Schedule};
pub use crate::scope::{Scope, Storage};

pub use tessera_dtype::DType;
