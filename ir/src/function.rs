//! Discretised functions: the arrays equations read and write.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bon::bon;
use snafu::ensure;
use tessera_dtype::DType;

use crate::dimension::Dimension;
use crate::error::{IndexArityMismatchSnafu, Result};
use crate::expr::{Expr, Indexed};

static FUNCTION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage class of a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    /// User-visible array that outlives the kernel.
    #[default]
    Persistent,
    /// Compiler-introduced scratch array. Only temporaries may be contracted
    /// into scalars.
    Temporary,
}

#[derive(Debug)]
struct FunctionData {
    id: u64,
    name: Arc<str>,
    dimensions: Vec<Dimension>,
    shape: Vec<usize>,
    dtype: DType,
    kind: FunctionKind,
}

/// Shared handle to a function; equality is identity.
#[derive(Debug, Clone)]
pub struct Function(Arc<FunctionData>);

#[bon]
impl Function {
    #[builder]
    pub fn new(
        #[builder(into)] name: Arc<str>,
        dimensions: Vec<Dimension>,
        #[builder(default)] shape: Vec<usize>,
        #[builder(default)] dtype: DType,
        #[builder(default)] kind: FunctionKind,
    ) -> Self {
        Self(Arc::new(FunctionData {
            id: FUNCTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            name,
            dimensions,
            shape,
            dtype,
            kind,
        }))
    }
}

impl Function {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.0.dimensions
    }

    /// Concrete extent per dimension; empty when unknown.
    pub fn shape(&self) -> &[usize] {
        &self.0.shape
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype
    }

    pub fn kind(&self) -> FunctionKind {
        self.0.kind
    }

    pub fn is_temporary(&self) -> bool {
        self.0.kind == FunctionKind::Temporary
    }

    pub fn is_persistent(&self) -> bool {
        self.0.kind == FunctionKind::Persistent
    }

    /// Access at the function's own dimensions, `f[d0, d1, ...]`.
    pub fn indexify(&self) -> Expr {
        Expr::indexed(self.clone(), self.dimensions().iter().map(Expr::dim).collect())
    }

    /// Access at explicit indices.
    pub fn at(&self, indices: impl IntoIterator<Item = Expr>) -> Result<Expr> {
        let indices: Vec<Expr> = indices.into_iter().collect();
        ensure!(
            indices.len() == self.dimensions().len(),
            IndexArityMismatchSnafu { function: self.name(), expected: self.dimensions().len(), actual: indices.len() }
        );
        Ok(Expr::Indexed(Indexed::new(self.clone(), indices)))
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
