//! Access offsets per dimension.

use std::collections::{BTreeMap, BTreeSet};

use crate::dimension::Dimension;
use crate::expr::Expr;

/// Offsets at which each dimension is accessed.
///
/// Only affine indices (`d` or `d + c`) contribute. A dimension that only
/// appears inside irregular indices is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stencil(BTreeMap<Dimension, BTreeSet<i64>>);

impl Stencil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect offsets from every array access in `exprs`.
    pub fn extract<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Self {
        let mut stencil = Self::new();
        for expr in exprs {
            for indexed in expr.indexeds() {
                for index in indexed.indices() {
                    if let Some((dim, offset)) = index.as_dim_offset() {
                        stencil.add(dim.clone(), offset);
                    }
                }
            }
        }
        stencil
    }

    pub fn add(&mut self, dim: Dimension, offset: i64) {
        self.0.entry(dim).or_default().insert(offset);
    }

    pub fn get(&self, dim: &Dimension) -> Option<&BTreeSet<i64>> {
        self.0.get(dim)
    }

    pub fn contains(&self, dim: &Dimension) -> bool {
        self.0.contains_key(dim)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Dimension, &BTreeSet<i64>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Minimum and maximum offset along `dim`.
    pub fn bounds(&self, dim: &Dimension) -> Option<(i64, i64)> {
        let offsets = self.0.get(dim)?;
        Some((*offsets.first()?, *offsets.last()?))
    }

    pub fn union(&self, other: &Stencil) -> Stencil {
        let mut out = self.clone();
        for (dim, offsets) in other.iter() {
            out.0.entry(dim.clone()).or_default().extend(offsets.iter().copied());
        }
        out
    }
}
