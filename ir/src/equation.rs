//! Equations enriched with the data space they touch.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use bon::bon;
use itertools::Itertools;

use crate::dimension::Dimension;
use crate::error::{NonAssignableLhsSnafu, Result};
use crate::expr::{Expr, Indexed};
use crate::function::Function;
use crate::interval::{Interval, IntervalBox};
use crate::ordering::partial_order;
use crate::stencil::Stencil;

/// `lhs = rhs` (or `lhs += rhs`) together with its data space.
///
/// The data space is derived once at construction and the equation is
/// immutable afterwards; every transformation builds a new one.
#[derive(Debug, Clone)]
pub struct Eq {
    lhs: Expr,
    rhs: Expr,
    is_increment: bool,
    stencil: Stencil,
    dspace: IntervalBox,
}

#[bon]
impl Eq {
    /// Build an equation. `subs` is applied to both sides before the data
    /// space is derived.
    #[builder]
    pub fn new(lhs: Expr, rhs: Expr, #[builder(default)] increment: bool, subs: Option<HashMap<Expr, Expr>>) -> Result<Self> {
        let (lhs, rhs) = match &subs {
            Some(subs) => (lhs.xreplace(subs), rhs.xreplace(subs)),
            None => (lhs, rhs),
        };
        snafu::ensure!(matches!(lhs, Expr::Indexed(_) | Expr::Symbol(_)), NonAssignableLhsSnafu { lhs });

        let stencil = Stencil::extract([&lhs, &rhs]);
        let dspace = derive_dspace(&lhs, &rhs, &stencil);
        Ok(Self { lhs, rhs, is_increment: increment, stencil, dspace })
    }
}

impl Eq {
    pub fn assign(lhs: Expr, rhs: Expr) -> Result<Self> {
        Self::builder().lhs(lhs).rhs(rhs).build()
    }

    pub fn increment(lhs: Expr, rhs: Expr) -> Result<Self> {
        Self::builder().lhs(lhs).rhs(rhs).increment(true).build()
    }

    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    pub fn is_increment(&self) -> bool {
        self.is_increment
    }

    /// Writes a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self.lhs, Expr::Symbol(_))
    }

    /// Writes an array element.
    pub fn is_tensor(&self) -> bool {
        matches!(self.lhs, Expr::Indexed(_))
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn dspace(&self) -> &IntervalBox {
        &self.dspace
    }

    /// Function written by a tensor equation.
    pub fn function(&self) -> Option<&Function> {
        self.lhs.as_indexed().map(Indexed::function)
    }

    /// Array accesses on the rhs, plus those inside lhs indices.
    pub fn reads(&self) -> Vec<&Indexed> {
        let mut out = self.rhs.indexeds();
        if let Expr::Indexed(lhs) = &self.lhs {
            out.extend(lhs.indices().iter().flat_map(Expr::indexeds));
        }
        out
    }

    /// Same kind of equation over new sides.
    pub fn rebuild(&self, lhs: Expr, rhs: Expr) -> Result<Self> {
        Self::builder().lhs(lhs).rhs(rhs).increment(self.is_increment).build()
    }

    /// Same lhs, new rhs.
    pub fn with_rhs(&self, rhs: Expr) -> Result<Self> {
        self.rebuild(self.lhs.clone(), rhs)
    }

    pub fn xreplace(&self, mapper: &HashMap<Expr, Expr>) -> Result<Self> {
        self.rebuild(self.lhs.xreplace(mapper), self.rhs.xreplace(mapper))
    }

    pub fn xreplace_indices(&self, mapper: &HashMap<Expr, Expr>) -> Result<Self> {
        self.rebuild(self.lhs.xreplace_indices(mapper), self.rhs.xreplace_indices(mapper))
    }
}

impl PartialEq for Eq {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs && self.is_increment == other.is_increment
    }
}

impl std::cmp::Eq for Eq {}

impl Hash for Eq {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lhs.hash(state);
        self.rhs.hash(state);
        self.is_increment.hash(state);
    }
}

impl fmt::Display for Eq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.is_increment { "+=" } else { "=" };
        write!(f, "{} {op} {}", self.lhs, self.rhs)
    }
}

/// Data space of `lhs = rhs`:
///
/// 1. order dimensions by merging the index order of every access, with the
///    dimensions outside the stencil (sorted by name) as one more chain;
/// 2. move time dimensions to the front, keeping the order otherwise;
/// 3. collapse stepping dimensions onto their parent, merging offsets;
/// 4. span each dimension from its smallest to its largest offset, or `Null`
///    when it was never accessed at an affine index.
fn derive_dspace(lhs: &Expr, rhs: &Expr, stencil: &Stencil) -> IntervalBox {
    let dims: Vec<Dimension> = lhs.free_dimensions().into_iter().chain(rhs.free_dimensions()).unique().collect();
    let free_dims: Vec<Dimension> =
        dims.iter().filter(|d| !stencil.contains(d)).cloned().sorted_by(|a, b| a.name().cmp(b.name())).collect();

    let mut constraints: Vec<Vec<Dimension>> = lhs
        .indexeds()
        .into_iter()
        .chain(rhs.indexeds())
        .map(|indexed| indexed.indices().iter().flat_map(Expr::free_dimensions).unique().collect())
        .collect();
    constraints.push(free_dims);

    let mut ordering = partial_order(&constraints);
    ordering.sort_by_key(|d| !d.is_time());

    let mut collapsed: Vec<(Dimension, Stencil)> = Vec::new();
    for dim in ordering {
        let root = dim.root().clone();
        let mut offsets = Stencil::new();
        for &offset in stencil.get(&dim).into_iter().flatten() {
            offsets.add(root.clone(), offset);
        }
        match collapsed.iter_mut().find(|(d, _)| *d == root) {
            Some((_, existing)) => *existing = existing.union(&offsets),
            None => collapsed.push((root, offsets)),
        }
    }

    collapsed
        .into_iter()
        .map(|(dim, offsets)| match offsets.bounds(&dim) {
            Some((lower, upper)) => Interval::new(dim, lower, upper),
            None => Interval::null(dim),
        })
        .collect()
}
