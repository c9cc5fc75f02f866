//! Clusters: ordered equations sharing one iteration space.
//!
//! A [`PartialCluster`] is the mutable form used while clustering and
//! fusing. Freezing it into a [`Cluster`] fixes its equations and attaches
//! the sub-iterators (stepping dimensions and their offsets) the IET builder
//! needs. [`ClusterGroup`] carries the ordered clusters plus the dimensions
//! along which each cluster must not be fused with earlier ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tessera_ir::{Dimension, Eq, Expr, Function, Indexed, Schedule, Scope, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Equations in program order. Inserting an equation already present is a
/// no-op, so scalars pulled into several clusters appear once after fusion;
/// distinct equations writing the same lhs are all kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace(Vec<Arc<Eq>>);

impl Trace {
    pub fn new(exprs: impl IntoIterator<Item = Arc<Eq>>) -> Self {
        let mut trace = Self::default();
        trace.update(exprs);
        trace
    }

    pub fn insert(&mut self, eq: Arc<Eq>) {
        if !self.0.contains(&eq) {
            self.0.push(eq);
        }
    }

    pub fn update(&mut self, exprs: impl IntoIterator<Item = Arc<Eq>>) {
        for eq in exprs {
            self.insert(eq);
        }
    }

    pub fn exprs(&self) -> &[Arc<Eq>] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Eq>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `lhs` is used inside an index expression of some access.
    pub fn is_index(&self, lhs: &Expr) -> bool {
        self.0.iter().any(|eq| {
            [eq.lhs(), eq.rhs()]
                .into_iter()
                .flat_map(Expr::indexeds)
                .flat_map(Indexed::indices)
                .any(|index| contains(index, lhs))
        })
    }
}

fn contains(expr: &Expr, needle: &Expr) -> bool {
    let mut found = false;
    expr.walk(&mut |e| found |= e == needle);
    found
}

/// Distinct accesses per function, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct Tensors(Vec<(Function, Vec<Indexed>)>);

impl Tensors {
    pub fn from_exprs(exprs: &[Arc<Eq>]) -> Self {
        let mut out: Vec<(Function, Vec<Indexed>)> = Vec::new();
        for eq in exprs {
            for indexed in eq.lhs().indexeds().into_iter().chain(eq.rhs().indexeds()) {
                match out.iter_mut().find(|(f, _)| f == indexed.function()) {
                    Some((_, accesses)) => {
                        if !accesses.contains(indexed) {
                            accesses.push(indexed.clone());
                        }
                    }
                    None => out.push((indexed.function().clone(), vec![indexed.clone()])),
                }
            }
        }
        Self(out)
    }

    pub fn get(&self, function: &Function) -> Option<&[Indexed]> {
        self.0.iter().find(|(f, _)| f == function).map(|(_, accesses)| accesses.as_slice())
    }

    pub fn contains(&self, function: &Function) -> bool {
        self.get(function).is_some()
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.0.iter().map(|(f, _)| f)
    }
}

/// A stepping dimension walked inside a loop over its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubIterator {
    pub dim: Dimension,
    /// Distinct offsets at which `dim` is accessed, ascending.
    pub offsets: Vec<i64>,
}

/// Sub-iterators per root dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubIterators(Vec<(Dimension, Vec<SubIterator>)>);

impl SubIterators {
    pub fn from_exprs(exprs: &[Arc<Eq>]) -> Self {
        let mut out: Vec<(Dimension, Vec<SubIterator>)> = Vec::new();
        for eq in exprs {
            for (dim, offsets) in eq.stencil().iter().filter(|(d, _)| d.is_stepping()) {
                let root = dim.root();
                let slot = match out.iter().position(|(r, _)| r == root) {
                    Some(i) => i,
                    None => {
                        out.push((root.clone(), Vec::new()));
                        out.len() - 1
                    }
                };
                let entry = &mut out[slot].1;
                match entry.iter_mut().find(|s| &s.dim == dim) {
                    Some(sub) => {
                        sub.offsets.extend(offsets.iter().copied());
                        sub.offsets.sort_unstable();
                        sub.offsets.dedup();
                    }
                    None => entry.push(SubIterator { dim: dim.clone(), offsets: offsets.iter().copied().collect() }),
                }
            }
        }
        Self(out)
    }

    pub fn get(&self, root: &Dimension) -> &[SubIterator] {
        self.0.iter().find(|(r, _)| r == root).map(|(_, subs)| subs.as_slice()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Iteration space of a frozen cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSpace {
    pub intervals: Schedule,
    pub sub_iterators: SubIterators,
}

impl IterationSpace {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Read access to the equations of either cluster form.
pub trait ClusterView {
    fn id(&self) -> ClusterId;
    fn exprs(&self) -> &[Arc<Eq>];

    /// Storages read by the cluster.
    fn unknown(&self) -> Vec<Storage> {
        Scope::new(self.exprs().iter().map(Arc::as_ref)).reads()
    }
}

#[derive(Debug, Clone)]
pub struct PartialCluster {
    id: ClusterId,
    trace: Trace,
    ispace: Schedule,
}

impl PartialCluster {
    pub fn new(id: ClusterId, exprs: impl IntoIterator<Item = Arc<Eq>>, ispace: Schedule) -> Self {
        Self { id, trace: Trace::new(exprs), ispace }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn ispace(&self) -> &Schedule {
        &self.ispace
    }

    pub fn set_exprs(&mut self, exprs: Vec<Arc<Eq>>) {
        self.trace = Trace::new(exprs);
    }

    /// Append `other`'s equations, skipping those already present. Both must
    /// share the iteration space.
    pub fn squash(&mut self, other: PartialCluster) {
        debug_assert_eq!(self.ispace, other.ispace, "squashing clusters over different iteration spaces");
        self.trace.update(other.trace.0);
    }

    pub fn tensors(&self) -> Tensors {
        Tensors::from_exprs(self.trace.exprs())
    }

    pub fn freeze(self) -> Cluster {
        let sub_iterators = SubIterators::from_exprs(self.trace.exprs());
        Cluster { id: self.id, trace: self.trace, ispace: IterationSpace { intervals: self.ispace, sub_iterators } }
    }
}

impl ClusterView for PartialCluster {
    fn id(&self) -> ClusterId {
        self.id
    }

    fn exprs(&self) -> &[Arc<Eq>] {
        self.trace.exprs()
    }
}

/// Frozen cluster, ready for IET construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: ClusterId,
    trace: Trace,
    ispace: IterationSpace,
}

impl Cluster {
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn ispace(&self) -> &IterationSpace {
        &self.ispace
    }

    pub fn unfreeze(self) -> PartialCluster {
        PartialCluster { id: self.id, trace: self.trace, ispace: self.ispace.intervals }
    }
}

impl ClusterView for Cluster {
    fn id(&self) -> ClusterId {
        self.id
    }

    fn exprs(&self) -> &[Arc<Eq>] {
        self.trace.exprs()
    }
}

fn write_cluster(f: &mut fmt::Formatter<'_>, id: ClusterId, ispace: &Schedule, exprs: &[Arc<Eq>]) -> fmt::Result {
    writeln!(f, "{id} {ispace}")?;
    for eq in exprs {
        writeln!(f, "  {eq}")?;
    }
    Ok(())
}

impl fmt::Display for PartialCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cluster(f, self.id, &self.ispace, self.exprs())
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_cluster(f, self.id, &self.ispace.intervals, self.exprs())
    }
}

/// Ordered clusters plus their atomic dimensions.
#[derive(Debug, Clone)]
pub struct ClusterGroup<C = Cluster> {
    clusters: Vec<C>,
    atomics: HashMap<ClusterId, BTreeSet<Dimension>>,
}

impl<C> Default for ClusterGroup<C> {
    fn default() -> Self {
        Self { clusters: Vec::new(), atomics: HashMap::new() }
    }
}

impl<C: ClusterView> ClusterGroup<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cluster: C) {
        self.clusters.push(cluster);
    }

    pub fn clusters(&self) -> &[C] {
        &self.clusters
    }

    pub(crate) fn clusters_mut(&mut self) -> &mut [C] {
        &mut self.clusters
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn into_clusters(self) -> Vec<C> {
        self.clusters
    }

    /// Dimensions along which `id` cannot share loops with earlier clusters.
    pub fn atomics(&self, id: ClusterId) -> impl Iterator<Item = &Dimension> {
        self.atomics.get(&id).into_iter().flatten()
    }

    pub fn is_atomic(&self, id: ClusterId, dim: &Dimension) -> bool {
        self.atomics.get(&id).is_some_and(|dims| dims.contains(dim))
    }

    pub fn add_atomics(&mut self, id: ClusterId, dims: impl IntoIterator<Item = Dimension>) {
        self.atomics.entry(id).or_default().extend(dims);
    }

    /// Read set of every cluster.
    pub fn unknown(&self) -> Vec<(ClusterId, Vec<Storage>)> {
        self.clusters.iter().map(|c| (c.id(), c.unknown())).collect()
    }

    /// All equations, in cluster order.
    pub fn exprs(&self) -> Vec<Arc<Eq>> {
        self.clusters.iter().flat_map(|c| c.exprs().iter().cloned()).collect()
    }

    fn map<D>(self, f: impl FnMut(C) -> D) -> ClusterGroup<D> {
        ClusterGroup { clusters: self.clusters.into_iter().map(f).collect(), atomics: self.atomics }
    }
}

impl<C: ClusterView> FromIterator<C> for ClusterGroup<C> {
    fn from_iter<T: IntoIterator<Item = C>>(iter: T) -> Self {
        Self { clusters: iter.into_iter().collect(), atomics: HashMap::new() }
    }
}

impl ClusterGroup<PartialCluster> {
    pub fn freeze(self) -> ClusterGroup<Cluster> {
        self.map(PartialCluster::freeze)
    }
}

impl ClusterGroup<Cluster> {
    pub fn unfreeze(self) -> ClusterGroup<PartialCluster> {
        self.map(Cluster::unfreeze)
    }
}

impl<C: fmt::Display> fmt::Display for ClusterGroup<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cluster in &self.clusters {
            write!(f, "{cluster}")?;
        }
        Ok(())
    }
}
