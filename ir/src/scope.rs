//! Data dependences among a sequence of equations.
//!
//! Every pair of accesses to the same storage, at least one of them a
//! write, is classified by the iteration distance between the two accesses
//! touching the same location. For an index position where both accesses
//! are affine over the same root dimension (`d + a` vs `d + b`), the access
//! that comes later in program order runs `a - b` iterations after the
//! earlier one. The first non-zero position decides which access executes
//! first and is the *cause* of the dependence. When every position is zero,
//! program order decides, with the reads of an equation preceding its write.
//! Irregular index positions are conservatively treated as carried.

use std::fmt;

use itertools::Itertools;

use crate::dimension::Dimension;
use crate::equation::Eq;
use crate::expr::{Expr, Symbol};
use crate::function::Function;

/// Something an equation can read or write.
#[derive(Debug, Clone, PartialEq, std::cmp::Eq, Hash)]
pub enum Storage {
    Array(Function),
    Scalar(Symbol),
}

impl Storage {
    pub fn name(&self) -> &str {
        match self {
            Storage::Array(f) => f.name(),
            Storage::Scalar(s) => s.name(),
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Storage::Array(f) => Some(f),
            Storage::Scalar(_) => None,
        }
    }

    /// Compiler-introduced storage: temporary arrays and temporary scalars.
    pub fn is_temporary(&self) -> bool {
        match self {
            Storage::Array(f) => f.is_temporary(),
            Storage::Scalar(s) => s.is_temp(),
        }
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, std::cmp::Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

/// One read or write performed by the equation at position `timestamp`.
#[derive(Debug, Clone, PartialEq, std::cmp::Eq, Hash)]
pub struct Access {
    pub storage: Storage,
    pub indices: Vec<Expr>,
    pub mode: AccessMode,
    pub timestamp: usize,
    /// Part of an increment (`+=`) equation's lhs.
    pub is_increment: bool,
}

impl Access {
    pub fn is_read(&self) -> bool {
        self.mode == AccessMode::Read
    }

    pub fn is_write(&self) -> bool {
        self.mode == AccessMode::Write
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_read() { "R" } else { "W" };
        write!(f, "{mode}<{}[{}]>@{}", self.storage, self.indices.iter().join(", "), self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, std::cmp::Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DependenceKind {
    /// Read after write.
    Flow,
    /// Write after read.
    Anti,
    /// Write after write.
    Output,
}

#[derive(Debug, Clone, PartialEq, std::cmp::Eq, Hash)]
pub struct Dependence {
    pub kind: DependenceKind,
    pub source: Access,
    pub sink: Access,
    /// Per index position, iterations from source to sink; `None` where the
    /// distance is unknown.
    pub distance: Vec<Option<i64>>,
    /// Dimension of the first position with a non-zero or unknown distance.
    pub cause: Option<Dimension>,
    carried: bool,
}

impl Dependence {
    pub fn storage(&self) -> &Storage {
        &self.source.storage
    }

    pub fn is_carried(&self) -> bool {
        self.carried
    }

    pub fn is_independent(&self) -> bool {
        !self.carried
    }

    pub fn is_increment(&self) -> bool {
        self.source.is_increment || self.sink.is_increment
    }

    /// Source and sink belong to the same equation.
    pub fn is_inplace(&self) -> bool {
        self.source.timestamp == self.sink.timestamp
    }
}

impl fmt::Display for Dependence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.kind, self.source, self.sink)?;
        if let Some(cause) = &self.cause {
            write!(f, " carried by {cause}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependenceSet(Vec<Dependence>);

impl DependenceSet {
    fn filtered(&self, keep: impl Fn(&Dependence) -> bool) -> Self {
        Self(self.0.iter().filter(|d| keep(d)).cloned().collect())
    }

    pub fn carried(&self) -> Self {
        self.filtered(Dependence::is_carried)
    }

    pub fn independent(&self) -> Self {
        self.filtered(Dependence::is_independent)
    }

    pub fn increment(&self) -> Self {
        self.filtered(Dependence::is_increment)
    }

    pub fn inplace(&self) -> Self {
        self.filtered(Dependence::is_inplace)
    }

    pub fn difference(&self, other: &DependenceSet) -> Self {
        self.filtered(|d| !other.0.contains(d))
    }

    pub fn union(&self, other: &DependenceSet) -> Self {
        let mut out = self.clone();
        out.0.extend(other.0.iter().filter(|d| !self.0.contains(d)).cloned());
        out
    }

    /// Distinct cause dimensions.
    pub fn cause(&self) -> Vec<Dimension> {
        self.0.iter().filter_map(|d| d.cause.clone()).unique().collect()
    }

    /// Distinct storages involved.
    pub fn functions(&self) -> Vec<Storage> {
        self.0.iter().map(|d| d.storage().clone()).unique().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependence> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a DependenceSet {
    type Item = &'a Dependence;
    type IntoIter = std::slice::Iter<'a, Dependence>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Accesses and dependences of an equation sequence.
#[derive(Debug, Clone)]
pub struct Scope {
    accesses: Vec<Access>,
    dependences: Vec<Dependence>,
}

impl Scope {
    pub fn new<'a>(exprs: impl IntoIterator<Item = &'a Eq>) -> Self {
        let accesses: Vec<Access> = exprs.into_iter().enumerate().flat_map(|(ts, eq)| collect_accesses(eq, ts)).collect();

        let mut dependences = Vec::new();
        for (i, a) in accesses.iter().enumerate() {
            for b in &accesses[i + 1..] {
                if a.storage != b.storage || (a.is_read() && b.is_read()) {
                    continue;
                }
                if let Some(dep) = classify(a, b) {
                    dependences.push(dep);
                }
            }
        }
        Self { accesses, dependences }
    }

    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    fn of_kind(&self, kind: DependenceKind) -> DependenceSet {
        DependenceSet(self.dependences.iter().filter(|d| d.kind == kind).cloned().collect())
    }

    pub fn d_flow(&self) -> DependenceSet {
        self.of_kind(DependenceKind::Flow)
    }

    pub fn d_anti(&self) -> DependenceSet {
        self.of_kind(DependenceKind::Anti)
    }

    pub fn d_output(&self) -> DependenceSet {
        self.of_kind(DependenceKind::Output)
    }

    pub fn d_all(&self) -> DependenceSet {
        DependenceSet(self.dependences.clone())
    }

    /// Some dependence connects two distinct equations.
    pub fn has_dep(&self) -> bool {
        self.dependences.iter().any(|d| !d.is_inplace())
    }

    /// Distinct storages read, in first-read order.
    pub fn reads(&self) -> Vec<Storage> {
        self.accesses.iter().filter(|a| a.is_read()).map(|a| a.storage.clone()).unique().collect()
    }

    /// Distinct storages written, in first-write order.
    pub fn writes(&self) -> Vec<Storage> {
        self.accesses.iter().filter(|a| a.is_write()).map(|a| a.storage.clone()).unique().collect()
    }
}

fn collect_accesses(eq: &Eq, timestamp: usize) -> Vec<Access> {
    let access = |storage, indices, mode, is_increment| Access { storage, indices, mode, timestamp, is_increment };
    let mut out = Vec::new();

    for indexed in eq.reads() {
        out.push(access(Storage::Array(indexed.function().clone()), indexed.indices().to_vec(), AccessMode::Read, false));
    }
    let scalar_reads = eq.rhs().symbols().into_iter().chain(match eq.lhs() {
        Expr::Indexed(lhs) => lhs.indices().iter().flat_map(Expr::symbols).collect::<Vec<_>>(),
        _ => Vec::new(),
    });
    for symbol in scalar_reads.filter(|s| s.is_temp()).unique() {
        out.push(access(Storage::Scalar(symbol.clone()), Vec::new(), AccessMode::Read, false));
    }

    let (storage, indices) = match eq.lhs() {
        Expr::Indexed(lhs) => (Storage::Array(lhs.function().clone()), lhs.indices().to_vec()),
        Expr::Symbol(s) => (Storage::Scalar(s.clone()), Vec::new()),
        // Rejected when the equation is built.
        _ => return out,
    };
    if eq.is_increment() {
        out.push(access(storage.clone(), indices.clone(), AccessMode::Read, true));
    }
    out.push(access(storage, indices, AccessMode::Write, eq.is_increment()));
    out
}

enum Step {
    Known(Dimension, i64),
    Unknown(Option<Dimension>),
    Zero,
    Disjoint,
}

fn step(a: &Expr, b: &Expr) -> Step {
    if let (Some((da, oa)), Some((db, ob))) = (a.as_dim_offset(), b.as_dim_offset())
        && da.root() == db.root()
    {
        return Step::Known(da.root().clone(), oa - ob);
    }
    if let (Some(ca), Some(cb)) = (a.as_int(), b.as_int()) {
        return if ca == cb { Step::Zero } else { Step::Disjoint };
    }
    if a == b && a.free_dimensions().is_empty() {
        return Step::Zero;
    }
    let dim = a.free_dimensions().into_iter().chain(b.free_dimensions()).next();
    Step::Unknown(dim.map(|d| d.root().clone()))
}

/// `a` precedes `b` in program order.
fn classify(a: &Access, b: &Access) -> Option<Dependence> {
    let mut distance = Vec::with_capacity(a.indices.len());
    let mut decided: Option<(bool, Option<Dimension>)> = None;

    for (ia, ib) in a.indices.iter().zip(&b.indices) {
        let (delta, first) = match step(ia, ib) {
            Step::Disjoint => return None,
            Step::Zero | Step::Known(_, 0) => (Some(0), None),
            Step::Known(dim, v) => (Some(v), Some((v > 0, Some(dim)))),
            Step::Unknown(dim) => (None, Some((true, dim))),
        };
        distance.push(delta);
        if decided.is_none() {
            decided = first;
        }
    }

    let carried = decided.is_some();
    let (a_first, cause) = decided.unwrap_or((true, None));
    let (source, sink) = if a_first { (a, b) } else { (b, a) };
    if !a_first {
        for d in &mut distance {
            *d = d.map(|v| -v);
        }
    }

    let kind = match (source.mode, sink.mode) {
        (AccessMode::Write, AccessMode::Read) => DependenceKind::Flow,
        (AccessMode::Read, AccessMode::Write) => DependenceKind::Anti,
        (AccessMode::Write, AccessMode::Write) => DependenceKind::Output,
        (AccessMode::Read, AccessMode::Read) => return None,
    };
    Some(Dependence { kind, source: source.clone(), sink: sink.clone(), distance, cause, carried })
}
