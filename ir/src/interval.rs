//! Closed integer intervals per dimension, and bags of them.
//!
//! [`Interval`] is a tagged union: `Null` is the interval of a dimension with
//! no observed access and acts as the absorbing element of intersection and
//! the identity of union. `Defined` carries integer offsets relative to the
//! dimension's iteration point; `lower > upper` is allowed and appears after
//! [`Interval::negate`].
//!
//! [`IntervalBox`] keys intervals by dimension. [`Schedule`] is the same
//! algebra with a fixed order, re-established by a sort key after every
//! operation.

use std::fmt;

use smallvec::SmallVec;
use snafu::ensure;

use crate::dimension::Dimension;
use crate::error::{DimensionMismatchSnafu, DuplicateDimensionSnafu, Result};
use crate::expr::Expr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Interval {
    Null(Dimension),
    Defined { dim: Dimension, lower: i64, upper: i64 },
}

impl Interval {
    pub fn new(dim: Dimension, lower: i64, upper: i64) -> Self {
        Self::Defined { dim, lower, upper }
    }

    pub fn null(dim: Dimension) -> Self {
        Self::Null(dim)
    }

    pub fn dim(&self) -> &Dimension {
        match self {
            Self::Null(dim) | Self::Defined { dim, .. } => dim,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined { .. })
    }

    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Null(_) => None,
            Self::Defined { lower, upper, .. } => Some((*lower, *upper)),
        }
    }

    /// `|upper - lower|`
    pub fn min_extent(&self) -> Option<u64> {
        self.bounds().map(|(lower, upper)| upper.abs_diff(lower))
    }

    /// Symbolic size of the dimension plus the halo the interval adds to it.
    pub fn extent(&self) -> Option<Expr> {
        let min_extent = i64::try_from(self.min_extent()?).ok()?;
        Some(self.dim().symbolic_size() + min_extent)
    }

    /// True iff both intervals are defined over the same dimension and lie
    /// within the larger of their two widths from each other.
    pub fn overlap(&self, other: &Interval) -> bool {
        if self.dim() != other.dim() {
            return false;
        }
        let (Some((a, _)), Some((b, _))) = (self.bounds(), other.bounds()) else {
            return false;
        };
        let (Some(ea), Some(eb)) = (self.min_extent(), other.min_extent()) else {
            return false;
        };
        let m = i128::from(ea.max(eb));
        let (a, b) = (i128::from(a), i128::from(b));
        (a <= b && b <= a + m) || (a >= b && a <= b + m)
    }

    /// `[max lower, min upper]` when overlapping, `Null` otherwise.
    pub fn intersection(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Self::Defined { dim, lower, upper }, Self::Defined { lower: ol, upper: ou, .. })
                if self.overlap(other) =>
            {
                Interval::new(dim.clone(), (*lower).max(*ol), (*upper).min(*ou))
            }
            _ => Interval::null(self.dim().clone()),
        }
    }

    /// Convex hull; `Null` is the identity.
    pub fn union(&self, other: &Interval) -> Result<Interval> {
        self.ensure_same_dim(other)?;
        Ok(match (self, other) {
            (Self::Null(_), _) => other.clone(),
            (_, Self::Null(_)) => self.clone(),
            (Self::Defined { dim, lower, upper }, Self::Defined { lower: ol, upper: ou, .. }) => {
                Interval::new(dim.clone(), (*lower).min(*ol), (*upper).max(*ou))
            }
        })
    }

    /// Bound-wise difference. A `Null` operand is treated as absent, so
    /// `Null - d` is `-d`.
    pub fn subtract(&self, other: &Interval) -> Result<Interval> {
        self.ensure_same_dim(other)?;
        Ok(match (self, other) {
            (_, Self::Null(_)) => self.clone(),
            (Self::Null(_), _) => other.negate(),
            (Self::Defined { dim, lower, upper }, Self::Defined { lower: ol, upper: ou, .. }) => {
                Interval::new(dim.clone(), lower - ol, upper - ou)
            }
        })
    }

    /// Flip the sign of both bounds.
    pub fn negate(&self) -> Interval {
        match self {
            Self::Null(dim) => Interval::null(dim.clone()),
            Self::Defined { dim, lower, upper } => Interval::new(dim.clone(), -lower, -upper),
        }
    }

    /// Left fold of `intersection` over a non-empty sequence.
    pub fn intersect_all<'a>(first: &Interval, rest: impl IntoIterator<Item = &'a Interval>) -> Interval {
        rest.into_iter().fold(first.clone(), |acc, i| acc.intersection(i))
    }

    fn ensure_same_dim(&self, other: &Interval) -> Result<()> {
        ensure!(self.dim() == other.dim(), DimensionMismatchSnafu { lhs: self.dim().clone(), rhs: other.dim().clone() });
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(dim) => write!(f, "{dim}[Null]"),
            Self::Defined { dim, lower, upper } => write!(f, "{dim}[{lower}, {upper}]"),
        }
    }
}

type Intervals = SmallVec<[Interval; 4]>;

/// Intervals keyed by distinct dimensions. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct IntervalBox {
    intervals: Intervals,
}

impl IntervalBox {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Result<Self> {
        let mut out = Intervals::new();
        for interval in intervals {
            ensure!(
                !out.iter().any(|i: &Interval| i.dim() == interval.dim()),
                DuplicateDimensionSnafu { dim: interval.dim().clone() }
            );
            out.push(interval);
        }
        Ok(Self { intervals: out })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.intervals.iter().map(Interval::dim)
    }

    pub fn get(&self, dim: &Dimension) -> Option<&Interval> {
        self.intervals.iter().find(|i| i.dim() == dim)
    }

    pub fn contains(&self, dim: &Dimension) -> bool {
        self.get(dim).is_some()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Per-dimension intersection over `self`'s dimensions. Intervals in
    /// `others` over dimensions `self` lacks are ignored, and dimensions the
    /// others lack keep `self`'s interval.
    pub fn intersection(&self, others: &[&IntervalBox]) -> IntervalBox {
        let intervals = self
            .intervals
            .iter()
            .map(|mine| Interval::intersect_all(mine, others.iter().filter_map(|o| o.get(mine.dim()))))
            .collect();
        IntervalBox { intervals }
    }

    /// Per-dimension union; dimensions only in `other` are appended.
    pub fn union(&self, other: &IntervalBox) -> Result<IntervalBox> {
        self.zip_with(other, |a, b| a.union(b), |b| b.clone())
    }

    /// Per-dimension difference; a missing dimension counts as `Null`.
    pub fn subtract(&self, other: &IntervalBox) -> Result<IntervalBox> {
        self.zip_with(other, |a, b| a.subtract(b), Interval::negate)
    }

    pub fn negate(&self) -> IntervalBox {
        IntervalBox { intervals: self.intervals.iter().map(Interval::negate).collect() }
    }

    fn zip_with(
        &self,
        other: &IntervalBox,
        both: impl Fn(&Interval, &Interval) -> Result<Interval>,
        only_other: impl Fn(&Interval) -> Interval,
    ) -> Result<IntervalBox> {
        let mut intervals = Intervals::new();
        for mine in &self.intervals {
            intervals.push(match other.get(mine.dim()) {
                Some(theirs) => both(mine, theirs)?,
                None => mine.clone(),
            });
        }
        intervals.extend(other.intervals.iter().filter(|i| !self.contains(i.dim())).map(only_other));
        Ok(IntervalBox { intervals })
    }

    fn sorted_by(&self, key: ScheduleKey) -> IntervalBox {
        let mut intervals = self.intervals.clone();
        intervals.sort_by_key(|i| key(i));
        IntervalBox { intervals }
    }
}

impl PartialEq for IntervalBox {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.intervals.iter().all(|i| other.get(i.dim()) == Some(i))
    }
}

impl Eq for IntervalBox {}

impl FromIterator<Interval> for IntervalBox {
    /// Later intervals over an already present dimension are dropped.
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        let mut intervals = Intervals::new();
        for interval in iter {
            if !intervals.iter().any(|i: &Interval| i.dim() == interval.dim()) {
                intervals.push(interval);
            }
        }
        IntervalBox { intervals }
    }
}

impl fmt::Display for IntervalBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_intervals(f, "Box", &self.intervals)
    }
}

fn write_intervals(f: &mut fmt::Formatter<'_>, name: &str, intervals: &[Interval]) -> fmt::Result {
    write!(f, "{name}[")?;
    for (i, interval) in intervals.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{interval}")?;
    }
    f.write_str("]")
}

/// Sort key of a [`Schedule`]; the sort is stable.
pub type ScheduleKey = fn(&Interval) -> i64;

/// Time dimensions first, everything else after in its current order.
pub fn time_first(interval: &Interval) -> i64 {
    if interval.dim().is_time() { 0 } else { 1 }
}

/// An [`IntervalBox`] with a fixed order. Equality is order-sensitive.
#[derive(Clone)]
pub struct Schedule {
    inner: IntervalBox,
    key: ScheduleKey,
}

impl Schedule {
    pub fn new(intervals: IntervalBox, key: ScheduleKey) -> Self {
        Self { inner: intervals.sorted_by(key), key }
    }

    pub fn time_first(intervals: IntervalBox) -> Self {
        Self::new(intervals, time_first)
    }

    pub fn empty() -> Self {
        Self::time_first(IntervalBox::empty())
    }

    pub fn intervals(&self) -> &[Interval] {
        self.inner.intervals()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.inner.dimensions()
    }

    pub fn get(&self, dim: &Dimension) -> Option<&Interval> {
        self.inner.get(dim)
    }

    pub fn contains(&self, dim: &Dimension) -> bool {
        self.inner.contains(dim)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_box(&self) -> &IntervalBox {
        &self.inner
    }

    pub fn intersection(&self, others: &[&Schedule]) -> Schedule {
        let boxes: Vec<&IntervalBox> = others.iter().map(|s| &s.inner).collect();
        self.rebuild(self.inner.intersection(&boxes))
    }

    pub fn union(&self, other: &Schedule) -> Result<Schedule> {
        Ok(self.rebuild(self.inner.union(&other.inner)?))
    }

    pub fn subtract(&self, other: &Schedule) -> Result<Schedule> {
        Ok(self.rebuild(self.inner.subtract(&other.inner)?))
    }

    pub fn negate(&self) -> Schedule {
        self.rebuild(self.inner.negate())
    }

    fn rebuild(&self, intervals: IntervalBox) -> Schedule {
        Schedule::new(intervals, self.key)
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.intervals() == other.intervals()
    }
}

impl Eq for Schedule {}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schedule").field(&self.intervals()).finish()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_intervals(f, "Schedule", self.intervals())
    }
}
