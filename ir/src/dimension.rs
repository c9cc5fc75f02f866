//! Iteration dimensions and the registry that interns them.
//!
//! A [`Dimension`] is a cheap, shared handle with identity semantics: two
//! handles are equal iff they were produced by the same interning call. The
//! kind of a dimension is an explicit variant ([`DimensionKind`]) and every
//! capability query (`is_time`, `parent`, `modulo`, ...) is computed from it on
//! demand.
//!
//! Two fields are mutable after construction and are shared by every clone of
//! the handle:
//!
//! * `reverse` lives on root dimensions. A stepping dimension has no flag of
//!   its own and reports its parent's value, so flipping the parent is
//!   observed by every stepping dimension over it.
//! * `modulo` lives on stepping dimensions only and is the depth of the
//!   circular buffer the stepping dimension walks.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use snafu::ensure;
use tessera_dtype::DType;

use crate::error::{InvalidModuloSnafu, InvalidParentSnafu, NotSteppingSnafu, Result};
use crate::expr::{Expr, Symbol};

/// Buffer depth of a stepping dimension when none is given.
pub const DEFAULT_MODULO: usize = 2;

static DIMENSION_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_dimension_id() -> u64 {
    DIMENSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Variant of a dimension.
#[derive(Debug)]
pub enum DimensionKind {
    /// Plain iteration axis with no space/time meaning.
    Basic,
    Space,
    Time,
    /// Walks `parent` through a circular buffer of depth `modulo`.
    Stepping { parent: Dimension, modulo: AtomicUsize },
    /// `(origin + offset) % modulo`, resolved to a concrete loop index.
    Lowered { origin: Dimension, offset: i64 },
}

#[derive(Debug)]
struct DimensionData {
    id: u64,
    name: Arc<str>,
    kind: DimensionKind,
    reverse: AtomicBool,
}

/// Shared handle to one iteration axis.
#[derive(Clone)]
pub struct Dimension(Arc<DimensionData>);

impl Dimension {
    fn new(name: &str, kind: DimensionKind) -> Self {
        Self(Arc::new(DimensionData {
            id: next_dimension_id(),
            name: Arc::from(name),
            kind,
            reverse: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &DimensionKind {
        &self.0.kind
    }

    pub fn is_time(&self) -> bool {
        match self.kind() {
            DimensionKind::Time => true,
            DimensionKind::Stepping { parent, .. } => parent.is_time(),
            _ => false,
        }
    }

    pub fn is_space(&self) -> bool {
        match self.kind() {
            DimensionKind::Space => true,
            DimensionKind::Stepping { parent, .. } => parent.is_space(),
            _ => false,
        }
    }

    /// True for dimensions defined in terms of another one.
    pub fn is_derived(&self) -> bool {
        matches!(self.kind(), DimensionKind::Stepping { .. } | DimensionKind::Lowered { .. })
    }

    pub fn is_stepping(&self) -> bool {
        matches!(self.kind(), DimensionKind::Stepping { .. })
    }

    pub fn is_lowered(&self) -> bool {
        matches!(self.kind(), DimensionKind::Lowered { .. })
    }

    /// Parent of a stepping dimension.
    pub fn parent(&self) -> Option<&Dimension> {
        match self.kind() {
            DimensionKind::Stepping { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Dimension a lowered index was resolved from, with its offset.
    pub fn origin(&self) -> Option<(&Dimension, i64)> {
        match self.kind() {
            DimensionKind::Lowered { origin, offset } => Some((origin, *offset)),
            _ => None,
        }
    }

    /// The dimension this one ultimately iterates: the parent for stepping
    /// dimensions, itself otherwise.
    pub fn root(&self) -> &Dimension {
        match self.kind() {
            DimensionKind::Stepping { parent, .. } => parent.root(),
            _ => self,
        }
    }

    pub fn modulo(&self) -> Option<usize> {
        match self.kind() {
            DimensionKind::Stepping { modulo, .. } => Some(modulo.load(Ordering::Relaxed)),
            _ => None,
        }
    }

    /// Change the buffer depth of a stepping dimension.
    pub fn set_modulo(&self, value: usize) -> Result<()> {
        ensure!(value > 0, InvalidModuloSnafu { modulo: value });
        match self.kind() {
            DimensionKind::Stepping { modulo, .. } => {
                modulo.store(value, Ordering::Relaxed);
                Ok(())
            }
            _ => NotSteppingSnafu { dim: self.clone() }.fail(),
        }
    }

    pub fn reverse(&self) -> bool {
        match self.kind() {
            DimensionKind::Stepping { parent, .. } => parent.reverse(),
            _ => self.0.reverse.load(Ordering::Relaxed),
        }
    }

    /// Flip iteration direction. On a stepping dimension this writes through
    /// to the parent, since the flag is inherited from it.
    pub fn set_reverse(&self, value: bool) {
        match self.kind() {
            DimensionKind::Stepping { parent, .. } => parent.set_reverse(value),
            _ => self.0.reverse.store(value, Ordering::Relaxed),
        }
    }

    /// `<name>_size`
    pub fn symbolic_size(&self) -> Expr {
        Expr::symbol(Symbol::global(format!("{}_size", self.name()), DType::Index))
    }

    /// `<name>_s`
    pub fn symbolic_start(&self) -> Expr {
        Expr::symbol(Symbol::global(format!("{}_s", self.name()), DType::Index))
    }

    /// `<name>_e`
    pub fn symbolic_end(&self) -> Expr {
        Expr::symbol(Symbol::global(format!("{}_e", self.name()), DType::Index))
    }

    /// Number of points between the symbolic bounds, inclusive.
    pub fn symbolic_extent(&self) -> Expr {
        self.symbolic_end() - self.symbolic_start() + 1
    }

    /// Grid spacing along this axis. Stepping dimensions share their parent's.
    pub fn spacing(&self) -> Expr {
        match self.kind() {
            DimensionKind::Stepping { parent, .. } => parent.spacing(),
            _ => Expr::symbol(Symbol::global(format!("h_{}", self.name()), DType::Float32)),
        }
    }

    /// Loop bounds `(start, end, step)` of a loop over this dimension.
    pub fn limits(&self) -> Limits {
        Limits { start: self.symbolic_start(), end: self.symbolic_end(), step: Expr::int(1) }
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Dimension {}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Dimension {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Creation order.
impl Ord for Dimension {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Short form: the kind payload would recurse through parents.
impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            DimensionKind::Basic => "basic",
            DimensionKind::Space => "space",
            DimensionKind::Time => "time",
            DimensionKind::Stepping { .. } => "stepping",
            DimensionKind::Lowered { .. } => "lowered",
        };
        write!(f, "{}#{}({kind})", self.name(), self.id())
    }
}

/// Loop bounds of an iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Limits {
    pub start: Expr,
    pub end: Expr,
    pub step: Expr,
}

impl Limits {
    /// `0 ..= extent - 1` with unit step.
    pub fn range(extent: usize) -> Self {
        let end = i64::try_from(extent).unwrap_or(i64::MAX) - 1;
        Self { start: Expr::int(0), end: Expr::int(end), step: Expr::int(1) }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.start, self.end, self.step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternKey {
    Basic(String),
    Space(String),
    Time(String),
    Stepping(String, u64),
    Lowered(String, u64, i64),
}

/// Interns dimensions for one compilation unit.
///
/// Asking twice for the same `(name, kind)` returns the same handle, so
/// equations built independently agree on their axes.
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    interned: HashMap<InternKey, Dimension>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, key: InternKey, name: &str, kind: impl FnOnce() -> DimensionKind) -> Dimension {
        self.interned.entry(key).or_insert_with(|| Dimension::new(name, kind())).clone()
    }

    pub fn dimension(&mut self, name: &str) -> Dimension {
        self.intern(InternKey::Basic(name.to_string()), name, || DimensionKind::Basic)
    }

    pub fn space(&mut self, name: &str) -> Dimension {
        self.intern(InternKey::Space(name.to_string()), name, || DimensionKind::Space)
    }

    pub fn time(&mut self, name: &str) -> Dimension {
        self.intern(InternKey::Time(name.to_string()), name, || DimensionKind::Time)
    }

    /// Stepping dimension over `parent`. A `modulo` of `None` keeps the
    /// current depth of an already interned dimension, or
    /// [`DEFAULT_MODULO`] for a new one.
    pub fn stepping(&mut self, name: &str, parent: &Dimension, modulo: Option<usize>) -> Result<Dimension> {
        ensure!(!parent.is_derived(), InvalidParentSnafu { name, parent: parent.clone() });
        let dim = self.intern(InternKey::Stepping(name.to_string(), parent.id()), name, || {
            DimensionKind::Stepping { parent: parent.clone(), modulo: AtomicUsize::new(DEFAULT_MODULO) }
        });
        if let Some(modulo) = modulo {
            dim.set_modulo(modulo)?;
        }
        Ok(dim)
    }

    pub fn lowered(&mut self, name: &str, origin: &Dimension, offset: i64) -> Dimension {
        self.intern(InternKey::Lowered(name.to_string(), origin.id(), offset), name, || DimensionKind::Lowered {
            origin: origin.clone(),
            offset,
        })
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}
