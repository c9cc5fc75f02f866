//! Symbolic expressions over dimensions, scalars and array accesses.
//!
//! Expressions are plain values. The constructors ([`Expr::add`],
//! [`Expr::mul`], [`Expr::modulo`], [`Expr::neg`]) canonicalise as they build:
//! nested sums and products are flattened, integer constants are folded, and
//! neutral terms are dropped. As a result `t + 0` is `t`, and `x + 1` comes
//! out structurally identical no matter how it was assembled. No further
//! simplification is attempted.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Rem, Sub};
use std::sync::Arc;

use tessera_dtype::DType;

use crate::dimension::Dimension;
use crate::function::Function;

/// Where a scalar comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    /// Runtime parameter such as a loop bound or a grid spacing.
    Global,
    /// Scalar temporary written by an equation.
    Temp,
}

/// Named scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    name: Arc<str>,
    dtype: DType,
    kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<Arc<str>>, dtype: DType, kind: SymbolKind) -> Self {
        Self { name: name.into(), dtype, kind }
    }

    pub fn global(name: impl Into<Arc<str>>, dtype: DType) -> Self {
        Self::new(name, dtype, SymbolKind::Global)
    }

    pub fn temp(name: impl Into<Arc<str>>, dtype: DType) -> Self {
        Self::new(name, dtype, SymbolKind::Temp)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_temp(&self) -> bool {
        self.kind == SymbolKind::Temp
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Array access `function[indices...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indexed {
    function: Function,
    indices: Vec<Expr>,
}

impl Indexed {
    pub fn new(function: Function, indices: Vec<Expr>) -> Self {
        Self { function, indices }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn indices(&self) -> &[Expr] {
        &self.indices
    }

    /// Rebuild with every index passed through `f`.
    pub fn map_indices(&self, f: impl FnMut(&Expr) -> Expr) -> Self {
        Self { function: self.function.clone(), indices: self.indices.iter().map(f).collect() }
    }
}

impl fmt::Display for Indexed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.function.name())?;
        for (i, index) in self.indices.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("]")
    }
}

/// `f64` compared and hashed by bit pattern.
#[derive(Debug, Clone, Copy)]
pub struct ConstFloat(pub f64);

impl PartialEq for ConstFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for ConstFloat {}

impl Hash for ConstFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Int(i64),
    Float(ConstFloat),
    Symbol(Symbol),
    Dim(Dimension),
    Indexed(Indexed),
    /// N-ary sum. The folded integer constant, if any, is the last term.
    Add(Vec<Expr>),
    /// N-ary product. The folded integer constant, if any, is the first factor.
    Mul(Vec<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Self::Float(ConstFloat(value))
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }

    pub fn dim(dim: &Dimension) -> Self {
        Self::Dim(dim.clone())
    }

    pub fn indexed(function: Function, indices: Vec<Expr>) -> Self {
        Self::Indexed(Indexed::new(function, indices))
    }

    pub fn add(terms: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        let mut constant = 0i64;
        for term in terms {
            match term {
                Expr::Add(inner) => {
                    for t in inner {
                        match t {
                            Expr::Int(v) => constant += v,
                            other => flat.push(other),
                        }
                    }
                }
                Expr::Int(v) => constant += v,
                other => flat.push(other),
            }
        }
        if constant != 0 {
            flat.push(Expr::Int(constant));
        }
        match flat.len() {
            0 => Expr::Int(0),
            1 => flat.pop().unwrap_or(Expr::Int(0)),
            _ => Expr::Add(flat),
        }
    }

    pub fn mul(factors: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        let mut constant = 1i64;
        for factor in factors {
            match factor {
                Expr::Mul(inner) => {
                    for f in inner {
                        match f {
                            Expr::Int(v) => constant *= v,
                            other => flat.push(other),
                        }
                    }
                }
                Expr::Int(v) => constant *= v,
                other => flat.push(other),
            }
        }
        if constant == 0 {
            return Expr::Int(0);
        }
        if constant != 1 {
            flat.insert(0, Expr::Int(constant));
        }
        match flat.len() {
            0 => Expr::Int(1),
            1 => flat.pop().unwrap_or(Expr::Int(1)),
            _ => Expr::Mul(flat),
        }
    }

    /// Euclidean remainder; folded when both operands are integer constants.
    pub fn modulo(lhs: Expr, rhs: Expr) -> Self {
        match (&lhs, &rhs) {
            (Expr::Int(a), Expr::Int(b)) if *b != 0 => Expr::Int(a.rem_euclid(*b)),
            _ => Expr::Mod(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn neg(expr: Expr) -> Self {
        match expr {
            Expr::Int(v) => Expr::Int(-v),
            Expr::Float(ConstFloat(v)) => Expr::float(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_indexed(&self) -> Option<&Indexed> {
        match self {
            Expr::Indexed(i) => Some(i),
            _ => None,
        }
    }

    /// Recognise the affine index forms `d` and `d + c`.
    pub fn as_dim_offset(&self) -> Option<(&Dimension, i64)> {
        match self {
            Expr::Dim(d) => Some((d, 0)),
            Expr::Add(terms) => match terms.as_slice() {
                [Expr::Dim(d), Expr::Int(c)] => Some((d, *c)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Symbol(_) | Expr::Dim(_) => Vec::new(),
            Expr::Indexed(i) => i.indices.iter().collect(),
            Expr::Add(terms) | Expr::Mul(terms) => terms.iter().collect(),
            Expr::Mod(a, b) => vec![a.as_ref(), b.as_ref()],
            Expr::Neg(a) => vec![a.as_ref()],
        }
    }

    /// Pre-order walk.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Dimensions appearing anywhere, in first-appearance order.
    pub fn free_dimensions(&self) -> Vec<Dimension> {
        let mut out: Vec<Dimension> = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Dim(d) = e
                && !out.contains(d)
            {
                out.push(d.clone());
            }
        });
        out
    }

    /// Every array access, including accesses nested inside indices.
    pub fn indexeds(&self) -> Vec<&Indexed> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Indexed(i) = e {
                out.push(i);
            }
        });
        out
    }

    /// Distinct scalars, in first-appearance order.
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Symbol(s) = e
                && !out.contains(&s)
            {
                out.push(s);
            }
        });
        out
    }

    /// Simultaneous top-down substitution. A node matching a key is replaced
    /// wholesale and the replacement is not visited again.
    pub fn xreplace(&self, mapper: &HashMap<Expr, Expr>) -> Expr {
        if mapper.is_empty() {
            return self.clone();
        }
        if let Some(replacement) = mapper.get(self) {
            return replacement.clone();
        }
        self.rebuild(|child| child.xreplace(mapper))
    }

    /// Like [`Expr::xreplace`] but only inside the index expressions of
    /// array accesses.
    pub fn xreplace_indices(&self, mapper: &HashMap<Expr, Expr>) -> Expr {
        if mapper.is_empty() {
            return self.clone();
        }
        match self {
            Expr::Indexed(i) => Expr::Indexed(i.map_indices(|index| index.xreplace(mapper))),
            _ => self.rebuild(|child| child.xreplace_indices(mapper)),
        }
    }

    fn rebuild(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Int(_) | Expr::Float(_) | Expr::Symbol(_) | Expr::Dim(_) => self.clone(),
            Expr::Indexed(i) => Expr::Indexed(i.map_indices(f)),
            Expr::Add(terms) => Expr::add(terms.iter().map(f)),
            Expr::Mul(factors) => Expr::mul(factors.iter().map(f)),
            Expr::Mod(a, b) => Expr::modulo(f(a), f(b)),
            Expr::Neg(a) => Expr::neg(f(a)),
        }
    }

    fn is_atom(&self) -> bool {
        matches!(self, Expr::Int(_) | Expr::Float(_) | Expr::Symbol(_) | Expr::Dim(_) | Expr::Indexed(_))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Int(value)
    }
}

impl From<&Dimension> for Expr {
    fn from(dim: &Dimension) -> Self {
        Expr::dim(dim)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::Symbol(symbol)
    }
}

impl From<Indexed> for Expr {
    fn from(indexed: Indexed) -> Self {
        Expr::Indexed(indexed)
    }
}

impl<T: Into<Expr>> Add<T> for Expr {
    type Output = Expr;

    fn add(self, rhs: T) -> Expr {
        Expr::add([self, rhs.into()])
    }
}

impl<T: Into<Expr>> Sub<T> for Expr {
    type Output = Expr;

    fn sub(self, rhs: T) -> Expr {
        Expr::add([self, Expr::neg(rhs.into())])
    }
}

impl<T: Into<Expr>> Mul<T> for Expr {
    type Output = Expr;

    fn mul(self, rhs: T) -> Expr {
        Expr::mul([self, rhs.into()])
    }
}

impl<T: Into<Expr>> Rem<T> for Expr {
    type Output = Expr;

    fn rem(self, rhs: T) -> Expr {
        Expr::modulo(self, rhs.into())
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Float(ConstFloat(v)) => write!(f, "{v:?}"),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Dim(d) => write!(f, "{d}"),
            Expr::Indexed(i) => write!(f, "{i}"),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    match (i, term) {
                        (0, t) => write!(f, "{t}")?,
                        (_, Expr::Int(v)) if *v < 0 => write!(f, " - {}", -v)?,
                        (_, Expr::Neg(inner)) => write_operand(f, " - ", inner)?,
                        (_, t) => write!(f, " + {t}")?,
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    write_operand(f, if i == 0 { "" } else { "*" }, factor)?;
                }
                Ok(())
            }
            Expr::Mod(a, b) => {
                write_operand(f, "", a)?;
                write_operand(f, " % ", b)
            }
            Expr::Neg(a) => write_operand(f, "-", a),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, prefix: &str, operand: &Expr) -> fmt::Result {
    if operand.is_atom() || matches!(operand, Expr::Neg(_)) {
        write!(f, "{prefix}{operand}")
    } else {
        write!(f, "{prefix}({operand})")
    }
}
