//! Fixtures for clustering tests.

use std::sync::Arc;

use tessera_ir::{DType, Dimension, DimensionRegistry, Eq, Expr, Function, FunctionKind, Symbol};

use crate::{ClusterConfig, ClusterContext, ClusterGroup, ClusterView, clusterize};

pub struct Grid {
    pub registry: DimensionRegistry,
    pub time: Dimension,
    pub t: Dimension,
    pub x: Dimension,
    pub y: Dimension,
}

impl Grid {
    pub fn new() -> Self {
        let mut registry = DimensionRegistry::new();
        let time = registry.time("time");
        let t = registry.stepping("t", &time, None).expect("time is a root dimension");
        let x = registry.space("x");
        let y = registry.space("y");
        Self { registry, time, t, x, y }
    }
}

fn function(name: &str, dims: &[&Dimension], kind: FunctionKind) -> Function {
    Function::builder()
        .name(name)
        .dimensions(dims.iter().map(|d| (*d).clone()).collect())
        .shape(vec![8; dims.len()])
        .kind(kind)
        .build()
}

pub fn persistent(name: &str, dims: &[&Dimension]) -> Function {
    function(name, dims, FunctionKind::Persistent)
}

pub fn temporary(name: &str, dims: &[&Dimension]) -> Function {
    function(name, dims, FunctionKind::Temporary)
}

pub fn at(f: &Function, indices: impl IntoIterator<Item = Expr>) -> Expr {
    f.at(indices).expect("arity matches")
}

pub fn shifted(d: &Dimension, offset: i64) -> Expr {
    Expr::dim(d) + offset
}

pub fn scalar(name: &str) -> Expr {
    Expr::symbol(Symbol::temp(name, DType::Float32))
}

pub fn assign(lhs: Expr, rhs: Expr) -> Arc<Eq> {
    Arc::new(Eq::assign(lhs, rhs).expect("assignable lhs"))
}

/// Cluster `exprs` under `config`.
pub fn run(exprs: &[Arc<Eq>], config: ClusterConfig) -> ClusterGroup {
    let mut ctx = ClusterContext::new(config);
    clusterize(exprs, &mut ctx).expect("clustering succeeds")
}

/// Equations of every cluster, rendered.
pub fn rendered(group: &ClusterGroup) -> Vec<Vec<String>> {
    group.iter().map(|c| c.exprs().iter().map(ToString::to_string).collect()).collect()
}
