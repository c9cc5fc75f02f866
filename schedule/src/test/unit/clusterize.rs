use tessera_ir::{Expr, Interval};

use crate::test::helpers::{Grid, assign, at, persistent, rendered, run, scalar, shifted, temporary};
use crate::{ClusterConfig, ClusterContext, ClusterView, Error, clusterize, partial_clusters};

#[test]
fn test_fusion_contracts_temporary() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(at(&r, [x.clone()]), Expr::int(2) * at(&b, [x.clone()])),
        assign(scalar("a"), at(&r, [x]) + at(&r, [shifted(&grid.x, 1)])),
    ];

    let group = run(&exprs, ClusterConfig::default());
    assert_eq!(rendered(&group), vec![vec!["s0 = 2*b[x]", "s1 = 2*b[x + 1]", "a = s0 + s1"]]);

    let ispace = &group.clusters()[0].ispace().intervals;
    assert_eq!(ispace.get(&grid.x), Some(&Interval::new(grid.x.clone(), 0, -1)));
}

#[test]
fn test_shared_read_prevents_contraction() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let w = persistent("w", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(at(&r, [x.clone()]), at(&b, [x.clone()])),
        assign(at(&u, [x.clone()]), at(&r, [shifted(&grid.x, 1)])),
        assign(at(&w, [x]), at(&r, [shifted(&grid.x, -1)])),
    ];

    let group = run(&exprs, ClusterConfig::default());
    assert_eq!(rendered(&group), vec![vec!["r[x] = b[x]"], vec!["u[x] = r[x + 1]", "w[x] = r[x - 1]"]]);

    let second = group.clusters()[1].id();
    assert_eq!(group.atomics(second).cloned().collect::<Vec<_>>(), vec![grid.x.clone()]);
    assert!(!group.is_atomic(group.clusters()[0].id(), &grid.x));
}

#[test]
fn test_regrouping_is_stable() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let v = persistent("v", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [assign(at(&u, [x.clone()]), at(&b, [x.clone()])), assign(at(&v, [x.clone()]), at(&u, [x]) + 1)];

    let mut ctx = ClusterContext::default();
    let once = clusterize(&exprs, &mut ctx).unwrap();
    assert_eq!(once.len(), 1);
    let before = rendered(&once);

    let twice = crate::groupby(once.unfreeze(), &mut ctx).unwrap();
    assert_eq!(rendered(&twice), before);
    assert_eq!(ctx.scalars_created(), 0);
}

#[test]
fn test_reclustering_contracted_group_is_stable() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(at(&r, [x.clone()]), Expr::int(2) * at(&b, [x.clone()])),
        assign(scalar("a"), at(&r, [x]) + at(&r, [shifted(&grid.x, 1)])),
    ];

    let mut ctx = ClusterContext::default();
    let once = clusterize(&exprs, &mut ctx).unwrap();
    let twice = clusterize(&once.exprs(), &mut ctx).unwrap();

    assert_eq!(twice.len(), once.len());
    assert_eq!(rendered(&twice), rendered(&once));
    assert_eq!(twice.clusters()[0].ispace().intervals, once.clusters()[0].ispace().intervals);
    assert_eq!(ctx.scalars_created(), 2);
}

#[test]
fn test_fusion_keeps_every_write_to_an_array() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [assign(at(&u, [x.clone()]), at(&b, [x.clone()])), assign(at(&u, [x.clone()]), at(&u, [x]) + 1)];

    let group = run(&exprs, ClusterConfig::default());
    assert_eq!(rendered(&group), vec![vec!["u[x] = b[x]", "u[x] = u[x] + 1"]]);
}

#[test]
fn test_propagation_shrinks_time_space() {
    let grid = Grid::new();
    let u = persistent("u", &[&grid.time, &grid.x]);
    let v = persistent("v", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let t = Expr::dim(&grid.t);
    let exprs = [
        assign(at(&u, [shifted(&grid.t, 1), x.clone()]), at(&u, [t, x.clone()]) + 1),
        assign(at(&v, [x.clone()]), Expr::int(2) * at(&u, [shifted(&grid.t, 1), x])),
    ];

    let group = run(&exprs, ClusterConfig::builder().fuse(false).build());
    assert_eq!(group.len(), 2);
    for cluster in group.iter() {
        let ispace = &cluster.ispace().intervals;
        assert_eq!(ispace.get(&grid.time), Some(&Interval::new(grid.time.clone(), 0, -1)));
        assert_eq!(ispace.get(&grid.x), Some(&Interval::new(grid.x.clone(), 0, 0)));
        assert_eq!(ispace.dimensions().next(), Some(&grid.time));
    }
}

#[test]
fn test_scalars_are_absorbed_by_their_consumers() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(scalar("s0"), at(&b, [x.clone()]) * 2),
        assign(scalar("s1"), scalar("s0") + 1),
        assign(at(&u, [x]), scalar("s1") * 3),
    ];

    let mut ctx = ClusterContext::default();
    let group = partial_clusters(&exprs, &mut ctx).unwrap();
    assert_eq!(group.len(), 1);

    let consumer = &group.clusters()[0];
    let members: Vec<String> = consumer.exprs().iter().map(ToString::to_string).collect();
    assert_eq!(members, vec!["s0 = 2*b[x]", "s1 = s0 + 1", "u[x] = 3*s1"]);
    assert_eq!(consumer.ispace().get(&grid.x), Some(&Interval::new(grid.x.clone(), 0, 0)));
}

#[test]
fn test_unconsumed_scalar_keeps_its_cluster() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [assign(at(&u, [x.clone()]), at(&b, [x.clone()])), assign(scalar("a"), at(&b, [x]))];

    let mut ctx = ClusterContext::default();
    let group = partial_clusters(&exprs, &mut ctx).unwrap();
    assert_eq!(group.len(), 2);
    assert!(group.clusters()[1].exprs()[0].is_scalar());
}

#[test]
fn test_propagation_cap() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let u = persistent("u", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [assign(at(&u, [x.clone()]), at(&b, [x.clone()])), assign(scalar("a"), at(&u, [x]))];

    let mut ctx = ClusterContext::new(ClusterConfig::builder().max_propagation_steps(1).build());
    let err = clusterize(&exprs, &mut ctx).unwrap_err();
    assert_eq!(err, Error::PropagationDiverged { steps: 1 });
}

#[test]
fn test_empty_input() {
    let group = run(&[], ClusterConfig::default());
    assert!(group.is_empty());
}
