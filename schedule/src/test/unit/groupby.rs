use std::sync::Arc;

use test_case::test_case;
use tessera_ir::{Eq, Expr, Schedule};

use crate::test::helpers::{Grid, assign, at, persistent, rendered, run, scalar, shifted, temporary};
use crate::{ClusterConfig, ClusterContext, ClusterId, ClusterView, Error, PartialCluster, bump_and_contract};

#[test]
fn test_bump_and_contract_one_scalar_per_access() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x, &grid.y]);
    let r = temporary("r", &[&grid.x, &grid.y]);
    let (x, y) = (Expr::dim(&grid.x), Expr::dim(&grid.y));

    let mut source = PartialCluster::new(
        ClusterId(0),
        [assign(at(&r, [x.clone(), y.clone()]), at(&b, [x.clone(), y.clone()]))],
        Schedule::empty(),
    );
    let mut sink = PartialCluster::new(
        ClusterId(1),
        [assign(
            scalar("a"),
            at(&r, [x.clone(), shifted(&grid.y, 1)]) + at(&r, [shifted(&grid.x, -1), y.clone()]) + at(&r, [x, y]),
        )],
        Schedule::empty(),
    );

    let mut ctx = ClusterContext::new(ClusterConfig::builder().scalar_prefix("r").build());
    bump_and_contract(&[r], &mut source, &mut sink, &mut ctx).unwrap();

    let source: Vec<String> = source.exprs().iter().map(ToString::to_string).collect();
    assert_eq!(source, vec!["r0 = b[x, y + 1]", "r1 = b[x - 1, y]", "r2 = b[x, y]"]);
    assert_eq!(sink.exprs()[0].to_string(), "a = r0 + r1 + r2");
    assert_eq!(ctx.scalars_created(), 3);
}

#[test]
fn test_bump_and_contract_without_targets_is_noop() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);

    let eq = assign(at(&r, [x.clone()]), at(&b, [x.clone()]));
    let mut source = PartialCluster::new(ClusterId(0), [eq.clone()], Schedule::empty());
    let mut sink = PartialCluster::new(ClusterId(1), [assign(scalar("a"), at(&r, [x]))], Schedule::empty());

    let mut ctx = ClusterContext::default();
    bump_and_contract(&[], &mut source, &mut sink, &mut ctx).unwrap();
    assert_eq!(source.exprs(), &[eq]);
    assert_eq!(ctx.scalars_created(), 0);
}

#[test]
fn test_bump_rejects_irregular_access() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);

    let mut source = PartialCluster::new(ClusterId(0), [assign(at(&r, [x.clone()]), at(&b, [x]))], Schedule::empty());
    let mut sink = PartialCluster::new(
        ClusterId(1),
        [assign(scalar("a"), at(&r, [Expr::int(2) * &grid.x]))],
        Schedule::empty(),
    );

    let mut ctx = ClusterContext::default();
    let err = bump_and_contract(&[r], &mut source, &mut sink, &mut ctx).unwrap_err();
    assert!(matches!(err, Error::NonAffineAccess { .. }), "{err:?}");
}

#[test]
fn test_persistent_write_is_not_contracted() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = persistent("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(at(&r, [x.clone()]), at(&b, [x.clone()])),
        assign(scalar("a"), at(&r, [x]) + at(&r, [shifted(&grid.x, 1)])),
    ];

    let mut ctx = ClusterContext::default();
    let group = crate::clusterize(&exprs, &mut ctx).unwrap();
    assert_eq!(group.len(), 2);
    assert_eq!(ctx.scalars_created(), 0);
    assert!(group.is_atomic(group.clusters()[1].id(), &grid.x));
}

#[test]
fn test_contraction_keeps_increments() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = temporary("r", &[&grid.x]);
    let x = Expr::dim(&grid.x);

    let write = Arc::new(Eq::increment(at(&r, [x.clone()]), at(&b, [x.clone()])).unwrap());
    let mut source = PartialCluster::new(ClusterId(0), [write], Schedule::empty());
    let mut sink = PartialCluster::new(ClusterId(1), [assign(scalar("a"), at(&r, [shifted(&grid.x, 1)]))], Schedule::empty());

    let mut ctx = ClusterContext::default();
    bump_and_contract(&[r], &mut source, &mut sink, &mut ctx).unwrap();
    assert!(source.exprs()[0].is_increment());
    assert_eq!(source.exprs()[0].to_string(), "s0 += b[x + 1]");
    assert_eq!(sink.exprs()[0].to_string(), "a = s0");
}

#[test]
fn test_flow_across_atomic_dimension_stops_scan() {
    let grid = Grid::new();
    let b = persistent("b", &[&grid.x]);
    let r = persistent("r", &[&grid.x]);
    let u = persistent("u", &[&grid.x, &grid.y]);
    let w = persistent("w", &[&grid.x]);
    let x = Expr::dim(&grid.x);
    let exprs = [
        assign(at(&r, [x.clone()]), at(&b, [x.clone()])),
        assign(at(&u, [x, Expr::dim(&grid.y)]), at(&r, [shifted(&grid.x, 1)])),
        assign(at(&w, [Expr::dim(&grid.x)]), at(&u, [shifted(&grid.x, -1), Expr::int(0)])),
    ];

    let group = run(&exprs, ClusterConfig::default());
    assert_eq!(
        rendered(&group),
        vec![vec!["r[x] = b[x]"], vec!["u[x, y] = r[x + 1]"], vec!["w[x] = u[x - 1, 0]"]]
    );
    assert!(group.is_atomic(group.clusters()[1].id(), &grid.x));
    assert!(!group.is_atomic(group.clusters()[2].id(), &grid.x));
}

#[test_case(true, 1; "increment sink fuses")]
#[test_case(false, 2; "plain sink is blocked")]
fn test_increment_anti_dependence_allows_fusion(increment: bool, expected: usize) {
    let grid = Grid::new();
    let u = persistent("u", &[&grid.x]);
    let v = persistent("v", &[&grid.x]);
    let x = Expr::dim(&grid.x);

    let sink = if increment {
        Eq::increment(at(&u, [x.clone()]), Expr::int(1))
    } else {
        Eq::assign(at(&u, [x.clone()]), at(&u, [x.clone()]) + 1)
    };
    let exprs = [assign(at(&v, [x]), at(&u, [shifted(&grid.x, 1)])), Arc::new(sink.unwrap())];

    let group = run(&exprs, ClusterConfig::default());
    assert_eq!(group.len(), expected);
    assert_eq!(group.is_atomic(group.clusters()[expected - 1].id(), &grid.x), !increment);
}
