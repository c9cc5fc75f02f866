use tessera_dtype::DType;
use tessera_ir::{Dimension, DimensionRegistry, Expr, Function, Limits};
use test_case::test_case;

use crate::test::helpers::{Grid, assign, persistent, scalar};
use crate::{
    Arena, Error, Expression, Iet, Iteration, Node, NodeId, StopPolicy, TreeMode, compose_nodes,
    compose_nodes_with_chain, copy_arrays, filter_iterations, is_foldable, retrieve_iteration_tree,
};

fn expression(arena: &mut Arena) -> NodeId {
    arena.alloc(Node::Expression(Expression { eq: assign(scalar("a"), Expr::int(0)), dtype: DType::Float32 }))
}

fn iteration(arena: &mut Arena, dim: &Dimension, nodes: Vec<NodeId>) -> NodeId {
    arena.alloc(Node::Iteration(Iteration { nodes, ..Iteration::new(dim.clone(), Limits::range(4)) }))
}

#[test]
fn test_retrieve_iteration_tree_modes() {
    let mut registry = DimensionRegistry::new();
    let [i, j, k, p] = ["i", "j", "k", "p"].map(|name| registry.dimension(name));
    let mut arena = Arena::new();

    let e0 = expression(&mut arena);
    let e1 = expression(&mut arena);
    let e2 = expression(&mut arena);
    let nk = iteration(&mut arena, &k, vec![e1]);
    let nj = iteration(&mut arena, &j, vec![nk]);
    let np = iteration(&mut arena, &p, vec![e2]);
    let ni = iteration(&mut arena, &i, vec![e0, nj, np]);

    let normal = retrieve_iteration_tree(&arena, ni, TreeMode::Normal).unwrap();
    assert_eq!(normal, vec![vec![ni, nj, nk], vec![ni, np]]);

    let superset = retrieve_iteration_tree(&arena, ni, TreeMode::Superset).unwrap();
    assert_eq!(superset, normal);

    // `k` also sits directly under a second `i` loop
    let shared = iteration(&mut arena, &i, vec![nj, nk]);
    let normal = retrieve_iteration_tree(&arena, shared, TreeMode::Normal).unwrap();
    assert_eq!(normal, vec![vec![shared, nj, nk], vec![shared, nk]]);

    let superset = retrieve_iteration_tree(&arena, shared, TreeMode::Superset).unwrap();
    assert_eq!(superset, vec![vec![shared, nj, nk]]);
}

#[test_case(StopPolicy::Never, &[2, 4, 6] ; "never")]
#[test_case(StopPolicy::Any, &[2] ; "any")]
#[test_case(StopPolicy::Asap, &[2, 4] ; "asap")]
fn test_filter_iterations(stop: StopPolicy, expected: &[i32]) {
    let tree = [2, 1, 4, 3, 6];
    assert_eq!(filter_iterations(&tree, |i| i % 2 == 0, stop), expected);
}

#[test]
fn test_is_foldable() {
    let grid = Grid::new();
    let mut arena = Arena::new();
    let e = expression(&mut arena);
    let a = iteration(&mut arena, &grid.x, vec![e]);
    let b = iteration(&mut arena, &grid.x, vec![]);
    let shifted = arena.alloc(Node::Iteration(Iteration { offsets: (1, 0), ..Iteration::new(grid.x.clone(), Limits::range(4)) }));
    let other = iteration(&mut arena, &grid.y, vec![]);

    assert!(is_foldable(&arena, &[a, b]).unwrap());
    assert!(!is_foldable(&arena, &[a]).unwrap());
    assert!(!is_foldable(&arena, &[a, shifted]).unwrap());
    assert!(!is_foldable(&arena, &[a, other]).unwrap());
    assert!(!is_foldable(&arena, &[a, e]).unwrap());
}

#[test]
fn test_compose_nodes() {
    let grid = Grid::new();
    let mut arena = Arena::new();
    let e0 = expression(&mut arena);
    let e1 = expression(&mut arena);
    let loops = vec![Iteration::new(grid.x.clone(), Limits::range(4)), Iteration::new(grid.y.clone(), Limits::range(4))];

    let (root, chain) = compose_nodes_with_chain(&mut arena, loops, vec![e0, e1]);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], root);
    assert_eq!(arena.children(chain[0]).unwrap(), &[chain[1]]);
    assert_eq!(arena.children(chain[1]).unwrap(), &[e0, e1]);

    assert_eq!(compose_nodes(&mut arena, Vec::new(), vec![e0]), e0);
    let list = compose_nodes(&mut arena, Vec::new(), vec![e0, e1]);
    assert!(matches!(arena.get(list).unwrap(), Node::List(body) if body == &[e0, e1]));
}

#[test_case(false, &["a[x, y] = b[x, y]", "c[x, y] = d[x, y]"] ; "forward")]
#[test_case(true, &["b[x, y] = a[x, y]", "d[x, y] = c[x, y]"] ; "reverse")]
fn test_copy_arrays_merges_nests(reverse: bool, expected: &[&str]) {
    let grid = Grid::new();
    let [a, b, c, d] = ["a", "b", "c", "d"].map(|name| persistent(name, &[&grid.x, &grid.y]));
    let mut arena = Arena::new();

    let nests = copy_arrays(&mut arena, &[(a, b), (c, d)], reverse).unwrap();
    assert_eq!(nests.len(), 1);

    let trees = retrieve_iteration_tree(&arena, nests[0], TreeMode::Normal).unwrap();
    assert_eq!(trees.len(), 1);
    let outer = arena.iteration(trees[0][0]).unwrap();
    assert_eq!(outer.dim, grid.x);
    assert_eq!(outer.limits, Limits::range(8));

    let root = arena.alloc(Node::List(nests));
    let iet = Iet::new(arena, root);
    let copies: Vec<String> = iet.expressions().unwrap().iter().map(|e| e.eq.to_string()).collect();
    assert_eq!(copies, expected);
}

#[test]
fn test_copy_arrays_arity_mismatch() {
    let grid = Grid::new();
    let dst = persistent("dst", &[&grid.x, &grid.y]);
    let src = persistent("src", &[&grid.x]);
    let mut arena = Arena::new();

    let err = copy_arrays(&mut arena, &[(dst, src)], false).unwrap_err();
    assert!(matches!(err, Error::Ir { .. }), "{err:?}");
}

#[test]
fn test_copy_arrays_requires_full_shape() {
    let grid = Grid::new();
    let [dst, src] = ["dst", "src"].map(|name| {
        Function::builder().name(name).dimensions(vec![grid.x.clone(), grid.y.clone()]).build()
    });
    let mut arena = Arena::new();

    let err = copy_arrays(&mut arena, &[(dst, src)], false).unwrap_err();
    assert_eq!(err, Error::ShapeMismatch { function: "dst".to_string(), dims: 2, rank: 0 });
    assert!(arena.is_empty());
}

#[test]
fn test_copy_arrays_empty() {
    let mut arena = Arena::new();
    assert!(copy_arrays(&mut arena, &[], false).unwrap().is_empty());
    assert!(arena.is_empty());
}
