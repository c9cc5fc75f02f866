use std::collections::HashMap;

use tessera_dtype::DType;
use tessera_ir::{Expr, Limits};

use crate::test::helpers::{Grid, assign, scalar};
use crate::{Arena, Error, Expression, Iteration, Node, Transformer, render_tree};

fn expression(arena: &mut Arena, value: i64) -> crate::NodeId {
    arena.alloc(Node::Expression(Expression { eq: assign(scalar("a"), Expr::int(value)), dtype: DType::Float32 }))
}

#[test]
fn test_foreign_id_is_rejected() {
    let mut first = Arena::new();
    let second = Arena::new();
    let id = expression(&mut first, 0);

    assert_ne!(first.generation(), second.generation());
    assert_eq!(second.get(id).unwrap_err(), Error::UnknownNode { id });
    assert_eq!(first.iteration(id).unwrap_err(), Error::NotAnIteration { id });
}

#[test]
fn test_transformer_rebuilds_ancestors() {
    let grid = Grid::new();
    let mut arena = Arena::new();
    let old = expression(&mut arena, 0);
    let untouched = expression(&mut arena, 1);
    let inner = arena.alloc(Node::Iteration(Iteration { nodes: vec![old], ..Iteration::new(grid.x.clone(), Limits::range(4)) }));
    let list = arena.alloc(Node::List(vec![inner, untouched]));
    let new = expression(&mut arena, 2);

    let mut transformer = Transformer::new(HashMap::from([(old, new)]));
    let rebuilt = transformer.visit(&mut arena, list).unwrap();

    assert_ne!(rebuilt, list);
    let rebuilt_inner = transformer.translate(inner);
    assert_ne!(rebuilt_inner, inner);
    assert_eq!(arena.children(rebuilt).unwrap(), &[rebuilt_inner, untouched]);
    assert_eq!(arena.children(rebuilt_inner).unwrap(), &[new]);
    assert_eq!(transformer.translate(untouched), untouched);
    assert_eq!(transformer.rebuilt().len(), 3);

    // The old tree is still intact.
    assert_eq!(arena.children(inner).unwrap(), &[old]);
}

#[test]
fn test_render_tree() {
    let grid = Grid::new();
    let mut arena = Arena::new();
    let leaf = expression(&mut arena, 3);
    let nest = arena.alloc(Node::Iteration(Iteration { nodes: vec![leaf], ..Iteration::new(grid.x.clone(), Limits::range(4)) }));

    let text = render_tree(&arena, nest);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Iteration x (0, 3, 1) offsets=(0, 0)");
    assert!(lines[1].ends_with("Expression<float32> a = 3"));
}
