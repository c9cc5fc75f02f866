//! Queries and constructors over iteration/expression trees.

use tessera_ir::{Eq, Expr, Function, Limits};

use crate::error::{Result, ShapeMismatchSnafu};
use crate::node::{Arena, Expression, Iteration, Node, NodeId};

/// Which loop nests [`retrieve_iteration_tree`] reports.
#[derive(Debug, Clone, Copy, PartialEq, std::cmp::Eq, Default)]
pub enum TreeMode {
    /// Every maximal chain of loops enclosing an expression.
    #[default]
    Normal,
    /// Maximal chains whose loops do not all appear in another reported
    /// chain. They differ from [`TreeMode::Normal`] only when a loop node is
    /// shared by several parents.
    Superset,
}

/// Maximal loop nests under `root`, each as the chain of iterations,
/// outermost first, down to some expression. For
///
/// ```text
/// Iteration i
///   expr0
///   Iteration j
///     Iteration k
///       expr1
///   Iteration p
///     expr2
/// ```
///
/// the result is `[i, j, k], [i, p]`: `[i]`, enclosing `expr0`, is a prefix
/// of a longer chain and is not reported.
pub fn retrieve_iteration_tree(arena: &Arena, root: NodeId, mode: TreeMode) -> Result<Vec<Vec<NodeId>>> {
    let mut trees: Vec<Vec<NodeId>> = Vec::new();
    let mut chain = Vec::new();
    find_sections(arena, root, &mut chain, &mut trees)?;

    let maximal: Vec<Vec<NodeId>> = trees
        .iter()
        .filter(|t| !trees.iter().any(|o| o.len() > t.len() && o.starts_with(t)))
        .cloned()
        .collect();
    Ok(match mode {
        TreeMode::Normal => maximal,
        TreeMode::Superset => maximal
            .iter()
            .filter(|i| !maximal.iter().any(|j| j != *i && i.iter().all(|n| j.contains(n))))
            .cloned()
            .collect(),
    })
}

fn find_sections(arena: &Arena, id: NodeId, chain: &mut Vec<NodeId>, out: &mut Vec<Vec<NodeId>>) -> Result<()> {
    match arena.get(id)? {
        Node::Expression(_) => {
            if !chain.is_empty() && !out.contains(chain) {
                out.push(chain.clone());
            }
        }
        Node::Iteration(it) => {
            chain.push(id);
            for &child in &it.nodes {
                find_sections(arena, child, chain, out)?;
            }
            chain.pop();
        }
        Node::List(body) => {
            for &child in body {
                find_sections(arena, child, chain, out)?;
            }
        }
    }
    Ok(())
}

/// When [`filter_iterations`] stops scanning.
#[derive(Debug, Clone, Copy, PartialEq, std::cmp::Eq, Default)]
pub enum StopPolicy {
    /// Scan everything.
    #[default]
    Never,
    /// Stop at the first miss after at least one match.
    Any,
    /// Stop once there is a match and every miss has been seen.
    Asap,
}

/// Items of `tree` satisfying `key`, scanning in order until `stop` says so.
pub fn filter_iterations<T: Clone>(tree: &[T], key: impl Fn(&T) -> bool, stop: StopPolicy) -> Vec<T> {
    let misses = match stop {
        StopPolicy::Asap => tree.iter().filter(|i| !key(i)).count(),
        _ => 0,
    };

    let mut filtered = Vec::new();
    let mut off = 0usize;
    for item in tree {
        let hit = key(item);
        if hit {
            filtered.push(item.clone());
        } else {
            off += 1;
        }
        let done = match stop {
            StopPolicy::Never => false,
            StopPolicy::Any => !hit && !filtered.is_empty(),
            StopPolicy::Asap => !filtered.is_empty() && off == misses,
        };
        if done {
            break;
        }
    }
    filtered
}

/// True if `nodes` are two or more iterations that could be emitted as a
/// single loop.
pub fn is_foldable(arena: &Arena, nodes: &[NodeId]) -> Result<bool> {
    if nodes.len() <= 1 {
        return Ok(false);
    }
    let mut iterations = Vec::with_capacity(nodes.len());
    for &id in nodes {
        match arena.get(id)?.as_iteration() {
            Some(it) => iterations.push(it),
            None => return Ok(false),
        }
    }
    let main = iterations[0];
    Ok(iterations.iter().all(|it| it.is_compatible(main)))
}

/// Nest `iterations`, outermost first, around `body`; see
/// [`compose_nodes_with_chain`].
pub fn compose_nodes(arena: &mut Arena, iterations: Vec<Iteration>, body: Vec<NodeId>) -> NodeId {
    compose_nodes_with_chain(arena, iterations, body).0
}

/// Nest `iterations`, outermost first, around `body`. Returns the outermost
/// node and the allocated iteration per level, outermost first.
///
/// Without iterations the body itself is returned, wrapped in a `List`
/// unless it is a single node.
pub fn compose_nodes_with_chain(
    arena: &mut Arena,
    iterations: Vec<Iteration>,
    mut body: Vec<NodeId>,
) -> (NodeId, Vec<NodeId>) {
    if iterations.is_empty() {
        let node = match body.len() {
            1 => body[0],
            _ => arena.alloc(Node::List(body)),
        };
        return (node, Vec::new());
    }

    let mut chain = Vec::with_capacity(iterations.len());
    for iteration in iterations.into_iter().rev() {
        let id = arena.alloc(Node::Iteration(Iteration { nodes: body, ..iteration }));
        chain.push(id);
        body = vec![id];
    }
    chain.reverse();
    (chain[0], chain)
}

/// Loop nests copying each `(dst, src)` pair element-wise, `dst = src`, or
/// `src = dst` when `reverse` is set. Bounds come from the shape of `dst`,
/// which must give one extent per dimension.
/// Nests over the same loops are merged.
pub fn copy_arrays(arena: &mut Arena, pairs: &[(Function, Function)], reverse: bool) -> Result<Vec<NodeId>> {
    let mut nests = Vec::with_capacity(pairs.len());
    for (dst, src) in pairs {
        let dims = dst.dimensions();
        snafu::ensure!(
            dims.len() == dst.shape().len(),
            ShapeMismatchSnafu { function: dst.name(), dims: dims.len(), rank: dst.shape().len() }
        );
        let iterations: Vec<Iteration> = dims
            .iter()
            .zip(dst.shape())
            .map(|(dim, &extent)| Iteration::new(dim.clone(), Limits::range(extent)))
            .collect();

        let indices = || dims.iter().map(Expr::dim);
        let (lhs, rhs) = if reverse { (src, dst) } else { (dst, src) };
        let eq = Eq::assign(lhs.at(indices())?, rhs.at(indices())?)?;
        let expression = arena.alloc(Node::Expression(Expression { eq: eq.into(), dtype: dst.dtype() }));

        nests.push(compose_nodes(arena, iterations, vec![expression]));
    }
    merge_outer_iterations(arena, &nests)
}

/// Merge adjacent sibling iterations that are foldable, recursively merging
/// their combined bodies.
pub fn merge_outer_iterations(arena: &mut Arena, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut out: Vec<NodeId> = Vec::with_capacity(nodes.len());
    for &id in nodes {
        let Some(&last) = out.last() else {
            out.push(id);
            continue;
        };
        if !is_foldable(arena, &[last, id])? {
            out.push(id);
            continue;
        }

        let first = arena.iteration(last)?.clone();
        let second = arena.iteration(id)?;
        let body: Vec<NodeId> = first.nodes.iter().chain(&second.nodes).copied().collect();
        let mut uindices = first.uindices.clone();
        for u in &second.uindices {
            if !uindices.contains(u) {
                uindices.push(u.clone());
            }
        }

        let nodes = merge_outer_iterations(arena, &body)?;
        let merged = arena.alloc(Node::Iteration(Iteration { nodes, uindices, ..first }));
        if let Some(slot) = out.last_mut() {
            *slot = merged;
        }
    }
    Ok(out)
}
