//! Lowering clusters into an iteration/expression tree.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_ir::{DEFAULT_MODULO, DimensionRegistry, Expr, Interval, Symbol};
use tessera_schedule::{ClusterGroup, ClusterView};

use crate::config::IetConfig;
use crate::error::Result;
use crate::node::{Arena, Expression, Iet, Iteration, Node, NodeId, UnboundedIndex, UnboundedIndices};
use crate::transformer::Transformer;
use crate::utils::compose_nodes_with_chain;

/// Build the tree for `clusters`, in order.
///
/// A cluster reuses the loops of the previously scheduled nest for the
/// longest prefix of equal intervals whose dimension is not atomic for it.
/// Its remaining intervals become new loops, grafted under the innermost
/// reused one. A cluster with an empty iteration space becomes plain
/// statements and ends any reuse.
#[tracing::instrument(skip_all, fields(num_clusters = clusters.len()))]
pub fn build_iet(clusters: &ClusterGroup, config: &IetConfig) -> Result<Iet> {
    let mut arena = Arena::new();
    let mut lowered = DimensionRegistry::new();
    let mut processed: Vec<NodeId> = Vec::new();
    let mut schedule: Vec<(Interval, NodeId)> = Vec::new();

    for cluster in clusters.iter() {
        let ispace = cluster.ispace();
        if ispace.is_empty() {
            for eq in cluster.exprs() {
                processed.push(arena.alloc(Node::Expression(Expression { eq: eq.clone(), dtype: config.default_dtype })));
            }
            schedule.clear();
            continue;
        }

        let intervals = ispace.intervals.intervals();
        let depth = intervals
            .iter()
            .zip(&schedule)
            .take_while(|&(i0, (i1, _))| i0 == i1 && !clusters.is_atomic(cluster.id(), i0.dim()))
            .count();
        let needed = &intervals[depth..];
        tracing::debug!(cluster = %cluster.id(), reuse_depth = depth, new_loops = needed.len(), "scheduling cluster");

        // Loop dimensions become index scalars, `stepping + offset` a lowered dimension
        let mut subs: HashMap<Expr, Expr> = HashMap::new();
        let mut uindices: Vec<UnboundedIndices> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let dim = interval.dim();
            let mut level = UnboundedIndices::new();
            for sub in ispace.sub_iterators.get(dim) {
                let modulo = i64::try_from(sub.dim.modulo().unwrap_or(DEFAULT_MODULO)).unwrap_or(i64::MAX);
                for &offset in &sub.offsets {
                    let name = slot_name(sub.dim.name(), offset);
                    let lowered_dim = lowered.lowered(&name, &sub.dim, offset);
                    subs.insert(Expr::dim(&sub.dim) + offset, Expr::dim(&lowered_dim));

                    let value = (Expr::dim(dim) + offset) % modulo;
                    level.push(UnboundedIndex {
                        name: Symbol::global(name, config.index_dtype),
                        min: value.clone(),
                        max: value,
                    });
                }
            }
            uindices.push(level);
            let proxy = Symbol::global(dim.name(), config.index_dtype);
            subs.insert(Expr::dim(dim), Expr::symbol(proxy));
        }

        let iterations: Vec<Iteration> = needed
            .iter()
            .zip(&uindices[depth..])
            .map(|(interval, level)| Iteration {
                dim: interval.dim().clone(),
                limits: interval.dim().limits(),
                offsets: interval.bounds().unwrap_or((0, 0)),
                uindices: level.clone(),
                nodes: Vec::new(),
            })
            .collect();

        let trace = cluster.trace();
        let mut exprs = Vec::with_capacity(trace.len());
        for eq in trace.iter() {
            let dtype = if trace.is_index(eq.lhs()) { config.index_dtype } else { config.default_dtype };
            let eq = Arc::new(eq.xreplace(&subs)?);
            exprs.push(arena.alloc(Node::Expression(Expression { eq, dtype })));
        }

        let (body, tree) = compose_nodes_with_chain(&mut arena, iterations, exprs);
        let scheduling = needed.iter().cloned().zip(tree);

        if depth == 0 {
            processed.push(body);
            schedule = scheduling.collect();
            continue;
        }

        // Graft innermost first: the reuse point takes the new body, and every
        // reused loop takes the unbounded indices it lacks. Each rebuild
        // refreshes the ids of the enclosing loops before they are visited.
        let mut body = Some(body);
        for level in (0..depth).rev() {
            let node = schedule[level].1;
            let mut iteration = arena.iteration(node)?.clone();
            let mut changed = false;
            for u in &uindices[level] {
                if !iteration.uindices.contains(u) {
                    iteration.uindices.push(u.clone());
                    changed = true;
                }
            }
            if let Some(body) = body.take() {
                iteration.nodes.push(body);
                changed = true;
            }
            if !changed {
                continue;
            }

            let grafted = arena.alloc(Node::Iteration(iteration));
            let mut transformer = Transformer::new(HashMap::from([(node, grafted)]));
            processed = transformer.visit_all(&mut arena, &processed)?;
            for (_, id) in &mut schedule {
                *id = transformer.translate(*id);
            }
        }
        schedule.truncate(depth);
        schedule.extend(scheduling);
    }

    let root = arena.alloc(Node::List(processed));
    Ok(Iet::new(arena, root))
}

/// Name of the index walking `stepping` at `offset`: `t0`, `t1`, `tm1`, ...
/// The same slot gets the same name in every cluster.
fn slot_name(stepping: &str, offset: i64) -> String {
    if offset < 0 {
        format!("{stepping}m{}", offset.unsigned_abs())
    } else {
        format!("{stepping}{offset}")
    }
}
