//! Phase two of clustering: greedy fusion of adjacent clusters.
//!
//! Clusters are visited left to right. Each one is tried against the already
//! accepted clusters, most recent first, and fused into the first whose
//! iteration space is identical, provided every array inducing a carried
//! anti-dependence can be contracted into scalars. An anti-dependence that
//! cannot be removed ends the search and makes its cause dimensions atomic
//! for the cluster. A flow dependence along a dimension that is atomic for
//! the candidate also ends the search.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use tessera_ir::{Expr, Function, Indexed, Scope, Storage};

use crate::cluster::{ClusterGroup, ClusterId, ClusterView, PartialCluster};
use crate::context::ClusterContext;
use crate::error::{NonAffineAccessSnafu, Result};

/// Clusters other than the source and sink of a fusion, reduced to what
/// they read.
struct Context<'a> {
    processed: &'a [PartialCluster],
    pending: &'a [(ClusterId, Vec<Storage>)],
    source: ClusterId,
    sink: ClusterId,
}

impl Context<'_> {
    fn reads_elsewhere(&self, storage: &Storage) -> bool {
        let skip = |id: ClusterId| id == self.source || id == self.sink;
        self.processed.iter().filter(|c| !skip(c.id())).any(|c| c.unknown().contains(storage))
            || self.pending.iter().filter(|(id, _)| !skip(*id)).any(|(_, reads)| reads.contains(storage))
    }
}

enum Verdict {
    Fuse { index: usize, targets: Vec<Function> },
    Keep,
}

/// Fuse adjacent clusters where dependences allow, then freeze.
#[tracing::instrument(skip_all, fields(num_clusters = clusters.len()))]
pub fn groupby(clusters: ClusterGroup<PartialCluster>, ctx: &mut ClusterContext) -> Result<ClusterGroup> {
    let input = clusters.into_clusters();
    let reads: Vec<(ClusterId, Vec<Storage>)> = input.iter().map(|c| (c.id(), c.unknown())).collect();

    let mut processed: ClusterGroup<PartialCluster> = ClusterGroup::new();
    for (position, mut cluster) in input.into_iter().enumerate() {
        let mut verdict = Verdict::Keep;

        for index in (0..processed.len()).rev() {
            let candidate = &processed.clusters()[index];
            let candidate_id = candidate.id();
            let scope = Scope::new(candidate.exprs().iter().chain(cluster.exprs()).map(Arc::as_ref));

            let d_anti = scope.d_anti();
            let anti = d_anti.carried().difference(&d_anti.increment());
            let d_flow = scope.d_flow();
            let flow = d_flow.difference(&d_flow.inplace().union(&d_flow.increment()));

            let context = Context {
                processed: processed.clusters(),
                pending: &reads[position + 1..],
                source: candidate_id,
                sink: cluster.id(),
            };
            let local = |storage: &Storage| {
                storage.as_function().filter(|f| is_local(f, candidate, &cluster, &context)).cloned()
            };

            let anti_targets: Option<Vec<Function>> = anti.functions().iter().map(local).collect();
            if let Some(targets) = anti_targets
                && candidate.ispace() == cluster.ispace()
            {
                let independent = d_flow.independent().functions();
                let targets: Vec<Function> =
                    targets.into_iter().chain(independent.iter().filter_map(local)).unique().collect();
                tracing::debug!(source = %candidate_id, sink = %cluster.id(), targets = ?targets, "fusing clusters");
                verdict = Verdict::Fuse { index, targets };
                break;
            }

            if !anti.is_empty() {
                let cause = anti.cause();
                tracing::debug!(cluster = %cluster.id(), blocked_by = %candidate_id, atomics = ?cause, "anti-dependence blocks fusion");
                processed.add_atomics(cluster.id(), cause);
                break;
            }

            if flow.cause().iter().any(|d| processed.is_atomic(candidate_id, d)) {
                tracing::debug!(cluster = %cluster.id(), blocked_by = %candidate_id, "flow dependence across atomic dimension");
                break;
            }
        }

        match verdict {
            Verdict::Fuse { index, targets } => {
                let source = &mut processed.clusters_mut()[index];
                bump_and_contract(&targets, source, &mut cluster, ctx)?;
                source.squash(cluster);
            }
            Verdict::Keep => processed.push(cluster),
        }
    }

    tracing::debug!(num_clusters = processed.len(), "fusion done");
    Ok(processed.freeze())
}

/// True if `array` can be contracted when fusing `sink` into `source`:
///
/// * it is a temporary;
/// * `source` writes it exactly once, from a rhs that reads no temporary
///   storage, and never reads it;
/// * no cluster other than `source` and `sink` reads it.
fn is_local(array: &Function, source: &PartialCluster, sink: &PartialCluster, context: &Context<'_>) -> bool {
    if !array.is_temporary() {
        return false;
    }
    debug_assert!(context.sink == sink.id());

    let mut writes = source.exprs().iter().filter(|eq| eq.function() == Some(array));
    let Some(write) = writes.next() else {
        return false;
    };
    if writes.next().is_some() {
        return false;
    }
    let rhs = write.rhs();
    if rhs.indexeds().iter().any(|i| i.function().is_temporary()) || rhs.symbols().iter().any(|s| s.is_temp()) {
        return false;
    }
    if source.exprs().iter().any(|eq| eq.reads().iter().any(|i| i.function() == array)) {
        return false;
    }

    !context.reads_elsewhere(&Storage::Array(array.clone()))
}

/// Turn the arrays in `targets` into scalars.
///
/// Index bumping re-emits the source write of a target once per distinct
/// access the sink makes to it, shifting the write's indices onto that
/// access. Array contraction then stores each copy into a fresh scalar, and
/// the sink reads the scalars instead of the array.
///
/// ```text
/// source: r[x] = b[x]*2            s0 = b[x]*2
///                           =>     s1 = b[x + 1]*2
/// sink:   a = r[x] + r[x + 1]      a = s0 + s1
/// ```
pub fn bump_and_contract(
    targets: &[Function],
    source: &mut PartialCluster,
    sink: &mut PartialCluster,
    ctx: &mut ClusterContext,
) -> Result<()> {
    if targets.is_empty() {
        return Ok(());
    }

    let tensors = sink.tensors();
    let mut mapper: HashMap<Expr, Expr> = HashMap::new();

    let mut processed = Vec::with_capacity(source.exprs().len());
    for eq in source.exprs() {
        let write = eq.lhs().as_indexed().filter(|w| targets.contains(w.function()));
        let Some((write, accesses)) = write.and_then(|w| Some((w, tensors.get(w.function())?))) else {
            processed.push(Arc::new(eq.with_rhs(eq.rhs().xreplace(&mapper))?));
            continue;
        };

        for access in accesses {
            let scalar = ctx.next_scalar(write.function().dtype());
            mapper.insert(Expr::Indexed(access.clone()), Expr::symbol(scalar.clone()));

            let shifting = shifting(write, access)?;
            let handle = eq.rebuild(Expr::symbol(scalar), eq.rhs().xreplace(&mapper))?.xreplace_indices(&shifting)?;
            tracing::debug!(access = %access, contracted = %handle, "array contraction");
            processed.push(Arc::new(handle));
        }
    }
    source.set_exprs(processed);

    let sink_exprs = sink
        .exprs()
        .iter()
        .map(|eq| Ok(Arc::new(eq.with_rhs(eq.rhs().xreplace(&mapper))?)))
        .collect::<Result<Vec<_>>>()?;
    sink.set_exprs(sink_exprs);
    Ok(())
}

/// Map each dimension indexing `write` to itself plus the offset between
/// `write` and `read` along it.
fn shifting(write: &Indexed, read: &Indexed) -> Result<HashMap<Expr, Expr>> {
    let function = write.function();
    let dims = function.dimensions();
    for indices in [write.indices(), read.indices()] {
        if indices.len() != dims.len() {
            return Err(tessera_ir::Error::IndexArityMismatch {
                function: function.name().to_string(),
                expected: dims.len(),
                actual: indices.len(),
            }
            .into());
        }
    }

    let mut out = HashMap::new();
    for (o1, o2) in write.indices().iter().zip(read.indices()) {
        match (o1.as_dim_offset(), o2.as_dim_offset()) {
            (Some((d1, a)), Some((d2, b))) if d1 == d2 => {
                if a != b {
                    out.insert(Expr::dim(d1), Expr::dim(d1) + (b - a));
                }
            }
            _ if o1 == o2 => {}
            _ => return NonAffineAccessSnafu { access: read.to_string(), target: write.to_string() }.fail(),
        }
    }
    Ok(out)
}
