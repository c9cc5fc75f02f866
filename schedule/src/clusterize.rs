//! Phase one of clustering: one partial cluster per equation, with iteration
//! spaces propagated along dependences until stable.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use snafu::ensure;
use tessera_ir::{Eq, Interval, Schedule, Scope};

use crate::cluster::{ClusterGroup, PartialCluster};
use crate::context::ClusterContext;
use crate::error::{PropagationDivergedSnafu, Result};
use crate::groupby::groupby;

/// Group `exprs` into clusters, fusing them afterwards unless disabled in
/// the context's configuration.
#[tracing::instrument(skip_all, fields(num_exprs = exprs.len()))]
pub fn clusterize(exprs: &[Arc<Eq>], ctx: &mut ClusterContext) -> Result<ClusterGroup> {
    let clusters = partial_clusters(exprs, ctx)?;
    if ctx.config().fuse {
        groupby(clusters, ctx)
    } else {
        tracing::debug!(num_clusters = clusters.len(), "fusion disabled");
        Ok(clusters.freeze())
    }
}

/// One [`PartialCluster`] per equation, without fusion. Scalars are folded
/// into the clusters of the equations consuming them and only get a cluster
/// of their own when nothing later depends on them.
///
/// The iteration space of an equation starts as its negated data space
/// (time dimensions first) and is intersected with the spaces of every
/// equation it depends on, or that depends on it, until nothing changes.
pub fn partial_clusters(exprs: &[Arc<Eq>], ctx: &mut ClusterContext) -> Result<ClusterGroup<PartialCluster>> {
    let n = exprs.len();

    // Step 1: dependence traces, in program order
    let traces: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let e1 = exprs[i].as_ref();
            let mut trace: Vec<usize> = (0..i).filter(|&j| Scope::new([exprs[j].as_ref(), e1]).has_dep()).collect();
            trace.push(i);
            trace.extend((i + 1..n).filter(|&j| Scope::new([e1, exprs[j].as_ref()]).has_dep()));
            trace
        })
        .collect();

    // Step 2: candidate iteration spaces
    let mut ispaces: Vec<Schedule> = exprs.iter().map(|e| Schedule::time_first(e.dspace().negate())).collect();

    // Step 3: work-queue fixpoint
    let max_steps = ctx.config().max_propagation_steps;
    let mut queue: VecDeque<usize> = (0..n).collect();
    let mut queued = vec![true; n];
    let mut steps = 0usize;
    while let Some(target) = queue.pop_front() {
        queued[target] = false;
        steps += 1;
        ensure!(steps <= max_steps, PropagationDivergedSnafu { steps: max_steps });

        let coerced = {
            let others: Vec<&Schedule> = traces[target].iter().map(|&i| &ispaces[i]).collect();
            ispaces[target].intersection(&others)
        };
        tracing::trace!(target, steps, queued = queue.len(), "propagation step");

        if coerced != ispaces[target] {
            tracing::debug!(eq = %exprs[target], from = %ispaces[target], to = %coerced, "iteration space narrowed");
            ispaces[target] = coerced;
            for &i in &traces[target] {
                if !queued[i] {
                    queued[i] = true;
                    queue.push_back(i);
                }
            }
        }
    }

    // Step 4: emit clusters. A scalar consumed later in the sequence only
    // lives in its consumers' clusters
    let mut clusters = ClusterGroup::new();
    for k in 0..n {
        if exprs[k].is_scalar() && traces[k].iter().any(|&j| j > k) {
            tracing::trace!(eq = %exprs[k], "scalar absorbed by its consumers");
            continue;
        }
        let members = scalar_closure(k, &traces, exprs);
        let ispace = emitted_ispace(k, &members, &ispaces);
        let members = members.into_iter().map(|i| exprs[i].clone());
        clusters.push(PartialCluster::new(ctx.next_cluster_id(), members, ispace));
    }
    Ok(clusters)
}

/// `k` plus the scalars it consumes, directly or through other scalars, in
/// program order.
fn scalar_closure(k: usize, traces: &[Vec<usize>], exprs: &[Arc<Eq>]) -> Vec<usize> {
    let mut members = BTreeSet::from([k]);
    let mut stack = vec![k];
    while let Some(m) = stack.pop() {
        for &i in traces[m].iter().take_while(|&&i| i != m) {
            if exprs[i].is_scalar() && members.insert(i) {
                stack.push(i);
            }
        }
    }
    members.into_iter().collect()
}

/// Iteration space of the cluster emitted for `k`: its own, extended with
/// the dimensions only its absorbed scalars iterate over. Along those, the
/// range is the one every absorbed scalar stays within.
fn emitted_ispace(k: usize, members: &[usize], ispaces: &[Schedule]) -> Schedule {
    let own = &ispaces[k];
    let mut extra: Vec<Interval> = Vec::new();
    for interval in members.iter().filter(|&&i| i != k).flat_map(|&i| ispaces[i].intervals()) {
        if own.contains(interval.dim()) {
            continue;
        }
        match extra.iter_mut().find(|e| e.dim() == interval.dim()) {
            Some(existing) => *existing = narrowest(existing, interval),
            None => extra.push(interval.clone()),
        }
    }
    if extra.is_empty() {
        return own.clone();
    }
    Schedule::time_first(own.intervals().iter().cloned().chain(extra).collect())
}

fn narrowest(a: &Interval, b: &Interval) -> Interval {
    match (a.bounds(), b.bounds()) {
        (Some((al, au)), Some((bl, bu))) => Interval::new(a.dim().clone(), al.max(bl), au.min(bu)),
        (None, _) => b.clone(),
        (_, None) => a.clone(),
    }
}
