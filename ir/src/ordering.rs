//! Merging partial orders into one total order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// Merge several chains (each an ordered sequence) into one sequence that
/// respects every chain.
///
/// Ties are broken by first appearance across the chains, so the result is
/// deterministic. A contradiction between chains (a cycle) cannot be
/// honoured; the elements caught in it are appended in first-appearance order
/// and a warning is emitted.
pub fn partial_order<T>(chains: &[Vec<T>]) -> Vec<T>
where
    T: Clone + Eq + Hash + Debug,
{
    // Step 1: number elements by first appearance
    let mut position: HashMap<&T, usize> = HashMap::new();
    let mut elements: Vec<&T> = Vec::new();
    for item in chains.iter().flatten() {
        position.entry(item).or_insert_with(|| {
            elements.push(item);
            elements.len() - 1
        });
    }

    // Step 2: edges between consecutive chain members
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); elements.len()];
    let mut in_degree = vec![0usize; elements.len()];
    for chain in chains {
        for pair in chain.windows(2) {
            let (a, b) = (position[&pair[0]], position[&pair[1]]);
            if a != b && !successors[a].contains(&b) {
                successors[a].push(b);
                in_degree[b] += 1;
            }
        }
    }

    // Step 3: Kahn's algorithm, smallest appearance index first
    let mut ready: BinaryHeap<Reverse<usize>> =
        (0..elements.len()).filter(|&i| in_degree[i] == 0).map(Reverse).collect();
    let mut order = Vec::with_capacity(elements.len());
    let mut placed = vec![false; elements.len()];
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        placed[i] = true;
        for &j in &successors[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < elements.len() {
        let stuck: Vec<&T> = (0..elements.len()).filter(|&i| !placed[i]).map(|i| elements[i]).collect();
        tracing::warn!(elements = ?stuck, "cyclic ordering constraints, falling back to appearance order");
        order.extend((0..elements.len()).filter(|&i| !placed[i]));
    }

    order.into_iter().map(|i| elements[i].clone()).collect()
}
