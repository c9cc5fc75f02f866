//! Rebuilding a tree around replaced nodes.

use std::collections::HashMap;

use crate::error::Result;
use crate::node::{Arena, NodeId};

/// Replaces nodes according to `mapper` and rebuilds every ancestor of a
/// replaced node. Untouched subtrees keep their ids.
///
/// After a visit, [`Transformer::rebuilt`] maps each old id that was
/// replaced or rebuilt to its new id, so ids held elsewhere can be
/// refreshed.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    mapper: HashMap<NodeId, NodeId>,
    rebuilt: HashMap<NodeId, NodeId>,
}

impl Transformer {
    pub fn new(mapper: HashMap<NodeId, NodeId>) -> Self {
        Self { mapper, rebuilt: HashMap::new() }
    }

    pub fn visit(&mut self, arena: &mut Arena, id: NodeId) -> Result<NodeId> {
        if let Some(&new) = self.mapper.get(&id) {
            self.rebuilt.insert(id, new);
            return Ok(new);
        }
        if let Some(&new) = self.rebuilt.get(&id) {
            return Ok(new);
        }

        let children = arena.children(id)?.to_vec();
        let visited = self.visit_all(arena, &children)?;
        if visited == children {
            return Ok(id);
        }
        let node = arena.get(id)?.with_children(visited);
        let new = arena.alloc(node);
        self.rebuilt.insert(id, new);
        Ok(new)
    }

    pub fn visit_all(&mut self, arena: &mut Arena, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        ids.iter().map(|&id| self.visit(arena, id)).collect()
    }

    pub fn rebuilt(&self) -> &HashMap<NodeId, NodeId> {
        &self.rebuilt
    }

    /// `id` after the visits so far.
    pub fn translate(&self, id: NodeId) -> NodeId {
        self.rebuilt.get(&id).copied().unwrap_or(id)
    }
}
