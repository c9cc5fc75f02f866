//! Iteration/expression tree nodes and the arena owning them.
//!
//! Nodes are immutable once allocated. Changing a subtree means allocating
//! new nodes for it and every ancestor (see [`crate::Transformer`]); the old
//! nodes stay valid, so ids recorded before a rebuild can be translated
//! through the rebuild map instead of dangling.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use itertools::Itertools;
use smallvec::SmallVec;
use tessera_dtype::DType;
use tessera_ir::{Dimension, Eq, Expr, Limits, Symbol};

use crate::error::{NotAnIterationSnafu, Result, UnknownNodeSnafu};

static ARENA_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Index of a node in its [`Arena`], tagged with the arena's generation.
#[derive(Debug, Clone, Copy, PartialEq, std::cmp::Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    generation: u32,
    index: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generation, self.index)
    }
}

/// Per-iteration index derived from the loop counter, `name = min..=max`.
#[derive(Debug, Clone, PartialEq, std::cmp::Eq, Hash)]
pub struct UnboundedIndex {
    pub name: Symbol,
    pub min: Expr,
    pub max: Expr,
}

impl fmt::Display for UnboundedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{} = {}", self.name, self.min)
        } else {
            write!(f, "{} = {}..{}", self.name, self.min, self.max)
        }
    }
}

pub type UnboundedIndices = SmallVec<[UnboundedIndex; 2]>;

/// A loop over `dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub dim: Dimension,
    pub limits: Limits,
    /// Shift applied to the start and end limits.
    pub offsets: (i64, i64),
    pub uindices: UnboundedIndices,
    pub nodes: Vec<NodeId>,
}

impl Iteration {
    pub fn new(dim: Dimension, limits: Limits) -> Self {
        Self { dim, limits, offsets: (0, 0), uindices: UnboundedIndices::new(), nodes: Vec::new() }
    }

    /// Loops that can be emitted as one: same dimension, limits and offsets.
    pub fn is_compatible(&self, other: &Iteration) -> bool {
        self.dim == other.dim && self.limits == other.limits && self.offsets == other.offsets
    }
}

/// One lowered equation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub eq: Arc<Eq>,
    pub dtype: DType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Iteration(Iteration),
    Expression(Expression),
    List(Vec<NodeId>),
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Iteration(it) => &it.nodes,
            Node::List(body) => body,
            Node::Expression(_) => &[],
        }
    }

    /// Same node over new children. Expressions have none and are returned
    /// unchanged.
    pub fn with_children(&self, children: Vec<NodeId>) -> Node {
        match self {
            Node::Iteration(it) => Node::Iteration(Iteration { nodes: children, ..it.clone() }),
            Node::List(_) => Node::List(children),
            Node::Expression(e) => Node::Expression(e.clone()),
        }
    }

    pub fn as_iteration(&self) -> Option<&Iteration> {
        match self {
            Node::Iteration(it) => Some(it),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Node::Expression(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_iteration(&self) -> bool {
        matches!(self, Node::Iteration(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iteration(it) => {
                let (lo, hi) = it.offsets;
                write!(f, "Iteration {} {} offsets=({lo}, {hi})", it.dim, it.limits)?;
                if !it.uindices.is_empty() {
                    write!(f, " uindices=[{}]", it.uindices.iter().join(", "))?;
                }
                Ok(())
            }
            Node::Expression(e) => write!(f, "Expression<{}> {}", e.dtype, e.eq),
            Node::List(_) => f.write_str("List"),
        }
    }
}

/// Append-only node storage.
#[derive(Debug, Clone)]
pub struct Arena {
    generation: u32,
    nodes: Vec<Node>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self { generation: ARENA_GENERATION.fetch_add(1, Ordering::Relaxed), nodes: Vec::new() }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(node);
        NodeId { generation: self.generation, index }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        snafu::ensure!(id.generation == self.generation, UnknownNodeSnafu { id });
        self.nodes.get(id.index()).ok_or_else(|| UnknownNodeSnafu { id }.build())
    }

    pub fn iteration(&self, id: NodeId) -> Result<&Iteration> {
        self.get(id)?.as_iteration().ok_or_else(|| NotAnIterationSnafu { id }.build())
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.get(id)?.children())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A finished tree: the arena plus the root `List`.
#[derive(Debug, Clone)]
pub struct Iet {
    arena: Arena,
    root: NodeId,
}

impl Iet {
    pub fn new(arena: Arena, root: NodeId) -> Self {
        Self { arena, root }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.arena.get(id)
    }

    /// Top-level fragments, in cluster order.
    pub fn body(&self) -> Result<&[NodeId]> {
        self.arena.children(self.root)
    }

    /// Every equation of the tree, in emission order.
    pub fn expressions(&self) -> Result<Vec<&Expression>> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.arena.get(id)?;
            if let Some(e) = node.as_expression() {
                out.push(e);
            }
            stack.extend(node.children().iter().rev());
        }
        Ok(out)
    }
}
