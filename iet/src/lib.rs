//! Iteration/expression trees (IET).
//!
//! [`build_iet`] lowers an ordered [`ClusterGroup`](tessera_schedule::ClusterGroup)
//! into a tree of loops ([`Node::Iteration`]) around lowered equations
//! ([`Node::Expression`]), rooted at a [`Node::List`]. Clusters sharing the
//! leading intervals of their iteration spaces share the corresponding
//! loops.
//!
//! Nodes live in an [`Arena`] and are immutable; grafting into an existing
//! loop rebuilds its ancestors through a [`Transformer`].

pub mod build;
pub mod config;
pub mod error;
pub mod node;
pub mod transformer;
pub mod tree;
pub mod utils;


pub use build::build_iet;
pub use config::IetConfig;
pub use error::{Error, Result};
pub use node::{Arena, Expression, Iet, Iteration, Node, NodeId, UnboundedIndex, UnboundedIndices};
pub use transformer::Transformer;
pub use tree::{NodeView, render_tree};
pub use utils::{
    StopPolicy, TreeMode, compose_nodes, compose_nodes_with_chain, copy_arrays, filter_iterations, is_foldable,
    merge_outer_iterations, retrieve_iteration_tree,
};
