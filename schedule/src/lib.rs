//! Clustering of equations into loop nests.
//!
//! A *cluster* is a sequence of equations sharing one iteration space, so
//! they can be emitted inside a single loop nest. Clustering runs in two
//! phases:
//!
//! - [`clusterize::partial_clusters`] - one cluster per equation, with
//!   iteration spaces propagated along dependences until stable
//! - [`groupby::groupby`] - greedy fusion of adjacent clusters, contracting
//!   temporary arrays into scalars where it removes a dependence
//!
//! [`clusterize()`] runs both. Fusion can be switched off through
//! [`ClusterConfig`].

pub mod cluster;
pub mod clusterize;
pub mod config;
pub mod context;
pub mod error;
pub mod groupby;


pub use cluster::{
    Cluster, ClusterGroup, ClusterId, ClusterView, IterationSpace, PartialCluster, SubIterator, SubIterators, Tensors,
    Trace,
};
pub use clusterize::{clusterize, partial_clusters};
pub use config::ClusterConfig;
pub use context::ClusterContext;
pub use error::{Error, Result};
pub use groupby::{bump_and_contract, groupby};

pub use tessera_ir;
