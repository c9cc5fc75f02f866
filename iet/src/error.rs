use snafu::Snafu;

use crate::node::NodeId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The id was allocated by another arena.
    #[snafu(display("node {id} does not belong to this tree"))]
    UnknownNode { id: NodeId },

    #[snafu(display("node {id} is not an iteration"))]
    NotAnIteration { id: NodeId },

    /// Copy nests take their bounds from the shape, one extent per dimension.
    #[snafu(display("{function} has {dims} dimensions but a shape of rank {rank}"))]
    ShapeMismatch { function: String, dims: usize, rank: usize },

    #[snafu(transparent)]
    Ir { source: tessera_ir::Error },
}
