use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Iteration-space propagation did not settle within the configured cap.
    #[snafu(display("iteration space propagation did not converge after {steps} steps"))]
    PropagationDiverged { steps: usize },

    /// Index bumping needs `d + c` indices to compute the shift.
    #[snafu(display("cannot bump non-affine access {access} against {target}"))]
    NonAffineAccess { access: String, target: String },

    #[snafu(transparent)]
    Ir { source: tessera_ir::Error },
}
