//! Clustering configuration with bon builders and environment fallbacks.

use bon::bon;

/// Default cap on work-queue pops during iteration-space propagation.
pub const DEFAULT_MAX_PROPAGATION_STEPS: usize = 10_000;

/// Default name prefix of scalars introduced by array contraction.
pub const DEFAULT_SCALAR_PREFIX: &str = "s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Maximum work-queue pops before propagation gives up.
    pub max_propagation_steps: usize,
    /// Run the fusion pass after clustering.
    pub fuse: bool,
    /// Prefix of contraction scalars (`s0`, `s1`, ...).
    pub scalar_prefix: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_propagation_steps: DEFAULT_MAX_PROPAGATION_STEPS,
            fuse: true,
            scalar_prefix: DEFAULT_SCALAR_PREFIX.to_string(),
        }
    }
}

#[bon]
impl ClusterConfig {
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_PROPAGATION_STEPS)] max_propagation_steps: usize,
        #[builder(default = true)] fuse: bool,
        #[builder(into, default = String::from(DEFAULT_SCALAR_PREFIX))] scalar_prefix: String,
    ) -> Self {
        Self { max_propagation_steps, fuse, scalar_prefix }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSERA_MAX_PROPAGATION` - Propagation step cap (default: 10000)
    /// * `TESSERA_NOFUSE` - Skip the fusion pass if set
    /// * `TESSERA_SCALAR_PREFIX` - Contraction scalar prefix (default: `s`)
    pub fn from_env() -> Self {
        let max_propagation_steps = std::env::var("TESSERA_MAX_PROPAGATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_PROPAGATION_STEPS);
        let fuse = std::env::var("TESSERA_NOFUSE").is_err();
        let scalar_prefix = std::env::var("TESSERA_SCALAR_PREFIX")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SCALAR_PREFIX.to_string());

        Self { max_propagation_steps, fuse, scalar_prefix }
    }
}
