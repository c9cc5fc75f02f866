//! State shared by the clustering passes of one compilation unit.

use tessera_dtype::DType;
use tessera_ir::Symbol;

use crate::cluster::ClusterId;
use crate::config::ClusterConfig;

/// Counters that must not restart between `clusterize` and `groupby`, so
/// cluster ids and contraction scalars stay unique within the unit.
#[derive(Debug, Clone, Default)]
pub struct ClusterContext {
    config: ClusterConfig,
    cluster_counter: usize,
    scalar_counter: usize,
}

impl ClusterContext {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config, cluster_counter: 0, scalar_counter: 0 }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn next_cluster_id(&mut self) -> ClusterId {
        let id = ClusterId(self.cluster_counter);
        self.cluster_counter += 1;
        id
    }

    /// Fresh temporary scalar, `<prefix><n>`.
    pub fn next_scalar(&mut self, dtype: DType) -> Symbol {
        let name = format!("{}{}", self.config.scalar_prefix, self.scalar_counter);
        self.scalar_counter += 1;
        Symbol::temp(name, dtype)
    }

    pub fn scalars_created(&self) -> usize {
        self.scalar_counter
    }
}
