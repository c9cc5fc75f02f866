use test_case::test_case;

use crate::ClusterConfig;
use crate::config::{DEFAULT_MAX_PROPAGATION_STEPS, DEFAULT_SCALAR_PREFIX};

#[test]
fn test_builder_defaults_match_default() {
    assert_eq!(ClusterConfig::builder().build(), ClusterConfig::default());

    let config = ClusterConfig::default();
    assert_eq!(config.max_propagation_steps, DEFAULT_MAX_PROPAGATION_STEPS);
    assert_eq!(config.scalar_prefix, DEFAULT_SCALAR_PREFIX);
    assert!(config.fuse);
}

#[test_case(1, false, "tmp" ; "tight cap without fusion")]
#[test_case(500, true, "r" ; "custom prefix")]
fn test_builder_overrides(steps: usize, fuse: bool, prefix: &str) {
    let config = ClusterConfig::builder().max_propagation_steps(steps).fuse(fuse).scalar_prefix(prefix).build();
    assert_eq!(config.max_propagation_steps, steps);
    assert_eq!(config.fuse, fuse);
    assert_eq!(config.scalar_prefix, prefix);
}
