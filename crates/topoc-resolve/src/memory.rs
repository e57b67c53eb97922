//! Memory-limit policy.
//!
//! Search/indexing workloads always get a memory limit. Other containers
//! get one only when they declare `resources.limits.memory`.

use topoc_common::config::CompilerConfig;
use topoc_model::Container;

/// Memory limit to emit for `container`, if any.
#[must_use]
pub fn memory_limit(container: &Container, config: &CompilerConfig) -> Option<String> {
    let explicit = container.explicit_memory_limit();
    let is_search = container.name.contains(&config.search_workload_marker);
    match explicit {
        Some(limit) => Some(limit),
        None if is_search => {
            tracing::debug!(
                container = %container.name,
                limit = %config.default_search_memory,
                "applying default search workload memory limit"
            );
            Some(config.default_search_memory.clone())
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(yaml: &str) -> Container {
        serde_yaml::from_str(yaml).expect("container")
    }

    #[test]
    fn search_workload_gets_default() {
        let c = container("name: docker.elastic.co/elasticsearch/elasticsearch:8.11.0");
        assert_eq!(
            memory_limit(&c, &CompilerConfig::default()).as_deref(),
            Some("3G")
        );
    }

    #[test]
    fn explicit_limit_is_used_verbatim() {
        let c = container("name: elasticsearch\nresources:\n  limits:\n    memory: 6Gi\n");
        assert_eq!(
            memory_limit(&c, &CompilerConfig::default()).as_deref(),
            Some("6Gi")
        );
        let c = container("name: api\nresources:\n  limits:\n    memory: 512M\n");
        assert_eq!(
            memory_limit(&c, &CompilerConfig::default()).as_deref(),
            Some("512M")
        );
    }

    #[test]
    fn malformed_limit_on_search_workload_falls_back() {
        let c = container("name: elasticsearch\nresources:\n  limits:\n    memory: {}\n");
        assert_eq!(
            memory_limit(&c, &CompilerConfig::default()).as_deref(),
            Some("3G")
        );
    }

    #[test]
    fn plain_container_has_no_limit() {
        let c = container("name: api");
        assert_eq!(memory_limit(&c, &CompilerConfig::default()), None);
    }
}
