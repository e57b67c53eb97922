//! Naming conventions, markers, and default values.

/// Default directory that receives one subdirectory per environment.
pub const DEFAULT_OUTPUT_DIR: &str = "deployment_files";

/// Default naming prefix for identity variables and the monitoring key.
pub const DEFAULT_PREFIX: &str = "APP";

/// Default name marker of the environment where GPU workloads are disabled.
pub const DEFAULT_NON_GPU_ENVIRONMENT: &str = "soe";

/// Default name marker of the network-isolated environment kind.
pub const DEFAULT_RESTRICTED_ENVIRONMENT: &str = "soe";

/// Container name marker identifying a search/indexing workload.
pub const DEFAULT_SEARCH_WORKLOAD_MARKER: &str = "elasticsearch";

/// Memory limit applied to search workloads that declare none.
pub const DEFAULT_SEARCH_MEMORY_LIMIT: &str = "3G";

/// Discriminant of the environment section.
pub const ENVIRONMENT_DETAILS_KIND: &str = "EnvironmentDetails";

/// Discriminant of the service section.
pub const SERVICE_DETAILS_KIND: &str = "ServiceDetails";

/// Services whose name contains this marker are diagram-only.
pub const PLACEHOLDER_SERVICE_MARKER: &str = "placeholder-";

/// Variables whose name contains this marker are never emitted verbatim.
pub const PLACEHOLDER_VARIABLE_MARKER: &str = "placeholder";

/// Name marker of the reverse-proxy service that owns named proxy ports.
pub const PROXY_SERVICE_MARKER: &str = "haproxy";

/// Variable name marker requesting a proxy port.
pub const PROXY_PORT_MARKER: &str = "PROXY_PORT";

/// Variable name marker requesting another service's port.
pub const SERVICE_PORT_MARKER: &str = "SERVICE_PORT";

/// Suffix stripped from a service-port variable to find the service name.
pub const SERVICE_PORT_SUFFIX: &str = "_SERVICE_SERVICE_PORT";

/// Suffix stripped from a service-host variable to find the service name.
pub const SERVICE_HOST_SUFFIX: &str = "_SERVICE_SERVICE_HOST";

/// Orchestrator-managed discovery variable suffix (host).
pub const DISCOVERY_HOST_SUFFIX: &str = "SERVICE_HOST";

/// Orchestrator-managed discovery variable suffix (port).
pub const DISCOVERY_PORT_SUFFIX: &str = "SERVICE_PORT";

/// Case-insensitive variable name marker for host substitution.
pub const HOST_MARKER: &str = "host";

/// Variable whose literal is suppressed for GPU-required services.
pub const USE_GPU_VARIABLE: &str = "USE_GPU";

/// Name of the convenience script that pulls every image.
pub const PULL_SCRIPT_NAME: &str = "pull_latest_images.sh";

/// Suffix of the monitoring service name (after the lowercase prefix).
pub const MONITORING_SERVICE_SUFFIX: &str = "-util-monitoring";

/// Suffix of the monitoring settings key (after the lowercase prefix).
pub const MONITORING_KEY_SUFFIX: &str = "-monitoring-settings";

/// Resource name of the GPU limit in orchestrator manifests.
pub const GPU_RESOURCE_NAME: &str = "nvidia.com/gpu";

/// Default category for services without architecture categories.
pub const DEFAULT_CATEGORY: &str = "Default";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "topoc";
