//! Topology entities.
//!
//! All entities are read-only after [`crate::load`] returns. Optional
//! fields that are absent mean "feature absent", never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use topoc_common::constants;

use crate::scalar::{ScalarValue, presence_flag};

/// The full declarative model for one compilation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    /// Deployment targets, in document order.
    pub environments: Vec<Environment>,
    /// Deployable units, in document order.
    pub services: Vec<Service>,
}

impl Topology {
    /// Finds a service by its unique name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Finds an environment by its unique name.
    #[must_use]
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    /// Builds the proxy-port table from the reverse-proxy service.
    ///
    /// Every named port mapping of every container of a service whose name
    /// contains `haproxy` contributes `name -> target`. A later duplicate
    /// name replaces an earlier one.
    #[must_use]
    pub fn proxy_ports(&self) -> BTreeMap<String, u16> {
        let mut ports = BTreeMap::new();
        for service in self.services.iter().filter(|s| s.is_proxy()) {
            for container in &service.containers {
                for mapping in &container.port_mappings {
                    if let Some(ref name) = mapping.proxy_name {
                        let _ = ports.insert(name.clone(), mapping.target);
                    }
                }
            }
        }
        ports
    }

    /// Returns the first port target of the named service's first container.
    ///
    /// `None` when the service does not exist or its first container
    /// declares no port mappings.
    #[must_use]
    pub fn service_main_port(&self, name: &str) -> Option<u16> {
        self.service(name)
            .and_then(|s| s.containers.first())
            .and_then(Container::main_port)
    }
}

/// A named deployment target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique environment name.
    pub name: String,
    /// Registry prefix joined with image basenames.
    pub image_registry: String,
    /// Value substituted into host variables.
    #[serde(default)]
    pub default_host: Option<String>,
    /// Environment-scoped variable values, in declaration order.
    #[serde(default, rename = "environment_variables")]
    pub overrides: Vec<VariableOverride>,
    /// Host directories mounted into services.
    #[serde(default)]
    pub volume_mappings: Vec<VolumeMapping>,
}

impl Environment {
    /// Returns `true` if any override carries the given name.
    #[must_use]
    pub fn has_override(&self, name: &str) -> bool {
        self.overrides.iter().any(|o| o.name == name)
    }

    /// Volume mappings targeting the named service, in declaration order.
    pub fn volumes_for<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a VolumeMapping> {
        self.volume_mappings
            .iter()
            .filter(move |v| v.service_name == service)
    }
}

/// An environment-scoped variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOverride {
    /// Variable name.
    pub name: String,
    /// Value emitted for this environment.
    #[serde(default)]
    pub value: ScalarValue,
    /// Emit for every container, declared or not.
    #[serde(default, deserialize_with = "presence_flag")]
    pub universal: bool,
}

/// A host directory mounted into a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMapping {
    /// Name of the service receiving the mount.
    pub service_name: String,
    /// Host path.
    pub source: String,
    /// Mount path inside the container.
    pub target: String,
    /// Requested capacity for the volume claim.
    #[serde(default)]
    pub size: Option<String>,
}

/// A named deployable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Unique service name; the join key for every cross-reference.
    pub name: String,
    /// Containers, in declaration order. Never empty after validation.
    pub containers: Vec<Container>,
    /// Replica count for the deployment.
    #[serde(default)]
    pub replicas: Option<u32>,
    /// Path routed to the service by an ingress.
    #[serde(default)]
    pub ingress_path: Option<String>,
    /// Init containers, passed through to the manifest verbatim.
    #[serde(default, rename = "initContainers")]
    pub init_containers: Option<Value>,
    /// Diagram grouping; ignored by the compiler.
    #[serde(default)]
    pub architecture_categories: Vec<Category>,
    /// Monitoring refresh interval (monitoring service only).
    #[serde(default)]
    pub refresh_interval_in_seconds: Option<u64>,
    /// Services monitored by staleness (monitoring service only).
    #[serde(default)]
    pub non_api_services_to_monitor: Option<Vec<NonApiMonitor>>,
    /// Services monitored by health endpoint (monitoring service only).
    #[serde(default)]
    pub api_services_to_monitor: Option<Vec<ApiMonitor>>,
}

impl Service {
    /// Placeholder services appear in diagrams only.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name.contains(constants::PLACEHOLDER_SERVICE_MARKER)
    }

    /// Returns `true` for the reverse-proxy service.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.name.contains(constants::PROXY_SERVICE_MARKER)
    }

    /// Returns `true` if scripts need a per-container name suffix.
    #[must_use]
    pub fn has_multiple_containers(&self) -> bool {
        self.containers.len() > 1
    }
}

/// A diagram category, optionally nesting one sub-category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category name.
    pub name: String,
    /// Nested categories; only the first one is used.
    #[serde(default)]
    pub architecture_categories: Vec<Category>,
}

/// A service watched for staleness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonApiMonitor {
    /// Monitored service name.
    pub name: String,
    /// Minutes without activity before alerting.
    pub threshold_in_minutes: u64,
}

/// A service watched through its health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMonitor {
    /// Monitored service name.
    pub name: String,
    /// Health-check endpoint.
    pub endpoint: String,
}

/// One runnable image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Image reference, possibly including a registry path.
    pub name: String,
    /// Published ports, in declaration order.
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    /// Declared variables, in declaration order.
    #[serde(default)]
    pub environment_variables: Vec<VariableDeclaration>,
    /// Resource block; only `limits.memory` is read.
    #[serde(default)]
    pub resources: Option<Value>,
    /// GPU count or device selector.
    #[serde(default)]
    pub gpus: Option<ScalarValue>,
    /// Command line overriding the image entrypoint.
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Liveness probe, passed through to the manifest verbatim.
    #[serde(default, rename = "livenessProbe")]
    pub liveness_probe: Option<Value>,
    /// Keep the declared image reference outside the restricted environment.
    #[serde(
        default,
        rename = "omit_image_registry_for_non_internet_environments",
        deserialize_with = "presence_flag"
    )]
    pub omit_registry_for_restricted_environments: bool,
}

impl Container {
    /// Target of the first port mapping.
    #[must_use]
    pub fn main_port(&self) -> Option<u16> {
        self.port_mappings.first().map(|p| p.target)
    }

    /// Returns `true` if any declaration carries the given name.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.environment_variables.iter().any(|v| v.name == name)
    }

    /// Explicit `resources.limits.memory`, if present and scalar.
    ///
    /// A non-scalar value is treated as absent.
    #[must_use]
    pub fn explicit_memory_limit(&self) -> Option<String> {
        let memory = self.resources.as_ref()?.get("limits")?.get("memory")?;
        match memory {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                tracing::debug!(container = %self.name, "ignoring malformed memory limit");
                None
            }
        }
    }
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port exposed on the host / service.
    pub target: u16,
    /// Port inside the container; defaults to `target`.
    #[serde(default)]
    pub source: Option<u16>,
    /// Name under which the target is exposed as a proxy port.
    #[serde(default, rename = "name")]
    pub proxy_name: Option<String>,
}

impl PortMapping {
    /// Container-side port, falling back to the target.
    #[must_use]
    pub fn source_or_target(&self) -> u16 {
        self.source.unwrap_or(self.target)
    }
}

/// A container-scoped variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Variable name.
    pub name: String,
    /// Value used in every environment.
    #[serde(default, rename = "value")]
    pub literal_value: Option<ScalarValue>,
    /// Marks the variable as never emitted verbatim.
    #[serde(default, rename = "placeholder", deserialize_with = "presence_flag")]
    pub placeholder: bool,
    /// Emit service-port and override values into the manifest form.
    #[serde(default, deserialize_with = "presence_flag")]
    pub include_in_k8: bool,
}

impl VariableDeclaration {
    /// Placeholders are flagged explicitly or by name.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
            || self
                .name
                .to_lowercase()
                .contains(constants::PLACEHOLDER_VARIABLE_MARKER)
    }
}
