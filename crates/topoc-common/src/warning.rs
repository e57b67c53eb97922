//! Non-fatal resolution warnings.
//!
//! A cross-entity lookup that finds nothing does not abort compilation: the
//! affected variable or block is omitted and a [`ResolutionWarning`] is
//! recorded so the omission stays auditable.

use std::fmt;

use serde::Serialize;

/// What went unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// A `PROXY_PORT` variable names no proxy port.
    UnresolvedProxyPort {
        /// Variable name.
        variable: String,
    },
    /// A `SERVICE_PORT` variable names no service with a port.
    UnresolvedServicePort {
        /// Variable name.
        variable: String,
        /// Service name derived from the variable.
        candidate: String,
    },
    /// A volume mapping references a service that does not exist.
    UnresolvedVolumeMapping {
        /// Service name given by the mapping.
        service: String,
    },
    /// A later volume mapping replaced this one in the manifest form.
    ShadowedVolumeMapping {
        /// Mount target of the shadowed mapping.
        target: String,
    },
    /// The service declares an ingress path but its first container has no port.
    IngressWithoutPort,
    /// The launch-script and manifest GPU exclusion checks disagree.
    GpuCheckDivergence {
        /// Whether the launch script excludes GPU settings.
        script_excluded: bool,
        /// Whether the manifest excludes GPU settings.
        manifest_excluded: bool,
    },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedProxyPort { variable } => {
                write!(f, "no proxy port named {variable}")
            }
            Self::UnresolvedServicePort {
                variable,
                candidate,
            } => write!(
                f,
                "{variable}: no service \"{candidate}\" with a port mapping"
            ),
            Self::UnresolvedVolumeMapping { service } => {
                write!(f, "volume mapping references unknown service \"{service}\"")
            }
            Self::ShadowedVolumeMapping { target } => {
                write!(f, "volume mapping for {target} shadowed in manifest")
            }
            Self::IngressWithoutPort => write!(f, "ingress path set but no port mapping"),
            Self::GpuCheckDivergence {
                script_excluded,
                manifest_excluded,
            } => write!(
                f,
                "GPU exclusion differs between forms (script: {script_excluded}, manifest: {manifest_excluded})"
            ),
        }
    }
}

/// A recorded non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    /// Environment being compiled.
    pub environment: String,
    /// Service being compiled.
    pub service: String,
    /// Container being compiled, when the warning is container-scoped.
    pub container: Option<String>,
    /// Details.
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}", self.environment, self.service)?;
        if let Some(ref container) = self.container {
            write!(f, "/{container}")?;
        }
        write!(f, "] {}", self.kind)
    }
}

/// Ordered, deduplicating collector of warnings.
///
/// The same condition can be hit once per output form; it is recorded once.
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    entries: Vec<ResolutionWarning>,
}

impl Warnings {
    /// Creates an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a warning and logs it, ignoring exact duplicates.
    pub fn push(&mut self, warning: ResolutionWarning) {
        if self.entries.contains(&warning) {
            return;
        }
        tracing::warn!(
            environment = %warning.environment,
            service = %warning.service,
            container = warning.container.as_deref().unwrap_or("-"),
            "{}",
            warning.kind
        );
        self.entries.push(warning);
    }

    /// Returns the recorded warnings in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[ResolutionWarning] {
        &self.entries
    }

    /// Consumes the collector, returning the warnings.
    #[must_use]
    pub fn into_vec(self) -> Vec<ResolutionWarning> {
        self.entries
    }
}
