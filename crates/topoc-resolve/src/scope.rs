//! The tuple under resolution and the output form being produced.

use std::collections::BTreeMap;

use topoc_common::config::CompilerConfig;
use topoc_common::warning::{ResolutionWarning, WarningKind};
use topoc_model::{Container, Environment, Service, Topology};

use crate::env::CollisionPolicy;

/// Target artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputForm {
    /// Standalone container-launch script.
    Script,
    /// Orchestrator manifest.
    Manifest,
}

impl OutputForm {
    /// How repeated variable names are handled in this form.
    #[must_use]
    pub const fn collision_policy(self) -> CollisionPolicy {
        match self {
            Self::Script => CollisionPolicy::Append,
            Self::Manifest => CollisionPolicy::Replace,
        }
    }
}

/// Everything resolution reads for one container in one environment.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Whole topology, for cross-service lookups.
    pub topology: &'a Topology,
    /// Run configuration.
    pub config: &'a CompilerConfig,
    /// Proxy-port table built once per run.
    pub proxy_ports: &'a BTreeMap<String, u16>,
    /// Environment being compiled.
    pub environment: &'a Environment,
    /// Service being compiled.
    pub service: &'a Service,
    /// Container being compiled.
    pub container: &'a Container,
}

impl Scope<'_> {
    /// Returns `true` if GPU settings are withheld from the given form.
    ///
    /// Scripts test the environment name for the non-GPU marker, manifests
    /// test it for the network-isolated marker. Both require the service to
    /// be in the GPU-required set.
    #[must_use]
    pub fn gpu_excluded(&self, form: OutputForm) -> bool {
        if !self.config.gpu_services.contains(&self.service.name) {
            return false;
        }
        match form {
            OutputForm::Script => self.config.is_non_gpu_environment(&self.environment.name),
            OutputForm::Manifest => self.config.is_restricted_environment(&self.environment.name),
        }
    }

    /// Builds a container-scoped warning.
    #[must_use]
    pub fn warning(&self, kind: WarningKind) -> ResolutionWarning {
        ResolutionWarning {
            environment: self.environment.name.clone(),
            service: self.service.name.clone(),
            container: Some(self.container.name.clone()),
            kind,
        }
    }

    /// Returns the divergence warning when the two GPU checks disagree.
    ///
    /// Only containers that carry GPU settings (a `gpus` value or a
    /// `USE_GPU` declaration) are considered.
    #[must_use]
    pub fn gpu_divergence(&self) -> Option<ResolutionWarning> {
        let uses_gpu = self.container.gpus.is_some()
            || self
                .container
                .declares(topoc_common::constants::USE_GPU_VARIABLE);
        if !uses_gpu {
            return None;
        }
        let script_excluded = self.gpu_excluded(OutputForm::Script);
        let manifest_excluded = self.gpu_excluded(OutputForm::Manifest);
        (script_excluded != manifest_excluded).then(|| {
            self.warning(WarningKind::GpuCheckDivergence {
                script_excluded,
                manifest_excluded,
            })
        })
    }
}

/// Everything resolution reads for one service in one environment.
#[derive(Debug, Clone, Copy)]
pub struct ServiceScope<'a> {
    /// Whole topology, for cross-service lookups.
    pub topology: &'a Topology,
    /// Run configuration.
    pub config: &'a CompilerConfig,
    /// Proxy-port table built once per run.
    pub proxy_ports: &'a BTreeMap<String, u16>,
    /// Environment being compiled.
    pub environment: &'a Environment,
    /// Service being compiled.
    pub service: &'a Service,
}

impl<'a> ServiceScope<'a> {
    /// Narrows the scope to one of the service's containers.
    #[must_use]
    pub const fn container(&self, container: &'a Container) -> Scope<'a> {
        Scope {
            topology: self.topology,
            config: self.config,
            proxy_ports: self.proxy_ports,
            environment: self.environment,
            service: self.service,
            container,
        }
    }

    /// Builds a service-scoped warning.
    #[must_use]
    pub fn warning(&self, kind: WarningKind) -> ResolutionWarning {
        ResolutionWarning {
            environment: self.environment.name.clone(),
            service: self.service.name.clone(),
            container: None,
            kind,
        }
    }
}
