//! Compilation driver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use topoc_common::config::CompilerConfig;
use topoc_common::constants;
use topoc_common::error::Result;
use topoc_common::warning::{ResolutionWarning, WarningKind, Warnings};
use topoc_model::{Environment, Topology};
use topoc_render::{PullList, Templates, render_launch_script, render_manifest};
use topoc_resolve::ServiceScope;

use crate::monitoring::{self, MonitoringSettings, SettingsStore};
use crate::writer;

/// One artifact file, rendered but not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name inside the environment directory.
    pub file_name: String,
    /// File contents.
    pub contents: String,
    /// Whether the file gets the executable bit.
    pub executable: bool,
}

impl GeneratedFile {
    fn script(file_name: String, contents: String) -> Self {
        Self {
            file_name,
            contents,
            executable: true,
        }
    }

    fn document(file_name: String, contents: String) -> Self {
        Self {
            file_name,
            contents,
            executable: false,
        }
    }
}

/// All artifacts of one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentOutput {
    /// Environment name, also the directory name.
    pub name: String,
    /// Files in generation order.
    pub files: Vec<GeneratedFile>,
}

/// Result of rendering every environment in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilePlan {
    /// One entry per environment, in declaration order.
    pub environments: Vec<EnvironmentOutput>,
    /// Non-fatal conditions met while rendering.
    pub warnings: Vec<ResolutionWarning>,
}

impl CompilePlan {
    /// Total number of files across environments.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.environments.iter().map(|e| e.files.len()).sum()
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    /// Environment directories that were written.
    pub directories: Vec<PathBuf>,
    /// Number of files written.
    pub files_written: usize,
    /// Non-fatal conditions met while rendering.
    pub warnings: Vec<ResolutionWarning>,
}

/// Compiles one topology under one configuration.
///
/// The proxy-port table and the templates are built once and shared by
/// every environment.
#[derive(Debug)]
pub struct Compiler {
    topology: Topology,
    config: CompilerConfig,
    templates: Templates,
    proxy_ports: BTreeMap<String, u16>,
}

impl Compiler {
    /// Creates a compiler, loading template overrides if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a template
    /// override cannot be read.
    pub fn new(topology: Topology, config: CompilerConfig) -> Result<Self> {
        config.validate()?;
        let templates = match config.template_dir {
            Some(ref dir) => Templates::from_dir(dir)?,
            None => Templates::embedded(),
        };
        let proxy_ports = topology.proxy_ports();
        tracing::debug!(proxy_ports = proxy_ports.len(), "proxy port table built");
        Ok(Self {
            topology,
            config,
            templates,
            proxy_ports,
        })
    }

    /// Loads the topology document at `path` and creates a compiler for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded or the compiler
    /// cannot be created.
    pub fn from_path(path: &Path, config: CompilerConfig) -> Result<Self> {
        let topology = topoc_model::load_path(path)?;
        Self::new(topology, config)
    }

    /// The loaded topology.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Renders every environment without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if a manifest template is malformed.
    pub fn plan(&self) -> Result<CompilePlan> {
        let mut warnings = Warnings::new();
        let environments = self
            .topology
            .environments
            .iter()
            .map(|env| self.render_environment(env, &mut warnings))
            .collect::<Result<Vec<_>>>()?;
        Ok(CompilePlan {
            environments,
            warnings: warnings.into_vec(),
        })
    }

    /// Renders every environment and writes it under the configured
    /// output directory, replacing existing environment directories.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or a directory or file cannot
    /// be written. Directories written before the failure are kept.
    pub fn compile(&self) -> Result<CompileReport> {
        self.compile_into(&self.config.output_dir)
    }

    /// Same as [`Compiler::compile`] with an explicit output root.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails, in which case nothing under
    /// `root` has been touched, or if a directory or file cannot be
    /// written.
    pub fn compile_into(&self, root: &Path) -> Result<CompileReport> {
        let plan = self.plan()?;
        let files_written = plan.file_count();
        let mut directories = Vec::with_capacity(plan.environments.len());
        for output in &plan.environments {
            directories.push(writer::write_environment(root, output)?);
        }
        tracing::info!(
            root = %root.display(),
            environments = directories.len(),
            files = files_written,
            warnings = plan.warnings.len(),
            "compilation finished"
        );
        Ok(CompileReport {
            directories,
            files_written,
            warnings: plan.warnings,
        })
    }

    /// Publishes the monitoring settings of this topology to `store`.
    ///
    /// Returns the published settings, or `None` if the topology has no
    /// monitoring service.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn publish_monitoring(
        &self,
        store: &mut dyn SettingsStore,
    ) -> Result<Option<MonitoringSettings>> {
        monitoring::publish(&self.topology, &self.config, store)
    }

    fn render_environment(
        &self,
        environment: &Environment,
        warnings: &mut Warnings,
    ) -> Result<EnvironmentOutput> {
        tracing::info!(environment = %environment.name, "rendering environment");
        self.check_volume_mappings(environment, warnings);

        let mut files = Vec::new();
        let mut pulls = PullList::new();
        for service in &self.topology.services {
            if service.is_placeholder() {
                tracing::debug!(service = %service.name, "skipping placeholder service");
                continue;
            }
            let scope = ServiceScope {
                topology: &self.topology,
                config: &self.config,
                proxy_ports: &self.proxy_ports,
                environment,
                service,
            };

            for container in &service.containers {
                let scope = scope.container(container);
                if let Some(divergence) = scope.gpu_divergence() {
                    warnings.push(divergence);
                }
                let script = render_launch_script(&scope, warnings);
                let _ = pulls.add(&script.image);
                files.push(GeneratedFile::script(script.file_name, script.contents));
            }

            let manifest = render_manifest(&scope, &self.templates, warnings)?;
            files.push(GeneratedFile::document(manifest.file_name, manifest.contents));
            if let Some((file_name, contents)) = manifest.volume_claim {
                files.push(GeneratedFile::document(file_name, contents));
            }
        }

        files.push(GeneratedFile::script(
            constants::PULL_SCRIPT_NAME.to_string(),
            pulls.render(),
        ));
        Ok(EnvironmentOutput {
            name: environment.name.clone(),
            files,
        })
    }

    fn check_volume_mappings(&self, environment: &Environment, warnings: &mut Warnings) {
        for mapping in &environment.volume_mappings {
            if self.topology.service(&mapping.service_name).is_none() {
                warnings.push(ResolutionWarning {
                    environment: environment.name.clone(),
                    service: mapping.service_name.clone(),
                    container: None,
                    kind: WarningKind::UnresolvedVolumeMapping {
                        service: mapping.service_name.clone(),
                    },
                });
            }
        }
    }
}
