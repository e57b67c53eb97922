//! Compiler configuration model.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, TopocError};

/// Root configuration for one compilation run.
///
/// Every field has a default, so a configuration file only needs the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Naming prefix for identity variables and the monitoring key.
    pub prefix: String,
    /// Directory receiving one subdirectory per environment.
    pub output_dir: PathBuf,
    /// Services that require a GPU.
    pub gpu_services: BTreeSet<String>,
    /// Name marker of the environment where GPU workloads are disabled.
    pub non_gpu_environment: String,
    /// Name marker of the network-isolated environment kind.
    pub restricted_environment: String,
    /// Container name marker identifying search/indexing workloads.
    pub search_workload_marker: String,
    /// Memory limit for search workloads that declare none.
    pub default_search_memory: String,
    /// Whether to publish monitoring settings after compiling.
    pub update_monitoring: bool,
    /// Connection URL of the settings store.
    pub redis_url: Option<String>,
    /// Directory overriding the embedded manifest templates.
    pub template_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            prefix: constants::DEFAULT_PREFIX.to_string(),
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            gpu_services: BTreeSet::new(),
            non_gpu_environment: constants::DEFAULT_NON_GPU_ENVIRONMENT.to_string(),
            restricted_environment: constants::DEFAULT_RESTRICTED_ENVIRONMENT.to_string(),
            search_workload_marker: constants::DEFAULT_SEARCH_WORKLOAD_MARKER.to_string(),
            default_search_memory: constants::DEFAULT_SEARCH_MEMORY_LIMIT.to_string(),
            update_monitoring: false,
            redis_url: None,
            template_dir: None,
        }
    }
}

impl CompilerConfig {
    /// Loads a configuration file (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading compiler configuration");
        let content = std::fs::read_to_string(path).map_err(|e| TopocError::io(path, e))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would otherwise produce nonsensical output.
    ///
    /// # Errors
    ///
    /// Returns [`TopocError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("prefix", &self.prefix),
            ("non_gpu_environment", &self.non_gpu_environment),
            ("restricted_environment", &self.restricted_environment),
            ("search_workload_marker", &self.search_workload_marker),
            ("default_search_memory", &self.default_search_memory),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TopocError::Config {
                    message: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Prefix in lowercase, used for service and key naming.
    #[must_use]
    pub fn prefix_lower(&self) -> String {
        self.prefix.to_lowercase()
    }

    /// Returns `true` if the environment name denotes the non-GPU environment.
    #[must_use]
    pub fn is_non_gpu_environment(&self, environment: &str) -> bool {
        environment
            .to_lowercase()
            .contains(&self.non_gpu_environment.to_lowercase())
    }

    /// Returns `true` if the environment name denotes the network-isolated kind.
    #[must_use]
    pub fn is_restricted_environment(&self, environment: &str) -> bool {
        environment
            .to_lowercase()
            .contains(&self.restricted_environment.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = CompilerConfig::default();
        assert_eq!(config.prefix, "APP");
        assert_eq!(config.output_dir, PathBuf::from("deployment_files"));
        assert_eq!(config.non_gpu_environment, "soe");
        assert_eq!(config.default_search_memory, "3G");
        assert!(!config.update_monitoring);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "prefix: SHOP\ngpu_services: [ml-inference]").expect("write");
        let config = CompilerConfig::from_path(file.path()).expect("load");
        assert_eq!(config.prefix, "SHOP");
        assert!(config.gpu_services.contains("ml-inference"));
        assert_eq!(config.restricted_environment, "soe");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "prefx: SHOP").expect("write");
        assert!(CompilerConfig::from_path(file.path()).is_err());
    }

    #[test]
    fn empty_prefix_fails_validation() {
        let config = CompilerConfig {
            prefix: "  ".into(),
            ..CompilerConfig::default()
        };
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("prefix"), "got: {msg}");
    }

    #[test]
    fn environment_markers_match_case_insensitively() {
        let config = CompilerConfig::default();
        assert!(config.is_non_gpu_environment("SOE-Prod"));
        assert!(config.is_restricted_environment("prod-soe"));
        assert!(!config.is_restricted_environment("staging"));
    }
}
