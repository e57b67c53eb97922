//! CLI command definitions and dispatch.

pub mod compile;
pub mod inspect;
pub mod plan;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use topoc_common::config::CompilerConfig;

/// topoc: compile deployment topologies into launch scripts and manifests.
#[derive(Parser, Debug)]
#[command(name = "topoc", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Compiler configuration file (YAML or JSON).
    #[arg(long, global = true, env = "TOPOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate every environment's scripts and manifests.
    Compile(compile::CompileArgs),
    /// Show the files a compile would write, without writing them.
    Plan(plan::PlanArgs),
    /// Show the architecture view: categories and service references.
    Inspect(inspect::InspectArgs),
}

/// Flags shared by the commands that render artifacts.
#[derive(Args, Debug)]
pub struct TopologyArgs {
    /// Path to the topology document.
    #[arg(default_value = "config_main.yaml")]
    pub file: PathBuf,

    /// Naming prefix for identity variables and the monitoring key.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Service requiring a GPU (repeatable).
    #[arg(long = "gpu-service", value_name = "SERVICE")]
    pub gpu_services: Vec<String>,

    /// Name marker of the environment where GPU workloads are disabled.
    #[arg(long)]
    pub non_gpu_environment: Option<String>,

    /// Name marker of the network-isolated environment kind.
    #[arg(long)]
    pub restricted_environment: Option<String>,

    /// Directory overriding the embedded manifest templates.
    #[arg(long)]
    pub template_dir: Option<PathBuf>,
}

impl TopologyArgs {
    /// Applies the flags given on the command line over `config`.
    pub fn apply(&self, config: &mut CompilerConfig) {
        if let Some(ref prefix) = self.prefix {
            config.prefix.clone_from(prefix);
        }
        config.gpu_services.extend(self.gpu_services.iter().cloned());
        if let Some(ref marker) = self.non_gpu_environment {
            config.non_gpu_environment.clone_from(marker);
        }
        if let Some(ref marker) = self.restricted_environment {
            config.restricted_environment.clone_from(marker);
        }
        if let Some(ref dir) = self.template_dir {
            config.template_dir = Some(dir.clone());
        }
    }
}

/// Loads the configuration file, or the defaults when none is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CompilerConfig> {
    match path {
        Some(path) => Ok(CompilerConfig::from_path(path)?),
        None => Ok(CompilerConfig::default()),
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Compile(args) => compile::execute(args, config),
        Command::Plan(args) => plan::execute(args, config),
        Command::Inspect(args) => inspect::execute(&args),
    }
}
