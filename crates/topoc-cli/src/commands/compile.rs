//! `topoc compile`: Generate scripts and manifests for every environment.

use std::path::PathBuf;

use clap::Args;
use topoc_common::config::CompilerConfig;
use topoc_compiler::{Compiler, RedisStore};

use super::TopologyArgs;
use crate::output;

/// Arguments for the `compile` command.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Topology document and rendering flags.
    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Directory receiving one subdirectory per environment.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Publish monitoring settings after compiling.
    #[arg(long)]
    pub update_monitoring: bool,

    /// Settings store URL used with `--update-monitoring`.
    #[arg(long, env = "TOPOC_REDIS_URL")]
    pub redis_url: Option<String>,
}

/// Executes the `compile` command.
///
/// # Errors
///
/// Returns an error if loading, rendering, writing, or publishing fails.
pub fn execute(args: CompileArgs, mut config: CompilerConfig) -> anyhow::Result<()> {
    args.topology.apply(&mut config);
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.update_monitoring |= args.update_monitoring;
    if args.redis_url.is_some() {
        config.redis_url = args.redis_url;
    }

    tracing::info!(path = %args.topology.file.display(), "compiling topology");
    let compiler = Compiler::from_path(&args.topology.file, config)?;
    let report = compiler.compile()?;

    for dir in &report.directories {
        println!("  wrote {}", dir.display());
    }
    println!(
        "{} file(s) in {} environment(s).",
        report.files_written,
        report.directories.len()
    );
    output::print_warnings(&report.warnings);

    if compiler.config().update_monitoring {
        let mut store = RedisStore::from_config(compiler.config())?;
        match compiler.publish_monitoring(&mut store)? {
            Some(_) => println!("Monitoring settings published."),
            None => println!("No monitoring service; nothing published."),
        }
    }
    Ok(())
}
