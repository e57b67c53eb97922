//! `topoc inspect`: Show the architecture view of a topology.

use std::path::PathBuf;

use clap::Args;
use topoc_model::graph::ArchitectureView;

use crate::output;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the topology document.
    #[arg(default_value = "config_main.yaml")]
    pub file: PathBuf,

    /// Show only the services this service references.
    #[arg(long)]
    pub service: Option<String>,
}

/// Executes the `inspect` command.
///
/// # Errors
///
/// Returns an error if the topology cannot be loaded.
pub fn execute(args: &InspectArgs) -> anyhow::Result<()> {
    let topology = topoc_model::load_path(&args.file)?;
    let view = ArchitectureView::from_topology(&topology);

    if let Some(ref service) = args.service {
        if topology.service(service).is_none() {
            anyhow::bail!("unknown service: {service}");
        }
        for dependency in view.dependencies_of(service) {
            println!("{service} -> {dependency}");
        }
        return Ok(());
    }

    println!("Categories:");
    print!("{}", output::format_categories(view.categories()));

    let references = view.references();
    if !references.is_empty() {
        println!();
        println!("References:");
        for (from, to) in references {
            println!("  {from} -> {to}");
        }
    }
    Ok(())
}
