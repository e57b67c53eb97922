//! `topoc plan`: Show the files a compile would write.

use clap::Args;
use topoc_common::config::CompilerConfig;
use topoc_compiler::Compiler;

use super::TopologyArgs;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Topology document and rendering flags.
    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Renders every environment in memory and lists the resulting files and
/// warnings. Nothing is written.
///
/// # Errors
///
/// Returns an error if the topology cannot be loaded or rendered.
pub fn execute(args: PlanArgs, mut config: CompilerConfig) -> anyhow::Result<()> {
    args.topology.apply(&mut config);
    let compiler = Compiler::from_path(&args.topology.file, config)?;
    let plan = compiler.plan()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output::plan_json(&plan))?);
        return Ok(());
    }

    println!("Compilation plan for: {}", args.topology.file.display());
    println!("{}", "\u{2550}".repeat(35));
    for env in &plan.environments {
        println!();
        println!(
            "  {}/",
            compiler.config().output_dir.join(&env.name).display()
        );
        for file in &env.files {
            let marker = if file.executable { "*" } else { " " };
            println!("    + {}{marker}", file.file_name);
        }
    }
    println!();
    println!(
        "  {} file(s) in {} environment(s) would be written.",
        plan.file_count(),
        plan.environments.len()
    );
    output::print_warnings(&plan.warnings);
    Ok(())
}
