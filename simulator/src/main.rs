use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workflow::config::{BurstConfig, PeriodicConfig, WorkflowConfig};
use workflow::runner::{Runner, WorkflowResult};

mod output;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Writes simulated dispersed bursts and pulse trains to filterbank files")]
struct Args {
    /// Load a workflow config from YAML instead of the command line
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a periodic pulsar with a given DM, period, Pdot, width and target S/N
    Periodic(PeriodicConfig),
    /// Inject repeated copies of one dispersed burst between blocks of noise
    Burst(BurstConfig),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match (args.workflow, args.command) {
        (Some(path), None) => WorkflowConfig::load(path)?,
        (None, Some(Command::Periodic(cfg))) => WorkflowConfig::Periodic(cfg),
        (None, Some(Command::Burst(cfg))) => WorkflowConfig::Burst(cfg),
        (Some(_), Some(_)) => bail!("give either --workflow or a subcommand, not both"),
        (None, None) => bail!("nothing to do: give --workflow or a subcommand"),
    };

    match Runner::new(workflow_config).execute()? {
        WorkflowResult::Periodic(summary) => println!(
            "Periodic run -> {} ({} samples, clean S/N {:.2} scaled by {:.3})",
            summary.filterbank.display(),
            summary.nsamp,
            summary.baseline_snr,
            summary.scale
        ),
        WorkflowResult::Burst(summary) => println!(
            "Burst run -> {} ({} injections, {} samples, template S/N {:.2}, offset {:.3} ms), log {}",
            summary.filterbank.display(),
            summary.injections,
            summary.samples_written,
            summary.template.snr,
            summary.offset,
            summary.report.display()
        ),
    }

    Ok(())
}
