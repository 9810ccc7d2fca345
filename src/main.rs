use anyhow::Result;
use clap::{Parser, Subcommand};
use codexup::commands::{run, summarize};
use codexup::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codexup")]
#[command(about = "Drive a coding agent over verification targets and reconcile its token usage", long_about = None)]
#[command(version)]
struct Cli {
    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch the agent once per configured target
    Run {
        /// Run configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Prompt template
        #[arg(short, long)]
        prompt: PathBuf,

        /// Only process the first N targets
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        /// Print the agent command and log path per target without running anything
        #[arg(long)]
        dry_run: bool,

        /// Keep the [Examples] section of the template
        #[arg(long)]
        use_examples: bool,

        /// Do not echo agent output (it still goes to the per-target log)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Rebuild a summary and CSV export from a metrics log
    Summarize {
        /// Metrics log (JSON Lines)
        metrics: PathBuf,

        /// Summary output path (default: beside the log, metrics -> summary)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// CSV output path (default: the log path with a .csv extension)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Only include records from this run
        #[arg(long)]
        run_id: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            prompt,
            limit,
            dry_run,
            use_examples,
            quiet,
        } => {
            let limit = limit.map(|n| usize::try_from(n).unwrap_or(usize::MAX));
            run::execute(&config, &prompt, limit, dry_run, use_examples, quiet)
        }
        Commands::Summarize {
            metrics,
            out,
            csv,
            run_id,
        } => summarize::execute(&metrics, out, csv, run_id),
    }
}
