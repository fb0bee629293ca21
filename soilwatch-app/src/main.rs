use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Duration};

mod config;
mod console;
mod plotting;
mod workflow;

#[derive(Parser)]
#[command(name = "soilwatch", version, about = "Live soil and air sensor dashboard")]
struct Cli {
    /// YAML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the feed and serve the dashboard console
    Watch {
        #[command(flatten)]
        overrides: config::Overrides,

        /// Stop after this many poll cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Run without reading commands from stdin
        #[arg(long)]
        no_console: bool,
    },
    /// Fetch the feed once and report malformed entries
    Check {
        #[command(flatten)]
        overrides: config::Overrides,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    println!("--- Soilwatch ---");

    let settings = config::load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Watch {
            overrides,
            cycles,
            duration,
            no_console,
        } => {
            let settings = overrides.apply(settings);
            let limits = workflow::StopAfter {
                cycles,
                duration: duration.map(Duration::from_secs),
            };
            workflow::run_watch(&settings, limits, !no_console).await?;
            println!("\nSession complete. Results are in '{}'", settings.output_dir);
        }
        Command::Check { overrides } => {
            let settings = overrides.apply(settings);
            workflow::run_check(&settings).await?;
        }
    }

    Ok(())
}
