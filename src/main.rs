//! treewatch binary entry point.

use anyhow::Context;
use clap::Parser;

use treewatch::Settings;
use treewatch::cli::commands::init::{run_config, run_init};
use treewatch::cli::commands::show::{ShowOptions, run_show};
use treewatch::cli::commands::watch::{WatchOptions, run_watch};
use treewatch::cli::{Cli, Commands};
use treewatch::logging;

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration for now.");
            Settings::default()
        }),
    };

    match &cli.log_file {
        Some(Some(path)) => settings.logging.file = Some(path.clone()),
        Some(None) => settings.logging.file = logging::default_log_file(),
        None => {}
    }

    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Config => run_config(&settings),
        Commands::Watch {
            paths,
            no_aggregate,
            max_events,
            duration,
            export,
            rebuild_on_remove,
        } => {
            let options = WatchOptions {
                paths,
                no_aggregate,
                max_events,
                duration,
                export,
                rebuild_on_remove,
            };
            run_watch(&settings, options).await
        }
        Commands::Show {
            file,
            path,
            operation,
            no_dirs,
            no_files,
            sort,
            expand,
        } => {
            let options = ShowOptions {
                file,
                path,
                operation,
                no_dirs,
                no_files,
                sort,
                expand,
            };
            run_show(&settings, options)
        }
    }
}
