//! Show command: print a JSON export through the same filter and sort
//! rules as the live log.

use std::path::PathBuf;

use anyhow::Context;

use crate::config::Settings;
use crate::events::{EventAggregator, EventStore};
use crate::persistence::{import_json, latest_export};
use crate::types::{Filter, Operation, SortOption};

#[derive(Debug, Default)]
pub struct ShowOptions {
    pub file: Option<PathBuf>,
    pub path: Option<String>,
    pub operation: Option<String>,
    pub no_dirs: bool,
    pub no_files: bool,
    pub sort: Option<SortOption>,
    pub expand: bool,
}

/// Run show command - render an export to stdout.
pub fn run_show(settings: &Settings, options: ShowOptions) -> anyhow::Result<()> {
    let file = match options.file {
        Some(file) => file,
        None => latest_export(".")
            .context("No treewatch export found in the current directory")?,
    };
    let operation = match options.operation.as_deref() {
        Some(name) => name.parse::<Operation>()?,
        None => Operation::empty(),
    };

    let events = import_json(&file)?;
    let mut aggregator =
        EventAggregator::with_store(EventStore::new(settings.events.max_events), true);
    aggregator.replace_events(events);
    if options.expand {
        aggregator.disable_aggregation();
    }

    let filter = Filter {
        path: options.path.unwrap_or_default(),
        operation,
        show_dirs: settings.events.show_dirs && !options.no_dirs,
        show_files: settings.events.show_files && !options.no_files,
    };
    let sort = options.sort.unwrap_or(settings.events.sort);
    let view = aggregator.store().query(&filter, sort);

    let color = is_terminal::is_terminal(std::io::stdout());
    for event in &view {
        println!("{}", event.render(color));
    }
    eprintln!(
        "{} of {} events from {} | Sort: {sort}",
        view.len(),
        aggregator.store().len(),
        file.display()
    );

    Ok(())
}
