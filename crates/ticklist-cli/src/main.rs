mod cli;
mod config;
mod storage;
mod tasks;
mod tui;

use std::{fs::OpenOptions, io, sync::Mutex};

use crate::cli::{Command, ConfigCommand};
use clap::Parser;
use color_eyre::Result;
use ticklist_core::storage::{KeyValueStore, StoreError};
use ticklist_task::TASKS_KEY;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);
    let config = config::load()?;
    init_tracing(&command, &config);

    match command {
        Command::Tui => {
            let store = storage::open_task_store(&config)?;
            tui::launch(store, &config.ui)?
        }
        Command::Version => print_version(),
        Command::Health => run_health_check(&config)?,
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Task(cmd) => tasks::handle(cmd, &config)?,
    }

    Ok(())
}

fn init_tracing(command: &Command, config: &config::Config) {
    // Respect user-provided filters; default to warn so command output stays readable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if *command == Command::Tui {
        // The TUI owns the terminal, so logs go to a file in the data dir.
        let Some(file) = storage::data_dir_from_env(config).ok().and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("ticklist.log"))
                .ok()
        }) else {
            return;
        };
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file));
        registry.with(fmt_layer).init();
        return;
    }

    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    registry.with(fmt_layer).init();
}

fn print_version() {
    println!("ticklist {}", env!("CARGO_PKG_VERSION"));
}

/// Probes the configured storage and reports whether stored tasks parse.
fn run_health_check(config: &config::Config) -> Result<()> {
    let root = storage::data_dir_from_env(config)?;
    let store = storage::store_from_config(config)?;
    run_store_health(&store)?;
    println!("Storage: ok ({})", root.display());
    println!("Tasks: {}", task_health(&store));
    Ok(())
}

/// Describe the stored collection without writing anything.
fn task_health<S: KeyValueStore + ?Sized>(store: &S) -> String {
    match store.get(TASKS_KEY) {
        Ok(bytes) => match ticklist_task::decode(&bytes) {
            Ok(tasks) => format!("{} stored", tasks.len()),
            Err(reason) => format!("malformed ({reason})"),
        },
        Err(StoreError::NotFound { .. }) => "none stored".to_string(),
        Err(err) => format!("unreadable ({err})"),
    }
}

fn run_store_health<S: KeyValueStore + ?Sized>(store: &S) -> Result<()> {
    let probe_key = "health/probe";
    let payload = b"ok";
    store.put(probe_key, payload)?;
    let round_trip = store.get(probe_key)?;
    store.delete(probe_key)?;

    if round_trip != payload {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
