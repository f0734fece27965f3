use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskrank_core::TaskId;

mod config;
mod focus_cmd;
mod state;
mod task_cmd;

use config::load_config;

#[derive(Parser, Debug)]
#[command(
    name = "taskrank",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TASKRANK_BUILD_SHA"), ")"),
    about = "Rank tasks by due date, importance, effort and blockers"
)]
struct Cli {
    /// Only log errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a task
    Add(task_cmd::AddArgs),

    /// List open tasks, rescoring each one
    List(task_cmd::ListArgs),

    /// Show a task with its score breakdown
    Show { id: TaskId },

    /// Change fields of a task
    Update(task_cmd::UpdateArgs),

    /// Mark a task done (recurring tasks get their next occurrence)
    Done { id: TaskId },

    /// Soft-delete a task
    Delete { id: TaskId },

    /// Select and flag today's top tasks
    Focus,

    /// Approve the currently flagged focus tasks
    Approve,

    /// Import tasks from a CSV (title,due,importance,estimate,category,recurrence,memo)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.taskrank/config.toml with defaults
    Init,

    /// Print the effective configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    if let Command::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => {
                let cfg = load_config()?;
                print!("{}", toml::to_string_pretty(&cfg)?);
                Ok(())
            }
        };
    }

    let cfg = load_config()?;
    tracing::debug!(owner = %cfg.general.owner, timezone = %cfg.general.timezone, "loaded config");

    match cli.command {
        Command::Add(args) => task_cmd::add(&cfg, args)?,
        Command::List(args) => task_cmd::list(&cfg, args)?,
        Command::Show { id } => task_cmd::show(&cfg, id)?,
        Command::Update(args) => task_cmd::update(&cfg, args)?,
        Command::Done { id } => task_cmd::done(&cfg, id)?,
        Command::Delete { id } => task_cmd::delete(&cfg, id)?,
        Command::Focus => focus_cmd::focus(&cfg)?,
        Command::Approve => focus_cmd::approve(&cfg)?,
        Command::Import { csv } => task_cmd::import(&cfg, csv)?,
        Command::Config { .. } => {}
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TASKRANK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
