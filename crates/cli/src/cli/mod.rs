pub mod module;
pub mod run;
pub mod sessions;

use clap::{Parser, Subcommand};

/// thinksuit — a module-driven LLM orchestration engine.
#[derive(Debug, Parser)]
#[command(name = "thinksuit", version, about)]
pub struct Cli {
    /// Path to the config file (defaults to `~/.thinksuit.json`).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Home directory sessions/traces are stored under (defaults to `$HOME`).
    #[arg(long, global = true)]
    pub home: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Schedule a single turn and print the final response.
    Run {
        /// The message to send. Read from stdin if omitted.
        #[arg(long)]
        input: Option<String>,
        /// Session to resume (a new one is minted if omitted).
        #[arg(long)]
        session: Option<String>,
        /// Output the full journal trace as JSON instead of just the response.
        #[arg(long)]
        json: bool,
    },
    /// Session inspection.
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Module Registry utilities.
    #[command(subcommand)]
    Module(ModuleCommand),
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List every known session, newest first.
    List,
    /// Print one session's status, metadata, and journal entries.
    Show {
        session_id: String,
        /// Print the raw journal entries as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ModuleCommand {
    /// Validate a `module.toml` file in isolation.
    Validate {
        /// Path to the module's `module.toml`.
        path: String,
    },
}
