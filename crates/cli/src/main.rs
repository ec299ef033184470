mod cli;
mod config;
mod tracing_setup;

use clap::Parser;
use thinksuit_engine::EngineBuilder;
use thinksuit_modules::builtin::core_chat_module;

use cli::{Cli, Command, ModuleCommand, SessionsCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Module validation never touches the engine or the filesystem store,
    // so it doesn't need tracing, config resolution, or a scheduler.
    if let Command::Module(ModuleCommand::Validate { path }) = &cli.command {
        return cli::module::validate(path);
    }

    tracing_setup::init();
    let resolved = config::load(cli.config, cli.home)?;

    let builder = EngineBuilder::new(resolved.config, core_chat_module(), resolved.home);
    let scheduler = builder.build().await?;

    match cli.command {
        Command::Run { input, session, json } => cli::run::run(&scheduler, input, session, json).await,
        Command::Sessions(SessionsCommand::List) => cli::sessions::list(&scheduler),
        Command::Sessions(SessionsCommand::Show { session_id, json }) => {
            cli::sessions::show(&scheduler, &session_id, json)
        }
        Command::Module(ModuleCommand::Validate { .. }) => unreachable!("handled above"),
    }
}
