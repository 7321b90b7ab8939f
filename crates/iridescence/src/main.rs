mod cli;
mod paths;
mod run;
mod settings;

use anyhow::{Context, Result};
use chat::{ChatClient, ChatConfig, ChatOutcome};
use cli::{ChatArgs, Command, ConfigAction, RunArgs};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Chat(args)) => run_chat(args),
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => run::run(cli.run),
    }
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let config = ChatConfig::new(&args.endpoint)?;
    let client = ChatClient::new(config).context("failed to construct chat client")?;

    match client.send(&args.message) {
        ChatOutcome::Reply(message) => println!("[{}] {}", message.timestamp, message.text),
        ChatOutcome::Notice(notice) => println!("{notice}"),
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    match action {
        ConfigAction::Where => {
            let paths = AppPaths::discover()?.with_config_file(args.config.as_deref());
            println!("{}", paths.config_file().display());
        }
        ConfigAction::Show => {
            let file = run::effective_settings(args)?;
            print!("{}", file.to_toml_string()?);
        }
    }
    Ok(())
}
