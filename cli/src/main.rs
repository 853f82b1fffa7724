mod commands;
mod terminal;

use std::process::ExitCode;

use tracing::error;

use commands::{CommandLine, Commands, discover, ip};
use lanscope_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);
    print::banner();

    match run(commands).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(commands: CommandLine) -> anyhow::Result<ExitCode> {
    let cfg = Config::discover(commands.config.as_deref())?;

    match commands.command {
        Commands::Discover(args) => {
            print::header("getting ready for discovery");
            discover::discover(args, &cfg).await
        }
        Commands::Ip(args) => ip::ip(args, &cfg).await,
    }
}
