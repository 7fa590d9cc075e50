use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    endless_reader::logging::init().context("init logging")?;

    let cli = endless_reader::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        endless_reader::cli::Command::Read(args) => {
            endless_reader::headless::run(args).await.context("read")?;
        }
        endless_reader::cli::Command::Parse(args) => {
            endless_reader::parse::run(args).context("parse")?;
        }
    }

    Ok(())
}
