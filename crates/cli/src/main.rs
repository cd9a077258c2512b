mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use output::{print_credits, print_list, ListKind};
use runner::{api_client, build_request, explain, run_test};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let command = cli.command.name();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let failure = explain(&e, command);
            eprintln!("{}", failure.text);
            ExitCode::from(failure.code)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    if let Some((kind, request)) = build_request(&cli.global, &cli.command) {
        return run_test(&cli.global, kind, request).await;
    }

    let client = api_client(&cli.global);
    match &cli.command {
        Commands::Credits => print_credits(&client, cli.global.json).await,
        Commands::List { kind } => print_list(&client, ListKind::parse(kind)?).await,
        _ => Ok(()),
    }
}

/// Logs go to stderr so they never land inside a rendered frame.
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
