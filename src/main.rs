use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{error, info};

use media_downloader::cli::args::Cli;
use media_downloader::cli::interrupt::Interrupts;
use media_downloader::cli::prompt::Prompter;
use media_downloader::cli::run_menu;
use media_downloader::commands::{run_command, system};
use media_downloader::core::config::AppConfig;
use media_downloader::utils::logging::init_tracing;
use media_downloader::{AppState, NAME, VERSION};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("🚀 Starting {} v{}", NAME, VERSION);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut state = AppState::new(config_path);
    let interrupts = Interrupts::install();

    if let Some(command) = cli.command {
        return run_command(&mut state, command, &interrupts).await;
    }

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    if !cli.skip_checks {
        system::ensure_requirements(&state.config, &mut prompter).await?;
    }

    run_menu(&mut state, &mut prompter, &interrupts).await?;
    Ok(ExitCode::SUCCESS)
}
