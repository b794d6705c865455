use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mc_lang_sync::cli::{Cli, Commands};
use mc_lang_sync::commands;
use mc_lang_sync::core::bedrock::BedrockOutcome;
use mc_lang_sync::core::error::SyncResult;
use mc_lang_sync::core::java::JavaOutcome;
use mc_lang_sync::core::state::Settings;
use mc_lang_sync::core::sync::SyncOptions;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    mc_lang_sync::init_tracing();

    let settings = Settings::resolve(cli.global.overrides());
    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.kind().exit_code())
        }
    }
}

async fn run(command: Commands, settings: &Settings) -> SyncResult<()> {
    match command {
        Commands::ExtractCik => {
            println!("{}", commands::extract_cik(settings)?);
        }

        Commands::Bedrock { target } => match commands::bedrock(settings, &target).await? {
            BedrockOutcome::UpToDate { version } => info!("Bedrock {} already up to date", version),
            BedrockOutcome::Updated { version, files, .. } => {
                info!("Bedrock {} updated ({} files)", version, files)
            }
        },

        Commands::Merge { target } => {
            let report = commands::merge(settings, &target)?;
            info!(
                "Merged {} locale(s) for {}, {} carried forward",
                report.merged.len(),
                report.version,
                report.carried.len()
            );
        }

        Commands::Java { target } => match commands::java(settings, &target).await? {
            JavaOutcome::UpToDate { version } => info!("Java {} already up to date", version),
            JavaOutcome::Updated { version, files, .. } => {
                info!("Java {} updated ({} files)", version, files)
            }
        },

        Commands::Sync {
            edition,
            push,
            no_commit,
            limit,
        } => {
            let options = SyncOptions {
                commit: !no_commit,
                push,
                limit,
            };
            commands::sync(settings, edition, options).await?;
        }
    }
    Ok(())
}
