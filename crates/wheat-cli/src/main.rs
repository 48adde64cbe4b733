use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wheat_core::app::{
    ChaffFilter, ChaffRow, EnrichJob, RunOutcome, Runner, chaff, loader, shutdown_signal,
};
use wheat_core::domain::{ConfigError, EnrichError, LoadError, Price, ReportError, StoreError};
use wheat_core::impls::{ClientError, MoxfieldClient, SqliteStore};
use wheat_core::Settings;

mod cli;

use cli::{Cli, Command};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("failed to encode chaff rows: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wheat=info,wheat_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    let settings = Settings::from_env()?;

    match command {
        Command::LoadCollection {
            file,
            overwrite,
            no_overwrite,
        } => {
            let path = file.unwrap_or_else(|| settings.collection_file.clone());
            let mut store = SqliteStore::open(&settings.database_path)?;
            loader::load_collection(&mut store, &path, overwrite || !no_overwrite)?;
        }
        Command::Populate { retry_failed } => populate(&settings, retry_failed).await?,
        Command::FindChaff {
            price,
            count,
            output,
            json,
        } => find_chaff(&settings, price, count, output, json)?,
    }
    Ok(())
}

async fn populate(settings: &Settings, retry_failed: bool) -> Result<(), CliError> {
    let mut store = SqliteStore::open(&settings.database_path)?;
    let client = MoxfieldClient::new(&settings.api_base_url, settings.target_format)?;
    let job = EnrichJob::new(client, settings).retry_failed(retry_failed);

    let runner = Runner::new();
    let token = runner.token();
    match runner.run(job.run(&mut store, &token), shutdown_signal()).await? {
        RunOutcome::Completed(summary) => {
            tracing::info!(
                selected = summary.selected,
                enriched = summary.enriched,
                unresolved = summary.unresolved,
                missing_decks = summary.missing_decks,
                unpriced = summary.unpriced,
                "Populate finished"
            );
        }
        RunOutcome::Cancelled => tracing::info!("Worker loop closed; exiting job"),
    }
    Ok(())
}

fn find_chaff(
    settings: &Settings,
    price: Price,
    count: u64,
    output: bool,
    json: bool,
) -> Result<(), CliError> {
    let store = SqliteStore::open(&settings.database_path)?;
    let filter = ChaffFilter {
        max_price: price,
        max_decks: count,
    };
    let rows = chaff::find_chaff(&store, &filter, settings.target_format)?;

    if rows.is_empty() {
        tracing::info!("No chaff cards found!");
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", describe(row));
        }
    }
    if output {
        chaff::write_report(&settings.output_file, &rows)?;
    }
    Ok(())
}

fn describe(row: &ChaffRow) -> String {
    let rank = row
        .edhrec_rank
        .map_or_else(|| "-".to_string(), |r| r.to_string());
    format!(
        "{name} [{set}] x{qty} | {colors} | {type_line} | ${price} | {decks} decks | EDHREC #{rank} | {url}",
        name = row.name,
        set = row.set_code,
        qty = row.quantity,
        colors = row.color_identity.concat(),
        type_line = row.type_line,
        price = row.price,
        decks = row.moxfield_deck_count,
        url = row.moxfield_decks_url.as_deref().unwrap_or("-"),
    )
}
