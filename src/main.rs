use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pucksync::cli::{Cli, Commands};
use pucksync::client::NhlClient;
use pucksync::config::AppConfig;
use pucksync::scheduler::Scheduler;
use pucksync::store::Store;
use pucksync::sync::{OpStatus, OperationOutcome, SyncEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    init_tracing(&config.logging.level);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config: {e}");
        }
        anyhow::bail!("invalid configuration");
    }

    let store = Store::connect(&config.database).await?;
    let client = Arc::new(NhlClient::new(config.remote.clone()));
    let engine = SyncEngine::new(client, store.clone(), &config.sync);

    match cli.command {
        Commands::Init => {
            store.init_schema().await?;
            println!("Database initialized at {}", config.database.path);
        }
        Commands::FetchTeams => report(engine.fetch_teams().await)?,
        Commands::FetchRoster { team, season } => {
            report(engine.fetch_roster(&team, season.as_deref()).await)?
        }
        Commands::FetchStats { team, season } => {
            report(engine.fetch_team_stats(&team, season.as_deref()).await)?
        }
        Commands::FetchPlayerStats { team } => report(engine.fetch_player_stats(&team).await)?,
        Commands::FetchSchedule { date } => report(engine.fetch_schedule(date).await)?,
        Commands::FetchAll { season } => report(engine.fetch_all(season.as_deref()).await)?,
        Commands::Stats => print_stats(&store).await?,
        Commands::Schedule => {
            store.init_schema().await?;
            Scheduler::new(engine, config.sync.update_interval_hours)
                .run()
                .await?;
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx=warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Print the one-line summary and fail the process on a total error.
fn report(outcome: OperationOutcome) -> Result<()> {
    println!("{}", outcome.summary());
    if outcome.status == OpStatus::Error {
        anyhow::bail!("operation failed");
    }
    Ok(())
}

async fn print_stats(store: &Store) -> Result<()> {
    let counts = store.counts().await?;

    println!();
    println!("{}", "=".repeat(50));
    println!("PUCKSYNC - DATABASE STATISTICS");
    println!("{}", "=".repeat(50));
    println!("Teams:           {}", counts.teams);
    println!("Players:         {}", counts.players);
    println!("Games:           {}", counts.games);
    println!("Player seasons:  {}", counts.player_seasons);
    println!("Team seasons:    {}", counts.team_seasons);
    println!("{}", "=".repeat(50));

    let logs = store.recent_fetch_logs(10).await?;
    if !logs.is_empty() {
        println!("\nRecent data fetches:");
        println!("{}", "-".repeat(50));
        for log in logs {
            let marker = if log.status == "success" { "✓" } else { "✗" };
            println!(
                "{} {:13} | {} | records: {:4} | {:.2}s",
                marker,
                log.fetch_kind,
                log.fetch_date.format("%Y-%m-%d %H:%M"),
                log.records_fetched,
                log.duration_ms as f64 / 1000.0
            );
        }
    }
    println!("{}", "=".repeat(50));
    println!();

    Ok(())
}
