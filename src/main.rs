use anyhow::Context;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use fmserver::core::config::AppConfig;
use fmserver::core::shared::state::AppState;
use fmserver::core::shared::utils::{create_conn, run_migrations};
use fmserver::core::store::{IntakeStore, MemoryIntakeStore, PgIntakeStore};
use fmserver::llm::build_provider;
use fmserver::main_module::run_axum_server;

const DEMO_ORG_ID: &str = "demo-org";
const DEMO_ORG_NAME: &str = "Demo Facility";

fn print_usage() {
    println!("Usage: fmserver [--memory]");
    println!();
    println!("  --memory   run against an in-process store seeded with a demo organization");
    println!();
    println!("Configuration is read from fmserver.toml (or $FMSERVER_CONFIG) and FMSERVER_* variables.");
}

async fn open_store(config: &AppConfig, in_memory: bool) -> anyhow::Result<Arc<dyn IntakeStore>> {
    if in_memory {
        let store = MemoryIntakeStore::new();
        store.add_organization(DEMO_ORG_ID, DEMO_ORG_NAME).await;
        warn!("Running with the in-memory store; tickets are lost on exit");
        return Ok(Arc::new(store));
    }

    let db_config = config.database.clone();
    let pool = tokio::task::spawn_blocking(move || {
        let pool = create_conn(&db_config).context("Failed to create database pool")?;
        if db_config.run_migrations {
            run_migrations(&pool).map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        Ok::<_, anyhow::Error>(pool)
    })
    .await
    .context("Database setup task failed")??;
    info!("Connected to database");

    Ok(Arc::new(PgIntakeStore::new(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut in_memory = false;
    for arg in &args {
        match arg.as_str() {
            "--memory" => in_memory = true,
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => anyhow::bail!("Unknown argument: {other}"),
        }
    }

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        "Starting fmserver {} (fallback routing: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.intake.fallback_routing
    );

    let store = open_store(&config, in_memory).await?;

    let provider = build_provider(&config.llm);
    match &provider {
        Some(_) => info!("Ticket title summarization enabled ({:?})", config.llm.provider),
        None => info!("No LLM API key configured; ticket titles fall back to truncation"),
    }
    if config.intake.expose_store_errors {
        warn!("intake.expose_store_errors is on; raw store errors are sent to senders");
    }

    let state = Arc::new(AppState::new(config, store, provider));
    run_axum_server(state).await.context("HTTP server failed")?;

    info!("fmserver stopped");
    Ok(())
}
