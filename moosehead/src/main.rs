//! Moosehead demo
//!
//! Runs one workshop through the full reservation lifecycle against the
//! in-memory log, logging every email instead of sending it:
//!
//! 1. an administrator creates a two-seat workshop
//! 2. three participants reserve and confirm
//! 3. the first participant cancels and the waiting participant is promoted
//! 4. the system is rebuilt from the same log and must agree
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,moosehead=debug cargo run --bin moosehead
//! ```

use anyhow::{Context, bail};
use metrics_exporter_prometheus::PrometheusBuilder;
use moosehead::{
    ActionResult, AuthorKind, Config, ConsoleEmailSender, Email, SettingsHandle, WorkshopData,
    WorkshopService, WorkshopSystem,
};
use moosehead_core::environment::SystemClock;
use moosehead_testing::InMemoryEventLog;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn build(log: &InMemoryEventLog, settings: &SettingsHandle) -> Arc<WorkshopSystem> {
    Arc::new(WorkshopSystem::new(
        Arc::new(log.clone()),
        settings.clone(),
        Arc::new(ConsoleEmailSender::new()),
        Arc::new(SystemClock),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    tracing::info!(
        open_time = %config.workshops.open_time,
        closed = config.workshops.closed_workshops.len(),
        very_full_threshold = config.workshops.very_full_threshold,
        "Configuration loaded"
    );

    let settings = SettingsHandle::new(config.settings());
    let log = InMemoryEventLog::new();
    let system = build(&log, &settings);
    system.bootstrap().await?;
    let service = WorkshopService::new(Arc::clone(&system));

    service
        .create_workshop(WorkshopData::new("rust-101", "Rust 101", "Ownership and borrowing", 2))
        .await?;

    let participants = [("ada@example.com", "Ada"), ("bob@example.com", "Bob"), ("cy@example.com", "Cy")];
    for (email, name) in participants {
        let result = service.reservation("rust-101", email, name, AuthorKind::User).await?;
        tracing::info!(email, ?result, "Reservation");
    }

    let tokens: Vec<_> = participants
        .iter()
        .filter_map(|(email, _)| {
            system
                .projection()
                .find_all_reservations(&Email::from(*email))
                .into_iter()
                .next()
                .map(|p| p.reservation_token)
        })
        .collect();

    for token in &tokens {
        let result = service.confirm_email(token.as_str()).await?;
        tracing::info!(%token, ?result, "Confirmation");
    }

    let Some(first) = tokens.first() else {
        bail!("no reservation was recorded");
    };
    if let ActionResult::Error(message) = service.cancellation(first.as_str(), AuthorKind::User).await? {
        bail!("cancellation failed: {message}");
    }

    let workshops = service.workshops();
    println!("{}", serde_json::to_string_pretty(&workshops)?);

    let rebuilt = build(&log, &settings);
    rebuilt.bootstrap().await?;
    if rebuilt.projection().snapshot() != system.projection().snapshot()
        || rebuilt.saga().snapshot() != system.saga().snapshot()
    {
        bail!("replayed state differs from live state");
    }
    tracing::info!(events = log.len(), "Replay reproduced the live state");

    println!("{}", metrics.render());
    Ok(())
}
