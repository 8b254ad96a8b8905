//! dexwatch — Binary Entrypoint
//! Dials the Share service, streams new readings, and logs alert triggers.

use std::sync::Arc;

use anyhow::{Context, Result};
use dexwatch::config::WatchConfig;
use dexwatch::metrics::Metrics;
use dexwatch::share::client::HttpShareApi;
use dexwatch::share::store::FileStore;
use dexwatch::stream::clock::SystemClock;
use dexwatch::{spawn_stream, Session, StreamEnd, TriggerEngine};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dexwatch=info,warn"));
    let json = std::env::var("DEXWATCH_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

/// Serve `/metrics` when DEXWATCH_METRICS_ADDR is set.
async fn start_metrics() -> Result<()> {
    let Ok(addr) = std::env::var("DEXWATCH_METRICS_ADDR") else {
        return Ok(());
    };
    let metrics = Metrics::init()?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tracing::info!(%addr, "serving metrics");
    let app = metrics.router();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!("metrics server stopped: {e:#}");
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatchConfig::load_default()?;
    let account = cfg.account()?;
    start_metrics().await?;

    let store = match cfg.session_path() {
        Some(p) => FileStore::new(p),
        None => FileStore::for_user(&account.username),
    };
    let api = HttpShareApi::new(cfg.account.region).with_timeout(cfg.poll.request_timeout_secs);
    let session = Session::dial(Arc::new(api), Box::new(store), account)
        .await
        .context("dialing share service")?;

    let mut engine = TriggerEngine::new();
    for a in &cfg.alerts {
        engine.register(a.name.clone(), a.build()?);
    }
    tracing::info!(alerts = engine.len(), "registered alerts");

    let cancel = CancellationToken::new();
    let begin = chrono::Utc::now()
        .checked_sub_signed(cfg.poll.backfill()?)
        .context("poll.backfill_mins reaches before the earliest representable time")?;
    let (mut rx, handle) = spawn_stream(
        session,
        SystemClock,
        cfg.poll.poller()?,
        begin,
        cancel.clone(),
    );

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    while let Some(entry) = rx.recv().await {
        tracing::info!(
            target: "dexwatch",
            time = %entry.time.to_rfc3339(),
            value = entry.value,
            trend = entry.trend.label(),
            "{} {}",
            entry.value,
            entry.trend.arrow()
        );
        let eval = engine.observe(&entry);
        for f in eval.rising() {
            tracing::warn!(target: "dexwatch", alert = %f.name, "{}", f.description);
        }
        if let Some(e) = eval.failure {
            tracing::warn!(target: "dexwatch", "trigger observation failed: {e}");
        }
    }

    match handle.await.context("stream task panicked")? {
        StreamEnd::Failed(e) => Err(e).context("stream ended"),
        end => {
            tracing::info!(?end, "stream ended");
            Ok(())
        }
    }
}
