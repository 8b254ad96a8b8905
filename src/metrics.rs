use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("share_fetch_total", "Window fetches issued to the share service.");
        describe_counter!(
            "share_fetch_errors_total",
            "Window fetches that failed (transport, format, or exhausted retries)."
        );
        describe_counter!("share_reauth_total", "Re-authentications after a rejected token.");
        describe_counter!(
            "share_unknown_trend_total",
            "Records with an unrecognized trend, mapped to not computable."
        );
        describe_histogram!("share_fetch_ms", "Share read round trip in milliseconds.");
        describe_counter!(
            "stream_entries_emitted_total",
            "Entries handed to the stream consumer."
        );
        describe_counter!("stream_empty_polls_total", "Polls that found no new entry.");
        describe_gauge!("stream_penalty_secs", "Current backoff penalty before the next poll.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` and `/healthz`.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new()
            .route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            )
            .route("/healthz", get(|| async { "ok" }))
    }
}
