// src/stream/runner.rs
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::share::types::Entry;
use crate::share::{ShareError, WindowFetcher};
use crate::stream::clock::Clock;
use crate::stream::{Poller, PollerConfig};

/// Why a stream stopped. The output channel is closed in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Cancelled,
    /// The consumer dropped its receiver.
    Closed,
    Failed(ShareError),
}

/// Sleep for `d` unless cancelled first. Returns false on cancellation.
async fn pause(d: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    let Ok(d) = d.to_std() else {
        return true;
    };
    if d.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(d) => true,
    }
}

/// Drive `fetcher` until failure, cancellation, or the consumer going away,
/// sending every new entry to `tx` in ascending time order.
pub async fn run<F, C>(
    mut poller: Poller,
    mut fetcher: F,
    clock: C,
    tx: mpsc::Sender<Entry>,
    cancel: CancellationToken,
) -> StreamEnd
where
    F: WindowFetcher,
    C: Clock,
{
    crate::metrics::ensure_metrics_described();

    loop {
        if !pause(poller.until_eta(clock.now()), &cancel).await {
            return StreamEnd::Cancelled;
        }
        if !pause(poller.penalty(), &cancel).await {
            return StreamEnd::Cancelled;
        }

        let lookback = poller.lookback(clock.now());
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            r = fetcher.fetch_window(lookback) => r,
        };

        let fresh = match fetched.and_then(|batch| poller.absorb(batch)) {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(target: "stream", error = %e, "failed to retrieve data, ending stream");
                return StreamEnd::Failed(e);
            }
        };

        for e in fresh {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamEnd::Cancelled,
                sent = tx.send(e) => {
                    if sent.is_err() {
                        tracing::info!(target: "stream", "consumer gone, ending stream");
                        return StreamEnd::Closed;
                    }
                }
            }
        }
    }
}

/// Spawn a stream of entries newer than `begin`. The receiver yields `None`
/// once the task ends; the handle says why.
pub fn spawn_stream<F, C>(
    fetcher: F,
    clock: C,
    cfg: PollerConfig,
    begin: DateTime<Utc>,
    cancel: CancellationToken,
) -> (mpsc::Receiver<Entry>, JoinHandle<StreamEnd>)
where
    F: WindowFetcher + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = mpsc::channel(cfg.channel_capacity.max(1));
    let poller = Poller::new(cfg, begin, clock.now());
    let handle = tokio::spawn(run(poller, fetcher, clock, tx, cancel));
    (rx, handle)
}
