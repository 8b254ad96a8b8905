//! # Adaptive polling
//! Turns repeated window fetches into an ordered, duplicate-free stream.
//!
//! The upstream samples every five minutes, so after a fresh reading the
//! next poll is scheduled one cadence later. Polls that find nothing new
//! back off by a growing (capped) penalty until data resumes.

pub mod clock;
pub mod runner;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};

use crate::share::types::Entry;
use crate::share::{ShareError, SAMPLE_MINUTES};

pub use runner::{run, spawn_stream, StreamEnd};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Expected spacing of upstream samples.
    pub cadence: Duration,
    /// Extra lookback to tolerate uneven sampling.
    pub slack: Duration,
    /// Penalty added after each poll without new data.
    pub penalty_step: Duration,
    pub penalty_cap: Duration,
    /// Upper bound on a single window request.
    pub max_lookback: Duration,
    /// Bound of the handoff channel to the consumer.
    pub channel_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::minutes(SAMPLE_MINUTES),
            slack: Duration::minutes(5),
            penalty_step: Duration::seconds(1),
            penalty_cap: Duration::seconds(10),
            max_lookback: Duration::hours(24),
            channel_capacity: 64,
        }
    }
}

/// Scheduling and dedup state of one stream.
#[derive(Debug, Clone)]
pub struct Poller {
    cfg: PollerConfig,
    cursor: DateTime<Utc>,
    eta: DateTime<Utc>,
    penalty: Duration,
    /// Penalty waited since the last fresh sample.
    waited: Duration,
}

impl Poller {
    pub fn new(cfg: PollerConfig, begin: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            cfg,
            cursor: begin,
            eta: now,
            penalty: Duration::zero(),
            waited: Duration::zero(),
        }
    }

    /// Timestamp of the newest emitted entry (or the initial `begin`).
    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    pub fn eta(&self) -> DateTime<Utc> {
        self.eta
    }

    pub fn penalty(&self) -> Duration {
        self.penalty
    }

    pub fn until_eta(&self, now: DateTime<Utc>) -> Duration {
        (self.eta - now).max(Duration::zero())
    }

    pub fn lookback(&self, now: DateTime<Utc>) -> Duration {
        ((now - self.cursor) + self.cfg.slack)
            .min(self.cfg.max_lookback)
            .max(Duration::zero())
    }

    /// Take one fetched batch (ascending) and return the entries that are
    /// strictly newer than anything emitted so far, advancing the schedule.
    ///
    /// A reading so late that the next poll time is unrepresentable fails the
    /// whole batch and leaves the state untouched.
    pub fn absorb(&mut self, batch: Vec<Entry>) -> Result<Vec<Entry>, ShareError> {
        let mut newest = self.cursor;
        let mut fresh = Vec::new();
        for e in batch {
            if e.time > newest {
                newest = e.time;
                fresh.push(e);
            }
        }
        let next = newest.checked_add_signed(self.cfg.cadence).ok_or_else(|| {
            ShareError::Format(format!("reading at {newest} leaves no room for the next poll"))
        })?;

        self.waited = self.waited + self.penalty;
        if fresh.is_empty() {
            self.penalty = (self.penalty + self.cfg.penalty_step).min(self.cfg.penalty_cap);
            counter!("stream_empty_polls_total").increment(1);
            tracing::debug!(target: "stream", penalty_secs = self.penalty.num_seconds(), "no new readings");
        } else {
            tracing::info!(
                target: "stream",
                fresh = fresh.len(),
                waited_secs = self.waited.num_seconds(),
                "sampled with penalty"
            );
            counter!("stream_entries_emitted_total").increment(fresh.len() as u64);
            self.cursor = newest;
            self.eta = next;
            self.penalty = Duration::zero();
            self.waited = Duration::zero();
        }
        gauge!("stream_penalty_secs").set(self.penalty.num_milliseconds() as f64 / 1_000.0);

        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::types::Trend;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn at(min: i64, value: i32) -> Entry {
        Entry {
            time: t0() + Duration::minutes(min),
            value,
            trend: Trend::Flat,
            raw: String::new(),
        }
    }

    #[test]
    fn empty_polls_grow_penalty_to_cap_then_reset() {
        let mut p = Poller::new(PollerConfig::default(), t0(), t0());
        let mut last = Duration::zero();
        for _ in 0..10 {
            assert!(p.absorb(vec![]).unwrap().is_empty());
            assert!(p.penalty() > last);
            last = p.penalty();
        }
        assert_eq!(p.penalty(), Duration::seconds(10));
        p.absorb(vec![]).unwrap();
        assert_eq!(p.penalty(), Duration::seconds(10));

        let out = p.absorb(vec![at(5, 120)]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(p.penalty(), Duration::zero());
        assert_eq!(p.cursor(), t0() + Duration::minutes(5));
        assert_eq!(p.eta(), t0() + Duration::minutes(10));
    }

    #[test]
    fn overlapping_windows_do_not_reemit() {
        let mut p = Poller::new(PollerConfig::default(), t0(), t0());
        let first = p.absorb(vec![at(-5, 100), at(0, 101), at(5, 102)]).unwrap();
        // begin itself is not "strictly newer"
        assert_eq!(first.iter().map(|e| e.value).collect::<Vec<_>>(), vec![102]);

        let second = p.absorb(vec![at(0, 101), at(5, 102), at(10, 103)]).unwrap();
        assert_eq!(second.iter().map(|e| e.value).collect::<Vec<_>>(), vec![103]);

        let third = p.absorb(vec![at(5, 102), at(10, 103)]).unwrap();
        assert!(third.is_empty());
        assert_eq!(p.cursor(), t0() + Duration::minutes(10));
    }

    #[test]
    fn unordered_batch_still_emits_ascending() {
        let mut p = Poller::new(PollerConfig::default(), t0(), t0());
        let out = p.absorb(vec![at(10, 1), at(5, 2), at(15, 3)]).unwrap();
        let times: Vec<_> = out.iter().map(|e| e.time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn reading_at_end_of_time_fails_without_panicking() {
        let mut p = Poller::new(PollerConfig::default(), t0(), t0());
        p.absorb(vec![at(5, 120)]).unwrap();
        let last = Entry {
            time: DateTime::<Utc>::MAX_UTC,
            ..at(10, 130)
        };
        let err = p.absorb(vec![at(10, 125), last]).unwrap_err();
        assert!(matches!(err, ShareError::Format(_)));
        assert_eq!(p.cursor(), t0() + Duration::minutes(5));
        assert_eq!(p.eta(), t0() + Duration::minutes(10));
    }

    #[test]
    fn lookback_adds_slack_and_is_capped() {
        let p = Poller::new(PollerConfig::default(), t0() - Duration::hours(1), t0());
        assert_eq!(p.lookback(t0()), Duration::minutes(65));

        let old = Poller::new(PollerConfig::default(), t0() - Duration::days(3), t0());
        assert_eq!(old.lookback(t0()), Duration::hours(24));
    }

    #[test]
    fn until_eta_never_negative() {
        let p = Poller::new(PollerConfig::default(), t0(), t0());
        assert_eq!(p.until_eta(t0() + Duration::minutes(1)), Duration::zero());
        assert_eq!(p.until_eta(t0() - Duration::seconds(30)), Duration::seconds(30));
    }
}
