// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::share::client::Region;
use crate::share::types::{Account, Trend};
use crate::stream::PollerConfig;
use crate::trigger::Trigger;

pub const ENV_CONFIG_PATH: &str = "DEXWATCH_CONFIG";
pub const ENV_USERNAME: &str = "DEX_USERNAME";
pub const ENV_PASSWORD: &str = "DEX_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub account: AccountConfig,
    pub poll: PollConfig,
    pub alerts: Vec<AlertSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    /// "ENV" means: read from DEX_PASSWORD.
    pub password: String,
    pub region: Region,
    /// Defaults to `$HOME/.dex.<username>`.
    pub session_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub cadence_secs: u64,
    pub slack_secs: u64,
    pub penalty_step_secs: u64,
    pub penalty_cap_secs: u64,
    pub max_lookback_mins: u64,
    /// How far back the first poll reaches.
    pub backfill_mins: u64,
    pub request_timeout_secs: u64,
    pub channel_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            cadence_secs: 300,
            slack_secs: 300,
            penalty_step_secs: 1,
            penalty_cap_secs: 10,
            max_lookback_mins: 1440,
            backfill_mins: 60,
            request_timeout_secs: 10,
            channel_capacity: 64,
        }
    }
}

/// One named alert; all listed conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSpec {
    pub name: String,
    pub below: Option<i32>,
    pub above: Option<i32>,
    pub arrows: Vec<Trend>,
    /// mg/dL per minute; negative watches for falls.
    pub rate: Option<f64>,
}

impl AlertSpec {
    pub fn build(&self) -> Result<Trigger> {
        let mut parts = Vec::new();
        if let Some(bg) = self.below {
            parts.push(Trigger::below(bg));
        }
        if let Some(bg) = self.above {
            parts.push(Trigger::above(bg));
        }
        if !self.arrows.is_empty() {
            parts.push(Trigger::arrow(self.arrows.iter().copied()));
        }
        if let Some(rate) = self.rate {
            parts.push(Trigger::rate_of_change(rate));
        }
        match parts.len() {
            0 => bail!("alert {:?} has no condition", self.name),
            1 => Ok(parts.remove(0)),
            _ => Ok(Trigger::all(parts)),
        }
    }
}

impl PollConfig {
    /// Zero or inverted values fall back to defaults.
    fn sanitize(&mut self) {
        let d = PollConfig::default();
        if self.cadence_secs == 0 {
            self.cadence_secs = d.cadence_secs;
        }
        if self.penalty_step_secs == 0 {
            self.penalty_step_secs = d.penalty_step_secs;
        }
        if self.penalty_cap_secs == 0 {
            self.penalty_cap_secs = d.penalty_cap_secs;
        }
        if self.penalty_cap_secs < self.penalty_step_secs {
            self.penalty_cap_secs = self.penalty_step_secs;
        }
        if self.max_lookback_mins == 0 {
            self.max_lookback_mins = d.max_lookback_mins;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = d.request_timeout_secs;
        }
        if self.channel_capacity == 0 {
            self.channel_capacity = d.channel_capacity;
        }
    }

    pub fn poller(&self) -> Result<PollerConfig> {
        Ok(PollerConfig {
            cadence: secs("cadence_secs", self.cadence_secs)?,
            slack: secs("slack_secs", self.slack_secs)?,
            penalty_step: secs("penalty_step_secs", self.penalty_step_secs)?,
            penalty_cap: secs("penalty_cap_secs", self.penalty_cap_secs)?,
            max_lookback: mins("max_lookback_mins", self.max_lookback_mins)?,
            channel_capacity: self.channel_capacity,
        })
    }

    pub fn backfill(&self) -> Result<Duration> {
        mins("backfill_mins", self.backfill_mins)
    }
}

fn secs(field: &str, v: u64) -> Result<Duration> {
    i64::try_from(v)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| anyhow!("poll.{field} = {v} is out of range"))
}

fn mins(field: &str, v: u64) -> Result<Duration> {
    i64::try_from(v)
        .ok()
        .and_then(Duration::try_minutes)
        .ok_or_else(|| anyhow!("poll.{field} = {v} is out of range"))
}

impl WatchConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $DEXWATCH_CONFIG
    /// 2) config/dexwatch.toml
    /// 3) config/dexwatch.json
    /// 4) defaults (credentials from env only)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for p in ["config/dexwatch.toml", "config/dexwatch.json"] {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        let mut cfg = WatchConfig::default();
        cfg.finish()?;
        Ok(cfg)
    }

    /// Apply env overrides, resolve secrets, sanitize, validate alerts.
    fn finish(&mut self) -> Result<()> {
        if let Ok(u) = env::var(ENV_USERNAME) {
            if !u.trim().is_empty() {
                self.account.username = u.trim().to_string();
            }
        }
        let wants_env = self.account.password.trim().eq_ignore_ascii_case("env")
            || self.account.password.is_empty();
        if wants_env {
            self.account.password = env::var(ENV_PASSWORD).unwrap_or_default();
        }
        self.poll.sanitize();
        self.poll.poller()?;
        self.poll.backfill()?;
        for a in &self.alerts {
            a.build()?;
        }
        Ok(())
    }

    pub fn account(&self) -> Result<Account> {
        if self.account.username.is_empty() {
            bail!("missing share username (set account.username or {ENV_USERNAME})");
        }
        if self.account.password.is_empty() {
            bail!("missing share password (set account.password or {ENV_PASSWORD})");
        }
        Ok(Account {
            username: self.account.username.clone(),
            password: self.account.password.clone(),
        })
    }

    pub fn session_path(&self) -> Option<&Path> {
        self.account.session_path.as_deref()
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!(toml_err).context("unsupported config format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_specs_compile_to_triggers() {
        let low = AlertSpec {
            name: "low".into(),
            below: Some(70),
            ..Default::default()
        };
        assert!(matches!(low.build().unwrap(), Trigger::Single { .. }));

        let falling_low = AlertSpec {
            name: "falling low".into(),
            below: Some(100),
            rate: Some(-2.0),
            ..Default::default()
        };
        assert!(matches!(falling_low.build().unwrap(), Trigger::All(ref c) if c.len() == 2));

        assert!(AlertSpec {
            name: "empty".into(),
            ..Default::default()
        }
        .build()
        .is_err());
    }

    #[test]
    fn sanitize_restores_broken_values() {
        let mut p = PollConfig {
            cadence_secs: 0,
            penalty_step_secs: 5,
            penalty_cap_secs: 1,
            channel_capacity: 0,
            ..Default::default()
        };
        p.sanitize();
        assert_eq!(p.cadence_secs, 300);
        assert_eq!(p.penalty_cap_secs, 5);
        assert_eq!(p.channel_capacity, 64);

        let mut z = PollConfig {
            penalty_step_secs: 0,
            penalty_cap_secs: 0,
            ..Default::default()
        };
        z.sanitize();
        assert_eq!(z.penalty_step_secs, 1);
        assert_eq!(z.penalty_cap_secs, 10);
    }

    #[test]
    fn oversized_durations_are_errors() {
        let p = PollConfig {
            cadence_secs: u64::MAX,
            ..Default::default()
        };
        assert!(p.poller().is_err());

        let p = PollConfig {
            backfill_mins: i64::MAX as u64,
            ..Default::default()
        };
        assert!(p.backfill().is_err());
        assert!(PollConfig::default().poller().is_ok());
    }

    #[test]
    fn toml_and_json_parse() {
        let toml = r#"
[account]
username = "me"
password = "pw"
region = "ous"

[poll]
backfill_mins = 30

[[alerts]]
name = "urgent low"
below = 55
arrows = ["falling", "falling_fast"]
"#;
        let c = parse_config(toml, "toml").unwrap();
        assert_eq!(c.account.region, Region::Ous);
        assert_eq!(c.poll.backfill_mins, 30);
        assert_eq!(c.poll.cadence_secs, 300);
        assert_eq!(c.alerts[0].arrows, vec![Trend::Falling, Trend::FallingFast]);

        let json = r#"{"account":{"username":"me"},"alerts":[{"name":"high","above":250}]}"#;
        let j = parse_config(json, "").unwrap();
        assert_eq!(j.alerts[0].above, Some(250));
    }
}
