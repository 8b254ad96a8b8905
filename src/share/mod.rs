// src/share/mod.rs
pub mod client;
pub mod parse;
pub mod session;
pub mod store;
pub mod types;

use chrono::Duration;
use thiserror::Error;

use crate::share::types::Entry;

/// Upstream sensors report one reading every five minutes.
pub const SAMPLE_MINUTES: i64 = 5;

/// Total read attempts per fetch before giving up on re-authentication.
pub const MAX_FETCH_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("session token rejected by share service")]
    AuthExpired,

    #[error("giving up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("login failed: {0}")]
    Login(String),

    #[error("share transport failure: {0}")]
    Transport(String),

    #[error("malformed share data: {0}")]
    Format(String),
}

impl From<reqwest::Error> for ShareError {
    fn from(e: reqwest::Error) -> Self {
        ShareError::Transport(e.to_string())
    }
}

/// One authenticated retrieval of the readings covering `lookback`,
/// returned in strictly ascending time order.
#[async_trait::async_trait]
pub trait WindowFetcher: Send {
    async fn fetch_window(&mut self, lookback: Duration) -> Result<Vec<Entry>, ShareError>;
}

/// Request sizing for a lookback: whole minutes, and the matching sample count.
pub fn window_request(lookback: Duration) -> (u64, u64) {
    let minutes = lookback.num_minutes().max(0) as u64;
    (minutes, minutes / SAMPLE_MINUTES as u64)
}
