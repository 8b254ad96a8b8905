// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod metrics;
pub mod share;
pub mod stream;
pub mod trigger;

// ---- Re-exports for stable public API ----
pub use crate::share::session::Session;
pub use crate::share::types::{Entry, Trend};
pub use crate::share::{ShareError, WindowFetcher};
pub use crate::stream::{spawn_stream, PollerConfig, StreamEnd};
pub use crate::trigger::{Trigger, TriggerEngine};
