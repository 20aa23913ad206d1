//! Injectable sleep capability.
//!
//! Every wait in the engine (retry backoff, video operation polling, refinement
//! polling) goes through a [`Sleeper`] so callers can swap the tokio timer for
//! an instant one when simulating provider behavior.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and records every requested wait
#[derive(Debug, Default)]
pub struct InstantSleeper {
    requested: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in call order
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.requested.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.requested.lock().push(duration);
        tokio::task::yield_now().await;
    }
}
