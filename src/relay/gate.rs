//! Connection readiness gate.
//!
//! Owns the terminal connection lifecycle. A background task connects with a
//! bounded number of attempts while request handlers wait on a watch channel
//! for the outcome. The state only ever moves forward:
//! `Connecting -> Ready` or `Connecting -> Failed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::TradingVenue;

use super::RelayError;

/// Connection state as seen by request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Connecting,
    Ready,
    Failed,
}

/// Readiness gate in front of the trading venue.
pub struct ConnectionGate {
    venue: Arc<dyn TradingVenue>,
    state: watch::Sender<GateState>,
    started: AtomicBool,
    attempts: u32,
    retry_delay: Duration,
}

impl ConnectionGate {
    pub fn new(venue: Arc<dyn TradingVenue>, attempts: u32, retry_delay: Duration) -> Self {
        let (state, _) = watch::channel(GateState::Connecting);
        Self {
            venue,
            state,
            started: AtomicBool::new(false),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Launch the background initializer. Only the first call spawns it;
    /// later calls return `None`.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }

        let gate = Arc::clone(self);
        Some(tokio::spawn(async move { gate.initialize().await }))
    }

    async fn initialize(&self) {
        for attempt in 1..=self.attempts {
            match self.venue.connect().await {
                Ok(()) => {
                    info!(attempt, "Trading terminal connected");
                    self.state.send_replace(GateState::Ready);
                    return;
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.attempts, error = %e, "Terminal connect failed");
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        error!(attempts = self.attempts, "Trading terminal failed to connect; giving up");
        self.state.send_replace(GateState::Failed);
    }

    /// Wait until the connection is ready, for at most `timeout`.
    ///
    /// Fails straight away once the initializer has given up, since the
    /// connection can no longer become ready.
    pub async fn ensure_ready(&self, timeout: Duration) -> Result<(), RelayError> {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(timeout, async {
            rx.wait_for(|state| *state != GateState::Connecting)
                .await
                .map(|state| *state)
        })
        .await;

        match settled {
            Ok(Ok(GateState::Ready)) => Ok(()),
            Ok(Ok(_)) => Err(RelayError::NotReady(format!(
                "terminal failed to connect after {} attempts",
                self.attempts
            ))),
            Ok(Err(_)) => Err(RelayError::NotReady("connection gate closed".to_string())),
            Err(_) => Err(RelayError::NotReady(format!(
                "terminal not ready within {:?}",
                timeout
            ))),
        }
    }

    /// Release the connection if it was ever established.
    pub async fn shutdown(&self) -> Result<()> {
        if self.state() != GateState::Ready {
            debug!(state = ?self.state(), "Terminal never connected; nothing to release");
            return Ok(());
        }

        self.venue.disconnect().await?;
        info!("Trading terminal disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PaperConfig, PaperVenue};

    const FAST_RETRY: Duration = Duration::from_millis(5);

    fn gate_for(venue: &Arc<PaperVenue>, attempts: u32) -> Arc<ConnectionGate> {
        let venue: Arc<dyn TradingVenue> = venue.clone();
        Arc::new(ConnectionGate::new(venue, attempts, FAST_RETRY))
    }

    #[tokio::test]
    async fn test_ready_after_transient_failures() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        venue.fail_connects(3).await;
        let gate = gate_for(&venue, 5);

        gate.start().unwrap().await.unwrap();

        assert_eq!(gate.state(), GateState::Ready);
        assert_eq!(venue.connect_calls().await, 4);
        assert!(gate.ensure_ready(Duration::ZERO).await.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts_exhausted() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        venue.fail_connects(10).await;
        let gate = gate_for(&venue, 5);

        gate.start().unwrap().await.unwrap();

        assert_eq!(gate.state(), GateState::Failed);
        assert_eq!(venue.connect_calls().await, 5);

        // No waiting out the timeout once the initializer has given up
        let started = std::time::Instant::now();
        let err = gate.ensure_ready(Duration::from_secs(30)).await.unwrap_err();
        assert!(matches!(err, RelayError::NotReady(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_no_pause_after_final_attempt() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        venue.fail_connects(10).await;
        let gate = Arc::new(ConnectionGate::new(
            venue.clone(),
            2,
            Duration::from_millis(400),
        ));

        let started = std::time::Instant::now();
        gate.start().unwrap().await.unwrap();
        let elapsed = started.elapsed();

        // One pause between the two attempts, none after the last
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);
        assert_eq!(gate.state(), GateState::Failed);
    }

    #[tokio::test]
    async fn test_wait_times_out_while_connecting() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        let gate = gate_for(&venue, 5);

        let err = gate.ensure_ready(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, RelayError::NotReady(_)));
        assert_eq!(venue.connect_calls().await, 0);
    }

    #[tokio::test]
    async fn test_waiter_released_when_connection_arrives() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        venue.fail_connects(2).await;
        let gate = Arc::new(ConnectionGate::new(
            venue.clone(),
            5,
            Duration::from_millis(30),
        ));

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.ensure_ready(Duration::from_secs(5)).await })
        };
        gate.start();

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_start_only_once() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        let gate = gate_for(&venue, 5);

        let first = gate.start();
        assert!(first.is_some());
        assert!(gate.start().is_none());
        first.unwrap().await.unwrap();
        assert_eq!(venue.connect_calls().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_only_disconnects_when_ready() {
        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        venue.fail_connects(10).await;
        let failed = gate_for(&venue, 2);
        failed.start().unwrap().await.unwrap();
        failed.shutdown().await.unwrap();
        assert_eq!(venue.disconnect_calls().await, 0);

        let venue = Arc::new(PaperVenue::new(PaperConfig::default()));
        let ready = gate_for(&venue, 2);
        ready.start().unwrap().await.unwrap();
        ready.shutdown().await.unwrap();
        assert_eq!(venue.disconnect_calls().await, 1);
    }
}
