//! Synthetic progress estimation for long-running stages
//!
//! Neither remote service reports real completion, so progress is a timed
//! ramp that exists purely to show the task is alive. It advances in fixed
//! increments up to a ceiling below 100 and snaps to 100 only on success.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Ramp parameters for one pipeline stage
#[derive(Debug, Clone, Copy)]
pub struct StageProfile {
    /// Percentage points added per tick
    pub step: u8,
    /// Tick interval
    pub interval: Duration,
    /// Ramp ceiling; never reached 100 before success
    pub ceiling: u8,
}

impl StageProfile {
    /// Image generation: seconds-scale, coarse increments
    pub const GENERATING: Self = Self {
        step: 5,
        interval: Duration::from_millis(400),
        ceiling: 90,
    };

    /// 3D conversion: minutes-scale and highly variable, fine increments
    pub const CONVERTING: Self = Self {
        step: 1,
        interval: Duration::from_millis(1500),
        ceiling: 95,
    };
}

/// Observable progress percentage driven by a cancellable ticker task
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<u8>,
    ticker: Option<(CancellationToken, JoinHandle<()>)>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx, ticker: None }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    /// Current percentage
    pub fn percent(&self) -> u8 {
        *self.tx.borrow()
    }

    /// Reset to 0 and start ramping with the given profile
    ///
    /// Any previous ticker is stopped first; at most one runs at a time.
    pub fn start(&mut self, profile: StageProfile) {
        self.stop_ticker();
        let _ = self.tx.send(0);

        let token = CancellationToken::new();
        let tick_token = token.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(profile.interval);
            // The first tick fires immediately; skip it so 0 stays visible
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = tick_token.cancelled() => break,
                    _ = interval.tick() => {
                        tx.send_modify(|p| *p = (*p + profile.step).min(profile.ceiling));
                    }
                }
            }
        });
        self.ticker = Some((token, handle));
    }

    /// Stop the ramp and snap to 100
    pub fn finish(&mut self) {
        self.stop_ticker();
        let _ = self.tx.send(100);
    }

    /// Stop the ramp and clear back to 0
    pub fn clear(&mut self) {
        self.stop_ticker();
        let _ = self.tx.send(0);
    }

    fn stop_ticker(&mut self) {
        if let Some((token, handle)) = self.ticker.take() {
            token.cancel();
            // Abort as well so a tick scheduled concurrently cannot land
            // after finish()/clear() has written the terminal value.
            handle.abort();
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
