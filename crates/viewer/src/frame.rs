//! Cooperative render loop
//!
//! A [`RenderLoop`] runs a step callback at a fixed cadence until it is
//! stopped or the callback asks to quit. The scheduling is tokio-timer
//! based, so tests can drive it deterministically with paused time.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to a running render loop
pub struct RenderLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RenderLoop {
    /// Spawn a loop that invokes `step` once per `frame_interval` with the
    /// elapsed seconds since the previous invocation. Returning `false`
    /// from `step` ends the loop.
    pub fn spawn<F>(frame_interval: Duration, mut step: F) -> Self
    where
        F: FnMut(f32) -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(frame_interval);
            // Catch up with a single tick after a stall instead of bursting
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = Instant::now();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let dt = (now - last).as_secs_f32();
                        last = now;
                        if !step(dt) {
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// True until the loop has exited (stopped, quit, or panicked)
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the loop and wait for the in-flight frame to finish
    pub async fn stop(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn steps_run_at_the_frame_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let render = RenderLoop::spawn(Duration::from_millis(16), move |_dt| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(160)).await;
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 9, "expected ~10 frames, got {seen}");
        render.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_further_steps() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let render = RenderLoop::spawn(Duration::from_millis(16), move |_dt| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(48)).await;
        render.stop().await;
        let at_stop = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn step_returning_false_ends_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let render = RenderLoop::spawn(Duration::from_millis(16), move |_dt| {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!render.is_running());
        assert_eq!(count.load(Ordering::SeqCst), 3);
        render.stop().await;
    }
}
