//! Fullscreen state tracking
//!
//! Fullscreen is granted by the platform, not by us: a request expresses
//! intent, and local state only changes when the platform reports the
//! transition back via [`FullscreenState::sync_from_platform`]. This keeps
//! the tracked state honest when a request is denied or when the user
//! exits fullscreen through the platform itself.

use tokio::sync::watch;

/// Watchable fullscreen flag, kept in sync with platform notifications
pub struct FullscreenState {
    tx: watch::Sender<bool>,
}

impl Default for FullscreenState {
    fn default() -> Self {
        Self::new()
    }
}

impl FullscreenState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn is_fullscreen(&self) -> bool {
        *self.tx.borrow()
    }

    /// Compute the state a toggle request should ask the platform for.
    /// Does NOT change local state; the platform confirms via
    /// `sync_from_platform`.
    pub fn request_toggle(&self) -> bool {
        !*self.tx.borrow()
    }

    /// Record a transition the platform has actually performed
    pub fn sync_from_platform(&self, fullscreen: bool) {
        // send_if_modified avoids waking watchers on redundant reports
        self.tx.send_if_modified(|current| {
            let changed = *current != fullscreen;
            *current = fullscreen;
            changed
        });
    }

    /// Subscribe to fullscreen transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
