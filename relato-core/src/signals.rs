//! Connectivity and position signals
//!
//! The pipeline never polls the outside world. Connectivity changes and GPS
//! fixes arrive through these two sources, each a thin wrapper over a tokio
//! watch channel: the platform side pushes updates in, interested components
//! hold a receiver. `subscribe` hands out an independent receiver and
//! dropping it is the unsubscribe; dropping the signal itself ends every
//! subscription.

use crate::types::GpsFix;
use tokio::sync::watch;

// ============================================
// Connectivity
// ============================================

/// Broadcast source for device connectivity state
#[derive(Debug)]
pub struct ConnectivitySignal {
    tx: watch::Sender<bool>,
}

impl ConnectivitySignal {
    /// Create a signal with the given initial state
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Publish the current connectivity state
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }

    /// Latest published state
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to connectivity updates
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

// ============================================
// Position
// ============================================

/// Broadcast source for device position fixes.
///
/// Starts with no fix. A published fix stays current until the next one
/// arrives; consumers read whatever is latest and never wait for a fix.
#[derive(Debug)]
pub struct PositionFeed {
    tx: watch::Sender<Option<GpsFix>>,
}

impl Default for PositionFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionFeed {
    /// Create a feed with no fix yet
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish a new fix
    pub fn update(&self, fix: GpsFix) {
        self.tx.send_replace(Some(fix));
    }

    /// Latest published fix, if any
    pub fn latest(&self) -> Option<GpsFix> {
        *self.tx.borrow()
    }

    /// Subscribe to position updates
    pub fn subscribe(&self) -> watch::Receiver<Option<GpsFix>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connectivity_subscribers_see_transitions() {
        let signal = ConnectivitySignal::new(false);
        let mut rx = signal.subscribe();
        assert!(!*rx.borrow_and_update());

        signal.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(signal.is_online());
    }

    #[tokio::test]
    async fn dropping_the_signal_ends_subscriptions() {
        let signal = ConnectivitySignal::new(true);
        let mut rx = signal.subscribe();
        drop(signal);
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn position_feed_keeps_latest_fix() {
        let feed = PositionFeed::new();
        assert_eq!(feed.latest(), None);

        let fix = GpsFix {
            latitude: -23.55,
            longitude: -46.63,
        };
        feed.update(fix);
        assert_eq!(feed.latest(), Some(fix));

        let newer = GpsFix {
            latitude: -23.56,
            longitude: -46.62,
        };
        feed.update(newer);
        assert_eq!(feed.latest(), Some(newer));
    }
}
