//! Connectivity signal abstraction.

use tokio::sync::watch;

/// Current online/offline state plus transition notifications.
///
/// Injected into the sync coordinator instead of being read from ambient
/// globals, so offline behavior is testable without a real network stack.
pub trait ConnectivitySignal: Send + Sync {
    /// Current online state.
    fn is_online(&self) -> bool;

    /// Subscribe to state transitions.
    fn watch(&self) -> watch::Receiver<bool>;
}

/// Connectivity signal backed by a watch channel.
///
/// Runtime integrations push OS/network events into it; tests toggle it
/// directly.
pub struct SwitchableConnectivity {
    tx: watch::Sender<bool>,
}

impl SwitchableConnectivity {
    /// Create a signal with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Create a signal that starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Create a signal that starts offline.
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Change the state, notifying subscribers on transitions.
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

impl ConnectivitySignal for SwitchableConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
