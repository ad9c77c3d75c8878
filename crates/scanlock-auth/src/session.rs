//! Per-token rendezvous session state
//!
//! Each registered token owns one [`RendezvousEntry`] inside the registry:
//! its lifecycle state, a registration deadline, and at most one single-shot
//! waiter sink. The browser side of a session holds a [`WaitHandle`] and
//! races the sink against the poll timeout.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::oneshot;

/// Lifecycle state of a registered token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Token minted and registered, no poller attached yet
    Registered,
    /// A long-poll holds the waiter sink
    Waiting,
    /// A verified login was delivered to the waiter
    Notified,
    /// The waiter's poll timed out before any login arrived
    Expired,
}

/// Registry-internal record for one active token
#[derive(Debug)]
pub(crate) struct RendezvousEntry {
    pub(crate) state: TokenState,
    /// Deadline for tokens that never attract a poller; a live poll is
    /// bounded by its own wait timeout instead
    pub(crate) expires_at: DateTime<Utc>,
    /// Single-use signal sink installed by the current subscriber
    pub(crate) waiter: Option<oneshot::Sender<()>>,
}

impl RendezvousEntry {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            state: TokenState::Registered,
            expires_at: Utc::now() + ttl,
            waiter: None,
        }
    }

    /// True once an unpolled registration has outlived its deadline.
    /// Entries with an attached waiter are bounded by the poll timeout
    /// and never expire through this path.
    pub(crate) fn is_stale(&self) -> bool {
        self.state == TokenState::Registered && Utc::now() > self.expires_at
    }
}

/// How a long-poll wait concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A verified login was signalled for this token
    Notified,
    /// The wait bound elapsed with no login
    Expired,
    /// A newer subscriber took over the token; this wait is void
    Replaced,
}

/// Receiving side of a token subscription
///
/// Consumed by [`wait`](WaitHandle::wait), which suspends the caller until
/// the registry signals a login or the timeout elapses.
#[derive(Debug)]
pub struct WaitHandle {
    token: String,
    rx: oneshot::Receiver<()>,
}

impl WaitHandle {
    pub(crate) fn new(token: String, rx: oneshot::Receiver<()>) -> Self {
        Self { token, rx }
    }

    /// The token this handle is subscribed to
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Suspend until the registry delivers a login signal or `timeout`
    /// elapses. A dropped sender (the subscription was replaced or the
    /// entry removed) resolves as [`WaitOutcome::Replaced`].
    pub async fn wait(self, timeout: std::time::Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(())) => WaitOutcome::Notified,
            Ok(Err(_)) => WaitOutcome::Replaced,
            Err(_) => WaitOutcome::Expired,
        }
    }
}

/// Mint a fresh high-entropy login token
///
/// 32 random bytes, URL-safe base64 so the value survives query strings
/// and QR payloads untouched. Token generation normally happens on the
/// browser side; this helper exists for clients and tests.
pub fn mint_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
