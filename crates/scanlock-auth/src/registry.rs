//! Token registry - the rendezvous point between pollers and notifiers
//!
//! Owns the set of live login tokens. Every mutation (register, subscribe,
//! notify, remove) passes through one lock so concurrent requests on the
//! same token can never observe a half-applied transition.

use crate::session::{RendezvousEntry, TokenState, WaitHandle};
use chrono::Duration;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, warn};

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The token was never registered, already released, or expired
    #[error("unknown token")]
    UnknownToken,
    /// The token is valid but no waiter is attached (yet, or any more)
    #[error("no subscriber for token")]
    NoSuchSubscriber,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Concurrency-safe map of live login tokens
///
/// Each token carries at most one waiter sink. Delivery is a non-blocking
/// single-shot send, so a notifier is never held hostage by a slow or
/// departed poller.
pub struct TokenRegistry {
    entries: RwLock<HashMap<String, RendezvousEntry>>,
    /// Validity window for tokens that never attract a poller
    token_ttl: Duration,
}

impl TokenRegistry {
    /// Create a registry whose unpolled tokens expire after `token_ttl`
    pub fn new(token_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            token_ttl,
        }
    }

    /// Mark a token as valid for a future login attempt
    ///
    /// Last register wins: re-registering resets the entry and its
    /// deadline. Stale never-polled entries are swept on the way.
    pub async fn register(&self, token: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|t, e| {
            if e.is_stale() {
                debug!("Sweeping expired unpolled token {}", t);
                false
            } else {
                true
            }
        });
        entries.insert(token.to_string(), RendezvousEntry::new(self.token_ttl));
        debug!("Registered token {}", token);
    }

    /// Whether a token is currently live
    ///
    /// A registered-but-never-polled token past its deadline counts as
    /// invalid, indistinguishable from one that never existed.
    pub async fn is_valid(&self, token: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(token).is_some_and(|e| !e.is_stale())
    }

    /// Attach a waiter sink to a token and return its receive handle
    ///
    /// At most one waiter per token: a second subscribe replaces the
    /// first, whose handle then resolves as
    /// [`WaitOutcome::Replaced`](crate::WaitOutcome::Replaced).
    pub async fn subscribe(&self, token: &str) -> RegistryResult<WaitHandle> {
        let mut entries = self.entries.write().await;
        if entries.get(token).map_or(true, |e| e.is_stale()) {
            entries.remove(token);
            return Err(RegistryError::UnknownToken);
        }
        let Some(entry) = entries.get_mut(token) else {
            return Err(RegistryError::UnknownToken);
        };

        let (tx, rx) = oneshot::channel();
        if entry.waiter.replace(tx).is_some() {
            warn!("Replacing existing waiter for token {}", token);
        }
        entry.state = TokenState::Waiting;
        Ok(WaitHandle::new(token.to_string(), rx))
    }

    /// Deliver exactly one login signal to the token's waiter
    ///
    /// Fails with [`RegistryError::UnknownToken`] for absent tokens and
    /// [`RegistryError::NoSuchSubscriber`] when the token is valid but
    /// nobody is listening - either the poll has not attached yet (the
    /// device out-raced the browser; the caller may retry) or the waiter
    /// already departed. The send never blocks the notifier.
    pub async fn notify(&self, token: &str) -> RegistryResult<()> {
        let mut entries = self.entries.write().await;
        if entries.get(token).map_or(true, |e| e.is_stale()) {
            entries.remove(token);
            return Err(RegistryError::UnknownToken);
        }
        let Some(entry) = entries.get_mut(token) else {
            return Err(RegistryError::UnknownToken);
        };

        let Some(tx) = entry.waiter.take() else {
            return Err(RegistryError::NoSuchSubscriber);
        };
        if tx.send(()).is_err() {
            warn!("Waiter for token {} departed before delivery", token);
            return Err(RegistryError::NoSuchSubscriber);
        }
        entry.state = TokenState::Notified;
        debug!("Delivered login signal for token {}", token);
        Ok(())
    }

    /// Remove a token and its waiter sink; idempotent
    pub async fn remove(&self, token: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(token).is_some() {
            debug!("Removed token {}", token);
        }
    }

    /// Number of live tokens
    pub async fn active_tokens(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}
