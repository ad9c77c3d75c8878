//! Shared application state

use scanlock_auth::{TokenRegistry, Verifier};
use scanlock_core::Config;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Live login tokens and their waiters
    pub registry: Arc<TokenRegistry>,
    /// Signature verifier over the device directory
    pub verifier: Verifier,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, registry: Arc<TokenRegistry>, verifier: Verifier) -> Self {
        Self {
            config,
            registry,
            verifier,
        }
    }
}
