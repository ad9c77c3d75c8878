//! Signature verification for authenticate requests
//!
//! The message a device signs IS the login token, so a valid signature is
//! both proof of device identity and selection of the rendezvous to wake.
//! That makes this check the trust boundary of the whole handshake.

use crate::device::DeviceDirectory;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Verifier as _};
use scanlock_core::AuthRequest;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Verification failures
///
/// The HTTP layer collapses all three into one generic unauthorized
/// response so callers cannot probe which check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("unknown device")]
    UnknownDevice,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
}

pub type VerifyResult<T> = Result<T, VerifyError>;

/// Checks signed login approvals against the device directory
#[derive(Clone)]
pub struct Verifier {
    devices: Arc<DeviceDirectory>,
}

impl Verifier {
    /// Create a verifier over the given device directory
    pub fn new(devices: Arc<DeviceDirectory>) -> Self {
        Self { devices }
    }

    /// Number of devices the verifier trusts
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Validate the signature in `request` against the claimed device's key
    ///
    /// The signature must cover exactly the bytes of `request.message` and
    /// arrive standard-base64 encoded.
    pub fn verify(&self, request: &AuthRequest) -> VerifyResult<()> {
        let device = self
            .devices
            .get(&request.device_id)
            .ok_or(VerifyError::UnknownDevice)?;

        let raw = BASE64
            .decode(&request.signature)
            .map_err(|_| VerifyError::MalformedSignature)?;
        let signature =
            Signature::from_slice(&raw).map_err(|_| VerifyError::MalformedSignature)?;

        device
            .public_key
            .verify(request.message.as_bytes(), &signature)
            .map_err(|_| {
                warn!("Signature mismatch for device {}", request.device_id);
                VerifyError::SignatureMismatch
            })
    }
}
