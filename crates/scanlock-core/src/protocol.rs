//! HTTP wire payload types
//!
//! These mirror what the browser and the signing device exchange with the
//! server: the QR code response, the authenticate request body, and the
//! newline-delimited JSON events emitted on the long-poll stream.

use serde::{Deserialize, Serialize};

/// Body of `POST /authenticate`, submitted by the signing device.
///
/// `message` carries the token value shown in the QR code; the signature is
/// computed over exactly those bytes and transported base64-encoded. The
/// request is consumed immediately and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Identifier of the signing device
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// The signed payload; this is the login token itself
    pub message: String,
    /// Base64-encoded Ed25519 signature over `message`
    pub signature: String,
}

/// Response of `GET /qrCode`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCodeResponse {
    /// Base64-encoded PNG image of the QR code
    #[serde(rename = "QRCode")]
    pub qr_code: String,
}

/// Outcome reported on the long-poll stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    /// Poll attached, no event yet
    Waiting,
    /// Signature accepted, login completed
    Success,
    /// No login event arrived within the wait bound
    Timeout,
}

/// One line of the long-poll NDJSON stream, e.g. `{"login":"waiting"}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoginEvent {
    pub login: LoginStatus,
}

impl LoginEvent {
    pub fn new(login: LoginStatus) -> Self {
        Self { login }
    }

    /// Serialize as one NDJSON line with trailing newline
    pub fn to_line(self) -> String {
        // LoginEvent serialization cannot fail
        let mut line = serde_json::to_string(&self).unwrap_or_default();
        line.push('\n');
        line
    }
}
