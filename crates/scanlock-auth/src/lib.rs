//! Scanlock Auth - Token rendezvous and signature verification
//!
//! Provides the login-token registry that pairs a waiting browser long-poll
//! with the signed approval posted by a mobile device.
//!
//! # Login Flow
//!
//! 1. Browser mints a one-time token and fetches `GET /qrCode?token=<T>`;
//!    the server registers `T` and returns the QR image
//! 2. Browser opens a long-poll on `T` via [`TokenRegistry::subscribe`]
//! 3. Mobile device scans the code, signs `T` with its Ed25519 key, and
//!    posts `{deviceId, message, signature}`
//! 4. Server verifies the signature via [`Verifier`] and calls
//!    [`TokenRegistry::notify`], waking exactly the poll waiting on `T`
//! 5. The token is removed whether the poll saw a login or timed out
//!
//! # Example
//!
//! ```no_run
//! use scanlock_auth::{mint_token, TokenRegistry, WaitOutcome};
//! use std::time::Duration;
//!
//! async fn example() {
//!     let registry = TokenRegistry::new(chrono::Duration::seconds(60));
//!     let token = mint_token();
//!     registry.register(&token).await;
//!
//!     let handle = registry.subscribe(&token).await.unwrap();
//!     // ... a verified device posts its signature, someone calls notify ...
//!     match handle.wait(Duration::from_secs(10)).await {
//!         WaitOutcome::Notified => println!("logged in"),
//!         _ => println!("no login"),
//!     }
//!     registry.remove(&token).await;
//! }
//! ```

pub mod device;
pub mod registry;
pub mod session;
pub mod verify;

pub use device::{Device, DeviceDirectory, DirectoryError};
pub use registry::{RegistryError, RegistryResult, TokenRegistry};
pub use session::{mint_token, TokenState, WaitHandle, WaitOutcome};
pub use verify::{Verifier, VerifyError, VerifyResult};
