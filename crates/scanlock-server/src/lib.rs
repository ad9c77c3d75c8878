//! Scanlock Server - Axum-based HTTP server
//!
//! This crate provides the web server exposing the QR login endpoints:
//! QR issuance, the long-poll login wait, and the authenticate submission.

pub mod http;
pub mod qr;
pub mod state;

pub use http::create_router;
pub use qr::generate_png;
pub use state::AppState;
