//! QR code rendering
//!
//! Pure encoding: token string in, PNG bytes out. The token is the entire
//! QR payload; the scanning app signs exactly what it scanned.

use image::ImageFormat;
use qrcode::QrCode;
use scanlock_core::{Error, Result};
use std::io::Cursor;

/// Render a token as a PNG QR code with the given edge length in pixels
pub fn generate_png(token: &str, size: u32) -> Result<Vec<u8>> {
    let code = QrCode::new(token.as_bytes()).map_err(|e| Error::QrEncode(e.to_string()))?;

    let image = code.render::<image::Luma<u8>>().build();
    let resized = image::imageops::resize(
        &image,
        size,
        size,
        image::imageops::FilterType::Nearest,
    );

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::QrEncode(e.to_string()))?;

    Ok(buffer.into_inner())
}
