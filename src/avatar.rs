//! Avatar validation and normalization.
//!
//! Uploads must be named `*.jpg`, `*.jpeg` or `*.png` (any case) and fit under
//! the configured size limit. Accepted images are resized to fill 250x250 and
//! re-encoded as PNG.

use std::io::Cursor;

use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const AVATAR_SIZE: u32 = 250;
pub const AVATAR_CONTENT_TYPE: &str = "image/png";

lazy_static! {
    static ref IMAGE_EXTENSION: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

pub fn check_filename(filename: &str) -> Result<(), AppError> {
    if IMAGE_EXTENSION.is_match(filename) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Please upload an image having jpg, jpeg or png extension.".into(),
        ))
    }
}

pub fn check_size(len: usize, max_bytes: usize) -> Result<(), AppError> {
    if len > max_bytes {
        Err(AppError::BadRequest("File too large".into()))
    } else {
        Ok(())
    }
}

/// Decodes `bytes`, resizes to fill `AVATAR_SIZE` square and encodes as PNG.
///
/// CPU-bound; run it on the blocking pool.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let resized = image::load_from_memory(bytes)?.resize_to_fill(
        AVATAR_SIZE,
        AVATAR_SIZE,
        FilterType::Lanczos3,
    );
    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
