//! Gzip + base64 encoding for game and error payloads
//!
//! Runners upload payloads base64-encoded. They are stored gzip-compressed and
//! re-encoded as base64 so they stay text-safe in the database.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::PayloadError;

/// Compress a base64 payload as submitted by a runner.
///
/// Returns `None` for missing, empty or undecodable input; such payloads are
/// dropped rather than rejected.
pub fn compress_encoded(encoded: Option<&str>) -> Option<String> {
    let encoded = encoded.filter(|s| !s.is_empty())?;
    let raw = STANDARD.decode(encoded).ok()?;
    compress_bytes(&raw).ok()
}

/// Gzip raw bytes and encode the result as base64.
pub fn compress_bytes(raw: &[u8]) -> Result<String, PayloadError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Decode a stored payload back to its raw bytes.
pub fn decompress(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    let compressed = STANDARD.decode(encoded)?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    Ok(raw)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod payload_tests;
