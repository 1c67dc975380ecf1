//! `Content-Encoding` decoders
//!
//! Both functions decode the whole buffer in memory. They fail on malformed
//! input instead of returning partial output.

use std::io::Read;

use flate2::read::{DeflateDecoder, MultiGzDecoder};

use crate::error::{FetchError, Result};

/// Decompress a gzip body (`Content-Encoding: gzip`).
///
/// Concatenated gzip members are decoded back to back.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|source| FetchError::Decompression {
            encoding: "gzip",
            source,
        })?;
    Ok(out)
}

/// Decompress a raw deflate stream (`Content-Encoding: deflate`).
///
/// No zlib header or checksum is expected.
pub fn inflate_raw(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|source| FetchError::Decompression {
            encoding: "deflate",
            source,
        })?;
    Ok(out)
}
