use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

/// Inflates a gzip-compressed index into control-file text.
pub fn decompress_gzip(bytes: &[u8]) -> Result<String> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .context("index is not valid gzip data")?;
    String::from_utf8(inflated).context("decompressed index is not valid UTF-8")
}
