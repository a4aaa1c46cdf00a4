//! compression/types.rs
//! Codec selector, concurrent-gzip settings and codec errors.

use std::fmt;
use std::io;
use std::str::FromStr;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    codec_ids, DEFAULT_GZIP_BLOCK_SIZE, DEFAULT_GZIP_WORKERS, MAX_GZIP_BLOCK_SIZE, MIN_GZIP_BLOCK_SIZE,
};

/// Compression applied transparently by readers and writers.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    None   = codec_ids::NONE,
    Gzip   = codec_ids::GZIP,
    Zlib   = codec_ids::ZLIB,
    Snappy = codec_ids::SNAPPY,
}

impl CompressionKind {
    pub const ALL: [CompressionKind; 4] =
        [CompressionKind::None, CompressionKind::Gzip, CompressionKind::Zlib, CompressionKind::Snappy];

    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Gzip => "gzip",
            CompressionKind::Zlib => "zlib",
            CompressionKind::Snappy => "snappy",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            CompressionKind::None => None,
            CompressionKind::Gzip => Some("gz"),
            CompressionKind::Zlib => Some("zz"),
            CompressionKind::Snappy => Some("sz"),
        }
    }
}

// Not derived: num_enum reads `#[default]` as its catch-all variant.
impl Default for CompressionKind {
    fn default() -> Self {
        CompressionKind::None
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(CompressionKind::None),
            "gzip" | "gz" => Ok(CompressionKind::Gzip),
            "zlib" => Ok(CompressionKind::Zlib),
            "snappy" => Ok(CompressionKind::Snappy),
            _ => Err(CodecError::UnknownKind(s.to_string())),
        }
    }
}

/// Block-parallel gzip settings for the write path.
///
/// Output is a sequence of independent gzip members, one per block, which
/// any multi-member aware decoder (gzip(1), `MultiGzDecoder`) reads back as
/// the uncompressed input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GzipConcurrency {
    pub block_size: usize,
    pub workers: usize,
}

impl Default for GzipConcurrency {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_GZIP_BLOCK_SIZE,
            workers: num_cpus::get().clamp(1, DEFAULT_GZIP_WORKERS),
        }
    }
}

impl GzipConcurrency {
    pub fn new(block_size: usize, workers: usize) -> Self {
        Self { block_size, workers }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if self.workers == 0 {
            return Err(CodecError::InvalidConcurrency("workers must be > 0".into()));
        }
        if self.block_size < MIN_GZIP_BLOCK_SIZE || self.block_size > MAX_GZIP_BLOCK_SIZE {
            return Err(CodecError::InvalidConcurrency(format!(
                "block size {} outside [{}, {}]",
                self.block_size, MIN_GZIP_BLOCK_SIZE, MAX_GZIP_BLOCK_SIZE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown compression kind: {0:?}")]
    UnknownKind(String),

    /// The stream does not start with a valid header for the codec.
    #[error("{kind} stream has an invalid header")]
    MalformedHeader { kind: CompressionKind },

    /// A compressed stream was requested over zero bytes.
    #[error("{kind} stream is empty")]
    EmptyStream { kind: CompressionKind },

    #[error("invalid gzip concurrency: {0}")]
    InvalidConcurrency(String),

    #[error("{kind} codec i/o: {source}")]
    Io {
        kind: CompressionKind,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    /// Errors that retrying the same open cannot fix.
    pub fn is_unhandled(&self) -> bool {
        match self {
            CodecError::MalformedHeader { .. } | CodecError::EmptyStream { .. } => true,
            CodecError::Io { source, .. } => crate::types::is_unhandled_io_error(source),
            _ => false,
        }
    }
}
