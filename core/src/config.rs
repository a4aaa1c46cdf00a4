//! config.rs
//! Per-call option values. Nothing here is process-global: every writer is
//! built from the options passed to it.

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionKind, GzipConcurrency};
use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_POOL_IDLE};

/// Options for [`crate::writer::FileWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Buffer between codec and raw handle; `0` selects `DEFAULT_BUFFER_SIZE`.
    pub buffer_size: usize,
    pub compression: CompressionKind,
    /// Block-parallel gzip; ignored for other codecs.
    pub gzip_concurrency: Option<GzipConcurrency>,
}

impl WriterOptions {
    pub fn new(buffer_size: usize, compression: CompressionKind) -> Self {
        Self { buffer_size, compression, gzip_concurrency: None }
    }

    pub fn with_gzip_concurrency(mut self, cfg: GzipConcurrency) -> Self {
        self.gzip_concurrency = Some(cfg);
        self
    }

    pub fn effective_buffer_size(&self) -> usize {
        if self.buffer_size > 0 {
            self.buffer_size
        } else {
            DEFAULT_BUFFER_SIZE
        }
    }

    /// Concurrency setting actually handed to the codec layer.
    pub fn codec_concurrency(&self) -> Option<GzipConcurrency> {
        match self.compression {
            CompressionKind::Gzip => self.gzip_concurrency,
            _ => None,
        }
    }
}

/// Sizing of a reader or writer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle objects kept for reuse; `0` disables pooling.
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_idle: DEFAULT_POOL_IDLE }
    }
}
