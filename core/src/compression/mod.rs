//! compression/mod.rs
//! Transparent compression for the read and write paths.
//!
//! - `decode` validates headers eagerly and returns a decompressing `Read`.
//! - `encode` returns a compressing `Write` with an explicit `finish`.
//! - `parallel` is the block-parallel gzip encoder behind `GzipConcurrency`.
//!
//! All formats are the standard containers (RFC 1952 gzip, RFC 1950 zlib,
//! snappy framing), readable by any stock decoder.

pub mod types;
pub mod decode;
pub mod encode;
pub mod parallel;

pub use types::*;
pub use decode::{decoder, decoder_for, DecodeStream};
pub use encode::{compress_bytes, decompress_bytes, encoder, encoder_for, EncodeStream};
pub use parallel::ParallelGzEncoder;
