//! constants.rs
//! Shared defaults for buffering, pooling and concurrent compression.

/// Buffer size used by the writer when the caller passes `0` (matches `bufio` / `BufWriter` defaults).
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Permission bits used when a writer auto-creates parent directories.
pub const DEFAULT_DIR_PERM: u32 = 0o755;

/// Permission bits reported for files created by the reference backends.
pub const DEFAULT_FILE_PERM: u32 = 0o644;

/// Default idle capacity of the reader/writer pools.
pub const DEFAULT_POOL_IDLE: usize = 256;

/// Concurrent gzip defaults: 1 MiB blocks, up to 4 blocks compressed at once.
pub const DEFAULT_GZIP_BLOCK_SIZE: usize = 1 << 20;
pub const DEFAULT_GZIP_WORKERS: usize = 4;

/// Blocks smaller than this are rejected by the concurrent gzip mode.
pub const MIN_GZIP_BLOCK_SIZE: usize = 4 * 1024;

/// Max block size sanity bound (32 MiB).
pub const MAX_GZIP_BLOCK_SIZE: usize = 32 * 1024 * 1024;

/// Stable codec IDs (u8), mirrored by `CompressionKind` discriminants.
pub mod codec_ids {
    pub const NONE: u8   = 0;
    pub const GZIP: u8   = 1;
    pub const ZLIB: u8   = 2;
    pub const SNAPPY: u8 = 3;
}

/// Header magic checked eagerly on the read path.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// zlib CMF low nibble for deflate.
pub const ZLIB_CM_DEFLATE: u8 = 8;
