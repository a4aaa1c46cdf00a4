//! compression/parallel.rs
//! Block-parallel gzip writer.
//!
//! Input is cut into `block_size` blocks; each block is compressed by a
//! worker thread into a self-contained gzip member and members are written
//! to the inner writer strictly in block order. At most `2 * workers`
//! blocks are in flight, which bounds memory to roughly that many blocks.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::compression::types::{CodecError, CompressionKind, GzipConcurrency};

struct Block {
    index: u64,
    data: Vec<u8>,
}

struct Member {
    index: u64,
    result: io::Result<Vec<u8>>,
}

/// Single compression worker loop: blocks in, gzip members out.
fn run_block_worker(rx: Receiver<Block>, tx: Sender<Member>, level: Compression) {
    while let Ok(block) = rx.recv() {
        let result = compress_member(&block.data, level);
        if tx.send(Member { index: block.index, result }).is_err() {
            break; // writer went away
        }
    }
}

fn compress_member(data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), level);
    enc.write_all(data)?;
    enc.finish()
}

pub struct ParallelGzEncoder<W: Write> {
    inner: W,
    block_size: usize,
    max_inflight: usize,
    pending: Vec<u8>,

    block_tx: Option<Sender<Block>>,
    member_rx: Receiver<Member>,
    workers: Vec<JoinHandle<()>>,

    next_index: u64,
    next_to_write: u64,
    ready: BTreeMap<u64, Vec<u8>>,
    finished: bool,
}

impl<W: Write> ParallelGzEncoder<W> {
    pub fn new(inner: W, cfg: GzipConcurrency) -> Result<Self, CodecError> {
        Self::try_new(inner, cfg).map_err(|(e, _)| e)
    }

    /// Like [`ParallelGzEncoder::new`] but hands `inner` back on failure so
    /// the caller can still close it.
    pub fn try_new(inner: W, cfg: GzipConcurrency) -> Result<Self, (CodecError, W)> {
        if let Err(e) = cfg.validate() {
            return Err((e, inner));
        }
        let level = Compression::default();
        let max_inflight = cfg.workers * 2;

        let (block_tx, block_rx) = bounded::<Block>(max_inflight);
        let (member_tx, member_rx) = bounded::<Member>(max_inflight);

        let mut workers = Vec::with_capacity(cfg.workers);
        for i in 0..cfg.workers {
            let rx = block_rx.clone();
            let tx = member_tx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("gzip-block-{i}"))
                .spawn(move || run_block_worker(rx, tx, level));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Closing the block channel stops the workers already running.
                    drop(block_tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err((CodecError::Io { kind: CompressionKind::Gzip, source: e }, inner));
                }
            }
        }

        Ok(Self {
            inner,
            block_size: cfg.block_size,
            max_inflight,
            pending: Vec::with_capacity(cfg.block_size),
            block_tx: Some(block_tx),
            member_rx,
            workers,
            next_index: 0,
            next_to_write: 0,
            ready: BTreeMap::new(),
            finished: false,
        })
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    fn inflight(&self) -> usize {
        (self.next_index - self.next_to_write) as usize
    }

    fn dispatch(&mut self) -> io::Result<()> {
        while self.inflight() >= self.max_inflight {
            self.collect_one()?;
        }
        let data = std::mem::replace(&mut self.pending, Vec::with_capacity(self.block_size));
        let tx = self
            .block_tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "gzip encoder already finished"))?;
        tx.send(Block { index: self.next_index, data })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "gzip block workers exited"))?;
        self.next_index += 1;
        Ok(())
    }

    /// Waits for one member, then writes every member that is now in order.
    fn collect_one(&mut self) -> io::Result<()> {
        let member = self
            .member_rx
            .recv()
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "gzip block workers exited"))?;
        self.ready.insert(member.index, member.result?);

        while let Some(bytes) = self.ready.remove(&self.next_to_write) {
            self.inner.write_all(&bytes)?;
            self.next_to_write += 1;
        }
        Ok(())
    }

    /// Compresses the tail block, writes every member and stops the workers.
    /// The inner writer is not flushed. Safe to call more than once.
    pub fn try_finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        // An empty input still has to produce a valid gzip stream.
        if !self.pending.is_empty() || self.next_index == 0 {
            self.dispatch()?;
        }
        while self.inflight() > 0 {
            self.collect_one()?;
        }
        self.finished = true;
        self.shutdown_workers();
        Ok(())
    }

    fn shutdown_workers(&mut self) {
        self.block_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("gzip block worker panicked");
            }
        }
    }
}

impl<W: Write> Write for ParallelGzEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write after gzip finish"));
        }
        let room = self.block_size - self.pending.len();
        let n = room.min(buf.len());
        self.pending.extend_from_slice(&buf[..n]);
        if self.pending.len() == self.block_size {
            self.dispatch()?;
        }
        Ok(n)
    }

    /// Only the inner writer is flushed; a partial block stays pending so
    /// block boundaries do not depend on flush timing.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for ParallelGzEncoder<W> {
    fn drop(&mut self) {
        // Workers exit once the block channel closes; the member channel is
        // bounded, so drain it or they could block forever on send.
        self.block_tx.take();
        while self.member_rx.recv().is_ok() {}
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
