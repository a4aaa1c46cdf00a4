//! rrwriter/mod.rs
//! Round-robin fan-out over a fixed set of destinations.
//!
//! Each `write` call goes whole to one destination, picked by an atomic
//! counter, so records written one per call are spread evenly and never
//! interleaved inside a destination. Destinations are opened eagerly and
//! each sits behind its own mutex; `write` takes `&self` and can be shared
//! across threads.

pub mod types;

pub use types::*;

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::backend::LocalFs;
use crate::fs::{FsCreate, WriteStream};

/// Opens one destination.
pub type WriterFactory = Box<dyn FnMut(&str) -> io::Result<Box<dyn WriteStream>> + Send>;

/// Runs once per destination path after every destination closed cleanly.
pub type CloseCallback = Box<dyn FnMut(&str) -> anyhow::Result<()> + Send + Sync>;

struct Destination {
    path: String,
    stream: Mutex<Box<dyn WriteStream>>,
}

pub struct RoundRobinBuilder {
    count: usize,
    path_fn: Box<dyn FnMut(usize) -> String>,
    on_close: CloseCallback,
    factory: Option<WriterFactory>,
}

impl RoundRobinBuilder {
    /// Replaces the default factory (plain local files).
    ///
    /// Wrapping a backend's `create`, or returning [`crate::FileWriter`]s
    /// for compressed destinations, is done here.
    pub fn writer_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut(&str) -> io::Result<Box<dyn WriteStream>> + Send + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Opens every destination. If one fails, the ones already open are
    /// closed before the error is returned.
    pub fn build(mut self) -> Result<RoundRobinWriter, RoundRobinError> {
        if self.count == 0 {
            return Err(RoundRobinError::NoDestinations);
        }
        let mut factory = match self.factory.take() {
            Some(factory) => factory,
            None => {
                let local = LocalFs::new();
                let create: WriterFactory = Box::new(move |path: &str| local.create(path));
                create
            }
        };

        let mut destinations: Vec<Destination> = Vec::with_capacity(self.count);
        for idx in 0..self.count {
            let path = (self.path_fn)(idx);
            match factory(&path) {
                Ok(stream) => destinations.push(Destination { path, stream: Mutex::new(stream) }),
                Err(source) => {
                    for dest in destinations {
                        if let Err(e) = dest.stream.into_inner().close() {
                            warn!("close {} after failed open of {path}: {e}", dest.path);
                        }
                    }
                    return Err(RoundRobinError::Open { path, source });
                }
            }
        }

        debug!("round-robin writer over {} destinations", destinations.len());
        Ok(RoundRobinWriter {
            destinations,
            counter: AtomicU64::new(0),
            on_close: Some(self.on_close),
        })
    }
}

pub struct RoundRobinWriter {
    destinations: Vec<Destination>,
    counter: AtomicU64,
    on_close: Option<CloseCallback>,
}

impl RoundRobinWriter {
    /// `path_fn(i)` names destination `i` for `i in 0..n`; `on_close` runs
    /// per path, in index order, once [`RoundRobinWriter::close`] has closed
    /// every destination without error.
    pub fn builder<P, C>(n: usize, path_fn: P, on_close: C) -> RoundRobinBuilder
    where
        P: FnMut(usize) -> String + 'static,
        C: FnMut(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        RoundRobinBuilder {
            count: n,
            path_fn: Box::new(path_fn),
            on_close: Box::new(on_close),
            factory: None,
        }
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(|d| d.path.as_str())
    }

    /// Hands all of `buf` to the next destination in rotation. The first
    /// call goes to destination 0. A short write from the destination is
    /// retried on that same destination, so a record is never split.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let ticket = self.counter.fetch_add(1, Ordering::Relaxed);
        let idx = (ticket % self.destinations.len() as u64) as usize;
        self.destinations[idx].stream.lock().write_all(buf)?;
        Ok(buf.len())
    }

    pub fn flush(&self) -> io::Result<()> {
        for dest in &self.destinations {
            dest.stream.lock().flush()?;
        }
        Ok(())
    }

    /// Closes every destination and reports all failures together. Only
    /// when all closed cleanly does the callback run, once per path in index
    /// order; its first failure stops the remaining callbacks.
    pub fn close(mut self) -> Result<(), RoundRobinError> {
        let destinations = std::mem::take(&mut self.destinations);
        let mut failures = Vec::new();
        let mut paths = Vec::with_capacity(destinations.len());
        for (index, dest) in destinations.into_iter().enumerate() {
            if let Err(source) = dest.stream.into_inner().close() {
                failures.push(DestinationError { index, path: dest.path.clone(), source });
            }
            paths.push(dest.path);
        }
        if !failures.is_empty() {
            return Err(RoundRobinError::Close(failures));
        }

        if let Some(mut on_close) = self.on_close.take() {
            for path in paths {
                on_close(&path).map_err(|source| RoundRobinError::Callback { path: path.clone(), source })?;
            }
        }
        Ok(())
    }
}

impl Write for &RoundRobinWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RoundRobinWriter::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        RoundRobinWriter::flush(*self)
    }
}

impl Drop for RoundRobinWriter {
    fn drop(&mut self) {
        for dest in self.destinations.drain(..) {
            if let Err(e) = dest.stream.into_inner().close() {
                warn!("round-robin destination {} dropped without close: {e}", dest.path);
            }
        }
    }
}

impl std::fmt::Debug for RoundRobinWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinWriter")
            .field("paths", &self.paths().collect::<Vec<_>>())
            .field("written", &self.counter.load(Ordering::Relaxed))
            .finish()
    }
}
