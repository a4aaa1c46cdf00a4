//! pool.rs
//! Free-list object pool with an explicit reset step.
//!
//! Pooling only amortizes allocations (path strings, line buffers, the boxed
//! state itself). Every object is reset on the releasing thread before it is
//! pushed back, and a disabled pool allocates fresh on every acquire, so
//! behavior is identical either way.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

use crate::config::PoolConfig;

/// Returns an object to its freshly-constructed state.
pub trait Reset {
    fn reset(&mut self);
}

impl<T: Reset + ?Sized> Reset for Box<T> {
    fn reset(&mut self) {
        (**self).reset()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub idle: usize,
}

pub struct Pool<T> {
    free: Option<ArrayQueue<T>>,
    created: AtomicU64,
    reused: AtomicU64,
}

impl<T: Reset + Default> Pool<T> {
    /// Keeps at most `max_idle` objects; `0` disables pooling.
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: (max_idle > 0).then(|| ArrayQueue::new(max_idle)),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    pub fn with_config(cfg: &PoolConfig) -> Self {
        Self::new(cfg.max_idle)
    }

    /// Always allocates fresh and drops on release.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.free.is_some()
    }

    pub fn acquire(&self) -> T {
        match self.free.as_ref().and_then(ArrayQueue::pop) {
            Some(item) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    /// Resets `item` and keeps it for reuse if there is room.
    pub fn release(&self, mut item: T) {
        item.reset();
        if let Some(free) = &self.free {
            // A full pool drops the surplus.
            let _ = free.push(item);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.free.as_ref().map_or(0, ArrayQueue::len),
        }
    }
}
