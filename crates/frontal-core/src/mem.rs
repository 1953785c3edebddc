//! Memory accounting for the factorization workspace.
//!
//! The budget is an explicit allocator context threaded through the
//! solver instead of process-wide allocator hooks: each dense frontal
//! block is charged before it is allocated and released when it is
//! dropped. All counters are atomic, so workers sharing a budget through
//! an `Arc` need no locking.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Byte accounting with an optional hard limit.
#[derive(Debug, Default)]
pub struct MemoryBudget {
    /// Bytes currently reserved.
    in_use: AtomicUsize,
    /// High-water mark of `in_use`.
    peak: AtomicUsize,
    /// Hard limit; `None` means accounting only.
    limit: Option<usize>,
}

impl MemoryBudget {
    /// Unlimited budget that only tracks usage.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Budget that fails reservations past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit: Some(limit),
        }
    }

    /// Reserve `bytes`, failing if the limit would be exceeded.
    pub fn reserve(&self, bytes: usize) -> Result<()> {
        let prev = self.in_use.fetch_add(bytes, Ordering::Relaxed);
        let now = prev + bytes;
        if let Some(limit) = self.limit {
            if now > limit {
                self.in_use.fetch_sub(bytes, Ordering::Relaxed);
                return Err(Error::OutOfMemory {
                    requested: bytes,
                    limit,
                });
            }
        }
        self.peak.fetch_max(now, Ordering::Relaxed);
        Ok(())
    }

    /// Return `bytes` to the budget.
    pub fn release(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Bytes currently reserved.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    /// High-water mark of reserved bytes.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}
