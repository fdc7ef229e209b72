//! Bounded pool of reusable SQL text buffers.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::trace;

/// Sizing of a [`BuilderPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of idle builders kept.
    pub capacity: usize,
    /// Initial capacity of freshly allocated builders, in bytes.
    pub initial_bytes: usize,
    /// Builders that grew beyond this many bytes are not retained.
    pub max_retained_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            initial_bytes: 256,
            max_retained_bytes: 16 * 1024,
        }
    }
}

/// Counters describing how well a pool is being reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions served by an idle builder.
    pub hits: u64,
    /// Acquisitions that found the pool empty and allocated.
    pub misses: u64,
    /// Acquisitions or releases that found the pool locked and bypassed it.
    pub contended: u64,
    /// Releases dropped because the pool was full or the builder too large.
    pub capacity_exceeded: u64,
}

/// A pool of `String` buffers used while rendering SQL.
///
/// The free list is only ever taken with `try_lock`: a caller that finds it
/// locked allocates a fresh builder instead of waiting, so nested and
/// concurrent renders never block on each other.
pub struct BuilderPool {
    config: PoolConfig,
    free: Mutex<Vec<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    contended: AtomicU64,
    capacity_exceeded: AtomicU64,
}

impl BuilderPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            free: Mutex::new(Vec::with_capacity(config.capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            contended: AtomicU64::new(0),
            capacity_exceeded: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide pool used when no pool is specified.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<BuilderPool> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(PoolConfig::default()))
    }

    /// Returns the pool configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Takes a builder from the pool, or allocates one.
    pub fn acquire(&self) -> PooledBuilder<'_> {
        let reused = match self.free.try_lock() {
            Some(mut free) => free.pop(),
            None => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                return self.allocate();
            }
        };
        match reused {
            Some(buf) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                PooledBuilder {
                    buf,
                    pool: self,
                    pooled: true,
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.allocate()
            }
        }
    }

    fn allocate(&self) -> PooledBuilder<'_> {
        PooledBuilder {
            buf: String::with_capacity(self.config.initial_bytes),
            pool: self,
            pooled: false,
        }
    }

    fn release(&self, mut buf: String) {
        if buf.capacity() > self.config.max_retained_bytes {
            self.capacity_exceeded.fetch_add(1, Ordering::Relaxed);
            trace!(bytes = buf.capacity(), "dropping oversized SQL builder");
            return;
        }
        buf.clear();
        let Some(mut free) = self.free.try_lock() else {
            self.contended.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if free.len() < self.config.capacity {
            free.push(buf);
        } else {
            drop(free);
            self.capacity_exceeded.fetch_add(1, Ordering::Relaxed);
            trace!(capacity = self.config.capacity, "SQL builder pool is full");
        }
    }

    /// Returns the number of idle builders.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Returns a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            capacity_exceeded: self.capacity_exceeded.load(Ordering::Relaxed),
        }
    }
}

impl Default for BuilderPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for BuilderPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// A builder checked out of a [`BuilderPool`]; returned on drop.
pub struct PooledBuilder<'p> {
    buf: String,
    pool: &'p BuilderPool,
    pooled: bool,
}

impl PooledBuilder<'_> {
    /// Returns whether this builder was reused from the pool.
    #[must_use]
    pub const fn is_pooled(&self) -> bool {
        self.pooled
    }
}

impl Deref for PooledBuilder<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuilder<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuilder<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl fmt::Debug for PooledBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuilder")
            .field("buf", &self.buf)
            .field("pooled", &self.pooled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn small_pool(capacity: usize) -> BuilderPool {
        BuilderPool::new(PoolConfig {
            capacity,
            initial_bytes: 16,
            max_retained_bytes: 64,
        })
    }

    #[test]
    fn test_reuse_after_release() {
        let pool = small_pool(2);
        {
            let mut b = pool.acquire();
            assert!(!b.is_pooled());
            b.push_str("SELECT 1");
        }
        let b = pool.acquire();
        assert!(b.is_pooled());
        assert!(b.is_empty());
        assert_eq!(pool.stats().hits, 1);
        assert_eq!(pool.stats().misses, 1);
    }

    #[test]
    fn test_nested_acquire_gets_distinct_builder() {
        let pool = small_pool(2);
        drop(pool.acquire());
        let mut outer = pool.acquire();
        outer.push_str("outer");
        {
            let mut inner = pool.acquire();
            assert!(!inner.is_pooled());
            inner.push_str("inner");
        }
        assert_eq!(outer.as_str(), "outer");
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_capacity_exceeded_is_counted() {
        let pool = small_pool(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.stats().capacity_exceeded, 1);

        let mut big = pool.acquire();
        big.push_str(&"x".repeat(200));
        drop(big);
        assert_eq!(pool.stats().capacity_exceeded, 2);
    }

    #[test]
    fn test_locked_pool_falls_back() {
        let pool = small_pool(4);
        drop(pool.acquire());
        let guard = pool.free.lock();
        let b = pool.acquire();
        assert!(!b.is_pooled());
        drop(b);
        drop(guard);
        let stats = pool.stats();
        assert_eq!(stats.contended, 2);
    }

    #[test]
    fn test_concurrent_acquire_never_shares() {
        let pool = Arc::new(small_pool(4));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let mut b = pool.acquire();
                        let tag = format!("t{i}");
                        b.push_str(&tag);
                        assert_eq!(b.as_str(), tag);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let stats = pool.stats();
        assert!(stats.hits + stats.misses + stats.contended >= 1600);
        assert!(pool.idle() <= 4);
    }
}
