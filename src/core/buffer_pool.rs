//! # Buffer Pool Module
//!
//! This module owns the three scratch buffers of the interactive preview
//! pipeline and the role protocol that moves them between the render worker
//! and the consumer.
//!
//! ## Overview
//!
//! Every scratch buffer holds exactly one role at any time:
//!
//! - **Idle**: free for the next render
//! - **Rendering**: checked out by the render worker as a [`RenderTarget`]; the
//!   only role in which pixels may be written
//! - **Published**: the buffer currently handed to the consumer
//!
//! ## Architecture
//!
//! ```text
//!            acquire()                 publish()
//!   ┌──────┐ ─────────▶ ┌───────────┐ ─────────▶ ┌───────────┐
//!   │ Idle │            │ Rendering │            │ Published │
//!   └──────┘ ◀───────── └───────────┘            └───────────┘
//!      ▲      abandon()                                │
//!      └───────────────────────────────────────────────┘
//!                 demoted by the next publish()
//! ```
//!
//! A render target owns its `PixelBuffer` by value while it is out, so the
//! type system guarantees no other role can observe a half-written frame.
//! Published buffers are handed out as `Arc<PixelBuffer>`, which makes them
//! read-only for as long as the consumer keeps a clone. When a demoted buffer
//! is still shared at the time it would be reused, the pool allocates a
//! replacement rather than writing into memory the consumer can see.
//!
//! ## Example
//!
//! ```rust
//! use imgcraft::core::buffer_pool::{BufferPool, BufferRole};
//! use imgcraft::core::frame::PixelBuffer;
//!
//! let preview = PixelBuffer::filled(4, 3, [10, 20, 30, 255]);
//! let pool = BufferPool::new(&preview);
//!
//! let mut target = pool.acquire().unwrap();
//! target.buffer_mut().as_bytes_mut().fill(255);
//! let published = pool.publish(target).unwrap();
//!
//! assert_eq!(published.pixel(0, 0), Some([255, 255, 255, 255]));
//! assert_eq!(
//!     pool.roles().iter().filter(|r| **r == BufferRole::Published).count(),
//!     1
//! );
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::core::frame::PixelBuffer;
use crate::error::{CraftError, CraftResult};

/// Number of scratch buffers in the interactive pipeline.
pub const POOL_SLOTS: usize = 3;

/// Role held by one scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    Idle,
    Rendering,
    Published,
}

/// A scratch buffer checked out for rendering.
///
/// Must be handed back through [`BufferPool::publish`] or
/// [`BufferPool::abandon`]. Dropping it instead leaves its slot in the
/// `Rendering` role and the pool refuses further renders.
#[derive(Debug)]
pub struct RenderTarget {
    slot: usize,
    buffer: PixelBuffer,
}

impl RenderTarget {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }
}

/// Counters for pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub published: u64,
    pub abandoned: u64,
    /// Acquires that allocated because the consumer still held the buffer.
    pub replacements: u64,
}

#[derive(Debug)]
struct Slot {
    role: BufferRole,
    /// `None` while the buffer is out as a render target or after destroy.
    buffer: Option<Arc<PixelBuffer>>,
    /// Demotion tick; the smallest tick among idle slots is reused first.
    demoted_at: u64,
}

#[derive(Debug)]
struct PoolInner {
    slots: [Slot; POOL_SLOTS],
    tick: u64,
    destroyed: bool,
    stats: PoolStats,
}

/// Three-slot role pool for preview rendering.
///
/// All slots share the dimensions of the preview source. The first slot is
/// seeded with a copy of the preview source and starts out `Published`, so a
/// consumer always has something to display.
#[derive(Debug)]
pub struct BufferPool {
    inner: Mutex<PoolInner>,
    width: u32,
    height: u32,
}

impl BufferPool {
    /// Create the pool, publishing a copy of `preview` as the initial frame.
    pub fn new(preview: &PixelBuffer) -> Self {
        let idle = |tick| Slot {
            role: BufferRole::Idle,
            buffer: Some(Arc::new(PixelBuffer::same_size_as(preview))),
            demoted_at: tick,
        };
        let slots = [
            Slot {
                role: BufferRole::Published,
                buffer: Some(Arc::new(preview.clone())),
                demoted_at: 0,
            },
            idle(1),
            idle(2),
        ];

        Self {
            inner: Mutex::new(PoolInner {
                slots,
                tick: 2,
                destroyed: false,
                stats: PoolStats::default(),
            }),
            width: preview.width(),
            height: preview.height(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Promote the least recently demoted idle buffer to `Rendering`.
    ///
    /// Fails after [`destroy`](Self::destroy) and while another render target
    /// is still out.
    pub fn acquire(&self) -> CraftResult<RenderTarget> {
        let (slot, shared) = {
            let mut inner = self.lock();
            if inner.destroyed {
                return Err(CraftError::state(
                    "destroyed",
                    "acquire",
                    "buffer pool has been released",
                ));
            }
            if inner
                .slots
                .iter()
                .any(|slot| slot.role == BufferRole::Rendering)
            {
                return Err(CraftError::state(
                    "rendering",
                    "acquire",
                    "a render target is already checked out",
                ));
            }

            let slot = inner
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.role == BufferRole::Idle)
                .min_by_key(|(_, slot)| slot.demoted_at)
                .map(|(index, _)| index)
                .ok_or_else(|| {
                    CraftError::resource("scratch buffer", "no idle buffer available")
                })?;

            inner.slots[slot].role = BufferRole::Rendering;
            inner.stats.acquired += 1;
            (slot, inner.slots[slot].buffer.take())
        };

        let buffer = match shared.map(Arc::try_unwrap) {
            Some(Ok(buffer)) => buffer,
            Some(Err(_still_shared)) => {
                debug!(slot, "idle buffer still held by consumer, allocating replacement");
                self.lock().stats.replacements += 1;
                PixelBuffer::new(self.width, self.height)
            }
            None => PixelBuffer::new(self.width, self.height),
        };

        Ok(RenderTarget { slot, buffer })
    }

    /// Make a fully written render target the new `Published` buffer.
    ///
    /// The previously published buffer is demoted to `Idle`. Returns the shared
    /// handle to hand to the consumer, or `None` once the pool is destroyed (the
    /// target is then simply dropped).
    pub fn publish(&self, target: RenderTarget) -> Option<Arc<PixelBuffer>> {
        let mut inner = self.lock();
        if inner.destroyed {
            return None;
        }

        inner.tick += 1;
        let tick = inner.tick;
        for slot in inner.slots.iter_mut() {
            if slot.role == BufferRole::Published {
                slot.role = BufferRole::Idle;
                slot.demoted_at = tick;
            }
        }

        let published = Arc::new(target.buffer);
        let slot = &mut inner.slots[target.slot];
        slot.role = BufferRole::Published;
        slot.buffer = Some(Arc::clone(&published));
        inner.stats.published += 1;

        Some(published)
    }

    /// Return a render target without publishing it. The published buffer is
    /// left untouched.
    pub fn abandon(&self, target: RenderTarget) {
        let mut inner = self.lock();
        if inner.destroyed {
            return;
        }

        inner.tick += 1;
        let tick = inner.tick;
        let slot = &mut inner.slots[target.slot];
        slot.role = BufferRole::Idle;
        slot.buffer = Some(Arc::new(target.buffer));
        slot.demoted_at = tick;
        inner.stats.abandoned += 1;
    }

    /// The currently published buffer.
    pub fn published(&self) -> Option<Arc<PixelBuffer>> {
        self.lock()
            .slots
            .iter()
            .find(|slot| slot.role == BufferRole::Published)
            .and_then(|slot| slot.buffer.clone())
    }

    /// Free every buffer the pool holds. Returns `true` only on the first call.
    ///
    /// A render target that is out at this point is freed when it comes back
    /// through `publish` or `abandon`.
    pub fn destroy(&self) -> bool {
        let mut inner = self.lock();
        if inner.destroyed {
            return false;
        }
        inner.destroyed = true;
        for slot in inner.slots.iter_mut() {
            slot.buffer = None;
        }
        debug!(stats = ?inner.stats, "buffer pool destroyed");
        true
    }

    pub fn roles(&self) -> [BufferRole; POOL_SLOTS] {
        let inner = self.lock();
        [
            inner.slots[0].role,
            inner.slots[1].role,
            inner.slots[2].role,
        ]
    }

    /// Buffers currently stored in the pool (render targets that are out are
    /// not counted).
    pub fn live_buffers(&self) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|slot| slot.buffer.is_some())
            .count()
    }

    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> BufferPool {
        BufferPool::new(&PixelBuffer::filled(4, 2, [1, 2, 3, 255]))
    }

    fn count(pool: &BufferPool, role: BufferRole) -> usize {
        pool.roles().iter().filter(|r| **r == role).count()
    }

    #[test]
    fn starts_with_preview_published() {
        let pool = pool();
        assert_eq!(
            pool.roles(),
            [BufferRole::Published, BufferRole::Idle, BufferRole::Idle]
        );
        let published = pool.published().unwrap();
        assert_eq!(published.pixel(3, 1), Some([1, 2, 3, 255]));
        assert_eq!(pool.live_buffers(), 3);
    }

    #[test]
    fn publish_rotates_roles() {
        let pool = pool();

        for round in 0..6u8 {
            let mut target = pool.acquire().unwrap();
            assert_eq!(count(&pool, BufferRole::Rendering), 1);
            assert_eq!(count(&pool, BufferRole::Published), 1);

            target.buffer_mut().as_bytes_mut().fill(round);
            let published = pool.publish(target).unwrap();
            assert_eq!(published.pixel(0, 0), Some([round; 4]));

            assert_eq!(count(&pool, BufferRole::Published), 1);
            assert_eq!(count(&pool, BufferRole::Idle), 2);
        }
        assert_eq!(pool.stats().published, 6);
        assert_eq!(pool.stats().replacements, 0);
    }

    #[test]
    fn reuses_least_recently_demoted_buffer() {
        let pool = pool();
        let first = pool.acquire().unwrap();
        assert_eq!(first.slot(), 1);
        pool.publish(first);

        // Slot 0 was just demoted, slot 2 has been idle longer.
        let second = pool.acquire().unwrap();
        assert_eq!(second.slot(), 2);
        pool.publish(second);

        let third = pool.acquire().unwrap();
        assert_eq!(third.slot(), 0);
        pool.abandon(third);
    }

    #[test]
    fn only_one_render_target_at_a_time() {
        let pool = pool();
        let target = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        assert_eq!(err.category(), "state");
        pool.abandon(target);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn abandon_keeps_previous_publication() {
        let pool = pool();
        let before = pool.published().unwrap();

        let mut target = pool.acquire().unwrap();
        target.buffer_mut().as_bytes_mut().fill(0xAA);
        pool.abandon(target);

        let after = pool.published().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(count(&pool, BufferRole::Idle), 2);
    }

    #[test]
    fn held_buffers_are_never_written() {
        let pool = pool();
        let held = pool.published().unwrap();
        let snapshot = held.as_bytes().to_vec();

        // Cycle enough times for the held buffer's slot to come around again.
        for _ in 0..POOL_SLOTS * 2 {
            let mut target = pool.acquire().unwrap();
            target.buffer_mut().as_bytes_mut().fill(0);
            pool.publish(target);
        }

        assert_eq!(held.as_bytes(), snapshot.as_slice());
        assert!(pool.stats().replacements >= 1);
    }

    #[test]
    fn destroy_frees_once_and_rejects_work() {
        let pool = pool();
        let target = pool.acquire().unwrap();

        assert!(pool.destroy());
        assert!(!pool.destroy());
        assert_eq!(pool.live_buffers(), 0);
        assert!(pool.published().is_none());
        assert!(pool.acquire().is_err());

        assert!(pool.publish(target).is_none());
        assert_eq!(pool.live_buffers(), 0);
    }
}
