//! # Double-Buffered Frame State
//!
//! Two complete copies of the per-frame state, handed back and forth between
//! the update thread and the render thread.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │        DoubleBuffer         │
//!                    │                             │
//!                    │  ┌─────────┐  ┌─────────┐  │
//!                    │  │ State A │  │ State B │  │
//!                    │  └────┬────┘  └────┬────┘  │
//!                    │       │            │       │
//!                    │  ┌────┴────────────┴────┐  │
//!                    │  │ producer index (0/1) │  │
//!                    │  │ renderer_busy flag   │  │
//!                    │  └──────────────────────┘  │
//!                    └─────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!      ┌──────────────┐ ┌────────────┐ ┌──────────────┐
//!      │ with_producer│ │    swap    │ │wait_and_drain│
//!      │   (update)   │ │  (update)  │ │   (render)   │
//!      └──────────────┘ └────────────┘ └──────────────┘
//! ```
//!
//! ## Protocol
//!
//! 1. The update thread fills the producer buffer.
//! 2. `swap_back_buffers` waits until the renderer is idle, carries frame
//!    metadata forward, flips the producer index, marks the renderer busy
//!    and wakes the render thread.
//! 3. The render thread drains the consumer buffer, then clears the busy
//!    flag and wakes the update thread.
//!
//! Frame N is always fully drained before frame N+1 becomes visible to the
//! render thread. Synchronisation happens once per frame, never per command.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Swap bookkeeping guarded by the control mutex.
#[derive(Debug, Default)]
struct SwapControl {
    /// True from a swap until the consumer finished draining that frame.
    renderer_busy: bool,
}

/// A pair of frame states exchanged between one producer and one consumer.
///
/// ## Usage
///
/// ```rust,ignore
/// let frames = Arc::new(DoubleBuffer::new(State::new(), State::new()));
///
/// // Update thread
/// frames.with_producer(|state| state.push(cmd));
/// frames.swap_back_buffers(|fresh, next| next.is_locked = fresh.is_locked);
///
/// // Render thread
/// frames.wait_and_drain(|state| execute(state));
/// ```
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    /// The two state buffers.
    buffers: [Mutex<T>; 2],

    /// Busy flag, waited on from both sides.
    control: Mutex<SwapControl>,

    /// Signalled when a frame was handed to the consumer.
    frame_ready: Condvar,

    /// Signalled when the consumer finished a frame.
    frame_drained: Condvar,

    /// Index of the producer buffer (0 or 1).
    /// The consumer buffer is always (producer_index ^ 1).
    producer_index: AtomicUsize,

    /// Number of completed swaps.
    frames_swapped: AtomicU64,

    /// Number of frames drained by the consumer.
    frames_drained: AtomicU64,
}

impl<T> DoubleBuffer<T> {
    /// Creates a double buffer. `first` starts as the producer buffer.
    #[must_use]
    pub fn new(first: T, second: T) -> Self {
        Self {
            buffers: [Mutex::new(first), Mutex::new(second)],
            control: Mutex::new(SwapControl::default()),
            frame_ready: Condvar::new(),
            frame_drained: Condvar::new(),
            producer_index: AtomicUsize::new(0),
            frames_swapped: AtomicU64::new(0),
            frames_drained: AtomicU64::new(0),
        }
    }

    /// Returns the index of the current producer buffer.
    #[inline]
    #[must_use]
    pub fn producer_index(&self) -> usize {
        self.producer_index.load(Ordering::Acquire)
    }

    /// Returns the number of completed swaps.
    #[inline]
    #[must_use]
    pub fn frames_swapped(&self) -> u64 {
        self.frames_swapped.load(Ordering::Relaxed)
    }

    /// Returns the number of frames the consumer has drained.
    #[inline]
    #[must_use]
    pub fn frames_drained(&self) -> u64 {
        self.frames_drained.load(Ordering::Relaxed)
    }

    /// Returns true while a swapped frame has not been drained yet.
    #[must_use]
    pub fn is_renderer_busy(&self) -> bool {
        self.control.lock().renderer_busy
    }

    /// Runs `f` with exclusive access to the producer buffer.
    ///
    /// Only the update thread should call this. The consumer never touches
    /// this buffer, so the lock is uncontended.
    pub fn with_producer<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let index = self.producer_index();
        f(&mut self.buffers[index].lock())
    }

    /// Hands the producer buffer to the consumer.
    ///
    /// Blocks while the previous frame is still being drained. `carry` is
    /// called with the freshly filled buffer and the buffer that becomes the
    /// next producer buffer, so state such as lock flags and offsets survives
    /// the exchange.
    pub fn swap_back_buffers(&self, carry: impl FnOnce(&T, &mut T)) {
        let mut control = self.control.lock();
        while control.renderer_busy {
            self.frame_drained.wait(&mut control);
        }

        self.flip(carry);
        control.renderer_busy = true;
        drop(control);

        self.frame_ready.notify_one();
    }

    /// Non-blocking variant of [`swap_back_buffers`](Self::swap_back_buffers).
    ///
    /// Returns false without swapping if the consumer is still busy.
    pub fn try_swap_back_buffers(&self, carry: impl FnOnce(&T, &mut T)) -> bool {
        let mut control = self.control.lock();
        if control.renderer_busy {
            return false;
        }

        self.flip(carry);
        control.renderer_busy = true;
        drop(control);

        self.frame_ready.notify_one();
        true
    }

    /// Waits for a swapped frame and drains it with `drain`.
    ///
    /// Only the consumer buffer is locked while `drain` runs, so the update
    /// thread keeps filling its own buffer in parallel.
    pub fn wait_and_drain<R>(&self, drain: impl FnOnce(&mut T) -> R) -> R {
        let consumer = {
            let mut control = self.control.lock();
            while !control.renderer_busy {
                self.frame_ready.wait(&mut control);
            }
            self.producer_index() ^ 1
        };

        self.drain_index(consumer, drain)
    }

    /// Like [`wait_and_drain`](Self::wait_and_drain), giving up after `timeout`.
    ///
    /// Returns `None` if no frame arrived in time.
    pub fn wait_and_drain_timeout<R>(
        &self,
        timeout: Duration,
        drain: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let consumer = {
            let mut control = self.control.lock();
            if !control.renderer_busy {
                let _ = self.frame_ready.wait_for(&mut control, timeout);
            }
            if !control.renderer_busy {
                return None;
            }
            self.producer_index() ^ 1
        };

        Some(self.drain_index(consumer, drain))
    }

    /// Drains a pending frame if there is one, without blocking.
    pub fn try_drain<R>(&self, drain: impl FnOnce(&mut T) -> R) -> Option<R> {
        let consumer = {
            let control = self.control.lock();
            if !control.renderer_busy {
                return None;
            }
            self.producer_index() ^ 1
        };

        Some(self.drain_index(consumer, drain))
    }

    fn flip(&self, carry: impl FnOnce(&T, &mut T)) {
        let current = self.producer_index();
        let next = current ^ 1;

        {
            let filled = self.buffers[current].lock();
            let mut upcoming = self.buffers[next].lock();
            carry(&filled, &mut upcoming);
        }

        self.producer_index.store(next, Ordering::Release);
        self.frames_swapped.fetch_add(1, Ordering::Relaxed);
    }

    fn drain_index<R>(&self, consumer: usize, drain: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut state = self.buffers[consumer].lock();
            drain(&mut state)
        };

        self.frames_drained.fetch_add(1, Ordering::Relaxed);

        let mut control = self.control.lock();
        control.renderer_busy = false;
        drop(control);
        self.frame_drained.notify_one();

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_double_buffer_creation() {
        let frames = DoubleBuffer::new(0_u32, 0_u32);
        assert_eq!(frames.producer_index(), 0);
        assert_eq!(frames.frames_swapped(), 0);
        assert!(!frames.is_renderer_busy());
    }

    #[test]
    fn test_swap_hands_frame_to_consumer() {
        let frames = DoubleBuffer::new(Vec::<u32>::new(), Vec::new());

        frames.with_producer(|v| v.extend([1, 2, 3]));
        frames.swap_back_buffers(|_, _| {});

        assert_eq!(frames.producer_index(), 1);
        assert!(frames.is_renderer_busy());

        let drained = frames.try_drain(std::mem::take);
        assert_eq!(drained, Some(vec![1, 2, 3]));
        assert!(!frames.is_renderer_busy());
        assert_eq!(frames.frames_drained(), 1);
    }

    #[test]
    fn test_carry_forward() {
        let frames = DoubleBuffer::new((true, 5_i32), (false, 0_i32));

        frames.swap_back_buffers(|fresh, next| *next = *fresh);
        assert_eq!(frames.with_producer(|s| *s), (true, 5));
    }

    #[test]
    fn test_try_swap_refuses_while_busy() {
        let frames = DoubleBuffer::new(0_u8, 0_u8);

        assert!(frames.try_swap_back_buffers(|_, _| {}));
        assert!(!frames.try_swap_back_buffers(|_, _| {}));
        assert_eq!(frames.frames_swapped(), 1);

        frames.try_drain(|_| ());
        assert!(frames.try_swap_back_buffers(|_, _| {}));
    }

    #[test]
    fn test_drain_without_frame() {
        let frames = DoubleBuffer::new(0_u8, 0_u8);
        assert!(frames.try_drain(|_| ()).is_none());
        assert!(frames
            .wait_and_drain_timeout(Duration::from_millis(5), |_| ())
            .is_none());
    }

    #[test]
    fn test_empty_frame_does_not_stall() {
        let frames = Arc::new(DoubleBuffer::new(0_u32, 0_u32));
        let consumer = {
            let frames = Arc::clone(&frames);
            thread::spawn(move || {
                for _ in 0..3 {
                    frames.wait_and_drain(|_| ());
                }
            })
        };

        // nothing written before any of the swaps
        for _ in 0..3 {
            frames.swap_back_buffers(|_, _| {});
        }

        consumer.join().unwrap();
        assert_eq!(frames.frames_drained(), 3);
    }
}
