//! # EMBER Core
//!
//! Pre-allocated building blocks for the EMBER render pipeline:
//! - A byte ring buffer carrying opcode payloads between threads
//! - Slot and keyed containers that never reallocate
//! - The once-per-frame double-buffer swap between update and render threads
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - All memory is pre-allocated
//! 2. **Overflow is reported, never grown** - Callers decide what to drop
//! 3. **One sync point per frame** - Never per command
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_core::{DoubleBuffer, RingBuffer};
//!
//! let frames = DoubleBuffer::new(RingBuffer::new(4096), RingBuffer::new(4096));
//! frames.with_producer(|ring| ring.write_value(&42_u64));
//! frames.swap_back_buffers(|_, _| {});
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{KeyedContainer, RingBuffer, SlotContainer, SlotState};
pub use sync::{DoubleBuffer, PopOutcome, ThreadSafeQueue};
