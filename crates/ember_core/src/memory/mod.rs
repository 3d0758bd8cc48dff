//! # Memory Management
//!
//! Pre-allocated stores for the render pipeline.
//!
//! ## Design Philosophy
//!
//! All memory is allocated once at startup. During a frame:
//! - No heap allocations
//! - No container growth
//! - Overflow is reported to the caller, never a reallocation

mod keyed;
mod ring_buffer;
mod slot;

pub use keyed::KeyedContainer;
pub use ring_buffer::RingBuffer;
pub use slot::{SlotContainer, SlotState};
