//! # Synchronization Primitives for the Render Pipeline
//!
//! ## The Problem
//!
//! ```text
//! Thread 1 (Update):  WRITE draw records and commands
//! Thread 2 (Render):  EXECUTE them against the GPU
//!
//! Shared frame state:      RACE CONDITION → CRASH
//! One lock per command:    LOCK CONTENTION → stutter
//! ```
//!
//! ## The Solution: Double Buffering
//!
//! ```text
//! Frame N:
//!   Update fills Buffer A
//!   Render drains Buffer B (last frame)
//!
//! Frame N+1:
//!   SWAP (once per frame)
//!   Update fills Buffer B
//!   Render drains Buffer A
//! ```
//!
//! Worker threads that decode surfaces report back through a
//! [`ThreadSafeQueue`].

mod double_buffer;
mod queue;

pub use double_buffer::DoubleBuffer;
pub use queue::{PopOutcome, ThreadSafeQueue};
