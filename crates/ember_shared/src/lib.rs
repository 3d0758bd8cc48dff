//! # EMBER Shared
//!
//! Plain data types used by the rendering and input crates.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a native multimedia binding
//! - threads or synchronization
//! - anything that owns a native handle
//!
//! If you need backend types, put them in `ember_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod color;
pub mod constants;
pub mod geometry;

pub use color::Color;
pub use constants::{
    FULL_OPACITY, FULL_ROTATION_ANGLE, INVALID_HANDLE, RGBA_BYTE_SIZE, ZERO_ANGLE, ZERO_OPACITY,
};
pub use geometry::{is_point_in_rect, Point, Rectangle};
