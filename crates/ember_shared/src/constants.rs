//! # Drawing Constants
//!
//! Values shared by the producer side (widgets) and the render side.

/// Fully transparent
pub const ZERO_OPACITY: i32 = 0;

/// Fully opaque
pub const FULL_OPACITY: i32 = 255;

/// No rotation
pub const ZERO_ANGLE: f64 = 0.0;

/// One full turn, in degrees
pub const FULL_ROTATION_ANGLE: f64 = 360.0;

/// Lower bound for scale factors
pub const MIN_SCALE_FACTOR: f64 = 0.0;

/// Upper bound for scale factors
pub const MAX_SCALE_FACTOR: f64 = 1.0;

/// Bytes per pixel of an RGBA texture, used for memory accounting
pub const RGBA_BYTE_SIZE: u64 = 4;

/// Session-local handle meaning "nothing loaded"
pub const INVALID_HANDLE: i32 = -1;
