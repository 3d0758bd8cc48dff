//! # EMBER UI
//!
//! Input side of the engine. Native window events come in through an
//! [`EventSource`], get filtered and classified, and leave as
//! [`InputEvent`]s the application dispatches to its widgets.
//!
//! ```text
//! EventSource ──▶ InputEventGenerator ──▶ InputEvent ──▶ application
//!                        │  ▲
//!        on_leave /      │  │ set_last_clicked
//!        on_return       ▼  │
//!                     TouchEntity
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod input;

pub use input::{
    DragState, EventKind, EventSource, InputEvent, InputEventGenerator, Key, MouseButton,
    NativeEvent, SharedTouchEntity, TouchEntity,
};
