//! roomlink core: runtime-free wire primitives, room model and error types.
//!
//! This crate defines the envelope codec spoken on both the control channel
//! (WebSocket) and the data channel (WebRTC), the payload unions for each,
//! and the user/message model shared with the client runtime. It carries no
//! transport or async runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed frames
//! surface as `RoomlinkError::MalformedEnvelope` so a hostile or buggy peer
//! can never take the client down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod protocol;

/// Shared result type.
pub use error::{Result, RoomlinkError};
