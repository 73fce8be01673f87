//! roomlink client library entry.
//!
//! This crate runs a chat room session over two transports: a WebSocket
//! control channel for authentication and signaling, and a WebRTC data channel
//! for room traffic. It wires the config loader, token persistence, the client
//! store, both channel managers and the session loop behind one [`Session`]
//! handle. It is consumed by the `roomlink` binary and by integration tests.

pub mod config;
pub mod infra;
pub mod session;
pub mod store;
pub mod transport;

pub use session::{Session, SessionBuilder, SessionStatus};
pub use store::ClientStore;
