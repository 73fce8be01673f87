//! Top-level facade crate for roomlink.
//!
//! Re-exports the wire primitives and the client runtime so applications can
//! depend on a single crate.

pub mod core {
    pub use roomlink_core::*;
}

pub mod client {
    pub use roomlink_client::*;
}
