//! Wire protocol shared by both transports.
//!
//! Every frame is one MessagePack map `{i, o, p?}`:
//! - `i`: per-transport sequence id, starting at 0
//! - `o`: opcode, local to the transport
//! - `p`: optional payload map whose first entry `t` names the variant
//!
//! The control channel and the data channel reuse this envelope with their
//! own opcode and payload sets ([`control`], [`data`]). All decoding is
//! panic-free: malformed input is reported as `MalformedEnvelope`.

use std::fmt;

use crate::error::{Result, RoomlinkError};

/// Declares a payload union with its wire type codes.
macro_rules! wire_payload {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident($body:ty) = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        pub enum $name {
            $( $(#[$vmeta])* $variant($body), )+
        }

        impl $name {
            /// Wire discriminant carried in the `t` field.
            pub fn type_code(&self) -> u8 {
                match self {
                    $( $name::$variant(_) => $code, )+
                }
            }

            pub fn to_value(&self) -> $crate::error::Result<::rmpv::Value> {
                match self {
                    $( $name::$variant(body) => $crate::protocol::envelope::body_to_value($code, body), )+
                }
            }

            pub fn from_value(value: &::rmpv::Value) -> $crate::error::Result<Self> {
                match $crate::protocol::envelope::type_code_of(value)? {
                    $( $code => $crate::protocol::envelope::body_from_value::<$body>(value, stringify!($variant))
                        .map($name::$variant), )+
                    other => Err($crate::error::RoomlinkError::MalformedEnvelope(format!(
                        "unknown {} type {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

pub mod control;
pub mod data;
pub mod envelope;

pub use envelope::{Codec, Envelope};

/// Ties an opcode set and a payload union to one transport.
pub trait Protocol {
    type Opcode: Copy + Eq + fmt::Debug + Into<u8> + TryFrom<u8, Error = RoomlinkError>;
    type Payload: Clone + fmt::Debug + PartialEq;

    /// Transport name used in logs and errors.
    const NAME: &'static str;
    /// Opcode of the liveness probe.
    const HEARTBEAT: Self::Opcode;

    fn encode_payload(payload: &Self::Payload) -> Result<rmpv::Value>;
    fn decode_payload(value: &rmpv::Value) -> Result<Self::Payload>;
}
