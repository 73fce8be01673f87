//! Envelope codec (MessagePack, panic-free).
//!
//! Decoding goes through `rmpv::Value` first so that missing `i`/`o` fields
//! and unknown payload types are reported precisely instead of surfacing as
//! opaque serde errors.

use std::marker::PhantomData;

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, RoomlinkError};
use crate::protocol::Protocol;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<P: Protocol> {
    /// Sender-local sequence id.
    pub id: u64,
    pub opcode: P::Opcode,
    pub payload: Option<P::Payload>,
}

/// Per-transport encoder holding the outbound sequence counter.
///
/// Create a fresh codec whenever the transport is re-created; ids then
/// restart at 0.
#[derive(Debug)]
pub struct Codec<P> {
    next_id: u64,
    _protocol: PhantomData<fn() -> P>,
}

impl<P: Protocol> Default for Codec<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Protocol> Codec<P> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            _protocol: PhantomData,
        }
    }

    /// Id the next encoded envelope will carry.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Encode an envelope, assigning it the next sequence id.
    ///
    /// Returns the id used together with the frame bytes.
    pub fn encode(&mut self, opcode: P::Opcode, payload: Option<&P::Payload>) -> Result<(u64, Vec<u8>)> {
        let id = self.next_id;

        let mut fields = vec![
            (Value::from("i"), Value::from(id)),
            (Value::from("o"), Value::from(opcode.into())),
        ];
        if let Some(payload) = payload {
            fields.push((Value::from("p"), P::encode_payload(payload)?));
        }

        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::Map(fields))
            .map_err(|e| RoomlinkError::Encode(format!("{} envelope: {e}", P::NAME)))?;

        self.next_id += 1;
        Ok((id, buf))
    }

    /// Decode a frame received on this transport.
    pub fn decode(bytes: &[u8]) -> Result<Envelope<P>> {
        let mut rd = bytes;
        let value = rmpv::decode::read_value(&mut rd)
            .map_err(|e| RoomlinkError::MalformedEnvelope(format!("{}: {e}", P::NAME)))?;

        let Some(map) = value.as_map() else {
            return Err(RoomlinkError::MalformedEnvelope(format!(
                "{}: envelope is not a map",
                P::NAME
            )));
        };

        let id = field(map, "i")
            .and_then(Value::as_u64)
            .ok_or_else(|| RoomlinkError::MalformedEnvelope(format!("{}: missing i", P::NAME)))?;

        let raw_opcode = field(map, "o")
            .and_then(Value::as_u64)
            .and_then(|o| u8::try_from(o).ok())
            .ok_or_else(|| RoomlinkError::MalformedEnvelope(format!("{}: missing o", P::NAME)))?;
        let opcode = P::Opcode::try_from(raw_opcode)?;

        let payload = match field(map, "p") {
            None | Some(Value::Nil) => None,
            Some(p) => Some(P::decode_payload(p)?),
        };

        Ok(Envelope { id, opcode, payload })
    }
}

fn field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Serialize a payload body as a named map and stamp it with `t` first.
pub(crate) fn body_to_value<T: Serialize>(code: u8, body: &T) -> Result<Value> {
    let named = rmp_serde::to_vec_named(body).map_err(|e| RoomlinkError::Encode(e.to_string()))?;
    let mut rd = named.as_slice();
    let value = rmpv::decode::read_value(&mut rd).map_err(|e| RoomlinkError::Encode(e.to_string()))?;

    let Value::Map(body_fields) = value else {
        return Err(RoomlinkError::Encode("payload body must encode as a map".into()));
    };

    let mut fields = Vec::with_capacity(body_fields.len() + 1);
    fields.push((Value::from("t"), Value::from(code)));
    fields.extend(body_fields);
    Ok(Value::Map(fields))
}

pub(crate) fn body_from_value<T: DeserializeOwned>(value: &Value, variant: &str) -> Result<T> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value)
        .map_err(|e| RoomlinkError::MalformedEnvelope(format!("{variant}: {e}")))?;
    rmp_serde::from_slice(&buf).map_err(|e| RoomlinkError::MalformedEnvelope(format!("{variant}: {e}")))
}

/// Read the `t` discriminant of a payload map.
pub(crate) fn type_code_of(value: &Value) -> Result<u8> {
    let map = value
        .as_map()
        .ok_or_else(|| RoomlinkError::MalformedEnvelope("payload is not a map".into()))?;
    field(map, "t")
        .and_then(Value::as_u64)
        .and_then(|t| u8::try_from(t).ok())
        .ok_or_else(|| RoomlinkError::MalformedEnvelope("payload has no type".into()))
}
