//! Control channel vocabulary (WebSocket).

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomlinkError};
use crate::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlOpcode {
    Heartbeat,
    Request,
    Response,
    Error,
    Authorize,
}

impl From<ControlOpcode> for u8 {
    fn from(op: ControlOpcode) -> Self {
        match op {
            ControlOpcode::Heartbeat => 0,
            ControlOpcode::Request => 1,
            ControlOpcode::Response => 2,
            ControlOpcode::Error => 3,
            ControlOpcode::Authorize => 4,
        }
    }
}

impl TryFrom<u8> for ControlOpcode {
    type Error = RoomlinkError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(ControlOpcode::Heartbeat),
            1 => Ok(ControlOpcode::Request),
            2 => Ok(ControlOpcode::Response),
            3 => Ok(ControlOpcode::Error),
            4 => Ok(ControlOpcode::Authorize),
            other => Err(RoomlinkError::MalformedEnvelope(format!(
                "control: unknown opcode {other}"
            ))),
        }
    }
}

/// Session token presented on every (re)connect; empty when none is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorize {
    pub token: String,
}

/// Generic server answer; `code` is matched against `ServerCode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSession {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGetRoomOffer {
    pub room_name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRoomOffer {
    #[serde(default)]
    pub connection_id: String,
    pub sdp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPostAnswer {
    pub sdp: String,
}

wire_payload! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ControlPayload {
        RequestGetRoomOffer(RequestGetRoomOffer) = 10,
        RequestPostAnswer(RequestPostAnswer) = 11,
        Response(Response) = 20,
        ResponseSession(ResponseSession) = 21,
        ResponseRoomOffer(ResponseRoomOffer) = 22,
        Authorize(Authorize) = 30,
    }
}

/// Marker for the control channel protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlProtocol;

impl Protocol for ControlProtocol {
    type Opcode = ControlOpcode;
    type Payload = ControlPayload;

    const NAME: &'static str = "control";
    const HEARTBEAT: ControlOpcode = ControlOpcode::Heartbeat;

    fn encode_payload(payload: &ControlPayload) -> Result<rmpv::Value> {
        payload.to_value()
    }

    fn decode_payload(value: &rmpv::Value) -> Result<ControlPayload> {
        ControlPayload::from_value(value)
    }
}

pub type ControlEnvelope = crate::protocol::Envelope<ControlProtocol>;
pub type ControlCodec = crate::protocol::Codec<ControlProtocol>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unknown_opcode_is_malformed() {
        let err = ControlOpcode::try_from(9).unwrap_err();
        assert!(matches!(err, RoomlinkError::MalformedEnvelope(_)));
    }

    #[test]
    fn payload_type_codes_follow_wire_table() {
        let offer = ControlPayload::RequestGetRoomOffer(RequestGetRoomOffer {
            room_name: "lobby".into(),
            username: "alice".into(),
        });
        assert_eq!(offer.type_code(), 10);

        let auth = ControlPayload::Authorize(Authorize { token: String::new() });
        assert_eq!(auth.type_code(), 30);
    }

    #[test]
    fn tag_is_the_first_payload_key() {
        let payload = ControlPayload::RequestPostAnswer(RequestPostAnswer { sdp: "v=0".into() });
        let value = payload.to_value().unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map[0].0.as_str(), Some("t"));
        assert_eq!(map[0].1.as_u64(), Some(11));
        assert_eq!(map[1].0.as_str(), Some("sdp"));
    }
}
