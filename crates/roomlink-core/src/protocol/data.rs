//! Data channel vocabulary (WebRTC DataChannel).

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomlinkError};
use crate::model::{Message, User};
use crate::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataOpcode {
    Heartbeat,
    Request,
    Response,
    Error,
    Dispatch,
    Hello,
}

impl From<DataOpcode> for u8 {
    fn from(op: DataOpcode) -> Self {
        match op {
            DataOpcode::Heartbeat => 0,
            DataOpcode::Request => 1,
            DataOpcode::Response => 2,
            DataOpcode::Error => 3,
            DataOpcode::Dispatch => 4,
            DataOpcode::Hello => 5,
        }
    }
}

impl TryFrom<u8> for DataOpcode {
    type Error = RoomlinkError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(DataOpcode::Heartbeat),
            1 => Ok(DataOpcode::Request),
            2 => Ok(DataOpcode::Response),
            3 => Ok(DataOpcode::Error),
            4 => Ok(DataOpcode::Dispatch),
            5 => Ok(DataOpcode::Hello),
            other => Err(RoomlinkError::MalformedEnvelope(format!(
                "data: unknown opcode {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPostMessage {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchUserUpdate {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMessageUpdate {
    pub message: Message,
}

/// Full room snapshot sent once the data channel opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub user_id: String,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

wire_payload! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DataPayload {
        RequestPostMessage(RequestPostMessage) = 10,
        Response(Response) = 20,
        DispatchUserUpdate(DispatchUserUpdate) = 40,
        DispatchMessageUpdate(DispatchMessageUpdate) = 41,
        Hello(Hello) = 50,
    }
}

/// Marker for the data channel protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataProtocol;

impl Protocol for DataProtocol {
    type Opcode = DataOpcode;
    type Payload = DataPayload;

    const NAME: &'static str = "data";
    const HEARTBEAT: DataOpcode = DataOpcode::Heartbeat;

    fn encode_payload(payload: &DataPayload) -> Result<rmpv::Value> {
        payload.to_value()
    }

    fn decode_payload(value: &rmpv::Value) -> Result<DataPayload> {
        DataPayload::from_value(value)
    }
}

pub type DataEnvelope = crate::protocol::Envelope<DataProtocol>;
pub type DataCodec = crate::protocol::Codec<DataProtocol>;
