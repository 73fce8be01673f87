//! Shared error type across roomlink crates.

use thiserror::Error;

/// Error classes as seen by the session (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Socket/channel closed or errored; recovered by reconnecting.
    TransportFailure,
    /// Frame could not be decoded; the frame is dropped.
    ProtocolViolation,
    /// Server rejected the room or username; fatal to the session.
    ServerValidation,
    /// SDP/ICE negotiation failed; recovered by re-signaling.
    NegotiationFailure,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::TransportFailure => "TRANSPORT_FAILURE",
            ErrorClass::ProtocolViolation => "PROTOCOL_VIOLATION",
            ErrorClass::ServerValidation => "SERVER_VALIDATION",
            ErrorClass::NegotiationFailure => "NEGOTIATION_FAILURE",
            ErrorClass::Config => "CONFIG",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Error codes the server reports inside a `response` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerCode {
    RoomNameTooShort,
    RoomNameTooLong,
    UsernameTooShort,
    UsernameTooLong,
    MessageContentTooShort,
    MessageContentTooLong,
    UsernameTaken,
}

impl ServerCode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            3001 => Some(ServerCode::RoomNameTooShort),
            3002 => Some(ServerCode::RoomNameTooLong),
            3003 => Some(ServerCode::UsernameTooShort),
            3004 => Some(ServerCode::UsernameTooLong),
            3005 => Some(ServerCode::MessageContentTooShort),
            3006 => Some(ServerCode::MessageContentTooLong),
            4001 => Some(ServerCode::UsernameTaken),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ServerCode::RoomNameTooShort => 3001,
            ServerCode::RoomNameTooLong => 3002,
            ServerCode::UsernameTooShort => 3003,
            ServerCode::UsernameTooLong => 3004,
            ServerCode::MessageContentTooShort => 3005,
            ServerCode::MessageContentTooLong => 3006,
            ServerCode::UsernameTaken => 4001,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(self) -> &'static str {
        match self {
            ServerCode::RoomNameTooShort => "Room name must be at least 3 characters long",
            ServerCode::RoomNameTooLong => "Room name must be no more than 32 characters long",
            ServerCode::UsernameTooShort => "Username must be at least 3 characters long",
            ServerCode::UsernameTooLong => "Username must be no more than 32 characters long",
            ServerCode::MessageContentTooShort => "Message must not be empty",
            ServerCode::MessageContentTooLong => "Message is too long",
            ServerCode::UsernameTaken => "This username is already taken in selected room",
        }
    }

    /// The locally confirmed room name is no longer valid and must be re-entered.
    pub fn invalidates_room_name(self) -> bool {
        matches!(self, ServerCode::RoomNameTooShort | ServerCode::RoomNameTooLong)
    }

    /// Codes that end the session when reported on the control channel.
    pub fn is_session_fatal(self) -> bool {
        !matches!(
            self,
            ServerCode::MessageContentTooShort | ServerCode::MessageContentTooLong
        )
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RoomlinkError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum RoomlinkError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("server rejected session: {}", .0.user_message())]
    Server(ServerCode),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RoomlinkError {
    /// Map the error onto the session's recovery taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            RoomlinkError::MalformedEnvelope(_) => ErrorClass::ProtocolViolation,
            RoomlinkError::Encode(_) => ErrorClass::Internal,
            RoomlinkError::Transport(_) => ErrorClass::TransportFailure,
            RoomlinkError::Negotiation(_) => ErrorClass::NegotiationFailure,
            RoomlinkError::Server(_) => ErrorClass::ServerValidation,
            RoomlinkError::BadConfig(_) => ErrorClass::Config,
            RoomlinkError::Internal(_) => ErrorClass::Internal,
        }
    }
}
