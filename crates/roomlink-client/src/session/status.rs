use std::time::Duration;

use roomlink_core::error::ServerCode;

/// Aggregated connection state published to the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub control_open: bool,
    pub data_open: bool,
    pub room_name_confirmed: bool,
    pub username_confirmed: bool,
    /// Last heartbeat round trip on the control channel.
    pub control_ping: Option<Duration>,
    /// Last heartbeat round trip on the data channel.
    pub data_ping: Option<Duration>,
    /// Last condition reported by the server.
    pub error: Option<ServerCode>,
}

impl SessionStatus {
    /// Both channels up and both names accepted locally.
    pub fn is_ready(&self) -> bool {
        self.control_open && self.data_open && self.room_name_confirmed && self.username_confirmed
    }
}
