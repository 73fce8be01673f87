use std::time::Duration;

use serde::Deserialize;
use roomlink_core::error::{Result, RoomlinkError};

/// Heartbeat period used on both transports when `debug` is on.
const DEBUG_HEARTBEAT_MS: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub control: ControlSection,

    #[serde(default)]
    pub data: DataSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            control: ControlSection::default(),
            data: DataSection::default(),
            store: StoreSection::default(),
            session: SessionSection::default(),
            debug: false,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RoomlinkError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.control.validate()?;
        self.data.validate()?;
        self.store.validate()?;
        self.session.validate()?;

        Ok(())
    }

    pub fn control_heartbeat(&self) -> Duration {
        if self.debug {
            return Duration::from_millis(DEBUG_HEARTBEAT_MS);
        }
        Duration::from_millis(self.control.heartbeat_interval_ms)
    }

    pub fn data_heartbeat(&self) -> Duration {
        if self.debug {
            return Duration::from_millis(DEBUG_HEARTBEAT_MS);
        }
        Duration::from_millis(self.data.heartbeat_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.control.reconnect_delay_ms)
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.store.clear_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Base URL of the chat server; the control endpoint is derived from it.
    #[serde(default = "default_server_url")]
    pub url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        super::control_endpoint(&self.url).map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSection {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_control_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,

    /// Close codes after which the client stays disconnected.
    #[serde(default = "default_terminal_close_codes")]
    pub terminal_close_codes: Vec<u16>,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_control_heartbeat_ms(),
            terminal_close_codes: default_terminal_close_codes(),
        }
    }
}

impl ControlSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.reconnect_delay_ms) {
            return Err(RoomlinkError::BadConfig(
                "control.reconnect_delay_ms must be between 100 and 60000".into(),
            ));
        }
        if !(1000..=300000).contains(&self.heartbeat_interval_ms) {
            return Err(RoomlinkError::BadConfig(
                "control.heartbeat_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if let Some(code) = self
            .terminal_close_codes
            .iter()
            .find(|c| !(1000..=4999).contains(*c))
        {
            return Err(RoomlinkError::BadConfig(format!(
                "control.terminal_close_codes: {code} is not a websocket close code"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    #[serde(default = "default_data_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_data_heartbeat_ms(),
            ice_servers: default_ice_servers(),
        }
    }
}

impl DataSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=300000).contains(&self.heartbeat_interval_ms) {
            return Err(RoomlinkError::BadConfig(
                "data.heartbeat_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        const SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];
        for server in &self.ice_servers {
            if !SCHEMES.iter().any(|s| server.starts_with(s)) {
                return Err(RoomlinkError::BadConfig(format!(
                    "data.ice_servers: {server} is not a stun/turn url"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default = "default_clear_delay_ms")]
    pub clear_delay_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            clear_delay_ms: default_clear_delay_ms(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if self.clear_delay_ms > 60000 {
            return Err(RoomlinkError::BadConfig(
                "store.clear_delay_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> Result<()> {
        if self.token_path.trim().is_empty() {
            return Err(RoomlinkError::BadConfig(
                "session.token_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8080".into()
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}
fn default_control_heartbeat_ms() -> u64 {
    30000
}
fn default_terminal_close_codes() -> Vec<u16> {
    vec![1000, 1005]
}
fn default_data_heartbeat_ms() -> u64 {
    5000
}
fn default_ice_servers() -> Vec<String> {
    vec!["stun:stun.l.google.com:19302".into()]
}
fn default_clear_delay_ms() -> u64 {
    1000
}
fn default_token_path() -> String {
    ".roomlink-token".into()
}
