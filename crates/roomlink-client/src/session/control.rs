//! Control channel manager.
//!
//! Owns the control socket, its codec and heartbeat, and the reconnect timer.
//! Protocol decisions (what to send when) are taken by the session core; this
//! type keeps the per-socket state consistent across reopen and close.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use url::Url;

use roomlink_core::error::{Result, RoomlinkError};
use roomlink_core::protocol::control::{
    Authorize, ControlCodec, ControlOpcode, ControlPayload, RequestGetRoomOffer, RequestPostAnswer,
};

use super::event::{Channel, ControlSink, Event};
use super::heartbeat::HeartbeatMonitor;
use crate::transport::{ControlConnector, ControlLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Closed,
    Connecting,
    Open { authenticated: bool },
    Reconnecting,
}

pub struct ControlChannel {
    connector: Arc<dyn ControlConnector>,
    events: UnboundedSender<Event>,
    state: ControlState,
    generation: u64,
    link: Option<Box<dyn ControlLink>>,
    codec: ControlCodec,
    heartbeat: HeartbeatMonitor,
    reconnect: Option<JoinHandle<()>>,
    reconnect_delay: Duration,
    terminal_close_codes: Vec<u16>,
}

impl ControlChannel {
    pub fn new(
        connector: Arc<dyn ControlConnector>,
        events: UnboundedSender<Event>,
        heartbeat_interval: Duration,
        reconnect_delay: Duration,
        terminal_close_codes: Vec<u16>,
    ) -> Self {
        Self {
            connector,
            events,
            state: ControlState::Closed,
            generation: 0,
            link: None,
            codec: ControlCodec::new(),
            heartbeat: HeartbeatMonitor::new(Channel::Control, heartbeat_interval),
            reconnect: None,
            reconnect_delay,
            terminal_close_codes,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ControlState::Open { authenticated: true }
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Start a fresh socket, dropping whatever was there before.
    pub fn open(&mut self, url: &Url) {
        self.cancel_reconnect();
        self.drop_link();

        self.generation += 1;
        self.codec = ControlCodec::new();
        self.state = ControlState::Connecting;

        let sink = ControlSink::new(self.events.clone(), self.generation);
        self.link = Some(self.connector.open(url, sink));
        tracing::info!(generation = self.generation, %url, "control connecting");
    }

    pub fn on_opened(&mut self) {
        self.state = ControlState::Open { authenticated: false };
    }

    /// Session accepted by the server; heartbeats start here.
    pub fn on_session(&mut self) {
        self.state = ControlState::Open { authenticated: true };
        self.heartbeat.start(self.events.clone(), self.generation);
    }

    pub fn authorize(&mut self, token: String) -> Result<()> {
        let payload = ControlPayload::Authorize(Authorize { token });
        self.send(ControlOpcode::Authorize, Some(&payload)).map(|_| ())
    }

    pub fn request_room_offer(&mut self, room_name: &str, username: &str) -> Result<()> {
        let payload = ControlPayload::RequestGetRoomOffer(RequestGetRoomOffer {
            room_name: room_name.to_string(),
            username: username.to_string(),
        });
        self.send(ControlOpcode::Request, Some(&payload)).map(|_| ())
    }

    pub fn post_answer(&mut self, sdp: String) -> Result<()> {
        let payload = ControlPayload::RequestPostAnswer(RequestPostAnswer { sdp });
        self.send(ControlOpcode::Request, Some(&payload)).map(|_| ())
    }

    pub fn send_heartbeat(&mut self) -> Result<()> {
        let id = self.send(ControlOpcode::Heartbeat, None)?;
        self.heartbeat.record_sent(id);
        Ok(())
    }

    pub fn observe_heartbeat(&mut self, id: u64) -> Option<Duration> {
        self.heartbeat.observe(id)
    }

    fn send(&mut self, opcode: ControlOpcode, payload: Option<&ControlPayload>) -> Result<u64> {
        let Some(link) = self.link.as_ref() else {
            return Err(RoomlinkError::Transport("control channel is not open".into()));
        };
        let (id, frame) = self.codec.encode(opcode, payload)?;
        link.send(frame)?;
        tracing::trace!(generation = self.generation, id, ?opcode, "control frame sent");
        Ok(id)
    }

    /// Socket closed by the peer. Returns whether a reconnect was scheduled.
    pub fn on_closed(&mut self, code: u16) -> bool {
        self.retire_socket();
        if self.terminal_close_codes.contains(&code) {
            self.state = ControlState::Closed;
            tracing::info!(generation = self.generation, code, "control closed, not reconnecting");
            return false;
        }
        tracing::warn!(generation = self.generation, code, "control closed");
        self.schedule_reconnect();
        true
    }

    /// Connect, send or socket failure. Always reconnects.
    pub fn on_failed(&mut self, reason: &str) {
        tracing::warn!(generation = self.generation, reason, "control failed");
        self.retire_socket();
        self.schedule_reconnect();
    }

    /// Whether a fired reconnect timer is still the one we armed.
    pub fn reconnect_due(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != ControlState::Reconnecting {
            return false;
        }
        self.reconnect = None;
        true
    }

    /// Forced close: no reconnect, late events from this socket are ignored.
    pub fn close(&mut self) {
        self.cancel_reconnect();
        self.drop_link();
        self.generation += 1;
        self.state = ControlState::Closed;
    }

    /// The socket is gone: queued heartbeats and late events for it go stale.
    fn retire_socket(&mut self) {
        self.drop_link();
        self.generation += 1;
    }

    fn schedule_reconnect(&mut self) {
        self.cancel_reconnect();
        self.state = ControlState::Reconnecting;

        let events = self.events.clone();
        let generation = self.generation;
        let delay = self.reconnect_delay;
        self.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::ReconnectDue { generation });
        }));
        tracing::info!(generation, ?delay, "control reconnect scheduled");
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.abort();
        }
    }

    fn drop_link(&mut self) {
        self.heartbeat.stop();
        if let Some(link) = self.link.take() {
            link.close();
        }
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.cancel_reconnect();
    }
}
