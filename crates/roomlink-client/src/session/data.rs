//! Data channel manager.
//!
//! At most one peer is live. Each accepted offer gets a new generation; events
//! carrying an older generation belong to a torn down peer and are ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use roomlink_core::error::{Result, RoomlinkError};
use roomlink_core::protocol::data::{DataCodec, DataOpcode, DataPayload};

use super::event::{Channel, DataSink, Event};
use super::heartbeat::HeartbeatMonitor;
use crate::transport::{PeerConnector, PeerLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Idle,
    Negotiating,
    Open,
    Closed { forced: bool },
}

/// What the session should do about a close or failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFailure {
    /// Stale or duplicate report.
    Ignored,
    /// We closed it ourselves; nothing to recover.
    Forced,
    /// Unexpected loss; re-signal through the control channel.
    Resignal,
}

pub struct DataChannel {
    connector: Arc<dyn PeerConnector>,
    events: UnboundedSender<Event>,
    state: DataState,
    generation: u64,
    link: Option<Box<dyn PeerLink>>,
    codec: DataCodec,
    heartbeat: HeartbeatMonitor,
}

impl DataChannel {
    pub fn new(
        connector: Arc<dyn PeerConnector>,
        events: UnboundedSender<Event>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            connector,
            events,
            state: DataState::Idle,
            generation: 0,
            link: None,
            codec: DataCodec::new(),
            heartbeat: HeartbeatMonitor::new(Channel::Data, heartbeat_interval),
        }
    }

    pub fn state(&self) -> DataState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn is_open(&self) -> bool {
        self.state == DataState::Open
    }

    pub fn has_peer(&self) -> bool {
        self.link.is_some()
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    /// Replace any live peer with one answering `offer_sdp`.
    ///
    /// Returns the local answer SDP.
    pub async fn accept_offer(&mut self, offer_sdp: String) -> Result<String> {
        self.drop_link();
        self.generation += 1;
        self.codec = DataCodec::new();
        self.state = DataState::Negotiating;

        let sink = DataSink::new(self.events.clone(), self.generation);
        match self.connector.accept_offer(offer_sdp, sink).await {
            Ok((link, answer)) => {
                self.link = Some(link);
                tracing::info!(generation = self.generation, "data channel negotiating");
                Ok(answer)
            }
            Err(e) => {
                self.generation += 1;
                self.state = DataState::Closed { forced: false };
                Err(e)
            }
        }
    }

    /// Channel reported open. Returns true when this moved us to `Open`.
    pub fn on_channel_opened(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) || self.state != DataState::Negotiating {
            return false;
        }
        self.state = DataState::Open;
        self.heartbeat.start(self.events.clone(), self.generation);
        tracing::info!(generation, "data channel open");
        true
    }

    /// Channel closed or errored, or the peer connection failed.
    pub fn on_failure(&mut self, generation: u64) -> DataFailure {
        if !self.is_current(generation) {
            return DataFailure::Ignored;
        }
        match self.state {
            DataState::Closed { forced: true } => {
                self.state = DataState::Idle;
                DataFailure::Forced
            }
            DataState::Negotiating | DataState::Open => {
                self.drop_link();
                // Later reports from the same peer are duplicates.
                self.generation += 1;
                self.state = DataState::Closed { forced: false };
                tracing::warn!(generation, "data channel lost");
                DataFailure::Resignal
            }
            DataState::Idle | DataState::Closed { forced: false } => DataFailure::Ignored,
        }
    }

    /// Tear down without recovery.
    pub fn force_close(&mut self) {
        if self.link.is_none() {
            self.state = DataState::Idle;
            return;
        }
        self.drop_link();
        self.state = DataState::Closed { forced: true };
        tracing::debug!(generation = self.generation, "data channel closed by us");
    }

    /// Send if open. Returns the envelope id, or `None` when not open.
    pub fn send(&mut self, opcode: DataOpcode, payload: Option<&DataPayload>) -> Result<Option<u64>> {
        if self.state != DataState::Open {
            return Ok(None);
        }
        let Some(link) = self.link.as_ref() else {
            return Err(RoomlinkError::Transport("data channel has no peer".into()));
        };
        let (id, frame) = self.codec.encode(opcode, payload)?;
        link.send(frame)?;
        Ok(Some(id))
    }

    pub fn send_heartbeat(&mut self) -> Result<()> {
        if let Some(id) = self.send(DataOpcode::Heartbeat, None)? {
            self.heartbeat.record_sent(id);
        }
        Ok(())
    }

    pub fn observe_heartbeat(&mut self, id: u64) -> Option<Duration> {
        self.heartbeat.observe(id)
    }

    fn drop_link(&mut self) {
        self.heartbeat.stop();
        if let Some(link) = self.link.take() {
            link.close();
        }
    }
}
