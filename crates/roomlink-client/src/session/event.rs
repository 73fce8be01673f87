//! Events fed into the session loop.
//!
//! Transports, timers and the facade never touch session state directly; they
//! post an [`Event`] and the loop handles it. Transport events carry the
//! generation of the instance that produced them so late events from a torn
//! down socket or peer are recognised and dropped.

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Control,
    Data,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Control => "control",
            Channel::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect { room_name: String, username: String },
    Disconnect,
    SendMessage { content: String },
    Control { generation: u64, event: ControlEvent },
    Data { generation: u64, event: DataEvent },
    HeartbeatDue { channel: Channel, generation: u64 },
    ReconnectDue { generation: u64 },
    /// Re-request a room offer after a failed negotiation; `generation` is the
    /// control socket the retry belongs to.
    OfferRetryDue { generation: u64 },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Opened,
    Frame(Vec<u8>),
    /// Socket closed; `1005` when the peer sent no code, `1006` when the
    /// stream ended without a close frame.
    Closed { code: u16 },
    /// Connect or I/O failure.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    ChannelOpened,
    Frame(Vec<u8>),
    ChannelClosed,
    ChannelError(String),
    PeerState(PeerState),
}

/// Peer connection state as reported by the WebRTC stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerState {
    /// States that count as a data channel failure.
    pub fn is_failure(self) -> bool {
        matches!(self, PeerState::Disconnected | PeerState::Failed)
    }
}

/// Handle given to a control transport to report what happens on its socket.
#[derive(Debug, Clone)]
pub struct ControlSink {
    tx: UnboundedSender<Event>,
    generation: u64,
}

impl ControlSink {
    pub fn new(tx: UnboundedSender<Event>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: ControlEvent) {
        let _ = self.tx.send(Event::Control {
            generation: self.generation,
            event,
        });
    }

    pub fn opened(&self) {
        self.emit(ControlEvent::Opened);
    }

    pub fn frame(&self, bytes: Vec<u8>) {
        self.emit(ControlEvent::Frame(bytes));
    }

    pub fn closed(&self, code: u16) {
        self.emit(ControlEvent::Closed { code });
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(ControlEvent::Failed(reason.into()));
    }
}

/// Handle given to a peer transport.
#[derive(Debug, Clone)]
pub struct DataSink {
    tx: UnboundedSender<Event>,
    generation: u64,
}

impl DataSink {
    pub fn new(tx: UnboundedSender<Event>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: DataEvent) {
        let _ = self.tx.send(Event::Data {
            generation: self.generation,
            event,
        });
    }

    pub fn channel_opened(&self) {
        self.emit(DataEvent::ChannelOpened);
    }

    pub fn frame(&self, bytes: Vec<u8>) {
        self.emit(DataEvent::Frame(bytes));
    }

    pub fn channel_closed(&self) {
        self.emit(DataEvent::ChannelClosed);
    }

    pub fn channel_error(&self, reason: impl Into<String>) {
        self.emit(DataEvent::ChannelError(reason.into()));
    }

    pub fn peer_state(&self, state: PeerState) {
        self.emit(DataEvent::PeerState(state));
    }
}
