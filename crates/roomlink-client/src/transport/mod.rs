//! Transport seams.
//!
//! The session loop talks to sockets only through these traits. Real
//! implementations live in [`ws`] (control channel) and [`rtc`] (data channel);
//! tests plug in in-process fakes.

pub mod rtc;
pub mod ws;

use async_trait::async_trait;
use url::Url;

use roomlink_core::error::Result;

use crate::session::event::{ControlSink, DataSink};

/// Opens control channel sockets.
pub trait ControlConnector: Send + Sync {
    /// Start connecting without blocking.
    ///
    /// The outcome is reported through `sink` (`Opened`, then frames, then
    /// `Closed` or `Failed`).
    fn open(&self, url: &Url, sink: ControlSink) -> Box<dyn ControlLink>;
}

/// Write side of one control socket.
pub trait ControlLink: Send {
    fn send(&self, frame: Vec<u8>) -> Result<()>;
    fn close(&self);
}

/// Answers data channel offers.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    /// Create a peer for `offer_sdp` and return it with the local answer SDP.
    async fn accept_offer(
        &self,
        offer_sdp: String,
        sink: DataSink,
    ) -> Result<(Box<dyn PeerLink>, String)>;
}

/// Write side of one peer connection and its data channel.
pub trait PeerLink: Send {
    fn send(&self, frame: Vec<u8>) -> Result<()>;
    fn close(&self);
}
