//! Data channel over a WebRTC peer connection (answerer side).
//!
//! The server offers; we answer once ICE gathering is complete so the answer
//! SDP already carries every local candidate. No trickle ICE.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use roomlink_core::error::{Result, RoomlinkError};

use super::{PeerConnector, PeerLink};
use crate::session::event::{DataSink, PeerState};

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

#[derive(Debug, Clone)]
pub struct RtcConnector {
    ice_servers: Vec<String>,
}

impl RtcConnector {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PeerConnector for RtcConnector {
    async fn accept_offer(
        &self,
        offer_sdp: String,
        sink: DataSink,
    ) -> Result<(Box<dyn PeerLink>, String)> {
        let api = build_api()?;
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        let peer = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await
            .map_err(negotiation)?,
        );

        let slot: ChannelSlot = Arc::default();
        attach_handlers(&peer, &slot, &sink);

        let answer = match answer_offer(&peer, offer_sdp).await {
            Ok(answer) => answer,
            Err(e) => {
                let _ = peer.close().await;
                return Err(e);
            }
        };

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(slot, out_rx));

        tracing::debug!(generation = sink.generation(), "answer ready");
        Ok((
            Box::new(RtcLink {
                peer,
                out_tx,
                writer,
            }),
            answer,
        ))
    }
}

fn build_api() -> Result<API> {
    let mut media_engine = MediaEngine::default();
    let registry =
        register_default_interceptors(Registry::new(), &mut media_engine).map_err(negotiation)?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

fn attach_handlers(peer: &Arc<RTCPeerConnection>, slot: &ChannelSlot, sink: &DataSink) {
    let state_sink = sink.clone();
    peer.on_peer_connection_state_change(Box::new(move |state| {
        let sink = state_sink.clone();
        Box::pin(async move {
            tracing::debug!(generation = sink.generation(), ?state, "peer state changed");
            sink.peer_state(peer_state(state));
        })
    }));

    let dc_sink = sink.clone();
    let dc_slot = slot.clone();
    peer.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
        let sink = dc_sink.clone();
        let slot = dc_slot.clone();
        Box::pin(async move {
            tracing::debug!(generation = sink.generation(), label = dc.label(), "data channel announced");
            *slot.lock() = Some(dc.clone());

            let open_sink = sink.clone();
            dc.on_open(Box::new(move || {
                let sink = open_sink.clone();
                Box::pin(async move {
                    sink.channel_opened();
                })
            }));

            let msg_sink = sink.clone();
            dc.on_message(Box::new(move |msg: DataChannelMessage| {
                let sink = msg_sink.clone();
                Box::pin(async move {
                    sink.frame(msg.data.to_vec());
                })
            }));

            let close_sink = sink.clone();
            dc.on_close(Box::new(move || {
                let sink = close_sink.clone();
                Box::pin(async move {
                    sink.channel_closed();
                })
            }));

            let err_sink = sink.clone();
            dc.on_error(Box::new(move |err| {
                let sink = err_sink.clone();
                Box::pin(async move {
                    sink.channel_error(err.to_string());
                })
            }));
        })
    }));
}

async fn answer_offer(peer: &Arc<RTCPeerConnection>, offer_sdp: String) -> Result<String> {
    let offer = RTCSessionDescription::offer(offer_sdp).map_err(negotiation)?;
    peer.set_remote_description(offer).await.map_err(negotiation)?;

    let answer = peer.create_answer(None).await.map_err(negotiation)?;
    let mut gathered = peer.gathering_complete_promise().await;
    peer.set_local_description(answer).await.map_err(negotiation)?;
    let _ = gathered.recv().await;

    let local = peer
        .local_description()
        .await
        .ok_or_else(|| RoomlinkError::Negotiation("missing local description".into()))?;
    Ok(local.sdp)
}

async fn write_loop(slot: ChannelSlot, mut out_rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = out_rx.recv().await {
        let announced = slot.lock().clone();
        let Some(dc) = announced else {
            tracing::trace!("dropping frame, data channel not announced yet");
            continue;
        };
        if let Err(e) = dc.send(&Bytes::from(frame)).await {
            tracing::warn!(error = %e, "data channel send failed");
        }
    }
}

struct RtcLink {
    peer: Arc<RTCPeerConnection>,
    out_tx: mpsc::UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
}

impl PeerLink for RtcLink {
    fn send(&self, frame: Vec<u8>) -> Result<()> {
        self.out_tx
            .send(frame)
            .map_err(|_| RoomlinkError::Transport("data channel writer is gone".into()))
    }

    fn close(&self) {
        self.writer.abort();
        let peer = self.peer.clone();
        tokio::spawn(async move {
            if let Err(e) = peer.close().await {
                tracing::debug!(error = %e, "peer close failed");
            }
        });
    }
}

impl Drop for RtcLink {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

fn peer_state(state: RTCPeerConnectionState) -> PeerState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => PeerState::New,
        RTCPeerConnectionState::Connecting => PeerState::Connecting,
        RTCPeerConnectionState::Connected => PeerState::Connected,
        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
        RTCPeerConnectionState::Failed => PeerState::Failed,
        RTCPeerConnectionState::Closed => PeerState::Closed,
    }
}

fn negotiation<E: std::fmt::Display>(err: E) -> RoomlinkError {
    RoomlinkError::Negotiation(err.to_string())
}
