//! Control channel over a binary WebSocket.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use roomlink_core::error::{Result, RoomlinkError};

use super::{ControlConnector, ControlLink};
use crate::session::event::ControlSink;

/// Close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Stream ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl ControlConnector for WsConnector {
    fn open(&self, url: &Url, sink: ControlSink) -> Box<dyn ControlLink> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url.to_string(), rx, sink));
        Box::new(WsLink { tx })
    }
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

struct WsLink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ControlLink for WsLink {
    fn send(&self, frame: Vec<u8>) -> Result<()> {
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| RoomlinkError::Transport("control socket is gone".into()))
    }

    fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

async fn run_socket(url: String, mut outbound: mpsc::UnboundedReceiver<Outbound>, sink: ControlSink) {
    let generation = sink.generation();

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            tracing::warn!(%url, generation, error = %e, "control connect failed");
            sink.failed(format!("connect {url}: {e}"));
            return;
        }
    };
    tracing::info!(%url, generation, "control socket open");
    sink.opened();

    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(bytes)) => {
                    if let Err(e) = ws_tx.send(Message::Binary(bytes)).await {
                        sink.failed(format!("send: {e}"));
                        return;
                    }
                }
                // Link closed or dropped by the session.
                Some(Outbound::Close) | None => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    };
                    let _ = ws_tx.send(Message::Close(Some(frame))).await;
                    return;
                }
            },

            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Binary(bytes))) => sink.frame(bytes),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map(|f| u16::from(f.code)).unwrap_or(CLOSE_NO_STATUS);
                    sink.closed(code);
                    return;
                }
                Some(Ok(Message::Text(_))) => {
                    tracing::trace!(generation, "ignoring text frame on binary channel");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.failed(e.to_string());
                    return;
                }
                None => {
                    sink.closed(CLOSE_ABNORMAL);
                    return;
                }
            },
        }
    }
}
