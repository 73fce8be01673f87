//! Session facade.
//!
//! [`Session`] is a cheap handle to a session loop running on its own task.
//! Commands are queued; outcomes are observed through [`SessionStatus`] and the
//! [`ClientStore`].

pub mod control;
pub mod driver;
pub mod data;
pub mod event;
pub mod heartbeat;
pub mod status;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use roomlink_core::error::{Result, RoomlinkError};

use self::driver::{Flow, SessionCore};
use self::event::Event;
use crate::config::ClientConfig;
use crate::infra::token_store::{FileTokenStore, TokenStore};
use crate::store::ClientStore;
use crate::transport::rtc::RtcConnector;
use crate::transport::ws::WsConnector;
use crate::transport::{ControlConnector, PeerConnector};

pub use self::status::SessionStatus;

#[derive(Clone)]
pub struct Session {
    events: mpsc::UnboundedSender<Event>,
    status: watch::Receiver<SessionStatus>,
    store: Arc<ClientStore>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Session {
    pub fn builder(config: ClientConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    fn post(&self, event: Event) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| RoomlinkError::Internal("session loop stopped".into()))
    }

    pub fn connect(&self, room_name: impl Into<String>, username: impl Into<String>) -> Result<()> {
        self.post(Event::Connect {
            room_name: room_name.into(),
            username: username.into(),
        })
    }

    pub fn disconnect(&self) -> Result<()> {
        self.post(Event::Disconnect)
    }

    /// Queue a chat message. Returns false (and sends nothing) unless ready.
    pub fn send_message(&self, content: impl Into<String>) -> bool {
        if !self.status.borrow().is_ready() {
            return false;
        }
        self.post(Event::SendMessage {
            content: content.into(),
        })
        .is_ok()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn store(&self) -> Arc<ClientStore> {
        self.store.clone()
    }

    /// Disconnect and wait for the loop to finish.
    pub async fn shutdown(&self) {
        let _ = self.post(Event::Shutdown);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

pub struct SessionBuilder {
    config: ClientConfig,
    control: Option<Arc<dyn ControlConnector>>,
    peer: Option<Arc<dyn PeerConnector>>,
    tokens: Option<Arc<dyn TokenStore>>,
}

impl SessionBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            control: None,
            peer: None,
            tokens: None,
        }
    }

    pub fn control_connector(mut self, connector: Arc<dyn ControlConnector>) -> Self {
        self.control = Some(connector);
        self
    }

    pub fn peer_connector(mut self, connector: Arc<dyn PeerConnector>) -> Self {
        self.peer = Some(connector);
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the loop state without spawning it.
    pub fn build_core(self) -> Result<(SessionCore, mpsc::UnboundedSender<Event>, mpsc::UnboundedReceiver<Event>)> {
        self.config.validate()?;

        let control = self.control.unwrap_or_else(|| Arc::new(WsConnector));
        let peer = self
            .peer
            .unwrap_or_else(|| Arc::new(RtcConnector::new(self.config.data.ice_servers.clone())));
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(FileTokenStore::new(self.config.session.token_path.clone())));

        let (tx, rx) = mpsc::unbounded_channel();
        let core = SessionCore::new(&self.config, control, peer, tokens, tx.clone())?;
        Ok((core, tx, rx))
    }

    /// Spawn the session loop on the current runtime.
    pub fn spawn(self) -> Result<Session> {
        let (mut core, events, mut rx) = self.build_core()?;
        let status = core.subscribe();
        let store = core.store();

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if core.handle(event).await == Flow::Stop {
                    break;
                }
            }
            tracing::debug!("session loop finished");
        });

        Ok(Session {
            events,
            status,
            store,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}
