//! Session loop state: both channel managers, the store and the token.
//!
//! Every event goes through [`SessionCore::handle`], one at a time. Answer
//! generation is awaited inline so the loop never observes a half-built peer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::task::JoinHandle;
use url::Url;

use roomlink_core::error::{Result, ServerCode};
use roomlink_core::protocol::control::{ControlCodec, ControlEnvelope, ControlPayload};
use roomlink_core::protocol::data::{DataCodec, DataEnvelope, DataOpcode, DataPayload, RequestPostMessage};

use super::control::{ControlChannel, ControlState};
use super::data::{DataChannel, DataFailure};
use super::event::{Channel, ControlEvent, DataEvent, Event};
use super::status::SessionStatus;
use crate::config::{self, ClientConfig};
use crate::infra::token_store::TokenStore;
use crate::store::ClientStore;
use crate::transport::{ControlConnector, PeerConnector};

/// Whether the loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct SessionCore {
    control: ControlChannel,
    data: DataChannel,
    store: Arc<ClientStore>,
    tokens: Arc<dyn TokenStore>,
    endpoint: Url,
    status: watch::Sender<SessionStatus>,
    room_name: Option<String>,
    username: Option<String>,
    events: UnboundedSender<Event>,
    offer_retry_delay: Duration,
    offer_retry: Option<JoinHandle<()>>,
}

impl SessionCore {
    pub fn new(
        config: &ClientConfig,
        control: Arc<dyn ControlConnector>,
        peer: Arc<dyn PeerConnector>,
        tokens: Arc<dyn TokenStore>,
        events: UnboundedSender<Event>,
    ) -> Result<Self> {
        let endpoint = config::control_endpoint(&config.server.url)?;
        let (status, _) = watch::channel(SessionStatus::default());

        Ok(Self {
            control: ControlChannel::new(
                control,
                events.clone(),
                config.control_heartbeat(),
                config.reconnect_delay(),
                config.control.terminal_close_codes.clone(),
            ),
            data: DataChannel::new(peer, events.clone(), config.data_heartbeat()),
            store: Arc::new(ClientStore::new(config.clear_delay())),
            tokens,
            endpoint,
            status,
            room_name: None,
            username: None,
            events,
            offer_retry_delay: config.reconnect_delay(),
            offer_retry: None,
        })
    }

    pub fn store(&self) -> Arc<ClientStore> {
        self.store.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn data(&self) -> &DataChannel {
        &self.data
    }

    pub async fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Connect { room_name, username } => self.connect(room_name, username),
            Event::Disconnect => self.disconnect(),
            Event::SendMessage { content } => self.send_message(content),
            Event::Control { generation, event } => {
                if !self.control.is_current(generation) {
                    tracing::trace!(generation, "stale control event");
                    return Flow::Continue;
                }
                self.on_control(event).await;
            }
            Event::Data { generation, event } => self.on_data(generation, event),
            Event::HeartbeatDue { channel, generation } => self.heartbeat_due(channel, generation),
            Event::OfferRetryDue { generation } => {
                if self.control.is_current(generation) {
                    self.offer_retry = None;
                    self.request_room_offer();
                }
            }
            Event::ReconnectDue { generation } => {
                if self.control.reconnect_due(generation) {
                    self.control.open(&self.endpoint);
                }
            }
            Event::Shutdown => {
                self.disconnect();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn update(&self, f: impl FnOnce(&mut SessionStatus)) {
        self.status.send_modify(f);
    }

    fn connect(&mut self, room_name: String, username: String) {
        tracing::info!(room = %room_name, user = %username, "connect");

        // Replacing a live socket is a close: the old room's state goes.
        if self.control.state() != ControlState::Closed {
            self.store.clear();
        }
        self.cancel_offer_retry();
        self.data.force_close();
        self.room_name = Some(room_name);
        self.username = Some(username);
        self.update(|s| {
            s.room_name_confirmed = true;
            s.username_confirmed = true;
            s.control_open = false;
            s.data_open = false;
            s.control_ping = None;
            s.data_ping = None;
            s.error = None;
        });
        self.control.open(&self.endpoint);
    }

    fn disconnect(&mut self) {
        tracing::info!("disconnect");

        self.cancel_offer_retry();
        self.data.force_close();
        self.control.close();
        self.store.clear();
        self.update(|s| {
            s.control_open = false;
            s.data_open = false;
            s.control_ping = None;
            s.data_ping = None;
            s.username_confirmed = false;
        });
    }

    fn send_message(&mut self, content: String) {
        if !self.status.borrow().is_ready() {
            tracing::debug!("not ready, message dropped");
            return;
        }
        let payload = DataPayload::RequestPostMessage(RequestPostMessage { content });
        if let Err(e) = self.data.send(DataOpcode::Request, Some(&payload)) {
            tracing::warn!(error = %e, "message send failed");
            let generation = self.data.generation();
            self.data_down(generation);
        }
    }

    async fn on_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Opened => {
                self.control.on_opened();
                self.update(|s| s.control_open = true);

                let token = match self.tokens.load() {
                    Ok(token) => token.unwrap_or_default(),
                    Err(e) => {
                        tracing::warn!(error = %e, "token load failed, authorizing without one");
                        String::new()
                    }
                };
                if let Err(e) = self.control.authorize(token) {
                    self.control_down(None, &e.to_string());
                }
            }
            ControlEvent::Frame(bytes) => match ControlCodec::decode(&bytes) {
                Ok(env) => self.on_control_envelope(env).await,
                Err(e) => tracing::warn!(error = %e, class = e.class().as_str(), "dropping control frame"),
            },
            ControlEvent::Closed { code } => self.control_down(Some(code), "closed"),
            ControlEvent::Failed(reason) => self.control_down(None, &reason),
        }
    }

    async fn on_control_envelope(&mut self, env: ControlEnvelope) {
        let Some(payload) = env.payload else {
            if let Some(rtt) = self.control.observe_heartbeat(env.id) {
                self.update(|s| s.control_ping = Some(rtt));
            }
            return;
        };

        match payload {
            ControlPayload::ResponseSession(session) => {
                if let Err(e) = self.tokens.save(&session.token) {
                    tracing::warn!(error = %e, "token save failed");
                }
                self.control.on_session();
                tracing::info!(generation = self.control.generation(), "control authenticated");
                self.request_room_offer();
            }
            ControlPayload::ResponseRoomOffer(offer) => {
                tracing::info!(connection_id = %offer.connection_id, "room offer received");
                self.cancel_offer_retry();
                if self.data.is_open() {
                    self.data_not_open();
                }
                match self.data.accept_offer(offer.sdp).await {
                    Ok(answer) => {
                        if let Err(e) = self.control.post_answer(answer) {
                            self.control_down(None, &e.to_string());
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, class = e.class().as_str(), "offer rejected");
                        self.data_not_open();
                        self.schedule_offer_retry();
                    }
                }
            }
            ControlPayload::Response(resp) => self.server_error(resp.code, &resp.message),
            other => tracing::debug!(type_code = other.type_code(), "unexpected control payload"),
        }
    }

    fn server_error(&mut self, code: u32, message: &str) {
        let Some(condition) = ServerCode::from_code(code) else {
            tracing::warn!(code, message, "unknown server code");
            return;
        };

        if !condition.is_session_fatal() {
            tracing::warn!(code, "server rejected request");
            self.update(|s| s.error = Some(condition));
            return;
        }

        tracing::error!(code, reason = condition.user_message(), "server rejected session");
        self.update(|s| {
            s.error = Some(condition);
            if condition.invalidates_room_name() {
                s.room_name_confirmed = false;
            }
        });
        self.disconnect();
    }

    /// Control socket lost: everything hanging off it goes too.
    fn control_down(&mut self, code: Option<u16>, reason: &str) {
        self.cancel_offer_retry();
        self.data.force_close();
        self.store.clear();
        self.update(|s| {
            s.control_open = false;
            s.data_open = false;
            s.control_ping = None;
            s.data_ping = None;
        });

        match code {
            Some(code) => {
                self.control.on_closed(code);
            }
            None => self.control.on_failed(reason),
        }
    }

    fn request_room_offer(&mut self) {
        if !self.control.is_authenticated() {
            tracing::debug!("control not authenticated, offer request deferred");
            return;
        }
        let (Some(room_name), Some(username)) = (self.room_name.clone(), self.username.clone()) else {
            return;
        };
        if let Err(e) = self.control.request_room_offer(&room_name, &username) {
            self.control_down(None, &e.to_string());
        }
    }

    fn on_data(&mut self, generation: u64, event: DataEvent) {
        match event {
            DataEvent::ChannelOpened => {
                if self.data.on_channel_opened(generation) {
                    self.update(|s| s.data_open = true);
                }
            }
            DataEvent::Frame(bytes) => {
                if !self.data.is_current(generation) {
                    return;
                }
                match DataCodec::decode(&bytes) {
                    Ok(env) => self.on_data_envelope(env),
                    Err(e) => tracing::warn!(error = %e, class = e.class().as_str(), "dropping data frame"),
                }
            }
            DataEvent::ChannelClosed => self.data_down(generation),
            DataEvent::ChannelError(reason) => {
                tracing::warn!(generation, reason, "data channel error");
                self.data_down(generation);
            }
            DataEvent::PeerState(state) if state.is_failure() => self.data_down(generation),
            DataEvent::PeerState(state) => tracing::trace!(generation, ?state, "peer state"),
        }
    }

    fn on_data_envelope(&mut self, env: DataEnvelope) {
        let Some(payload) = env.payload else {
            if let Some(rtt) = self.data.observe_heartbeat(env.id) {
                self.update(|s| s.data_ping = Some(rtt));
            }
            return;
        };

        match payload {
            DataPayload::Hello(hello) => {
                tracing::info!(
                    user_id = %hello.user_id,
                    users = hello.users.len(),
                    messages = hello.messages.len(),
                    "hello snapshot"
                );
                self.store.apply_snapshot(hello.user_id, hello.users, hello.messages);
            }
            DataPayload::DispatchUserUpdate(update) => self.store.upsert_user(update.user),
            DataPayload::DispatchMessageUpdate(update) => self.store.upsert_message(update.message),
            DataPayload::Response(resp) => match ServerCode::from_code(resp.code) {
                Some(condition) => {
                    tracing::warn!(code = resp.code, "message rejected");
                    self.update(|s| s.error = Some(condition));
                }
                None => tracing::debug!(code = resp.code, "data response"),
            },
            other => tracing::debug!(type_code = other.type_code(), "unexpected data payload"),
        }
    }

    fn data_down(&mut self, generation: u64) {
        match self.data.on_failure(generation) {
            DataFailure::Ignored => {}
            DataFailure::Forced => self.update(|s| s.data_open = false),
            DataFailure::Resignal => {
                self.data_not_open();
                self.request_room_offer();
            }
        }
    }

    fn data_not_open(&mut self) {
        self.update(|s| {
            s.data_open = false;
            s.data_ping = None;
        });
        self.store.clear();
    }

    /// Ask for a fresh offer after the usual delay, on this control socket only.
    fn schedule_offer_retry(&mut self) {
        self.cancel_offer_retry();

        let events = self.events.clone();
        let generation = self.control.generation();
        let delay = self.offer_retry_delay;
        self.offer_retry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::OfferRetryDue { generation });
        }));
        tracing::info!(generation, ?delay, "offer re-request scheduled");
    }

    fn cancel_offer_retry(&mut self) {
        if let Some(timer) = self.offer_retry.take() {
            timer.abort();
        }
    }

    fn heartbeat_due(&mut self, channel: Channel, generation: u64) {
        match channel {
            Channel::Control => {
                if !self.control.is_current(generation) {
                    return;
                }
                if let Err(e) = self.control.send_heartbeat() {
                    self.control_down(None, &e.to_string());
                }
            }
            Channel::Data => {
                if !self.data.is_current(generation) {
                    return;
                }
                if let Err(e) = self.data.send_heartbeat() {
                    tracing::warn!(error = %e, "data heartbeat failed");
                    self.data_down(generation);
                }
            }
        }
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        self.cancel_offer_retry();
    }
}
