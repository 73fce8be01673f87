//! In-memory room state: users, messages and the local user id.
//!
//! Writes come from the session loop only. Reads may happen from any task;
//! `subscribe()` hands out a revision counter that moves on every mutation so
//! a presentation layer can re-render without polling.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use roomlink_core::model::{group_by_author, Message, MessageGroup, MessageId, User, UserStatus};

/// Where the store is in its clear cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearState {
    Populated,
    /// A clear was requested; contents are still readable until the delay elapses.
    Clearing,
    Cleared,
}

#[derive(Debug, Default)]
struct ClearGate {
    generation: u64,
    pending: bool,
}

pub struct ClientStore {
    users: DashMap<String, User>,
    messages: DashMap<MessageId, Message>,
    user_id: RwLock<Option<String>>,
    gate: Mutex<ClearGate>,
    clear_delay: Duration,
    revision: watch::Sender<u64>,
}

impl ClientStore {
    pub fn new(clear_delay: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            users: DashMap::new(),
            messages: DashMap::new(),
            user_id: RwLock::new(None),
            gate: Mutex::new(ClearGate::default()),
            clear_delay,
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn upsert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
        self.bump();
    }

    pub fn upsert_message(&self, message: Message) {
        self.messages.insert(message.id.clone(), message);
        self.bump();
    }

    /// Replace everything with an authoritative snapshot.
    ///
    /// Cancels a pending clear so the snapshot survives it.
    pub fn apply_snapshot(&self, user_id: String, users: Vec<User>, messages: Vec<Message>) {
        let mut gate = self.gate.lock();
        gate.generation += 1;
        gate.pending = false;

        *self.user_id.write() = Some(user_id);
        self.users.clear();
        self.messages.clear();
        for user in users {
            self.users.insert(user.id.clone(), user);
        }
        for message in messages {
            self.messages.insert(message.id.clone(), message);
        }
        drop(gate);

        self.bump();
    }

    /// Request a debounced clear.
    ///
    /// Contents stay readable for `clear_delay`; a later request restarts the
    /// delay. The local user id is kept.
    pub fn clear(self: &Arc<Self>) {
        let generation = {
            let mut gate = self.gate.lock();
            gate.generation += 1;
            gate.pending = true;
            gate.generation
        };
        self.bump();

        let store: Weak<Self> = Arc::downgrade(self);
        let delay = self.clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(store) = store.upgrade() {
                store.finish_clear(generation);
            }
        });
    }

    fn finish_clear(&self, generation: u64) {
        let mut gate = self.gate.lock();
        if gate.generation != generation || !gate.pending {
            return;
        }
        gate.pending = false;
        self.users.clear();
        self.messages.clear();
        drop(gate);

        tracing::debug!("store cleared");
        self.bump();
    }

    pub fn clear_state(&self) -> ClearState {
        if self.gate.lock().pending {
            ClearState::Clearing
        } else if self.users.is_empty() && self.messages.is_empty() {
            ClearState::Cleared
        } else {
            ClearState::Populated
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    pub fn users(&self) -> Vec<User> {
        self.users.iter().map(|u| u.value().clone()).collect()
    }

    /// Messages in ascending id order.
    pub fn messages(&self) -> Vec<Message> {
        let mut out: Vec<Message> = self.messages.iter().map(|m| m.value().clone()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn grouped_by_author(&self) -> Vec<MessageGroup> {
        group_by_author(self.messages.iter().map(|m| m.value().clone()))
    }

    pub fn online_users(&self) -> Vec<User> {
        self.users_with(UserStatus::Online)
    }

    pub fn offline_users(&self) -> Vec<User> {
        self.users_with(UserStatus::Offline)
    }

    fn users_with(&self, status: UserStatus) -> Vec<User> {
        let me = self.user_id();
        let mut out: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.status == status && Some(&u.id) != me.as_ref())
            .map(|u| u.value().clone())
            .collect();

        out.sort_by_cached_key(|u| (u.username.to_lowercase(), u.username.clone(), u.id.clone()));
        out
    }
}
