//! Room model: users, messages and the message-id ordering.
//!
//! Message ids are server snowflakes rendered as decimal strings. They exceed
//! the range of `f64` integers, so every comparison goes through
//! [`compare_ids`], which orders them as arbitrary-precision integers.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Presence of a user in the room (`0` offline, `1` online on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UserStatus {
    Offline,
    Online,
}

impl From<UserStatus> for u8 {
    fn from(status: UserStatus) -> Self {
        match status {
            UserStatus::Offline => 0,
            UserStatus::Online => 1,
        }
    }
}

impl TryFrom<u8> for UserStatus {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(UserStatus::Offline),
            1 => Ok(UserStatus::Online),
            other => Err(format!("unknown user status {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub status: UserStatus,
}

/// Numeric-string message id with arbitrary-precision ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_ids(&self.0, &other.0)
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The one ordering used for message ids.
///
/// Decimal ids compare by value. Ids that are not decimal sort after every
/// decimal id and compare lexicographically among themselves. Numerically
/// equal ids with different spellings ("07" vs "7") fall back to the raw
/// string so the ordering stays consistent with `Eq`.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (parse_id(a), parse_id(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_id(s: &str) -> Option<BigUint> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: String,
    pub content: String,
}

/// A run of consecutive messages by the same author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    /// Position of the run counted from the oldest run (0).
    pub ordinal: usize,
    pub author_id: String,
    /// Ascending by id.
    pub messages: Vec<Message>,
}

/// Sort messages by id and split them into same-author runs, newest run first.
pub fn group_by_author(messages: impl IntoIterator<Item = Message>) -> Vec<MessageGroup> {
    let mut sorted: Vec<Message> = messages.into_iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut groups: Vec<MessageGroup> = Vec::new();
    for message in sorted {
        match groups.last_mut() {
            Some(group) if group.author_id == message.author_id => group.messages.push(message),
            _ => groups.push(MessageGroup {
                ordinal: groups.len(),
                author_id: message.author_id.clone(),
                messages: vec![message],
            }),
        }
    }

    groups.reverse();
    groups
}
