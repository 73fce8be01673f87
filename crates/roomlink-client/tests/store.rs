#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use roomlink_client::store::{ClearState, ClientStore};
use roomlink_core::model::{Message, MessageId, User, UserStatus};

fn user(id: &str, name: &str, status: UserStatus) -> User {
    User {
        id: id.into(),
        username: name.into(),
        status,
    }
}

fn msg(id: &str, author: &str) -> Message {
    Message {
        id: MessageId::new(id),
        author_id: author.into(),
        content: format!("content {id}"),
    }
}

fn store() -> Arc<ClientStore> {
    Arc::new(ClientStore::new(Duration::from_secs(1)))
}

#[tokio::test(start_paused = true)]
async fn clear_is_debounced() {
    let store = store();
    store.upsert_user(user("1", "alice", UserStatus::Online));
    store.upsert_message(msg("10", "1"));

    store.clear();
    assert_eq!(store.clear_state(), ClearState::Clearing);
    assert_eq!(store.users().len(), 1);
    assert_eq!(store.message_count(), 1);

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(store.clear_state(), ClearState::Cleared);
    assert!(store.users().is_empty());
    assert_eq!(store.message_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_clear_restarts_the_delay() {
    let store = store();
    store.upsert_message(msg("1", "a"));

    store.clear();
    tokio::time::sleep(Duration::from_millis(600)).await;
    store.clear();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(store.message_count(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(store.message_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn snapshot_cancels_pending_clear() {
    let store = store();
    store.upsert_message(msg("1", "a"));
    store.clear();

    store.apply_snapshot("7".into(), vec![user("7", "me", UserStatus::Online)], vec![msg("2", "7")]);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(store.clear_state(), ClearState::Populated);
    let ids: Vec<String> = store.messages().into_iter().map(|m| m.id.to_string()).collect();
    assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn upserts_are_last_write_wins() {
    let store = store();
    store.upsert_user(user("1", "alice", UserStatus::Online));
    store.upsert_user(user("1", "alice", UserStatus::Offline));
    assert_eq!(store.users().len(), 1);
    assert_eq!(store.user("1").unwrap().status, UserStatus::Offline);

    store.upsert_message(msg("5", "1"));
    let mut edited = msg("5", "1");
    edited.content = "edited".into();
    store.upsert_message(edited);
    assert_eq!(store.message_count(), 1);
    assert_eq!(store.messages()[0].content, "edited");
}

#[tokio::test]
async fn presence_lists_exclude_self_and_sort_by_name() {
    let store = store();
    store.apply_snapshot(
        "6".into(),
        vec![
            user("1", "zoe", UserStatus::Online),
            user("2", "Bob", UserStatus::Online),
            user("3", "alice", UserStatus::Online),
            user("4", "carol", UserStatus::Offline),
            user("5", "Dave", UserStatus::Offline),
            user("6", "me", UserStatus::Online),
        ],
        vec![],
    );

    let online: Vec<String> = store.online_users().into_iter().map(|u| u.username).collect();
    assert_eq!(online, vec!["alice", "Bob", "zoe"]);

    let offline: Vec<String> = store.offline_users().into_iter().map(|u| u.username).collect();
    assert_eq!(offline, vec!["carol", "Dave"]);
}

#[tokio::test]
async fn grouped_view_uses_numeric_order() {
    let store = store();
    store.upsert_message(msg("10000000000000000000", "b"));
    store.upsert_message(msg("9999999999999999999", "a"));
    store.upsert_message(msg("9999999999999999998", "a"));

    let groups = store.grouped_by_author();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].author_id, "b");
    assert_eq!(groups[1].messages[0].id.as_str(), "9999999999999999998");
    assert_eq!(groups[1].messages[1].id.as_str(), "9999999999999999999");
}

#[tokio::test]
async fn revision_moves_on_mutation() {
    let store = store();
    let mut rev = store.subscribe();
    let before = *rev.borrow_and_update();

    store.upsert_user(user("1", "alice", UserStatus::Online));
    assert!(rev.has_changed().unwrap());
    assert!(*rev.borrow_and_update() > before);
}
