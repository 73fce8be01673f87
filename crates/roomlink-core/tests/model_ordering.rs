#![allow(clippy::unwrap_used)]

use std::cmp::Ordering;

use roomlink_core::model::{compare_ids, group_by_author, Message, MessageId};

fn msg(id: &str, author: &str) -> Message {
    Message {
        id: MessageId::new(id),
        author_id: author.into(),
        content: format!("m{id}"),
    }
}

#[test]
fn ids_compare_numerically_not_lexically() {
    assert_eq!(compare_ids("9", "10"), Ordering::Less);
    assert_eq!(compare_ids("100", "20"), Ordering::Greater);
    assert_eq!(compare_ids("42", "42"), Ordering::Equal);
}

#[test]
fn ids_beyond_float_precision_stay_distinct() {
    // 2^53 + 1 and 2^53 collapse to the same f64.
    assert_eq!(compare_ids("9007199254740993", "9007199254740992"), Ordering::Greater);
    assert_eq!(
        compare_ids("340282366920938463463374607431768211457", "18446744073709551616"),
        Ordering::Greater
    );
}

#[test]
fn non_numeric_ids_sort_last() {
    assert_eq!(compare_ids("abc", "1"), Ordering::Greater);
    assert_eq!(compare_ids("", "0"), Ordering::Greater);
    assert_eq!(compare_ids("b", "a"), Ordering::Greater);
}

#[test]
fn leading_zeros_do_not_break_total_order() {
    assert_eq!(compare_ids("007", "7"), Ordering::Less);
    assert_eq!(compare_ids("007", "8"), Ordering::Less);
}

#[test]
fn groups_runs_by_author_newest_first() {
    let groups = group_by_author(vec![
        msg("5", "b"),
        msg("1", "a"),
        msg("3", "b"),
        msg("2", "a"),
        msg("4", "b"),
        msg("10", "a"),
    ]);

    assert_eq!(groups.len(), 3);

    assert_eq!(groups[0].author_id, "a");
    assert_eq!(groups[0].ordinal, 2);
    assert_eq!(groups[0].messages.len(), 1);
    assert_eq!(groups[0].messages[0].id.as_str(), "10");

    assert_eq!(groups[1].author_id, "b");
    let ids: Vec<&str> = groups[1].messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4", "5"]);

    assert_eq!(groups[2].author_id, "a");
    assert_eq!(groups[2].ordinal, 0);
}

#[test]
fn empty_input_has_no_groups() {
    assert!(group_by_author(Vec::new()).is_empty());
}
