#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use roomlink_client::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
control:
  reconnect_delay_ms: 1000
  reconect_delay_ms: 5 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.url, "ws://127.0.0.1:8080");
    assert_eq!(cfg.reconnect_delay(), Duration::from_secs(1));
    assert_eq!(cfg.control_heartbeat(), Duration::from_secs(30));
    assert_eq!(cfg.data_heartbeat(), Duration::from_secs(5));
    assert_eq!(cfg.clear_delay(), Duration::from_secs(1));
    assert_eq!(cfg.control.terminal_close_codes, vec![1000, 1005]);
    assert_eq!(cfg.data.ice_servers, vec!["stun:stun.l.google.com:19302".to_string()]);
}

#[test]
fn debug_switches_both_heartbeats_to_fast() {
    let cfg = config::load_from_str("version: 1\ndebug: true\n").unwrap();
    assert_eq!(cfg.control_heartbeat(), Duration::from_secs(1));
    assert_eq!(cfg.data_heartbeat(), Duration::from_secs(1));
}

#[test]
fn unsupported_version_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.class().as_str(), "CONFIG");
}

#[test]
fn out_of_range_values_are_rejected() {
    let cases = [
        "version: 1\ncontrol: { heartbeat_interval_ms: 10 }\n",
        "version: 1\ncontrol: { reconnect_delay_ms: 0 }\n",
        "version: 1\ncontrol: { terminal_close_codes: [42] }\n",
        "version: 1\ndata: { ice_servers: [\"http://stun.example\"] }\n",
        "version: 1\nserver: { url: \"ftp://example.com\" }\n",
        "version: 1\nsession: { token_path: \"  \" }\n",
    ];
    for case in cases {
        assert!(config::load_from_str(case).is_err(), "accepted: {case}");
    }
}

#[test]
fn endpoint_is_derived_from_server_url() {
    let cfg = config::load_from_str("version: 1\nserver: { url: \"https://chat.example.com\" }\n").unwrap();
    let url = config::control_endpoint(&cfg.server.url).unwrap();
    assert_eq!(url.as_str(), "wss://chat.example.com/ws?encoding=messagePack");
}
