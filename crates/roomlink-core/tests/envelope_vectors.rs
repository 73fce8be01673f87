//! Envelope codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use roomlink_core::model::UserStatus;
use roomlink_core::protocol::control::{
    Authorize, ControlCodec, ControlOpcode, ControlPayload, RequestGetRoomOffer,
};
use roomlink_core::protocol::data::{DataCodec, DataOpcode, DataPayload, RequestPostMessage};
use roomlink_core::RoomlinkError;

mod vector_loader;
use vector_loader::{load, TestVector};

fn check<T>(
    v: &TestVector,
    res: Result<T, RoomlinkError>,
    fields: impl Fn(&T) -> (u64, u8, Option<u8>),
) {
    if let Some(err) = &v.expect_error {
        let e = res.err().expect("expected error");
        assert_eq!(e.class().as_str(), err.code, "vector={}", v.description);
        return;
    }

    let env = res.expect("expected ok envelope");
    let ex = v.expect.as_ref().expect("missing expect block");
    let (id, opcode, payload_type) = fields(&env);

    assert_eq!(id, ex["id"].as_u64().unwrap(), "vector={}", v.description);
    assert_eq!(opcode as u64, ex["opcode"].as_u64().unwrap(), "vector={}", v.description);
    assert_eq!(
        payload_type.map(u64::from),
        ex["payload_type"].as_u64(),
        "vector={}",
        v.description
    );
}

#[test]
fn control_vectors() {
    let files = [
        "control_heartbeat_echo.json",
        "control_response_session.json",
        "control_room_offer.json",
        "control_error_response.json",
        "control_nil_payload.json",
        "control_unknown_opcode.json",
        "control_missing_id.json",
        "control_unknown_payload.json",
        "control_not_a_map.json",
    ];

    for f in files {
        let v = load(f);
        let res = ControlCodec::decode(&v.frame.decode());
        check(&v, res, |env| {
            (env.id, env.opcode.into(), env.payload.as_ref().map(ControlPayload::type_code))
        });
    }
}

#[test]
fn data_vectors() {
    let files = [
        "data_hello.json",
        "data_dispatch_user.json",
        "data_dispatch_message.json",
        "data_bad_status.json",
        "data_unknown_opcode.json",
    ];

    for f in files {
        let v = load(f);
        let res = DataCodec::decode(&v.frame.decode());
        check(&v, res, |env| {
            (env.id, env.opcode.into(), env.payload.as_ref().map(DataPayload::type_code))
        });
    }
}

#[test]
fn hello_keeps_snowflake_ids_as_strings() {
    let v = load("data_hello.json");
    let env = DataCodec::decode(&v.frame.decode()).unwrap();

    let Some(DataPayload::Hello(hello)) = env.payload else {
        panic!("expected hello payload");
    };
    assert_eq!(hello.user_id, "1");
    assert_eq!(hello.users[0].status, UserStatus::Online);
    assert_eq!(hello.messages[0].id.as_str(), "18446744073709551617");
}

#[test]
fn error_response_carries_code_and_message() {
    let v = load("control_error_response.json");
    let env = ControlCodec::decode(&v.frame.decode()).unwrap();

    assert_eq!(env.opcode, ControlOpcode::Error);
    let Some(ControlPayload::Response(resp)) = env.payload else {
        panic!("expected response payload");
    };
    assert_eq!(resp.code, 4001);
    assert_eq!(resp.message, "taken");
}

#[test]
fn truncated_frame_is_malformed() {
    let raw = hex::decode("83a16900a16f02a170").unwrap();
    let err = ControlCodec::decode(&raw).unwrap_err();
    assert!(matches!(err, RoomlinkError::MalformedEnvelope(_)));
}

#[test]
fn empty_token_authorize_matches_wire_bytes() {
    let mut codec = ControlCodec::new();
    let payload = ControlPayload::Authorize(Authorize { token: String::new() });
    let (id, bytes) = codec.encode(ControlOpcode::Authorize, Some(&payload)).unwrap();

    assert_eq!(id, 0);
    assert_eq!(hex::encode(bytes), "83a16900a16f04a17082a1741ea5746f6b656ea0");
}

#[test]
fn ids_increase_per_encode_and_heartbeat_has_no_payload() {
    let mut codec = ControlCodec::new();
    let offer = ControlPayload::RequestGetRoomOffer(RequestGetRoomOffer {
        room_name: "lobby".into(),
        username: "alice".into(),
    });

    let (first, _) = codec
        .encode(ControlOpcode::Authorize, Some(&ControlPayload::Authorize(Authorize { token: "t".into() })))
        .unwrap();
    let (second, bytes) = codec.encode(ControlOpcode::Request, Some(&offer)).unwrap();
    assert_eq!((first, second), (0, 1));
    assert_eq!(
        hex::encode(bytes),
        "83a16901a16f01a17083a1740aa9726f6f6d5f6e616d65a56c6f626279a8757365726e616d65a5616c696365"
    );

    let mut codec = ControlCodec::new();
    for _ in 0..5 {
        codec.encode(ControlOpcode::Heartbeat, None).unwrap();
    }
    let (id, bytes) = codec.encode(ControlOpcode::Heartbeat, None).unwrap();
    assert_eq!(id, 5);
    assert_eq!(hex::encode(bytes), "82a16905a16f00");
    assert_eq!(codec.next_id(), 6);
}

#[test]
fn post_message_round_trips_through_decode() {
    let mut codec = DataCodec::new();
    codec.encode(DataOpcode::Heartbeat, None).unwrap();
    codec.encode(DataOpcode::Heartbeat, None).unwrap();

    let payload = DataPayload::RequestPostMessage(RequestPostMessage { content: "hello".into() });
    let (_, bytes) = codec.encode(DataOpcode::Request, Some(&payload)).unwrap();
    assert_eq!(hex::encode(&bytes), "83a16902a16f01a17082a1740aa7636f6e74656e74a568656c6c6f");

    let env = DataCodec::decode(&bytes).unwrap();
    assert_eq!(env.id, 2);
    assert_eq!(env.opcode, DataOpcode::Request);
    assert_eq!(env.payload, Some(payload));
}
