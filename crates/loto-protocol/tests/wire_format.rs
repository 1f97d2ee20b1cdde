//! Pins the JSON shape of the messages other clients parse.

use std::collections::BTreeSet;

use loto_protocol::{
    Codec, GameStatus, JsonCodec, PlayerStatus, PresenceMeta, RoomEvent, RoundSnapshot,
    WinnerRecord,
};
use loto_ticket::Ticket;
use serde_json::{json, Value};

fn to_json(event: &RoomEvent) -> Value {
    let bytes = JsonCodec.encode_event(event).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_number_draw_wire_shape() {
    assert_eq!(
        to_json(&RoomEvent::NumberDraw { epoch: 3, number: 17 }),
        json!({"event": "number_draw", "payload": {"epoch": 3, "number": 17}})
    );
}

#[test]
fn test_host_change_wire_shape() {
    assert_eq!(
        to_json(&RoomEvent::HostChange { new_host: "an".into() }),
        json!({"event": "host_change", "payload": {"new_host": "an"}})
    );
}

#[test]
fn test_heartbeat_carries_snapshot() {
    let event = RoomEvent::Heartbeat {
        host: "an".into(),
        active_players: vec!["an".into(), "binh".into()],
        snapshot: RoundSnapshot {
            epoch: 2,
            status: GameStatus::Playing,
            drawn_numbers: vec![5, 23],
            winner: None,
        },
    };
    let value = to_json(&event);
    assert_eq!(value["payload"]["snapshot"]["status"], "playing");
    assert_eq!(value["payload"]["snapshot"]["drawn_numbers"], json!([5, 23]));
    assert_eq!(value["payload"]["active_players"], json!(["an", "binh"]));
    assert!(value["payload"]["snapshot"]["winner"].is_null());
}

#[test]
fn test_player_win_keeps_claim_verbatim() {
    let ticket = Ticket::generate();
    let marked: BTreeSet<u8> = ticket.numbers().take(5).collect();
    let event = RoomEvent::PlayerWin {
        epoch: 1,
        winner: WinnerRecord {
            name: "chi".into(),
            is_host: false,
            ticket: ticket.clone(),
            marked_numbers: marked.clone(),
        },
    };

    let bytes = JsonCodec.encode_event(&event).unwrap();
    let RoomEvent::PlayerWin { winner, .. } = JsonCodec.decode_event("player_win", &bytes).unwrap()
    else {
        panic!("expected player_win");
    };
    assert_eq!(winner.ticket, ticket);
    assert_eq!(winner.marked_numbers, marked);
}

#[test]
fn test_presence_meta_wire_shape() {
    let meta = PresenceMeta {
        name: "dung".into(),
        is_host: true,
        status: PlayerStatus::Playing,
        waiting_numbers: vec![81],
        joined_at: 1_700_000_000_000,
        revision: 4,
    };
    assert_eq!(
        serde_json::to_value(&meta).unwrap(),
        json!({
            "name": "dung",
            "is_host": true,
            "status": "playing",
            "waiting_numbers": [81],
            "joined_at": 1_700_000_000_000u64,
            "revision": 4
        })
    );
}

#[test]
fn test_heartbeat_ping_has_no_payload() {
    assert_eq!(to_json(&RoomEvent::HeartbeatPing), json!({"event": "heartbeat_ping"}));
}
