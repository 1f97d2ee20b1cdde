//! Joining rooms through the meta crate.

use std::time::Duration;

use loto::prelude::*;
use tokio::time;

async fn until(handle: &RoomHandle, pred: impl FnMut(&RoomView) -> bool) -> RoomView {
    let mut rx = handle.subscribe_view();
    let view = time::timeout(Duration::from_secs(300), rx.wait_for(pred))
        .await
        .expect("timed out waiting for view")
        .expect("room actor stopped");
    view.clone()
}

#[tokio::test(start_paused = true)]
async fn test_join_host_and_guest_share_a_round() {
    let hub = LocalHub::new();
    let host = RoomJoiner::new("ABC123", "alice").host(true).join(&hub).await.unwrap();
    let guest = RoomJoiner::new("ABC123", "bob").join(&hub).await.unwrap();

    until(&guest.handle, |v| v.host.as_deref() == Some("alice")).await;
    host.handle.start_game().await.unwrap();
    let n = host.handle.draw_random().await.unwrap();

    let view = until(&guest.handle, |v| v.drawn_numbers == vec![n]).await;
    assert_eq!(view.status, GameStatus::Playing);
    assert_eq!(view.room, "ABC123");
    assert_eq!(view.me, "bob");
    assert_eq!(hub.members("ABC123"), vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_join_rejects_blank_names() {
    let hub = LocalHub::new();
    let err = RoomJoiner::new("ABC123", "   ").join(&hub).await.err().unwrap();
    assert!(matches!(err, LotoError::InvalidJoin(_)));
    let err = RoomJoiner::new("", "alice").join(&hub).await.err().unwrap();
    assert!(matches!(err, LotoError::InvalidJoin(_)));
}

#[tokio::test(start_paused = true)]
async fn test_join_after_shutdown_is_a_transport_error() {
    let hub = LocalHub::new();
    hub.shutdown();
    let err = RoomJoiner::new("ABC123", "alice").join(&hub).await.err().unwrap();
    assert!(matches!(err, LotoError::Transport(_)));
}

#[tokio::test(start_paused = true)]
async fn test_joined_at_decides_host_conflicts() {
    let hub = LocalHub::new();
    let late = RoomJoiner::new("ABC123", "zoe")
        .host(true)
        .joined_at(2_000)
        .join(&hub)
        .await
        .unwrap();
    let early = RoomJoiner::new("ABC123", "yann")
        .host(true)
        .joined_at(1_000)
        .join(&hub)
        .await
        .unwrap();

    let view = until(&late.handle, |v| !v.is_host).await;
    assert_eq!(view.host.as_deref(), Some("yann"));
    assert!(early.handle.view().is_host);
}

#[tokio::test(start_paused = true)]
async fn test_room_errors_convert_into_loto_error() {
    let hub = LocalHub::new();
    let guest = RoomJoiner::new("ABC123", "bob").join(&hub).await.unwrap();

    let result: Result<(), LotoError> = async {
        guest.handle.start_game().await?;
        Ok(())
    }
    .await;
    assert!(matches!(result, Err(LotoError::Room(RoomError::NotHost(_)))));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_leaves_the_room() {
    let hub = LocalHub::new();
    let host = RoomJoiner::new("ABC123", "alice").host(true).join(&hub).await.unwrap();
    let guest = RoomJoiner::new("ABC123", "bob").join(&hub).await.unwrap();
    until(&host.handle, |v| v.players.len() == 2).await;

    let JoinedRoom { handle, channel } = guest;
    drop(handle);
    drop(channel);

    let view = until(&host.handle, |v| v.players.len() == 1).await;
    assert_eq!(view.players[0].display_name, "alice");
}
