use std::time::Duration;

use loto::prelude::*;
use tokio::time;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// What the demo observed.
#[derive(Debug)]
struct Outcome {
    first_host: String,
    new_host: String,
    winner: String,
    verified: bool,
    drawn: usize,
}

/// Fast timings so the demo finishes in a few seconds of wall time.
fn demo_config() -> RoomConfig {
    RoomConfig {
        heartbeat_interval: Duration::from_millis(500),
        heartbeat_timeout: Duration::from_millis(1_250),
        chat_throttle: Duration::from_millis(300),
        host_check_jitter: Duration::from_millis(100),
        ..RoomConfig::default()
    }
}

async fn until(
    handle: &RoomHandle,
    what: &'static str,
    pred: impl FnMut(&RoomView) -> bool,
) -> Result<RoomView, LotoError> {
    let mut rx = handle.subscribe_view();
    let view = match time::timeout(Duration::from_secs(120), rx.wait_for(pred)).await {
        Ok(Ok(view)) => view.clone(),
        Ok(Err(_)) => return Err(RoomError::Unavailable(handle.room().to_string()).into()),
        Err(_) => {
            tracing::error!(room = %handle.room(), what, "gave up waiting");
            return Err(RoomError::Unavailable(handle.room().to_string()).into());
        }
    };
    Ok(view)
}

/// Three players on one hub: the host draws a few numbers and then
/// freezes, a follower takes over and plays the round to a win.
async fn run(hub: &LocalHub, config: RoomConfig) -> Result<Outcome, LotoError> {
    const ROOM: &str = "DEMO42";

    let alice = RoomJoiner::new(ROOM, "alice")
        .host(true)
        .config(config.clone())
        .join(hub)
        .await?;
    let bob = RoomJoiner::new(ROOM, "bob").config(config.clone()).join(hub).await?;
    let carol = RoomJoiner::new(ROOM, "carol").config(config).join(hub).await?;

    for joined in [&alice, &bob, &carol] {
        until(&joined.handle, "everyone present", |v| v.players.len() == 3).await?;
    }
    let first_host = bob.handle.view().host.unwrap_or_default();
    tracing::info!(host = %first_host, "room assembled");

    alice.handle.start_game().await?;
    for _ in 0..5 {
        let n = alice.handle.draw_random().await?;
        tracing::info!(number = n, "alice drew");
        time::sleep(Duration::from_millis(100)).await;
    }
    carol.handle.send_chat("sắp kinh rồi!").await?;

    // Alice's tab freezes: her presence stays, her broadcasts vanish.
    alice.channel.set_muted(true);
    tracing::info!("alice muted");

    let view = until(&bob.handle, "bob takes over", |v| v.is_host).await?;
    until(&carol.handle, "carol follows bob", |v| v.host.as_deref() == Some("bob")).await?;
    let new_host = view.me.clone();

    // Bob draws his own first row and claims the win.
    let row: Vec<u8> = view.ticket.frames[0].rows()[0].iter().flatten().copied().collect();
    for &n in &row {
        match bob.handle.draw_number(n).await {
            Ok(()) | Err(RoomError::AlreadyDrawn(_)) => {}
            Err(e) => return Err(e.into()),
        }
        bob.handle.toggle_mark(n).await?;
    }
    bob.handle.declare_win().await?;

    let view = until(&carol.handle, "carol sees the win", |v| v.status == GameStatus::Ended).await?;
    let winner = view.winner.as_ref().map(|w| w.name.clone()).unwrap_or_default();
    let verified = view.win_verification.as_ref().is_some_and(|v| v.is_verified());

    for joined in [&bob, &carol] {
        joined.handle.leave().await?;
    }

    Ok(Outcome {
        first_host,
        new_host,
        winner,
        verified,
        drawn: view.drawn_numbers.len(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    loto::init_tracing();
    eprintln!("running a three-player room on an in-memory hub");

    let hub = LocalHub::new();
    let outcome = run(&hub, demo_config()).await?;

    eprintln!(
        "host {} froze, {} took over; {} won after {} draws (verified: {})",
        outcome.first_host, outcome.new_host, outcome.winner, outcome.drawn, outcome.verified
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_run_migrates_host_and_finishes_round() {
        let hub = LocalHub::new();
        let outcome = run(&hub, demo_config()).await.unwrap();

        assert_eq!(outcome.first_host, "alice");
        assert_eq!(outcome.new_host, "bob");
        assert_eq!(outcome.winner, "bob");
        assert!(outcome.verified);
        assert!(outcome.drawn >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_default_timings() {
        let hub = LocalHub::new();
        let outcome = run(&hub, RoomConfig::default()).await.unwrap();
        assert_eq!(outcome.new_host, "bob");
    }
}
