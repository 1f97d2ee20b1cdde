//! Room actor: one Tokio task per joined room.
//!
//! The actor owns the channel subscription and a [`RoomReplica`]. It
//! multiplexes commands from [`RoomHandle`]s, channel events, and its
//! timers in a single `select!` loop, performs the effects the replica
//! asks for, and republishes the [`RoomView`] after every step.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use loto_protocol::{ChatMessage, Codec};
use loto_tick::{TickConfig, TickScheduler};
use loto_transport::Channel;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::replica::{wall_ms, Outbound, RoomReplica, RoomView};
use crate::RoomError;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Requests from handles to the actor.
pub(crate) enum RoomCommand {
    StartGame { reply: Reply<()> },
    DrawNumber { number: u8, reply: Reply<()> },
    DrawRandom { reply: Reply<u8> },
    SetAutoDraw { period: Option<Duration>, reply: Reply<()> },
    DeclareWin { reply: Reply<()> },
    ToggleMark { number: u8, reply: Reply<bool> },
    RegenerateTicket { reply: Reply<()> },
    ResetGame { keep_tickets: bool, reply: Reply<()> },
    SendChat { text: String, reply: Reply<ChatMessage> },
    /// Announce the departure, unsubscribe, stop.
    Leave { reply: oneshot::Sender<()> },
}

/// Handle to a running room. Cheap to clone.
///
/// When the last handle is dropped the actor leaves the room.
#[derive(Clone)]
pub struct RoomHandle {
    room: String,
    sender: mpsc::Sender<RoomCommand>,
    view: watch::Receiver<RoomView>,
}

impl RoomHandle {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// The latest published view.
    pub fn view(&self) -> RoomView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified whenever the view changes.
    pub fn subscribe_view(&self) -> watch::Receiver<RoomView> {
        self.view.clone()
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))?
    }

    /// Host only. Opens a new round.
    pub async fn start_game(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartGame { reply }).await
    }

    /// Host only. Draws `number`.
    pub async fn draw_number(&self, number: u8) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::DrawNumber { number, reply })
            .await
    }

    /// Host only. Draws a random undrawn number and returns it.
    pub async fn draw_random(&self) -> Result<u8, RoomError> {
        self.request(|reply| RoomCommand::DrawRandom { reply }).await
    }

    /// Host only. `Some(period)` draws automatically until the round
    /// ends; `None` stops.
    pub async fn set_auto_draw(&self, period: Option<Duration>) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetAutoDraw { period, reply })
            .await
    }

    /// Claims the win with the current marks.
    pub async fn declare_win(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::DeclareWin { reply }).await
    }

    /// Marks or unmarks a drawn number. Returns whether it is now marked.
    pub async fn toggle_mark(&self, number: u8) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ToggleMark { number, reply })
            .await
    }

    /// Deals a new ticket. Only while waiting.
    pub async fn regenerate_ticket(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RegenerateTicket { reply })
            .await
    }

    /// Host only. Back to waiting.
    pub async fn reset_game(&self, keep_tickets: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ResetGame {
            keep_tickets,
            reply,
        })
        .await
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<ChatMessage, RoomError> {
        let text = text.into();
        self.request(|reply| RoomCommand::SendChat { text, reply })
            .await
    }

    /// Leaves the room and waits for the actor to stop.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))
    }
}

struct RoomActor<C: Channel, K: Codec> {
    channel: Arc<C>,
    codec: K,
    replica: RoomReplica,
    receiver: mpsc::Receiver<RoomCommand>,
    view: watch::Sender<RoomView>,
    heartbeat: TickScheduler,
    host_check: TickScheduler,
    auto_draw: TickScheduler,
    armed: Option<Duration>,
}

impl<C: Channel, K: Codec> RoomActor<C, K> {
    async fn run(mut self) {
        info!(
            room = %self.replica.room(),
            player = %self.replica.name(),
            channel = %self.channel.id(),
            leader = self.replica.is_leader(),
            "room actor started"
        );

        loop {
            self.sync_timers();
            let refresh = self.replica.next_refresh(Instant::now());

            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!(room = %self.replica.room(), "all handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                event = self.channel.recv() => match event {
                    Some(event) => {
                        let out = self.replica.handle(event, &self.codec, Instant::now());
                        self.dispatch(out).await;
                    }
                    None => {
                        warn!(room = %self.replica.room(), "channel closed");
                        break;
                    }
                },
                _ = self.heartbeat.wait_for_tick() => {
                    let out = self.replica.on_heartbeat_tick(Instant::now());
                    self.dispatch(out).await;
                }
                _ = self.host_check.wait_for_tick() => {
                    let out = self.replica.on_host_check(Instant::now());
                    self.dispatch(out).await;
                }
                _ = self.auto_draw.wait_for_tick() => {
                    let out = self.replica.on_auto_draw();
                    self.dispatch(out).await;
                }
                _ = sleep_until(refresh) => {}
            }

            self.publish();
        }

        self.publish();
        info!(room = %self.replica.room(), player = %self.replica.name(), "room actor stopped");
    }

    /// Runs one command. `Break` means the actor has left the room.
    async fn handle_command(&mut self, cmd: RoomCommand) -> ControlFlow<()> {
        match cmd {
            RoomCommand::StartGame { reply } => {
                let result = self.replica.start_game();
                self.finish(result, reply).await;
            }
            RoomCommand::DrawNumber { number, reply } => {
                let result = self.replica.draw_number(number);
                self.finish(result, reply).await;
            }
            RoomCommand::DrawRandom { reply } => {
                let result = self.replica.draw_random();
                self.finish_with(result, reply).await;
            }
            RoomCommand::SetAutoDraw { period, reply } => {
                let _ = reply.send(self.replica.set_auto_draw(period));
            }
            RoomCommand::DeclareWin { reply } => {
                let result = self.replica.declare_win();
                self.finish(result, reply).await;
            }
            RoomCommand::ToggleMark { number, reply } => {
                let result = self.replica.toggle_mark(number);
                self.finish_with(result, reply).await;
            }
            RoomCommand::RegenerateTicket { reply } => {
                let _ = reply.send(self.replica.regenerate_ticket());
            }
            RoomCommand::ResetGame {
                keep_tickets,
                reply,
            } => {
                let result = self.replica.reset_game(keep_tickets);
                self.finish(result, reply).await;
            }
            RoomCommand::SendChat { text, reply } => {
                let result = self.replica.send_chat(&text, Instant::now(), wall_ms());
                self.finish_with(result, reply).await;
            }
            RoomCommand::Leave { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn finish(&mut self, result: Result<Vec<Outbound>, RoomError>, reply: Reply<()>) {
        self.finish_with(result.map(|out| ((), out)), reply).await;
    }

    /// Performs the effects of a successful command, then replies.
    async fn finish_with<T>(&mut self, result: Result<(T, Vec<Outbound>), RoomError>, reply: Reply<T>) {
        match result {
            Ok((value, out)) => {
                self.dispatch(out).await;
                let _ = reply.send(Ok(value));
            }
            Err(e) => {
                debug!(room = %self.replica.room(), error = %e, "command rejected");
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Encodes and sends outbound effects. Transport errors are logged,
    /// never surfaced: the heartbeat repairs anything lost.
    async fn dispatch(&self, outbound: Vec<Outbound>) {
        for out in outbound {
            match out {
                Outbound::Broadcast(event) => {
                    let bytes = match self.codec.encode_event(&event) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(event = event.name(), error = %e, "failed to encode event");
                            continue;
                        }
                    };
                    if let Err(e) = self.channel.broadcast(event.name(), &bytes) {
                        warn!(room = %self.replica.room(), event = event.name(), error = %e, "broadcast failed");
                    }
                }
                Outbound::Track(meta) => {
                    let bytes = match self.codec.encode(&meta) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(error = %e, "failed to encode presence meta");
                            continue;
                        }
                    };
                    if let Err(e) = self.channel.track(bytes).await {
                        warn!(room = %self.replica.room(), error = %e, "presence track failed");
                    }
                }
            }
        }
    }

    /// Runs the heartbeat only while leading and the host check only
    /// while following. Arms or disarms auto-draw to match the replica.
    fn sync_timers(&mut self) {
        if self.replica.is_leader() {
            self.heartbeat.resume();
            self.host_check.pause();
        } else {
            self.heartbeat.pause();
            self.host_check.resume();
        }

        let wanted = self.replica.auto_draw();
        if wanted != self.armed {
            debug!(room = %self.replica.room(), period = ?wanted, "auto-draw changed");
            self.auto_draw.set_period(wanted);
            self.armed = wanted;
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.replica.view(Instant::now()));
    }

    async fn shutdown(&mut self) {
        let out = self.replica.leave();
        self.dispatch(out).await;
        if let Err(e) = self.channel.unsubscribe().await {
            debug!(room = %self.replica.room(), error = %e, "unsubscribe failed");
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Starts the actor for an already-subscribed channel.
///
/// The caller tracks the replica's initial presence before spawning, so
/// peers see the player before any of its broadcasts.
pub fn spawn_room<C: Channel, K: Codec>(channel: Arc<C>, codec: K, replica: RoomReplica) -> RoomHandle {
    let config = replica.config().clone();
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (view_tx, view_rx) = watch::channel(replica.view(Instant::now()));

    let mut heartbeat = TickScheduler::every(config.heartbeat_interval);
    let mut host_check = TickScheduler::new(
        TickConfig::every(config.heartbeat_interval).with_jitter(config.host_check_jitter),
    );
    if replica.is_leader() {
        host_check.pause();
    } else {
        heartbeat.pause();
    }

    let room = replica.room().to_string();
    let actor = RoomActor {
        channel,
        codec,
        replica,
        receiver: rx,
        view: view_tx,
        heartbeat,
        host_check,
        auto_draw: TickScheduler::new(TickConfig::event_driven()),
        armed: None,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room,
        sender: tx,
        view: view_rx,
    }
}
