//! One client's replica of a room.
//!
//! `RoomReplica` is plain synchronous state. Every handler takes the
//! current instant and returns the [`Outbound`] effects the actor should
//! perform; nothing here touches the network or a timer. That keeps
//! every rule of the room testable without a runtime.
//!
//! Origins update optimistically: a broadcast is never echoed back to its
//! sender, so every command applies its own effect before returning the
//! broadcast.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use loto_presence::{MergeOutcome, PresenceTracker, Roster};
use loto_protocol::{
    ChatMessage, Codec, Epoch, GameStatus, PlayerRecord, PlayerStatus, PresenceMeta, RoomEvent,
    WinnerRecord,
};
use loto_ticket::{waiting_numbers, winning_frame, Ticket};
use loto_transport::{ChannelEvent, PresenceState};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::election::{successor, ElectionStep, HostElection, HostSignal, Role};
use crate::game::{Merge, WinVerification};
use crate::{ChatRelay, GameStateMachine, RoomConfig, RoomError};

/// Milliseconds since the Unix epoch.
pub fn wall_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// An effect the actor performs on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Broadcast(RoomEvent),
    /// Re-publish the local presence metadata.
    Track(PresenceMeta),
}

/// Read-only snapshot of a room as this client sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub room: String,
    pub me: String,
    pub role: Role,
    pub is_host: bool,
    pub host: Option<String>,
    /// Sorted by name.
    pub players: Vec<PlayerRecord>,
    pub room_full: bool,
    /// Whether this client is within capacity by seniority.
    pub admitted: bool,
    pub epoch: Epoch,
    pub status: GameStatus,
    pub drawn_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    pub winner: Option<WinnerRecord>,
    pub win_verification: Option<WinVerification>,
    pub ticket: Ticket,
    pub marked_numbers: BTreeSet<u8>,
    pub waiting_numbers: BTreeSet<u8>,
    /// A peer's recent "one number away" announcement.
    pub waiting_announcement: Option<PresenceMeta>,
    pub messages: Vec<ChatMessage>,
    pub chat_cooldown: Duration,
    pub auto_draw: Option<Duration>,
}

/// Everything needed to build a replica.
#[derive(Debug, Clone)]
pub struct ReplicaOptions {
    pub room: String,
    pub name: String,
    pub host_hint: bool,
    /// Wall-clock join time, used for seniority.
    pub joined_at: u64,
    pub config: RoomConfig,
    /// `None` generates one.
    pub ticket: Option<Ticket>,
}

/// A client's replica of one room.
#[derive(Debug)]
pub struct RoomReplica {
    room: String,
    config: RoomConfig,
    origin: Instant,
    tracker: PresenceTracker,
    roster: Roster,
    election: HostElection,
    game: GameStateMachine,
    chat: ChatRelay,
    ticket: Ticket,
    marks: BTreeSet<u8>,
    waiting: BTreeSet<u8>,
    announced_waiting: bool,
    announcement: Option<(PresenceMeta, Instant)>,
    room_full: bool,
    auto_draw: Option<Duration>,
    /// When the last heartbeat from the accepted host arrived.
    last_host_heartbeat: Option<u64>,
}

impl RoomReplica {
    pub fn new(options: ReplicaOptions, now: Instant) -> Self {
        let ReplicaOptions {
            room,
            name,
            host_hint,
            joined_at,
            config,
            ticket,
        } = options;
        let config = config.validated();

        let me = PlayerRecord {
            id: name.clone(),
            display_name: name.clone(),
            is_host: host_hint,
            status: PlayerStatus::Waiting,
            waiting_numbers: Vec::new(),
            last_seen_at: 0,
            joined_at,
            revision: 0,
        };

        Self {
            tracker: PresenceTracker::new(config.max_players),
            roster: Roster::new(me),
            election: HostElection::new(name, host_hint, config.heartbeat_timeout, now),
            game: GameStateMachine::new(),
            chat: ChatRelay::new(config.chat_throttle, config.max_chat_messages),
            ticket: ticket.unwrap_or_else(Ticket::generate),
            marks: BTreeSet::new(),
            waiting: BTreeSet::new(),
            announced_waiting: false,
            announcement: None,
            room_full: false,
            auto_draw: None,
            last_host_heartbeat: None,
            origin: now,
            room,
            config,
        }
    }

    /// The metadata to track right after subscribing.
    pub fn initial_meta(&mut self) -> PresenceMeta {
        self.roster.retrack()
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn name(&self) -> &str {
        self.roster.local_name()
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn is_leader(&self) -> bool {
        self.election.is_leader()
    }

    pub fn role(&self) -> Role {
        self.election.role()
    }

    pub fn status(&self) -> GameStatus {
        self.game.status()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn auto_draw(&self) -> Option<Duration> {
        self.auto_draw
    }

    fn now_ms(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.origin).as_millis()).unwrap_or(u64::MAX)
    }

    fn track(&mut self) -> Outbound {
        Outbound::Track(self.roster.retrack())
    }

    fn require_host(&self, action: &'static str) -> Result<(), RoomError> {
        if self.election.is_leader() {
            Ok(())
        } else {
            Err(RoomError::NotHost(action))
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Host only. Opens a new round.
    pub fn start_game(&mut self) -> Result<Vec<Outbound>, RoomError> {
        self.require_host("start the game")?;
        let was_ended = self.game.status() == GameStatus::Ended;
        let epoch = self.game.start()?;
        info!(room = %self.room, epoch, "round started");

        if was_ended {
            self.chat.clear();
        }
        self.begin_round_locally(GameStatus::Playing);
        Ok(vec![
            Outbound::Broadcast(RoomEvent::GameStart { epoch }),
            self.track(),
        ])
    }

    /// Host only. Draws a specific number.
    pub fn draw_number(&mut self, number: u8) -> Result<Vec<Outbound>, RoomError> {
        self.require_host("draw")?;
        self.game.draw(number)?;
        debug!(room = %self.room, number, "drew number");
        Ok(vec![Outbound::Broadcast(RoomEvent::NumberDraw {
            epoch: self.game.epoch(),
            number,
        })])
    }

    /// Host only. Draws a random undrawn number.
    pub fn draw_random(&mut self) -> Result<(u8, Vec<Outbound>), RoomError> {
        self.require_host("draw")?;
        let number = self.game.draw_random(&mut rand::rng())?;
        debug!(room = %self.room, number, "drew random number");
        Ok((
            number,
            vec![Outbound::Broadcast(RoomEvent::NumberDraw {
                epoch: self.game.epoch(),
                number,
            })],
        ))
    }

    /// Host only. Arms (`Some`) or disarms (`None`) the periodic draw.
    pub fn set_auto_draw(&mut self, period: Option<Duration>) -> Result<(), RoomError> {
        if period.is_some() {
            self.require_host("auto-draw")?;
            if self.game.status() != GameStatus::Playing {
                return Err(RoomError::InvalidTransition {
                    status: self.game.status(),
                    action: "auto-draw",
                });
            }
        }
        self.auto_draw = period;
        Ok(())
    }

    /// Toggles a mark on a drawn number. Returns whether it is now marked.
    pub fn toggle_mark(&mut self, number: u8) -> Result<(bool, Vec<Outbound>), RoomError> {
        if self.game.status() != GameStatus::Playing {
            return Err(RoomError::InvalidTransition {
                status: self.game.status(),
                action: "mark",
            });
        }
        if !self.game.is_drawn(number) {
            return Err(RoomError::NotDrawn(number));
        }
        let marked = if self.marks.remove(&number) {
            false
        } else {
            self.marks.insert(number);
            true
        };
        Ok((marked, self.refresh_waiting()))
    }

    /// Recomputes the local waiting numbers from the marks, announcing
    /// the first time in a round that a row is one number away.
    fn refresh_waiting(&mut self) -> Vec<Outbound> {
        let waiting: BTreeSet<u8> = self
            .ticket
            .frames
            .iter()
            .flat_map(|card| waiting_numbers(card, &self.marks))
            .collect();
        if waiting == self.waiting {
            return Vec::new();
        }
        self.waiting = waiting;
        let me = self.roster.local_name().to_string();
        self.roster.set_waiting(&me, self.waiting.iter().copied().collect());

        let mut out = vec![self.track()];
        if !self.waiting.is_empty() && !self.announced_waiting {
            self.announced_waiting = true;
            info!(room = %self.room, player = %me, waiting = ?self.waiting, "one number away");
            out.push(Outbound::Broadcast(RoomEvent::WaitingKinh {
                player: self.roster.me().to_meta(),
            }));
        }
        out
    }

    /// Claims the win with the current marks.
    pub fn declare_win(&mut self) -> Result<Vec<Outbound>, RoomError> {
        if self.game.status() != GameStatus::Playing {
            return Err(RoomError::InvalidTransition {
                status: self.game.status(),
                action: "declare a win",
            });
        }
        if winning_frame(&self.ticket, &self.marks).is_none() {
            return Err(RoomError::NotAWinningTicket);
        }
        let winner = WinnerRecord {
            name: self.roster.local_name().to_string(),
            is_host: self.election.is_leader(),
            ticket: self.ticket.clone(),
            marked_numbers: self.marks.clone(),
        };
        self.game.declare_win(winner.clone())?;
        self.auto_draw = None;
        let me = winner.name.clone();
        self.roster.set_status(&me, PlayerStatus::Won);
        info!(room = %self.room, player = %me, epoch = self.game.epoch(), "declared win");

        Ok(vec![
            Outbound::Broadcast(RoomEvent::PlayerWin {
                epoch: self.game.epoch(),
                winner,
            }),
            self.track(),
        ])
    }

    /// Replaces the local ticket. Only between rounds.
    pub fn regenerate_ticket(&mut self) -> Result<(), RoomError> {
        if self.game.status() != GameStatus::Waiting {
            return Err(RoomError::InvalidTransition {
                status: self.game.status(),
                action: "change tickets",
            });
        }
        self.ticket = Ticket::generate();
        Ok(())
    }

    /// Host only. Back to waiting, optionally keeping everyone's tickets.
    pub fn reset_game(&mut self, keep_tickets: bool) -> Result<Vec<Outbound>, RoomError> {
        self.require_host("reset the game")?;
        let epoch = self.game.reset()?;
        info!(room = %self.room, epoch, keep_tickets, "room reset");
        self.apply_reset(keep_tickets);
        Ok(vec![
            Outbound::Broadcast(RoomEvent::GameReset {
                epoch,
                keep_tickets,
            }),
            self.track(),
        ])
    }

    /// Sends a chat line.
    pub fn send_chat(
        &mut self,
        text: &str,
        now: Instant,
        wall_ms: u64,
    ) -> Result<(ChatMessage, Vec<Outbound>), RoomError> {
        let me = self.roster.local_name().to_string();
        let message = self.chat.send(&me, text, now, wall_ms)?;
        Ok((message.clone(), vec![Outbound::Broadcast(RoomEvent::Chat(message))]))
    }

    /// The leave notice. The actor unsubscribes afterwards.
    pub fn leave(&mut self) -> Vec<Outbound> {
        info!(room = %self.room, player = %self.roster.local_name(), "leaving room");
        vec![Outbound::Broadcast(RoomEvent::PlayerLeave {
            name: self.roster.local_name().to_string(),
        })]
    }

    // -----------------------------------------------------------------------
    // Per-round local state
    // -----------------------------------------------------------------------

    fn clear_round_locally(&mut self) {
        self.marks.clear();
        self.waiting.clear();
        self.announced_waiting = false;
        self.announcement = None;
        self.auto_draw = None;
    }

    fn begin_round_locally(&mut self, status: GameStatus) {
        self.clear_round_locally();
        self.roster.set_all_status(status.player_status());
    }

    fn apply_reset(&mut self, keep_tickets: bool) {
        self.chat.clear();
        self.begin_round_locally(GameStatus::Waiting);
        if !keep_tickets {
            self.ticket = Ticket::generate();
        }
    }

    // -----------------------------------------------------------------------
    // Channel events
    // -----------------------------------------------------------------------

    /// Dispatches a raw channel event. Undecodable broadcasts are dropped.
    pub fn handle<C: Codec>(&mut self, event: ChannelEvent, codec: &C, now: Instant) -> Vec<Outbound> {
        match event {
            ChannelEvent::PresenceSync(state) => self.on_presence_sync(&state, codec, now),
            ChannelEvent::PresenceJoin { key, metas } => {
                self.on_presence_join(&key, &metas, codec, now)
            }
            ChannelEvent::PresenceLeave { key } => self.on_presence_leave(&key, now),
            ChannelEvent::Broadcast { event, payload } => {
                match codec.decode_event(&event, &payload) {
                    Ok(decoded) => self.on_event(decoded, now),
                    Err(e) => {
                        debug!(room = %self.room, %event, error = %e, "dropping undecodable broadcast");
                        Vec::new()
                    }
                }
            }
        }
    }

    pub fn on_presence_sync<C: Codec>(
        &mut self,
        state: &PresenceState,
        codec: &C,
        now: Instant,
    ) -> Vec<Outbound> {
        let outcome = self.tracker.sync(state, codec, self.now_ms(now));
        self.room_full = outcome.room_full;
        let diff = self.roster.apply_sync(outcome.players);
        if !diff.is_empty() {
            debug!(room = %self.room, joined = ?diff.joined, left = ?diff.left, "presence changed");
        }
        for name in &diff.left {
            self.election.host_left(name, now);
        }
        self.check_host_claims(now)
    }

    pub fn on_presence_join<C: Codec>(
        &mut self,
        key: &str,
        metas: &[Vec<u8>],
        codec: &C,
        now: Instant,
    ) -> Vec<Outbound> {
        let Some(meta) = self.tracker.decode_join(key, metas, codec) else {
            return Vec::new();
        };
        let now_ms = self.now_ms(now);
        self.roster.touch(&meta.name, now_ms);
        if self.roster.merge(meta, now_ms) == MergeOutcome::Inserted {
            info!(room = %self.room, player = %key, "player joined");
        }
        self.check_host_claims(now)
    }

    pub fn on_presence_leave(&mut self, key: &str, now: Instant) -> Vec<Outbound> {
        if self.roster.remove(key).is_some() {
            info!(room = %self.room, player = %key, "player left");
        }
        self.election.host_left(key, now);
        Vec::new()
    }

    /// Looks for peers that publish themselves as host.
    fn check_host_claims(&mut self, now: Instant) -> Vec<Outbound> {
        let claimants: Vec<String> = self
            .roster
            .names()
            .into_iter()
            .filter(|name| *name != self.roster.local_name() && self.roster.claims_host(name))
            .map(str::to_string)
            .collect();

        if self.election.is_leader() {
            let mut out = Vec::new();
            for rival in claimants {
                out.extend(self.resolve_conflict(&rival, now));
            }
            return out;
        }
        if self.election.host().is_none() {
            let senior = claimants
                .iter()
                .filter_map(|name| self.roster.get(name))
                .min_by(|a, b| a.seniority().cmp(&b.seniority()))
                .map(|p| p.display_name.clone());
            if let Some(host) = senior {
                self.election.adopt(&host);
                self.roster.set_host(&host);
            }
        }
        Vec::new()
    }

    /// Two leaders: the junior yields, the senior re-announces itself.
    /// A rival not heard from within the timeout does not count.
    fn resolve_conflict(&mut self, rival: &str, now: Instant) -> Vec<Outbound> {
        let now_ms = self.now_ms(now);
        let timeout_ms = u64::try_from(self.config.heartbeat_timeout.as_millis()).unwrap_or(u64::MAX);
        let Some(rival_record) = self.roster.get(rival) else {
            return Vec::new();
        };
        if now_ms.saturating_sub(rival_record.last_seen_at) > timeout_ms {
            debug!(room = %self.room, %rival, "ignoring stale host claim");
            return Vec::new();
        }

        let me = self.roster.me();
        if me.seniority() < rival_record.seniority() {
            warn!(room = %self.room, %rival, "host conflict, keeping host role");
            vec![self.announce_host()]
        } else {
            warn!(room = %self.room, %rival, "host conflict, yielding to senior host");
            let rival = rival.to_string();
            self.election.yield_to(&rival, now);
            self.roster.set_host(&rival);
            self.auto_draw = None;
            vec![self.track()]
        }
    }

    fn announce_host(&mut self) -> Outbound {
        Outbound::Broadcast(RoomEvent::HostChange {
            new_host: self.roster.local_name().to_string(),
        })
    }

    /// Applies a decoded broadcast from a peer.
    pub fn on_event(&mut self, event: RoomEvent, now: Instant) -> Vec<Outbound> {
        let now_ms = self.now_ms(now);
        match event {
            RoomEvent::Heartbeat {
                ref host,
                ref active_players,
                ..
            } => {
                self.roster.touch(host, now_ms);
                let mut out = self.host_signal(host.clone(), now);
                if !self.election.is_leader() && self.election.host() == Some(host.as_str()) {
                    self.prune_inactive(host, active_players, now_ms);
                }
                out.extend(self.apply_round(&event));
                out
            }
            RoomEvent::HostChange { new_host } => {
                self.roster.touch(&new_host, now_ms);
                self.host_signal(new_host, now)
            }
            RoomEvent::HeartbeatPing => {
                self.election.host_contact(now);
                if let Some(host) = self.election.host().map(str::to_string) {
                    self.roster.touch(&host, now_ms);
                }
                vec![Outbound::Broadcast(RoomEvent::HeartbeatPong {
                    name: self.roster.local_name().to_string(),
                })]
            }
            RoomEvent::HeartbeatPong { name } => {
                self.roster.touch(&name, now_ms);
                Vec::new()
            }
            RoomEvent::GameStart { .. }
            | RoomEvent::GameReset { .. }
            | RoomEvent::NumberDraw { .. } => {
                self.election.host_contact(now);
                self.apply_round(&event)
            }
            RoomEvent::PlayerWin { ref winner, .. } => {
                self.roster.touch(&winner.name, now_ms);
                self.apply_round(&event)
            }
            RoomEvent::Chat(message) => {
                self.roster.touch(&message.sender_name, now_ms);
                self.chat.receive(message);
                Vec::new()
            }
            RoomEvent::WaitingKinh { player } => {
                self.roster.touch(&player.name, now_ms);
                self.announcement = Some((player.clone(), now + self.config.announcement_ttl));
                self.roster.merge(player, now_ms);
                Vec::new()
            }
            RoomEvent::PlayerEvicted { name } => self.on_evicted(&name, now),
            RoomEvent::PlayerLeave { name } => {
                if self.roster.remove(&name).is_some() {
                    info!(room = %self.room, player = %name, "player left");
                }
                self.election.host_left(&name, now);
                Vec::new()
            }
        }
    }

    fn host_signal(&mut self, host: String, now: Instant) -> Vec<Outbound> {
        match self.election.host_heard(&host, now) {
            HostSignal::Accepted { .. } => {
                if self.roster.host() != Some(host.as_str()) {
                    self.roster.set_host(&host);
                }
                Vec::new()
            }
            HostSignal::Conflict { rival } => self.resolve_conflict(&rival, now),
        }
    }

    fn on_evicted(&mut self, name: &str, now: Instant) -> Vec<Outbound> {
        if name == self.roster.local_name() {
            warn!(room = %self.room, "evicted by host, re-announcing presence");
            return vec![
                self.track(),
                Outbound::Broadcast(RoomEvent::HeartbeatPong {
                    name: name.to_string(),
                }),
            ];
        }
        if self.roster.evict(name) {
            debug!(room = %self.room, player = %name, "peer evicted by host");
        }
        self.election.host_left(name, now);
        Vec::new()
    }

    /// Catches up on evictions whose broadcast never arrived.
    fn prune_inactive(&mut self, host: &str, active: &[String], now_ms: u64) {
        let previous = self.last_host_heartbeat.replace(now_ms);
        for name in self.roster.evict_inactive(active, host, previous) {
            debug!(room = %self.room, player = %name, "peer missing from host heartbeat");
        }
    }

    fn apply_round(&mut self, event: &RoomEvent) -> Vec<Outbound> {
        let before = self.game.status();
        match self.game.apply(event) {
            Merge::Stale => {
                debug!(room = %self.room, event = event.name(), "ignoring event from an earlier round");
                Vec::new()
            }
            Merge::Unchanged => Vec::new(),
            Merge::Updated => {
                if self.game.status() != before {
                    self.on_round_change(before, false, None);
                    return vec![self.track()];
                }
                Vec::new()
            }
            Merge::NewRound => {
                let keep_tickets = match event {
                    RoomEvent::GameReset { keep_tickets, .. } => Some(*keep_tickets),
                    _ => None,
                };
                info!(
                    room = %self.room,
                    epoch = self.game.epoch(),
                    status = ?self.game.status(),
                    "adopted new round"
                );
                self.on_round_change(before, true, keep_tickets);
                vec![self.track()]
            }
        }
    }

    /// Local consequences of the round moving to `self.game.status()`.
    fn on_round_change(&mut self, before: GameStatus, new_round: bool, keep_tickets: Option<bool>) {
        let status = self.game.status();
        if new_round {
            self.clear_round_locally();
            if status == GameStatus::Waiting || before == GameStatus::Ended {
                self.chat.clear();
            }
            if keep_tickets == Some(false) {
                self.ticket = Ticket::generate();
            }
        }
        if status == GameStatus::Ended {
            self.auto_draw = None;
        }
        self.roster.set_all_status(status.player_status());
        if let Some(name) = self.game.winner().map(|w| w.name.clone()) {
            self.roster.set_status(&name, PlayerStatus::Won);
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Leader only: evict silent peers, then heartbeat and ping.
    pub fn on_heartbeat_tick(&mut self, now: Instant) -> Vec<Outbound> {
        if !self.election.is_leader() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for name in self.roster.stale(self.now_ms(now), self.config.heartbeat_timeout) {
            warn!(room = %self.room, player = %name, "evicting silent player");
            self.roster.evict(&name);
            out.push(Outbound::Broadcast(RoomEvent::PlayerEvicted { name }));
        }
        out.push(Outbound::Broadcast(RoomEvent::Heartbeat {
            host: self.roster.local_name().to_string(),
            active_players: self.roster.names().into_iter().map(str::to_string).collect(),
            snapshot: self.game.snapshot(),
        }));
        out.push(Outbound::Broadcast(RoomEvent::HeartbeatPing));
        out
    }

    /// Followers: look for a silent host and take over if it is our turn.
    pub fn on_host_check(&mut self, now: Instant) -> Vec<Outbound> {
        let host = self.election.host().map(str::to_string);
        let names = self.roster.names();
        let next = successor(names, host.as_deref()).map(str::to_string);

        match self.election.check(now, next.as_deref()) {
            ElectionStep::Promoted => {
                let me = self.roster.local_name().to_string();
                // Nobody pinged while the host was silent. Count from now.
                let now_ms = self.now_ms(now);
                self.roster.touch_all(now_ms, host.as_deref());
                self.roster.set_host(&me);
                info!(room = %self.room, player = %me, "became host");
                vec![self.announce_host(), self.track()]
            }
            ElectionStep::Candidate | ElectionStep::StoodDown | ElectionStep::Idle => Vec::new(),
        }
    }

    /// Auto-draw tick. Disarms itself when the round is over or the host
    /// role is gone.
    pub fn on_auto_draw(&mut self) -> Vec<Outbound> {
        if self.auto_draw.is_none() {
            return Vec::new();
        }
        if !self.election.is_leader() || self.game.status() != GameStatus::Playing {
            self.auto_draw = None;
            return Vec::new();
        }
        match self.draw_random() {
            Ok((_, out)) => out,
            Err(e) => {
                info!(room = %self.room, reason = %e, "auto-draw stopped");
                self.auto_draw = None;
                Vec::new()
            }
        }
    }

    /// Next instant at which the view changes without any event: the end
    /// of the chat cooldown or of an announcement.
    pub fn next_refresh(&self, now: Instant) -> Option<Instant> {
        let cooldown = self.chat.cooldown_ends().filter(|end| *end > now);
        let announcement = self.announcement.as_ref().map(|(_, until)| *until).filter(|until| *until > now);
        match (cooldown, announcement) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    pub fn view(&self, now: Instant) -> RoomView {
        let me = self.roster.local_name();
        RoomView {
            room: self.room.clone(),
            me: me.to_string(),
            role: self.election.role(),
            is_host: self.election.is_leader(),
            host: self.roster.host().map(str::to_string),
            players: self.roster.players(),
            room_full: self.room_full || self.tracker.is_full(self.roster.len()),
            admitted: self.roster.admitted(me, self.tracker.max_players()),
            epoch: self.game.epoch(),
            status: self.game.status(),
            drawn_numbers: self.game.drawn_numbers().to_vec(),
            current_number: self.game.current_number(),
            winner: self.game.winner().cloned(),
            win_verification: self.game.verify_winner(),
            ticket: self.ticket.clone(),
            marked_numbers: self.marks.clone(),
            waiting_numbers: self.waiting.clone(),
            waiting_announcement: self
                .announcement
                .as_ref()
                .filter(|(_, until)| *until > now)
                .map(|(meta, _)| meta.clone()),
            messages: self.chat.history().cloned().collect(),
            chat_cooldown: self.chat.cooldown(now),
            auto_draw: self.auto_draw,
        }
    }
}
