//! The replica's member table.
//!
//! Presence decides who is in the room; broadcasts decide who is alive.
//! The roster keeps both views in one place:
//!
//! - Records merge last-writer-wins on the owner's `revision`, so a late
//!   or duplicated presence payload never rolls a player back.
//! - `last_seen_at` only moves when the player is actually heard from
//!   (a broadcast or a presence join). A presence sync alone does not
//!   refresh it, which is what lets a wedged client with lingering
//!   presence go stale.
//! - The host flag shown to the application is the replica's own belief
//!   ([`Roster::set_host`]), not whatever each peer claims about itself.
//!   Claims are still available through [`Roster::claims_host`].
//! - Evicted players are kept out of later syncs until they are heard
//!   from again.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use loto_protocol::{PlayerRecord, PlayerStatus, PresenceMeta};

/// Membership changes caused by one presence sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiff {
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl SyncDiff {
    /// Never true: the local player is always a member.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// What [`Roster::merge`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First time this player was seen.
    Inserted,
    /// Replaced an older or equal revision.
    Updated,
    /// Older than what is already held. Ignored.
    Stale,
    /// The player is evicted. Ignored.
    Suppressed,
    /// The record describes the local player. Ignored.
    Local,
}

/// The local view of a room's members.
#[derive(Debug, Clone)]
pub struct Roster {
    me: PlayerRecord,
    peers: BTreeMap<String, PlayerRecord>,
    host: Option<String>,
    evicted: BTreeSet<String>,
}

impl Roster {
    /// Creates a roster holding only the local player.
    pub fn new(me: PlayerRecord) -> Self {
        let host = me.is_host.then(|| me.display_name.clone());
        Self {
            me,
            peers: BTreeMap::new(),
            host,
            evicted: BTreeSet::new(),
        }
    }

    /// The local player's record.
    pub fn me(&self) -> &PlayerRecord {
        &self.me
    }

    pub fn local_name(&self) -> &str {
        &self.me.display_name
    }

    /// Bumps the local revision and returns the metadata to track.
    pub fn retrack(&mut self) -> PresenceMeta {
        self.me.revision += 1;
        self.me.to_meta()
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    /// Applies a projected presence sync.
    ///
    /// Peers missing from `players` are dropped. New peers are added with
    /// the `last_seen_at` the projection gave them. Known peers take the
    /// incoming fields when its revision is not older, but keep their own
    /// `last_seen_at`.
    pub fn apply_sync(&mut self, players: Vec<PlayerRecord>) -> SyncDiff {
        let mut diff = SyncDiff::default();
        let present: BTreeSet<&str> = players.iter().map(|p| p.display_name.as_str()).collect();

        let gone: Vec<String> = self
            .peers
            .keys()
            .filter(|name| !present.contains(name.as_str()))
            .cloned()
            .collect();
        for name in gone {
            self.remove(&name);
            diff.left.push(name);
        }
        // Presence no longer lists them, so there is nothing left to suppress.
        self.evicted.retain(|name| present.contains(name.as_str()));

        for incoming in players {
            let name = incoming.display_name.clone();
            if name == self.me.display_name || self.evicted.contains(&name) {
                continue;
            }
            match self.peers.get_mut(&name) {
                Some(existing) => {
                    if incoming.revision >= existing.revision {
                        let last_seen_at = existing.last_seen_at;
                        *existing = PlayerRecord { last_seen_at, ..incoming };
                    }
                }
                None => {
                    self.peers.insert(name.clone(), incoming);
                    diff.joined.push(name);
                }
            }
        }

        diff
    }

    /// Merges one player's published metadata.
    pub fn merge(&mut self, meta: PresenceMeta, now_ms: u64) -> MergeOutcome {
        if meta.name == self.me.display_name {
            return MergeOutcome::Local;
        }
        if self.evicted.contains(&meta.name) {
            return MergeOutcome::Suppressed;
        }
        match self.peers.get_mut(&meta.name) {
            Some(existing) if meta.revision < existing.revision => MergeOutcome::Stale,
            Some(existing) => {
                let last_seen_at = existing.last_seen_at;
                *existing = PlayerRecord::from_meta(meta, last_seen_at);
                MergeOutcome::Updated
            }
            None => {
                self.peers
                    .insert(meta.name.clone(), PlayerRecord::from_meta(meta, now_ms));
                MergeOutcome::Inserted
            }
        }
    }

    /// Records that `name` was heard from.
    ///
    /// Lifts any eviction. Returns whether the player is a known peer.
    pub fn touch(&mut self, name: &str, now_ms: u64) -> bool {
        self.evicted.remove(name);
        match self.peers.get_mut(name) {
            Some(peer) => {
                peer.last_seen_at = now_ms;
                true
            }
            None => false,
        }
    }

    /// Restarts every peer's liveness clock at `now_ms`, except `skip`.
    ///
    /// Evictions are left in place.
    pub fn touch_all(&mut self, now_ms: u64, skip: Option<&str>) {
        for peer in self.peers.values_mut() {
            if Some(peer.display_name.as_str()) != skip {
                peer.last_seen_at = now_ms;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Host
    // -----------------------------------------------------------------------

    /// Makes `name` the only host in this replica's view.
    pub fn set_host(&mut self, name: &str) {
        self.me.is_host = self.me.display_name == name;
        self.host = Some(name.to_string());
    }

    /// Forgets the current host.
    pub fn clear_host(&mut self) {
        self.me.is_host = false;
        self.host = None;
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Whether `name` publishes itself as host.
    pub fn claims_host(&self, name: &str) -> bool {
        self.get(name).is_some_and(|p| p.is_host)
    }

    // -----------------------------------------------------------------------
    // Field updates
    // -----------------------------------------------------------------------

    pub fn set_status(&mut self, name: &str, status: PlayerStatus) -> bool {
        match self.get_mut(name) {
            Some(p) => {
                p.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_waiting(&mut self, name: &str, numbers: Vec<u8>) -> bool {
        match self.get_mut(name) {
            Some(p) => {
                p.waiting_numbers = numbers;
                true
            }
            None => false,
        }
    }

    /// Sets every member's status, used on round transitions.
    pub fn set_all_status(&mut self, status: PlayerStatus) {
        self.me.status = status;
        self.me.waiting_numbers.clear();
        for peer in self.peers.values_mut() {
            peer.status = status;
            peer.waiting_numbers.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Drops a peer. The local player cannot be removed.
    pub fn remove(&mut self, name: &str) -> Option<PlayerRecord> {
        let removed = self.peers.remove(name);
        if removed.is_some() && self.host.as_deref() == Some(name) {
            self.host = None;
        }
        removed
    }

    /// Drops a peer and keeps it out of later syncs until it is heard from.
    pub fn evict(&mut self, name: &str) -> bool {
        if name == self.me.display_name {
            return false;
        }
        self.evicted.insert(name.to_string());
        self.remove(name).is_some()
    }

    /// Evicts peers missing from the host's `active` list.
    ///
    /// The host is never evicted. Peers heard from after `heard_after` are
    /// spared: they may have joined after the host built its list.
    pub fn evict_inactive(&mut self, active: &[String], host: &str, heard_after: Option<u64>) -> Vec<String> {
        let listed: BTreeSet<&str> = active.iter().map(String::as_str).collect();
        let gone: Vec<String> = self
            .peers
            .values()
            .filter(|p| p.display_name != host && !listed.contains(p.display_name.as_str()))
            .filter(|p| heard_after.is_none_or(|t| p.last_seen_at <= t))
            .map(|p| p.display_name.clone())
            .collect();
        for name in &gone {
            self.evict(name);
        }
        gone
    }

    pub fn is_evicted(&self, name: &str) -> bool {
        self.evicted.contains(name)
    }

    /// Peers not heard from for longer than `timeout`.
    pub fn stale(&self, now_ms: u64, timeout: Duration) -> Vec<String> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.peers
            .values()
            .filter(|p| now_ms.saturating_sub(p.last_seen_at) > timeout_ms)
            .map(|p| p.display_name.clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        if name == self.me.display_name {
            Some(&self.me)
        } else {
            self.peers.get(name)
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut PlayerRecord> {
        if name == self.me.display_name {
            Some(&mut self.me)
        } else {
            self.peers.get_mut(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of members, the local player included.
    pub fn len(&self) -> usize {
        self.peers.len() + 1
    }

    /// Never true: the local player is always a member.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All member names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .peers
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(self.me.display_name.as_str()))
            .collect();
        names.sort_unstable();
        names
    }

    /// All members sorted by name, with `is_host` set from this replica's
    /// view of who is host.
    pub fn players(&self) -> Vec<PlayerRecord> {
        let mut players: Vec<PlayerRecord> = self
            .peers
            .values()
            .chain(std::iter::once(&self.me))
            .map(|p| PlayerRecord {
                is_host: self.host.as_deref() == Some(p.display_name.as_str()),
                ..p.clone()
            })
            .collect();
        players.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        players
    }

    /// Zero-based seniority of `name`. 0 joined first.
    pub fn seniority_rank(&self, name: &str) -> Option<usize> {
        let target = self.get(name)?.seniority();
        Some(
            self.peers
                .values()
                .chain(std::iter::once(&self.me))
                .filter(|p| p.seniority() < target)
                .count(),
        )
    }

    /// Whether `name` is among the `max_players` most senior members.
    pub fn admitted(&self, name: &str, max_players: usize) -> bool {
        self.seniority_rank(name).is_some_and(|rank| rank < max_players)
    }
}
