//! Host election.
//!
//! ```text
//!            host silent > timeout
//!            and I am successor              still silent, still successor
//! Follower ──────────────────────▶ Candidate ─────────────────────────────▶ Leader
//!    ▲                                 │                                      │
//!    └──── host heard / other successor┘                                      │
//!    └─────────────────────────── yielded to a senior host ──────────────────┘
//! ```
//!
//! The successor is the present member with the smallest name, the
//! current (silent) host excluded. Conflicts between two leaders are
//! resolved outside this type, by seniority.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// This replica's part in the election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Follower,
    /// Noticed the silence at `since`; promotes at the next check.
    Candidate { since: Instant },
    Leader,
}

/// Outcome of a host-alive check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionStep {
    /// Nothing changed.
    Idle,
    /// Became a candidate.
    Candidate,
    /// Gave up candidacy.
    StoodDown,
    /// Took over as host. The caller announces it.
    Promoted,
}

/// What hearing from a host meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    /// The host is (still) `name`.
    Accepted { changed: bool },
    /// This replica leads and someone else claims to.
    Conflict { rival: String },
}

/// Host election state for one replica.
#[derive(Debug, Clone)]
pub struct HostElection {
    me: String,
    role: Role,
    host: Option<String>,
    last_host_contact: Instant,
    timeout: Duration,
}

impl HostElection {
    /// `host_hint` is the out-of-band claim: the room creator starts as
    /// leader, everyone else as a follower whose host clock starts now.
    pub fn new(me: impl Into<String>, host_hint: bool, timeout: Duration, now: Instant) -> Self {
        let me = me.into();
        let (role, host) = if host_hint {
            (Role::Leader, Some(me.clone()))
        } else {
            (Role::Follower, None)
        };
        Self {
            me,
            role,
            host,
            last_host_contact: now,
            timeout,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Whether the host has been silent for longer than the timeout.
    pub fn host_silent(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_host_contact) > self.timeout
    }

    /// A message arrived from `name` acting as host.
    pub fn host_heard(&mut self, name: &str, now: Instant) -> HostSignal {
        if name == self.me {
            return HostSignal::Accepted { changed: false };
        }
        if self.role == Role::Leader {
            return HostSignal::Conflict {
                rival: name.to_string(),
            };
        }
        if let Role::Candidate { .. } = self.role {
            debug!(me = %self.me, host = %name, "host heard, standing down");
            self.role = Role::Follower;
        }
        self.last_host_contact = now;
        let changed = self.host.as_deref() != Some(name);
        if changed {
            info!(me = %self.me, host = %name, "host changed");
            self.host = Some(name.to_string());
        }
        HostSignal::Accepted { changed }
    }

    /// Something only the host sends arrived (a draw, a ping) without
    /// naming its sender. Counts as contact with the current host.
    pub fn host_contact(&mut self, now: Instant) {
        if self.role != Role::Leader && self.host.is_some() {
            self.last_host_contact = now;
        }
    }

    /// Adopts `name` as host without needing contact, e.g. from a fresh
    /// presence claim when no host is known yet.
    pub fn adopt(&mut self, name: &str) {
        if self.role != Role::Leader && self.host.is_none() && name != self.me {
            debug!(me = %self.me, host = %name, "adopting host from presence");
            self.host = Some(name.to_string());
        }
    }

    /// Steps down in favour of `name` after losing a seniority contest.
    pub fn yield_to(&mut self, name: &str, now: Instant) {
        info!(me = %self.me, host = %name, "yielding host role");
        self.role = Role::Follower;
        self.host = Some(name.to_string());
        self.last_host_contact = now;
    }

    /// The host left or was evicted. The next check may act immediately.
    pub fn host_left(&mut self, name: &str, now: Instant) {
        if self.host.as_deref() != Some(name) || self.role == Role::Leader {
            return;
        }
        info!(me = %self.me, host = %name, "host left");
        self.host = None;
        self.last_host_contact = now
            .checked_sub(self.timeout + Duration::from_millis(1))
            .unwrap_or(self.last_host_contact);
    }

    /// Periodic host-alive check.
    ///
    /// `successor` is the member that should take over if the host is
    /// gone, computed by the caller from its roster.
    pub fn check(&mut self, now: Instant, successor: Option<&str>) -> ElectionStep {
        let rightful = successor == Some(self.me.as_str());
        let silent = self.host_silent(now);

        match self.role {
            Role::Leader => ElectionStep::Idle,
            Role::Follower if silent && rightful => {
                info!(me = %self.me, silent_for = ?now.saturating_duration_since(self.last_host_contact), "host silent, standing as candidate");
                self.role = Role::Candidate { since: now };
                ElectionStep::Candidate
            }
            Role::Follower => ElectionStep::Idle,
            Role::Candidate { .. } if silent && rightful => {
                info!(me = %self.me, "promoting self to host");
                self.role = Role::Leader;
                self.host = Some(self.me.clone());
                ElectionStep::Promoted
            }
            Role::Candidate { .. } => {
                debug!(me = %self.me, "no longer successor, standing down");
                self.role = Role::Follower;
                ElectionStep::StoodDown
            }
        }
    }
}

/// The member that should take over: smallest name, `host` excluded.
pub fn successor<'a>(members: impl IntoIterator<Item = &'a str>, host: Option<&str>) -> Option<&'a str> {
    members.into_iter().filter(|m| Some(*m) != host).min()
}
