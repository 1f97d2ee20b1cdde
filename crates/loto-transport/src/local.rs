//! In-process pub/sub hub.
//!
//! Every [`LocalChannel`] is a member of one room on a shared [`LocalHub`].
//! Delivery goes through unbounded mpsc queues, so a slow reader never blocks
//! a broadcaster. Broadcasts can be dropped at random (`drop_rate`) and a
//! member can be muted, which keeps its presence entry alive while silently
//! discarding everything it sends.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::{Channel, ChannelEvent, ChannelId, PresenceState, PubSub, TransportError};

/// Counter for generating unique channel IDs.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for a [`LocalHub`].
#[derive(Debug, Clone, Default)]
pub struct LocalHubConfig {
    /// Probability (0.0–1.0) that a single broadcast delivery is lost.
    pub drop_rate: f64,
}

struct Member {
    key: String,
    meta: Option<Vec<u8>>,
    muted: bool,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

#[derive(Default)]
struct HubRoom {
    members: BTreeMap<ChannelId, Member>,
}

impl HubRoom {
    fn presence(&self) -> PresenceState {
        let mut state = PresenceState::new();
        for member in self.members.values() {
            let metas = state.entry(member.key.clone()).or_default();
            if let Some(meta) = &member.meta {
                metas.push(meta.clone());
            }
        }
        state
    }

    fn send_all(&self, event: &ChannelEvent) {
        for member in self.members.values() {
            let _ = member.tx.send(event.clone());
        }
    }

    fn sync_all(&self) {
        self.send_all(&ChannelEvent::PresenceSync(self.presence()));
    }
}

#[derive(Default)]
struct HubInner {
    rooms: HashMap<String, HubRoom>,
    shut_down: bool,
}

/// An in-memory [`PubSub`] shared by every client of a process.
///
/// Cheap to clone; all clones talk to the same rooms.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubInner>>,
    config: LocalHubConfig,
}

impl LocalHub {
    /// Creates a lossless hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub with the given configuration.
    pub fn with_config(mut config: LocalHubConfig) -> Self {
        config.drop_rate = config.drop_rate.clamp(0.0, 1.0);
        Self {
            inner: Arc::default(),
            config,
        }
    }

    /// Presence keys currently subscribed to `room`, sorted.
    pub fn members(&self, room: &str) -> Vec<String> {
        let inner = self.lock();
        let mut keys: Vec<String> = inner
            .rooms
            .get(room)
            .map(|r| r.members.values().map(|m| m.key.clone()).collect())
            .unwrap_or_default();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Closes every channel. Pending `recv` calls return `None`.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.shut_down = true;
        inner.rooms.clear();
        tracing::info!("local hub shut down");
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn join(
        &self,
        room: &str,
        key: &str,
    ) -> Result<(ChannelId, mpsc::UnboundedReceiver<ChannelEvent>), TransportError> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Err(TransportError::Shutdown);
        }

        let id = ChannelId::new(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let hub_room = inner.rooms.entry(room.to_string()).or_default();
        hub_room.members.insert(
            id,
            Member {
                key: key.to_string(),
                meta: None,
                muted: false,
                tx: tx.clone(),
            },
        );
        let _ = tx.send(ChannelEvent::PresenceSync(hub_room.presence()));

        tracing::debug!(%id, room, key, "subscribed to local room");
        Ok((id, rx))
    }

    fn track(&self, room: &str, id: ChannelId, meta: Vec<u8>) -> Result<(), TransportError> {
        let mut inner = self.lock();
        let hub_room = inner
            .rooms
            .get_mut(room)
            .ok_or_else(|| TransportError::ChannelClosed(id.to_string()))?;
        let member = hub_room
            .members
            .get_mut(&id)
            .ok_or_else(|| TransportError::ChannelClosed(id.to_string()))?;
        member.meta = Some(meta.clone());
        let join = ChannelEvent::PresenceJoin {
            key: member.key.clone(),
            metas: vec![meta],
        };

        for (other, m) in &hub_room.members {
            if *other != id {
                let _ = m.tx.send(join.clone());
            }
        }
        hub_room.sync_all();
        Ok(())
    }

    fn broadcast(
        &self,
        room: &str,
        id: ChannelId,
        event: &str,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let inner = self.lock();
        let hub_room = inner
            .rooms
            .get(room)
            .ok_or_else(|| TransportError::ChannelClosed(id.to_string()))?;
        let sender = hub_room
            .members
            .get(&id)
            .ok_or_else(|| TransportError::ChannelClosed(id.to_string()))?;
        if sender.muted {
            tracing::trace!(%id, event, "muted member, broadcast discarded");
            return Ok(());
        }

        let mut rng = rand::rng();
        for (other, m) in &hub_room.members {
            if *other == id {
                continue;
            }
            if self.config.drop_rate > 0.0 && rng.random_bool(self.config.drop_rate) {
                tracing::trace!(from = %id, to = %other, event, "broadcast dropped");
                continue;
            }
            let _ = m.tx.send(ChannelEvent::Broadcast {
                event: event.to_string(),
                payload: payload.to_vec(),
            });
        }
        Ok(())
    }

    fn set_muted(&self, room: &str, id: ChannelId, muted: bool) {
        let mut inner = self.lock();
        if let Some(member) = inner.rooms.get_mut(room).and_then(|r| r.members.get_mut(&id)) {
            member.muted = muted;
        }
    }

    /// Removes a member. Returns `false` if it was already gone.
    fn leave(&self, room: &str, id: ChannelId) -> bool {
        let mut inner = self.lock();
        let Some(hub_room) = inner.rooms.get_mut(room) else {
            return false;
        };
        let Some(member) = hub_room.members.remove(&id) else {
            return false;
        };

        hub_room.send_all(&ChannelEvent::PresenceLeave { key: member.key });
        hub_room.sync_all();
        if hub_room.members.is_empty() {
            inner.rooms.remove(room);
        }
        tracing::debug!(%id, room, "left local room");
        true
    }
}

impl PubSub for LocalHub {
    type Channel = LocalChannel;
    type Error = TransportError;

    async fn subscribe(&self, room: &str, presence_key: &str) -> Result<LocalChannel, TransportError> {
        let (id, rx) = self.join(room, presence_key)?;
        Ok(LocalChannel {
            id,
            room: room.to_string(),
            hub: self.clone(),
            rx: AsyncMutex::new(rx),
        })
    }
}

/// A member's subscription to a room on a [`LocalHub`].
///
/// Dropping the channel behaves like a disconnect: other members see the
/// presence entry disappear.
pub struct LocalChannel {
    id: ChannelId,
    room: String,
    hub: LocalHub,
    rx: AsyncMutex<mpsc::UnboundedReceiver<ChannelEvent>>,
}

impl LocalChannel {
    /// The room this channel is subscribed to.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Mutes or unmutes this member's broadcasts.
    ///
    /// A muted member stays in presence but none of its broadcasts reach
    /// anyone, like a client whose tab froze.
    pub fn set_muted(&self, muted: bool) {
        self.hub.set_muted(&self.room, self.id, muted);
    }
}

impl Channel for LocalChannel {
    type Error = TransportError;

    async fn track(&self, meta: Vec<u8>) -> Result<(), TransportError> {
        self.hub.track(&self.room, self.id, meta)
    }

    fn broadcast(&self, event: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.hub.broadcast(&self.room, self.id, event, payload)
    }

    async fn recv(&self) -> Option<ChannelEvent> {
        self.rx.lock().await.recv().await
    }

    async fn unsubscribe(&self) -> Result<(), TransportError> {
        if self.hub.leave(&self.room, self.id) {
            Ok(())
        } else {
            Err(TransportError::ChannelClosed(self.id.to_string()))
        }
    }

    fn id(&self) -> ChannelId {
        self.id
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.hub.leave(&self.room, self.id);
    }
}
