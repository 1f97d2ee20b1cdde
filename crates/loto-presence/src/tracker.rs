//! Projection of raw presence state into player records.

use std::collections::BTreeMap;

use loto_protocol::{Codec, PlayerRecord, PresenceMeta};
use loto_transport::PresenceState;

/// Room capacity used when nothing else is configured.
pub const DEFAULT_MAX_PLAYERS: usize = 20;

/// Result of one [`PresenceTracker::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Players sorted by display name.
    pub players: Vec<PlayerRecord>,
    /// `players.len() >= max_players`. Advisory only.
    pub room_full: bool,
}

/// Turns the transport's presence registry into player records.
///
/// Stateless apart from the capacity, so the same input always yields the
/// same output and a sync can be replayed any number of times.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    max_players: usize,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PLAYERS)
    }
}

impl PresenceTracker {
    pub fn new(max_players: usize) -> Self {
        Self { max_players }
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// True when `count` players fill the room.
    pub fn is_full(&self, count: usize) -> bool {
        count >= self.max_players
    }

    /// Projects `state` into sorted player records.
    ///
    /// Keys with no metadata are left out. Blobs that fail to decode are
    /// skipped. When a key (or a name) shows up more than once, the
    /// highest revision wins. `now_ms` becomes every record's
    /// `last_seen_at`.
    pub fn sync<C: Codec>(&self, state: &PresenceState, codec: &C, now_ms: u64) -> SyncOutcome {
        let mut by_name: BTreeMap<String, PresenceMeta> = BTreeMap::new();

        for (key, metas) in state {
            let Some(meta) = decode_latest(key, metas, codec) else {
                continue;
            };
            match by_name.get(&meta.name) {
                Some(existing) if existing.revision >= meta.revision => {}
                _ => {
                    by_name.insert(meta.name.clone(), meta);
                }
            }
        }

        let players: Vec<PlayerRecord> = by_name
            .into_values()
            .map(|meta| PlayerRecord::from_meta(meta, now_ms))
            .collect();
        let room_full = self.is_full(players.len());

        SyncOutcome { players, room_full }
    }

    /// Decodes the metadata of a single presence join.
    pub fn decode_join<C: Codec>(
        &self,
        key: &str,
        metas: &[Vec<u8>],
        codec: &C,
    ) -> Option<PresenceMeta> {
        decode_latest(key, metas, codec)
    }
}

/// Decodes every blob under `key` and keeps the one with the highest
/// revision.
fn decode_latest<C: Codec>(
    key: &str,
    metas: &[Vec<u8>],
    codec: &C,
) -> Option<PresenceMeta> {
    metas
        .iter()
        .filter_map(|blob| match codec.decode::<PresenceMeta>(blob) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::debug!(%key, error = %e, "skipping undecodable presence meta");
                None
            }
        })
        .max_by_key(|meta| meta.revision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loto_protocol::{JsonCodec, PlayerStatus};

    fn blob(name: &str, is_host: bool, revision: u64) -> Vec<u8> {
        let meta = PresenceMeta {
            name: name.into(),
            is_host,
            status: PlayerStatus::Waiting,
            waiting_numbers: vec![],
            joined_at: 0,
            revision,
        };
        JsonCodec.encode(&meta).unwrap()
    }

    fn state(entries: &[(&str, Vec<Vec<u8>>)]) -> PresenceState {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_sync_empty_metadata_omitted() {
        let tracker = PresenceTracker::default();
        let outcome = tracker.sync(
            &state(&[("an", vec![blob("an", true, 1)]), ("binh", vec![])]),
            &JsonCodec,
            0,
        );
        assert_eq!(outcome.players.len(), 1);
        assert_eq!(outcome.players[0].display_name, "an");
    }

    #[test]
    fn test_sync_sorted_by_name_and_idempotent() {
        let tracker = PresenceTracker::default();
        let raw = state(&[
            ("chi", vec![blob("chi", false, 1)]),
            ("an", vec![blob("an", true, 1)]),
            ("binh", vec![blob("binh", false, 1)]),
        ]);
        let first = tracker.sync(&raw, &JsonCodec, 10);
        let second = tracker.sync(&raw, &JsonCodec, 10);

        let names: Vec<_> = first.players.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["an", "binh", "chi"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_sync_highest_revision_wins_within_key() {
        let tracker = PresenceTracker::default();
        let raw = state(&[("an", vec![blob("an", true, 1), blob("an", false, 3)])]);
        let outcome = tracker.sync(&raw, &JsonCodec, 0);
        assert_eq!(outcome.players.len(), 1);
        assert!(!outcome.players[0].is_host);
        assert_eq!(outcome.players[0].revision, 3);
    }

    #[test]
    fn test_sync_undecodable_blob_skipped() {
        let tracker = PresenceTracker::default();
        let raw = state(&[
            ("an", vec![b"{broken".to_vec()]),
            ("binh", vec![blob("binh", false, 1)]),
        ]);
        let outcome = tracker.sync(&raw, &JsonCodec, 0);
        assert_eq!(outcome.players.len(), 1);
        assert_eq!(outcome.players[0].display_name, "binh");
    }

    #[test]
    fn test_sync_room_full_at_capacity() {
        let tracker = PresenceTracker::new(2);
        let raw = state(&[
            ("an", vec![blob("an", true, 1)]),
            ("binh", vec![blob("binh", false, 1)]),
        ]);
        assert!(tracker.sync(&raw, &JsonCodec, 0).room_full);

        let raw = state(&[("an", vec![blob("an", true, 1)])]);
        assert!(!tracker.sync(&raw, &JsonCodec, 0).room_full);
    }

    #[test]
    fn test_decode_join_picks_latest() {
        let tracker = PresenceTracker::default();
        let meta = tracker
            .decode_join("an", &[blob("an", false, 2), blob("an", true, 5)], &JsonCodec)
            .unwrap();
        assert!(meta.is_host);
    }
}
