//! SnapshotStore: ordered, deduplicated snapshot list with a single "current" entry.
//!
//! Invariants:
//! - no two entries share a SnapshotKey (index: key -> position);
//! - zero or one entry has is_current = true;
//! - position == display order == capture order; entries never move and are
//!   never removed individually, only clear() empties the store.
//!
//! capture_or_highlight() is all-or-nothing: if the thumbnail fetch fails the
//! store is not touched (no partial insert, highlight untouched).
//!
//! Известное ограничение: для уже существующего ключа миниатюра не
//! перерисовывается, даже если вид изменился (zoom/layout): берётся старая.

use anyhow::Result;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::key::SnapshotKey;

mod snapshot;

pub use snapshot::{Snapshot, Thumbnail};

/// What a store mutation did. Forwarded to subscribers so the rendering
/// layer can update presentation without scanning the list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StoreChange {
    Inserted { key: SnapshotKey, position: usize },
    Highlighted { key: SnapshotKey, position: usize },
    Cleared { removed: usize },
}

/// Result of capture_or_highlight().
#[derive(Debug)]
pub struct Capture<'a> {
    pub snapshot: &'a Snapshot,
    pub position: usize,
    /// true: new entry appended; false: existing entry re-highlighted.
    pub inserted: bool,
}

impl Capture<'_> {
    pub fn change(&self) -> StoreChange {
        let key = self.snapshot.key().clone();
        if self.inserted {
            StoreChange::Inserted {
                key,
                position: self.position,
            }
        } else {
            StoreChange::Highlighted {
                key,
                position: self.position,
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: Vec<Snapshot>,
    index: HashMap<SnapshotKey, usize>,
    current: Option<usize>,
    next_seq: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`; highlight it if present (fetch is NOT called),
    /// otherwise fetch a thumbnail once and append a new current entry.
    pub fn capture_or_highlight<F>(
        &mut self,
        key: SnapshotKey,
        display_width_px: u32,
        fetch: F,
    ) -> Result<Capture<'_>>
    where
        F: FnOnce() -> Result<Thumbnail>,
    {
        if let Some(pos) = self.highlight(&key) {
            return Ok(Capture {
                snapshot: &self.entries[pos],
                position: pos,
                inserted: false,
            });
        }

        // Сначала fetch, потом мутации: при ошибке стор остаётся как был.
        let thumbnail = fetch()?;

        let pos = self.entries.len();
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.set_current(None);
        self.index.insert(key.clone(), pos);
        self.entries
            .push(Snapshot::new(key, thumbnail, display_width_px, seq));
        self.current = Some(pos);

        debug!(
            "history store: inserted {} at {} (seq={})",
            self.entries[pos].key(),
            pos,
            seq
        );

        Ok(Capture {
            snapshot: &self.entries[pos],
            position: pos,
            inserted: true,
        })
    }

    /// Make an existing entry current without capturing. Returns its position,
    /// or None if the key is unknown (highlight state is then unchanged).
    pub fn highlight(&mut self, key: &SnapshotKey) -> Option<usize> {
        let pos = *self.index.get(key)?;
        self.set_current(Some(pos));
        debug!("history store: highlighted {} at {}", key, pos);
        Some(pos)
    }

    /// Empty the store. Safe on an already-empty store.
    /// The next capture behaves as if it were the first ever.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.current = None;
        self.next_seq = 0;
    }

    /// Ordered, read-only view of the entries (display order).
    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<&Snapshot> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn position(&self, key: &SnapshotKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.map(|pos| &self.entries[pos])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set_current(&mut self, pos: Option<usize>) {
        if let Some(prev) = self.current.take() {
            self.entries[prev].set_current(false);
        }
        if let Some(p) = pos {
            self.entries[p].set_current(true);
            self.current = Some(p);
        }
    }
}

impl<'a> IntoIterator for &'a SnapshotStore {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
