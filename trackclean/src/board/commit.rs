//! Commit log
//!
//! The cleaner never keeps undo state itself. Every removal and every edit it
//! performs is reported to a [`CommitLog`]; the host decides what to do with
//! it. [`BoardCommit`] is the log used by the file-level API: it collects the
//! entries of one run and turns them into a single [`UndoRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Track, TrackId};
use super::Board;

/// Why the cleaner deleted an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    NullSegment,
    DuplicateVia,
    ViaOnThroughPad,
    DuplicateTrack,
    MergedCollinear,
    MisConnected,
    Dangling,
}

impl RemovalReason {
    pub fn describe(&self) -> &'static str {
        match self {
            RemovalReason::NullSegment => "zero-length segment",
            RemovalReason::DuplicateVia => "duplicate via",
            RemovalReason::ViaOnThroughPad => "via on through-hole pad",
            RemovalReason::DuplicateTrack => "duplicate track",
            RemovalReason::MergedCollinear => "merged into collinear neighbour",
            RemovalReason::MisConnected => "connects different nets",
            RemovalReason::Dangling => "dangling",
        }
    }
}

/// Receiver for the structural changes of a cleanup run.
pub trait CommitLog {
    /// `track` has just been taken off the board.
    fn removed(&mut self, id: TrackId, track: &Track, reason: RemovalReason);

    /// A track was edited in place; `before` is the previous state.
    fn modified(&mut self, id: TrackId, before: &Track, after: &Track);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommitEntry {
    Removed {
        id: TrackId,
        track: Track,
        reason: RemovalReason,
    },
    Modified {
        id: TrackId,
        before: Track,
        after: Track,
    },
}

/// Pending changes of one operation.
#[derive(Debug, Clone, Default)]
pub struct BoardCommit {
    entries: Vec<CommitEntry>,
}

/// A pushed commit: one undo step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoRecord {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<CommitEntry>,
}

impl BoardCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CommitEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn removed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CommitEntry::Removed { .. }))
            .count()
    }

    /// Close the commit. Returns `None` when nothing was recorded.
    pub fn push(self, message: &str) -> Option<UndoRecord> {
        if self.entries.is_empty() {
            return None;
        }
        Some(UndoRecord {
            message: message.to_string(),
            timestamp: Utc::now(),
            entries: self.entries,
        })
    }
}

impl CommitLog for BoardCommit {
    fn removed(&mut self, id: TrackId, track: &Track, reason: RemovalReason) {
        self.entries.push(CommitEntry::Removed {
            id,
            track: track.clone(),
            reason,
        });
    }

    fn modified(&mut self, id: TrackId, before: &Track, after: &Track) {
        self.entries.push(CommitEntry::Modified {
            id,
            before: before.clone(),
            after: after.clone(),
        });
    }
}

impl UndoRecord {
    /// Undo every entry, newest first.
    pub fn revert(&self, board: &mut Board) {
        for entry in self.entries.iter().rev() {
            match entry {
                CommitEntry::Removed { id, track, .. } => board.restore_track(*id, track.clone()),
                CommitEntry::Modified { id, before, .. } => {
                    board.restore_track(*id, before.clone())
                }
            }
        }
    }
}
