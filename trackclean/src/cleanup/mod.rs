//! Track network cleanup
//!
//! [`TracksCleaner`] removes redundant and broken copper from a [`Board`]:
//! zero-length segments, stacked vias, duplicated segments, intermediate
//! points of straight runs, tracks shorting two nets and dangling stubs.
//! Every change goes through the board and is reported to a [`CommitLog`].
//!
//! Arcs connect at their two ends like segments. They can be removed as
//! dangling or mis-connected, but are never merged, deduplicated or reshaped.
//!
//! ```
//! use trackclean::board::{Board, BoardCommit, Layer, Point, Track};
//! use trackclean::cleanup::{CleanupOptions, TracksCleaner};
//!
//! let mut board = Board::new();
//! board.add_track(Track::trace(Point::new(0, 0), Point::new(10, 0), 200, Layer::FRONT, 1));
//! board.add_track(Track::trace(Point::new(10, 0), Point::new(20, 0), 200, Layer::FRONT, 1));
//!
//! let mut commit = BoardCommit::new();
//! let options = CleanupOptions { delete_dangling: false, ..Default::default() };
//! let modified = TracksCleaner::new(&mut board, &mut commit).cleanup_board(&options);
//!
//! assert!(modified);
//! assert_eq!(board.track_count(), 1);
//! ```

pub mod connectivity;
pub mod decorations;
pub mod geometry;

mod dangling;
mod duplicates;
mod merge;
mod misconnect;

pub use connectivity::{ConnectivityIndex, Neighbors, TrackConnections};
pub use decorations::{NoDecorations, TrackDecorations};

use serde::{Deserialize, Serialize};

use crate::board::{Board, CommitLog, RemovalReason, Track, TrackId};

/// What a cleanup run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Delete tracks that connect items of different nets.
    pub remove_misconnected: bool,
    /// Delete stacked through vias and through vias sitting on through-hole pads.
    pub clean_vias: bool,
    /// Delete null and duplicated segments, merge collinear segments.
    pub merge_segments: bool,
    /// Delete tracks with an unconnected end.
    pub delete_dangling: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_misconnected: true,
            clean_vias: true,
            merge_segments: true,
            delete_dangling: true,
        }
    }
}

impl CleanupOptions {
    /// Options with every pass disabled.
    pub fn none() -> Self {
        Self {
            remove_misconnected: false,
            clean_vias: false,
            merge_segments: false,
            delete_dangling: false,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.remove_misconnected || self.clean_vias || self.merge_segments || self.delete_dangling
    }
}

/// Counters of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub null_segments: usize,
    pub duplicate_vias: usize,
    pub vias_on_pads: usize,
    pub duplicate_tracks: usize,
    pub merged_segments: usize,
    pub misconnected: usize,
    pub dangling: usize,
    /// Vias whose end did not match their start.
    pub normalized_vias: usize,
}

impl CleanupStats {
    fn record(&mut self, reason: RemovalReason) {
        let counter = match reason {
            RemovalReason::NullSegment => &mut self.null_segments,
            RemovalReason::DuplicateVia => &mut self.duplicate_vias,
            RemovalReason::ViaOnThroughPad => &mut self.vias_on_pads,
            RemovalReason::DuplicateTrack => &mut self.duplicate_tracks,
            RemovalReason::MergedCollinear => &mut self.merged_segments,
            RemovalReason::MisConnected => &mut self.misconnected,
            RemovalReason::Dangling => &mut self.dangling,
        };
        *counter += 1;
    }

    pub fn total_removed(&self) -> usize {
        self.null_segments
            + self.duplicate_vias
            + self.vias_on_pads
            + self.duplicate_tracks
            + self.merged_segments
            + self.misconnected
            + self.dangling
    }
}

/// One cleanup run over a board.
pub struct TracksCleaner<'a> {
    board: &'a mut Board,
    commit: &'a mut dyn CommitLog,
    decorations: Option<&'a mut dyn TrackDecorations>,
    index: ConnectivityIndex,
    stats: CleanupStats,
}

impl<'a> TracksCleaner<'a> {
    pub fn new(board: &'a mut Board, commit: &'a mut dyn CommitLog) -> Self {
        let index = ConnectivityIndex::build(board);
        Self {
            board,
            commit,
            decorations: None,
            index,
            stats: CleanupStats::default(),
        }
    }

    /// Notify `decorations` around every removal.
    pub fn with_decorations(mut self, decorations: &'a mut dyn TrackDecorations) -> Self {
        self.decorations = Some(decorations);
        self
    }

    pub fn stats(&self) -> &CleanupStats {
        &self.stats
    }

    pub fn into_stats(self) -> CleanupStats {
        self.stats
    }

    /// Run the selected passes. Returns `true` if the board changed.
    pub fn cleanup_board(&mut self, options: &CleanupOptions) -> bool {
        tracing::info!(
            "Cleaning {} tracks (misconnected: {}, vias: {}, merge: {}, dangling: {})",
            self.board.track_count(),
            options.remove_misconnected,
            options.clean_vias,
            options.merge_segments,
            options.delete_dangling
        );

        if !options.any_enabled() {
            return false;
        }

        // Every pass relies on vias having a single position
        let mut modified = self.normalize_vias();
        self.build_track_connection_info();

        if options.clean_vias {
            modified |= self.clean_vias();
        }

        // Null segments go away with the merge pass, or on their own when
        // mis-connections are about to be checked
        if options.merge_segments {
            modified |= self.clean_segments();
        } else if options.remove_misconnected {
            modified |= self.delete_null_segments();
        }

        if options.remove_misconnected && self.remove_bad_track_segments() {
            modified = true;
            self.build_track_connection_info();
        }

        if options.delete_dangling {
            self.refresh_index();

            if self.delete_dangling_tracks() {
                modified = true;

                // Removing the stem of a T leaves the bar in two aligned pieces
                if options.merge_segments {
                    self.clean_segments();
                }
            }
        }

        tracing::info!(
            "Cleanup finished: {} items removed, {} tracks left",
            self.stats.total_removed(),
            self.board.track_count()
        );
        modified
    }

    /// Delete every track bridging two nets, and null segments.
    pub fn remove_misconnected_tracks(&mut self) -> bool {
        self.cleanup_board(&CleanupOptions {
            remove_misconnected: true,
            ..CleanupOptions::none()
        })
    }

    /// Rebuild the connectivity index from the board as it is now.
    pub fn build_track_connection_info(&mut self) {
        self.index = ConnectivityIndex::build(self.board);
    }

    /// The index as of the last rebuild.
    pub fn connectivity(&self) -> &ConnectivityIndex {
        &self.index
    }

    fn refresh_index(&mut self) {
        if !self.index.is_current(self.board) {
            self.build_track_connection_info();
        }
    }

    /// Force `end = start` on malformed vias.
    fn normalize_vias(&mut self) -> bool {
        let malformed: Vec<TrackId> = self
            .board
            .tracks()
            .filter(|(_, t)| t.is_via() && t.start != t.end)
            .map(|(id, _)| id)
            .collect();

        for &id in &malformed {
            if let Some(before) = self.board.modify_track(id, |t| t.end = t.start) {
                tracing::warn!(
                    "Malformed via {} with mismatching ends {} / {}, end reset to start",
                    before.uuid,
                    before.start,
                    before.end
                );
                if let Some(after) = self.board.track(id) {
                    self.commit.modified(id, &before, after);
                }
                self.stats.normalized_vias += 1;
            }
        }
        !malformed.is_empty()
    }

    /// Take a track off the board and report it.
    fn remove_track(&mut self, id: TrackId, reason: RemovalReason) -> Option<Track> {
        if let (Some(decorations), Some(track)) = (self.decorations.as_mut(), self.board.track(id)) {
            decorations.before_remove(track);
        }

        let track = self.board.remove_track(id)?;
        tracing::debug!(
            "Removed {} {} {}-{} net {}: {}",
            track.kind_name(),
            id,
            track.start,
            track.end,
            track.net,
            reason.describe()
        );
        self.commit.removed(id, &track, reason);
        self.stats.record(reason);
        Some(track)
    }

    /// Edit a track in place and report the change.
    fn modify_track<F>(&mut self, id: TrackId, edit: F) -> bool
    where
        F: FnOnce(&mut Track),
    {
        let Some(before) = self.board.modify_track(id, edit) else {
            return false;
        };
        if let Some(after) = self.board.track(id) {
            self.commit.modified(id, &before, after);
        }
        true
    }

    fn notify_reattach(&mut self, survivor: TrackId, removed: &Track) {
        if let (Some(decorations), Some(track)) =
            (self.decorations.as_mut(), self.board.track(survivor))
        {
            decorations.reattach(track, removed);
        }
    }
}
