//! Null segments, stacked vias and duplicated segments.

use super::geometry;
use super::TracksCleaner;
use crate::board::{Pad, RemovalReason, TrackId};

impl TracksCleaner<'_> {
    /// Delete every zero-length trace.
    pub(super) fn delete_null_segments(&mut self) -> bool {
        let null: Vec<TrackId> = self
            .board
            .tracks()
            .filter(|(_, t)| geometry::is_null(t))
            .map(|(id, _)| id)
            .collect();

        for &id in &null {
            self.remove_track(id, RemovalReason::NullSegment);
        }
        !null.is_empty()
    }

    /// Delete through vias stacked on an earlier one, and through vias
    /// sitting on a pad that already spans every copper layer.
    ///
    /// Blind, buried and micro vias are left alone.
    pub(super) fn clean_vias(&mut self) -> bool {
        self.refresh_index();
        let mut modified = false;

        for id in self.board.track_ids() {
            let is_candidate = self.board.track(id).map_or(false, |t| t.is_through_via());
            if !is_candidate {
                continue;
            }

            modified |= self.remove_duplicates_of_via(id);

            // Removals above do not move anything, so the pad contacts
            // recorded for this via are still exact
            let on_through_pad = self.index.connections(id).map_or(false, |conn| {
                conn.pads
                    .iter()
                    .filter_map(|&pad| self.board.pad(pad))
                    .any(Pad::is_on_all_copper_layers)
            });
            if on_through_pad && self.remove_track(id, RemovalReason::ViaOnThroughPad).is_some() {
                modified = true;
            }
        }
        modified
    }

    fn remove_duplicates_of_via(&mut self, id: TrackId) -> bool {
        let Some(via) = self.board.track(id).cloned() else {
            return false;
        };

        let stacked: Vec<TrackId> = self
            .board
            .tracks_after(id)
            .filter(|(_, other)| geometry::is_duplicate_via(&via, other))
            .map(|(other_id, _)| other_id)
            .collect();

        for &other in &stacked {
            self.remove_track(other, RemovalReason::DuplicateVia);
        }
        !stacked.is_empty()
    }

    /// Delete later copies of `id` within its net run.
    ///
    /// Tracks are net-sorted, so the scan stops at the first track of
    /// another net.
    pub(super) fn remove_duplicates_of_track(&mut self, id: TrackId) -> bool {
        let Some(track) = self.board.track(id).cloned() else {
            return false;
        };

        let duplicates: Vec<TrackId> = self
            .board
            .tracks_after(id)
            .take_while(|(_, other)| other.net == track.net)
            .filter(|(_, other)| geometry::is_duplicate_track(&track, other))
            .map(|(other_id, _)| other_id)
            .collect();

        for &dup in &duplicates {
            if let Some(removed) = self.remove_track(dup, RemovalReason::DuplicateTrack) {
                self.notify_reattach(id, &removed);
            }
        }
        !duplicates.is_empty()
    }

    /// Null segments, then duplicates, then collinear merges.
    pub(super) fn clean_segments(&mut self) -> bool {
        let mut modified = self.delete_null_segments();

        for id in self.board.track_ids() {
            modified |= self.remove_duplicates_of_track(id);
        }

        for id in self.board.track_ids() {
            // Retry the same track after each merge: its new end may line up
            // with the next segment of the run
            while self.board.track(id).map_or(false, |t| t.is_trace())
                && self.merge_collinear_of_track(id)
            {
                modified = true;
            }
        }
        modified
    }
}

#[cfg(test)]
mod tests {
    use crate::board::*;
    use crate::cleanup::tests::{smd_pad, trace};
    use crate::cleanup::{CleanupOptions, TracksCleaner};

    fn through_via(x: i64, y: i64, net: u32) -> Track {
        Track::via(Point::new(x, y), 600, net, ViaInfo::through(300))
    }

    fn clean(board: &mut Board, options: CleanupOptions) -> BoardCommit {
        let mut commit = BoardCommit::new();
        TracksCleaner::new(board, &mut commit).cleanup_board(&options);
        commit
    }

    fn vias_only() -> CleanupOptions {
        CleanupOptions {
            clean_vias: true,
            ..CleanupOptions::none()
        }
    }

    fn merge_only() -> CleanupOptions {
        CleanupOptions {
            merge_segments: true,
            ..CleanupOptions::none()
        }
    }

    #[test]
    fn test_null_segments_removed_by_merge_pass() {
        let mut board = Board::new();
        board.add_track(trace(5, 5, 5, 5, 1));
        board.add_track(trace(7, 7, 7, 7, 2));
        board.add_track(Track::via(Point::new(1, 1), 600, 1, ViaInfo::through(300)));

        clean(&mut board, merge_only());

        assert!(board.tracks().all(|(_, t)| !crate::cleanup::geometry::is_null(t)));
        assert_eq!(board.summary().vias, 1, "Vias are never null segments");
    }

    #[test]
    fn test_null_segments_removed_when_checking_misconnections() {
        let mut board = Board::new();
        board.add_track(trace(5, 5, 5, 5, 1));
        clean(
            &mut board,
            CleanupOptions {
                remove_misconnected: true,
                ..CleanupOptions::none()
            },
        );
        assert!(board.is_empty());
    }

    #[test]
    fn test_duplicate_vias_keep_earliest() {
        let mut board = Board::new();
        let first = board.add_track(through_via(100, 100, 1));
        let second = board.add_track(through_via(100, 100, 1));
        let third = board.add_track(through_via(100, 100, 2));
        let elsewhere = board.add_track(through_via(200, 100, 1));

        let commit = clean(&mut board, vias_only());

        assert!(board.contains(first));
        assert!(!board.contains(second));
        assert!(!board.contains(third));
        assert!(board.contains(elsewhere));
        assert_eq!(commit.removed_count(), 2);
    }

    #[test]
    fn test_micro_vias_are_not_deduplicated() {
        let mut board = Board::new();
        let micro = ViaInfo {
            via_type: ViaType::Micro,
            top: Layer::FRONT,
            bottom: Layer(1),
            drill: 100,
        };
        board.add_track(Track::via(Point::new(0, 0), 300, 1, micro));
        board.add_track(Track::via(Point::new(0, 0), 300, 1, micro));

        let commit = clean(&mut board, vias_only());
        assert!(commit.is_empty());
        assert_eq!(board.track_count(), 2);
    }

    #[test]
    fn test_via_on_through_hole_pad_is_removed() {
        let mut board = Board::new();
        board.add_pad(Pad {
            reference: "J1".to_string(),
            number: "1".to_string(),
            position: Point::new(0, 0),
            net: 1,
            layers: LayerSet::all_copper(),
            kind: PadKind::ThroughHole,
        });
        board.add_pad(smd_pad(50, 0, 1));
        let on_th = board.add_track(through_via(0, 0, 1));
        let on_smd = board.add_track(through_via(50, 0, 1));

        let commit = clean(&mut board, vias_only());

        assert!(!board.contains(on_th));
        assert!(board.contains(on_smd), "An SMD pad does not make a via redundant");
        assert!(matches!(
            commit.entries()[0],
            CommitEntry::Removed { reason: RemovalReason::ViaOnThroughPad, .. }
        ));
    }

    #[test]
    fn test_duplicate_tracks_within_net_run() {
        let mut board = Board::new();
        let a = board.add_track(trace(0, 0, 10, 0, 1));
        let b = board.add_track(trace(10, 0, 0, 0, 1));
        let mut back = trace(0, 0, 10, 0, 1);
        back.layer = Layer::BACK;
        let c = board.add_track(back);
        let d = board.add_track(trace(0, 0, 10, 0, 2));

        clean(&mut board, merge_only());

        assert!(board.contains(a));
        assert!(!board.contains(b));
        assert!(board.contains(c), "Copy on another layer is not a duplicate");
        assert!(board.contains(d), "Copy on another net is not a duplicate");
    }

    #[test]
    fn test_duplicate_scan_stops_at_net_change() {
        let mut board = Board::new();
        let a = board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(50, 0, 60, 0, 2));
        let unsorted_copy = board.add_track(trace(0, 0, 10, 0, 1));

        let mut commit = BoardCommit::new();
        let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
        assert!(!cleaner.remove_duplicates_of_track(a));
        drop(cleaner);

        assert!(board.contains(unsorted_copy));
        assert!(commit.is_empty());
    }
}
