//! Collinear segment merging.
//!
//! Two traces of the same width meeting end to end on a straight line, with
//! nothing else at the junction, become one trace: the reference keeps its
//! identity and stretches over the neighbour, which is deleted.

use super::connectivity::Neighbors;
use super::geometry;
use super::TracksCleaner;
use crate::board::{Endpoint, RemovalReason, TrackId};

impl TracksCleaner<'_> {
    /// Try both endpoints of `id`. Returns `true` after the first merge; the
    /// caller retries since the stretched track may merge again.
    pub(super) fn merge_collinear_of_track(&mut self, id: TrackId) -> bool {
        for endpoint in Endpoint::BOTH {
            self.refresh_index();

            let attached = self
                .index
                .connected_at(self.board, id, endpoint, Neighbors::same_net());

            // A branch or a via at the junction blocks the merge
            let &[other] = attached.as_slice() else {
                continue;
            };

            if self.merge_collinear_segment_if_possible(id, other, endpoint) {
                return true;
            }
        }
        false
    }

    /// Merge `candidate` into `id` across `endpoint` when the geometry allows.
    ///
    /// A pad-anchored endpoint never moves. The stretched endpoint ends up
    /// wherever the candidate's far end was, pad included.
    pub(super) fn merge_collinear_segment_if_possible(
        &mut self,
        id: TrackId,
        candidate: TrackId,
        endpoint: Endpoint,
    ) -> bool {
        let (Some(track), Some(other)) = (self.board.track(id), self.board.track(candidate)) else {
            return false;
        };

        if !geometry::can_merge_kinds(track, other) {
            return false;
        }

        // Same segment twice: the candidate is redundant as it is
        if geometry::same_endpoints(track, other) {
            if let Some(removed) = self.remove_track(candidate, RemovalReason::MergedCollinear) {
                self.notify_reattach(id, &removed);
            }
            return true;
        }

        if !geometry::are_collinear(track, other) {
            return false;
        }

        if self.index.on_pad(id, endpoint) {
            return false;
        }

        let near = track.endpoint(endpoint);
        let far = if other.start == near { other.end } else { other.start };

        tracing::debug!(
            "Merging {} into {}: {} moves from {} to {}",
            candidate,
            id,
            if endpoint == Endpoint::Start { "start" } else { "end" },
            near,
            far
        );

        self.modify_track(id, |t| t.set_endpoint(endpoint, far));
        if let Some(removed) = self.remove_track(candidate, RemovalReason::MergedCollinear) {
            self.notify_reattach(id, &removed);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::board::*;
    use crate::cleanup::geometry::same_endpoints;
    use crate::cleanup::tests::{smd_pad, trace};
    use crate::cleanup::{CleanupOptions, TracksCleaner};

    fn merge(board: &mut Board) -> (bool, BoardCommit) {
        let mut commit = BoardCommit::new();
        let modified = TracksCleaner::new(board, &mut commit).cleanup_board(&CleanupOptions {
            merge_segments: true,
            ..CleanupOptions::none()
        });
        (modified, commit)
    }

    fn only_track(board: &Board) -> &Track {
        let tracks: Vec<&Track> = board.tracks().map(|(_, t)| t).collect();
        assert_eq!(tracks.len(), 1, "Expected a single track, got {:?}", tracks);
        tracks[0]
    }

    #[test]
    fn test_two_segments_merge_and_keep_length() {
        let mut board = Board::new();
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        let length_before = board.net_length(1);

        let (modified, _) = merge(&mut board);

        assert!(modified);
        assert_eq!(only_track(&board).start, Point::new(0, 0));
        assert_eq!(only_track(&board).end, Point::new(20, 0));
        assert_eq!(board.net_length(1), length_before);
    }

    #[test]
    fn test_chain_collapses_to_one_segment() {
        let mut board = Board::new();
        // Scrambled sequence and mixed directions
        board.add_track(trace(20, 20, 10, 10, 1));
        board.add_track(trace(0, 0, 10, 10, 1));
        board.add_track(trace(20, 20, 30, 30, 1));

        merge(&mut board);

        assert!(same_endpoints(only_track(&board), &trace(0, 0, 30, 30, 1)));
    }

    #[test]
    fn test_survivor_keeps_identity() {
        let mut board = Board::new();
        let a = board.add_track(trace(0, 0, 10, 0, 1));
        let b = board.add_track(trace(10, 0, 20, 0, 1));
        let uuid = board.track(a).unwrap().uuid.clone();

        let (_, commit) = merge(&mut board);

        assert!(!board.contains(b));
        assert_eq!(board.track(a).unwrap().uuid, uuid);
        assert!(commit.entries().iter().any(|e| matches!(
            e,
            CommitEntry::Modified { id, .. } if *id == a
        )));
    }

    #[test]
    fn test_pad_at_junction_blocks_merge() {
        let mut board = Board::new();
        board.add_pad(smd_pad(10, 0, 1));
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));

        let (modified, _) = merge(&mut board);

        assert!(!modified);
        assert_eq!(board.track_count(), 2);
    }

    #[test]
    fn test_branch_blocks_merge() {
        let mut board = Board::new();
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        board.add_track(trace(10, 0, 10, 10, 1));

        let (modified, _) = merge(&mut board);

        assert!(!modified);
        assert_eq!(board.track_count(), 3);
    }

    #[test]
    fn test_via_at_junction_blocks_merge() {
        let mut board = Board::new();
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        board.add_track(Track::via(Point::new(10, 0), 600, 1, ViaInfo::through(300)));

        let (modified, _) = merge(&mut board);
        assert!(!modified);
    }

    #[test]
    fn test_width_or_angle_mismatch_blocks_merge() {
        let mut board = Board::new();
        board.add_track(trace(0, 0, 10, 0, 1));
        let mut wide = trace(10, 0, 20, 0, 1);
        wide.width = 400;
        board.add_track(wide);
        board.add_track(trace(0, 0, -10, 5, 1));

        let (modified, _) = merge(&mut board);
        assert!(!modified);
        assert_eq!(board.track_count(), 3);
    }

    #[test]
    fn test_other_net_does_not_block_or_merge() {
        let mut board = Board::new();
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        board.add_track(trace(10, 0, 10, 10, 2));

        merge(&mut board);

        assert_eq!(board.summary().traces, 2);
        let net1: Vec<&Track> = board.tracks().map(|(_, t)| t).filter(|t| t.net == 1).collect();
        assert_eq!(net1.len(), 1);
        assert_eq!(net1[0].end, Point::new(20, 0));
    }

    #[test]
    fn test_far_pad_flag_is_carried() {
        // A-B-C with a pad at C: after A-B merges into A-C the new end sits
        // on the pad, so a collinear D beyond the pad must stay separate
        let mut board = Board::new();
        board.add_pad(smd_pad(20, 0, 1));
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        board.add_track(trace(20, 0, 30, 0, 1));

        merge(&mut board);

        assert_eq!(board.track_count(), 2);
        assert!(board
            .tracks()
            .any(|(_, t)| same_endpoints(t, &trace(0, 0, 20, 0, 1))));
    }
}
