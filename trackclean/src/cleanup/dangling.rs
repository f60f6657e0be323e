//! Dangling track removal.
//!
//! A track end is connected when it sits on a pad, on another item of the
//! same net, or inside a filled zone of its net. A via reached by a track
//! only counts if something else continues from it. Deleting a dangling
//! track can leave its neighbour dangling, so rounds repeat until one of them
//! deletes nothing.

use super::connectivity::Neighbors;
use super::TracksCleaner;
use crate::board::{Endpoint, RemovalReason, Track, TrackId, Zone};

impl TracksCleaner<'_> {
    pub(super) fn delete_dangling_tracks(&mut self) -> bool {
        if self.board.is_empty() {
            return false;
        }

        let mut modified = false;
        let mut round = 0;
        loop {
            self.refresh_index();

            let condemned: Vec<TrackId> = self
                .board
                .track_ids()
                .into_iter()
                .filter(|&id| self.is_dangling(id))
                .collect();
            if condemned.is_empty() {
                break;
            }

            round += 1;
            tracing::debug!("Dangling round {}: {} items", round, condemned.len());
            for id in condemned {
                self.remove_track(id, RemovalReason::Dangling);
            }
            modified = true;
        }

        if modified {
            tracing::info!(
                "Removed {} dangling items in {} rounds",
                self.stats.dangling,
                round
            );
        }
        modified
    }

    /// Should `id` go? Pad-anchored ends are never tested, and the end is
    /// only looked at when the start is fine.
    fn is_dangling(&self, id: TrackId) -> bool {
        let mut erase = false;
        if !self.index.on_pad(id, Endpoint::Start) {
            erase |= self.test_track_endpoint_dangling(id, Endpoint::Start);
        }
        if !erase && !self.index.on_pad(id, Endpoint::End) {
            erase |= self.test_track_endpoint_dangling(id, Endpoint::End);
        }
        erase
    }

    /// Is `endpoint` of `id` left unconnected?
    pub fn test_track_endpoint_dangling(&self, id: TrackId, endpoint: Endpoint) -> bool {
        let Some(track) = self.board.track(id) else {
            return false;
        };

        let first = self
            .index
            .first_connected_at(self.board, id, endpoint, Neighbors::same_net());

        let Some(other_id) = first else {
            return self.zone_for_track_endpoint(track, endpoint).is_none();
        };

        let Some(via) = self.board.track(other_id).filter(|t| t.is_through_via()) else {
            return false;
        };

        // A via on a pad is anchored like any other pad contact
        if self.index.on_pad(other_id, Endpoint::Start) {
            return false;
        }

        let exclude = [id];
        let beyond = self.index.items_at(
            self.board,
            other_id,
            via,
            via.start,
            Neighbors::same_net().excluding(&exclude),
        );
        beyond.is_empty() && self.zone_for_track_endpoint(via, Endpoint::Start).is_none()
    }

    /// Filled zone of the track's net under `endpoint`, on the track's layer
    /// or anywhere in a via's span.
    pub fn zone_for_track_endpoint(&self, track: &Track, endpoint: Endpoint) -> Option<&Zone> {
        let (top, bottom) = track.layer_pair();
        self.board
            .hit_test_filled_zone(track.endpoint(endpoint), top, bottom, track.net)
    }
}

#[cfg(test)]
mod tests {
    use crate::board::*;
    use crate::cleanup::tests::{smd_pad, trace};
    use crate::cleanup::{CleanupOptions, TracksCleaner};

    fn dangling_only() -> CleanupOptions {
        CleanupOptions {
            delete_dangling: true,
            ..CleanupOptions::none()
        }
    }

    fn clean(board: &mut Board, options: CleanupOptions) -> bool {
        let mut commit = BoardCommit::new();
        TracksCleaner::new(board, &mut commit).cleanup_board(&options)
    }

    fn square_zone(net: u32, layer: Layer, x: i64, y: i64, half: i64) -> Zone {
        Zone {
            net,
            fills: vec![ZoneFill {
                layer,
                outline: vec![
                    Point::new(x - half, y - half),
                    Point::new(x + half, y - half),
                    Point::new(x + half, y + half),
                    Point::new(x - half, y + half),
                ],
            }],
        }
    }

    /// Every surviving end is on a pad, a zone or another survivor.
    fn assert_all_connected(board: &Board) {
        for (id, track) in board.tracks() {
            for point in [track.start, track.end] {
                let layers = track.layer_set();
                let on_pad = board.pads_at(point, &layers).next().is_some();
                let on_track = board
                    .tracks()
                    .any(|(o, t)| o != id && t.has_endpoint_at(point) && t.layer_set().intersects(&layers));
                let (top, bottom) = track.layer_pair();
                let on_zone = board.hit_test_filled_zone(point, top, bottom, track.net).is_some();
                assert!(
                    on_pad || on_track || on_zone,
                    "Track {} has a dangling end at {}",
                    id,
                    point
                );
            }
        }
    }

    #[test]
    fn test_stub_is_removed() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(20, 0, 1));
        board.add_track(trace(0, 0, 20, 0, 1));
        let stub = board.add_track(trace(0, 0, 0, 10, 1));

        assert!(clean(&mut board, dangling_only()));
        assert!(!board.contains(stub));
        assert_eq!(board.track_count(), 1);
    }

    #[test]
    fn test_removal_cascades_to_fixed_point() {
        // Pad - a - b - c - (open), with a branch d hanging off the a/b corner
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        let a = board.add_track(trace(0, 0, 10, 0, 1));
        let b = board.add_track(trace(10, 0, 10, 10, 1));
        let c = board.add_track(trace(10, 10, 20, 10, 1));
        let d = board.add_track(trace(10, 0, 20, 0, 1));

        assert!(clean(&mut board, dangling_only()));

        // c and d dangle first, then b, then a is left with only its pad
        assert!(!board.contains(b));
        assert!(!board.contains(c));
        assert!(!board.contains(d));
        assert!(!board.contains(a));
        assert!(board.is_empty());
    }

    #[test]
    fn test_t_junction_cascade_then_remerge() {
        // Crossbar between two pads, split at the stem. The stem leads to an
        // open end, so it goes, and the crossbar halves merge back
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(20, 0, 1));
        board.add_track(trace(0, 0, 10, 0, 1));
        board.add_track(trace(10, 0, 20, 0, 1));
        let stem_top = board.add_track(trace(10, 0, 10, 10, 1));
        let stem_bottom = board.add_track(trace(10, 10, 15, 15, 1));

        assert!(clean(&mut board, CleanupOptions::default()));

        assert!(!board.contains(stem_top));
        assert!(!board.contains(stem_bottom));
        assert_eq!(board.track_count(), 1);
        assert_all_connected(&board);
    }

    #[test]
    fn test_zone_keeps_track_end() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_zone(square_zone(1, Layer::FRONT, 100, 0, 20));
        let feed = board.add_track(trace(0, 0, 100, 0, 1));

        assert!(!clean(&mut board, dangling_only()));
        assert!(board.contains(feed));
    }

    #[test]
    fn test_zone_of_other_net_or_layer_does_not_count() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_zone(square_zone(2, Layer::FRONT, 100, 0, 20));
        board.add_zone(square_zone(1, Layer::BACK, 100, 0, 20));
        let feed = board.add_track(trace(0, 0, 100, 0, 1));

        assert!(clean(&mut board, dangling_only()));
        assert!(!board.contains(feed));
    }

    #[test]
    fn test_via_leading_nowhere_does_not_save_track() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        let feed = board.add_track(trace(0, 0, 50, 0, 1));
        let via = board.add_track(Track::via(Point::new(50, 0), 600, 1, ViaInfo::through(300)));

        assert!(clean(&mut board, dangling_only()));
        assert!(!board.contains(feed));
        assert!(!board.contains(via), "Orphaned via goes in the next round");
    }

    #[test]
    fn test_via_to_other_layer_keeps_both_tracks() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        let mut back_pad = smd_pad(90, 0, 1);
        back_pad.layers = LayerSet::single(Layer::BACK);
        board.add_pad(back_pad);

        board.add_track(trace(0, 0, 50, 0, 1));
        board.add_track(Track::via(Point::new(50, 0), 600, 1, ViaInfo::through(300)));
        let mut bottom = trace(50, 0, 90, 0, 1);
        bottom.layer = Layer::BACK;
        board.add_track(bottom);

        assert!(!clean(&mut board, dangling_only()));
        assert_eq!(board.track_count(), 3);
    }

    #[test]
    fn test_via_inside_zone_keeps_track() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_zone(square_zone(1, Layer::BACK, 50, 0, 10));
        board.add_track(trace(0, 0, 50, 0, 1));
        board.add_track(Track::via(Point::new(50, 0), 600, 1, ViaInfo::through(300)));

        assert!(!clean(&mut board, dangling_only()));
        assert_eq!(board.track_count(), 2);
    }

    #[test]
    fn test_other_net_neighbour_does_not_connect() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(20, 0, 2));
        let a = board.add_track(trace(0, 0, 10, 0, 1));
        let b = board.add_track(trace(10, 0, 20, 0, 2));

        assert!(clean(&mut board, dangling_only()));
        assert!(!board.contains(a));
        assert!(!board.contains(b));
    }
}
