//! Removal of tracks that short two nets.

use super::TracksCleaner;
use crate::board::{RemovalReason, TrackId};

impl TracksCleaner<'_> {
    /// Mark, then delete, every track touching a pad or a track of another net.
    ///
    /// A track is not marked for touching a foreign track that is already
    /// marked, so only one side of a short is removed. Which side depends on
    /// the track sequence.
    pub(super) fn remove_bad_track_segments(&mut self) -> bool {
        self.build_track_connection_info();
        self.index.clear_marks();

        let board = &*self.board;
        for (id, track) in board.tracks() {
            let Some(conn) = self.index.connections(id) else {
                continue;
            };

            let pad_short = conn
                .pads
                .iter()
                .filter_map(|&pad| board.pad(pad))
                .any(|pad| pad.net != track.net);

            let track_short = conn.tracks.iter().any(|&other| {
                board.track(other).map_or(false, |o| o.net != track.net)
                    && !self.index.is_marked(other)
            });

            if pad_short || track_short {
                self.index.set_marked(id, true);
            }
        }

        let marked: Vec<TrackId> = self.index.marked();
        if !marked.is_empty() {
            tracing::info!("Removing {} tracks connecting different nets", marked.len());
        }
        for &id in &marked {
            self.remove_track(id, RemovalReason::MisConnected);
        }
        !marked.is_empty()
    }
}
