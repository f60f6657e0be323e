//! Optional observer for decorations attached to tracks (teardrops, rounded
//! corners and the like). The cleaner calls it around removals; nothing in
//! the cleanup result depends on it.

use crate::board::Track;

pub trait TrackDecorations {
    /// `track` is about to be removed from the board.
    fn before_remove(&mut self, _track: &Track) {}

    /// `removed` was absorbed by `survivor` (duplicate or collinear merge).
    fn reattach(&mut self, _survivor: &Track, _removed: &Track) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecorations;

impl TrackDecorations for NoDecorations {}
