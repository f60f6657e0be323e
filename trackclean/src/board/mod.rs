//! In-memory board
//!
//! The board owns every copper item the cleaner looks at. Tracks live in an
//! arena of slots: a [`TrackId`] is the slot index, slot order is the track
//! sequence, and removing a track empties its slot without disturbing any
//! other identifier. Every structural mutation bumps the board revision so
//! derived data (the cleaner's connectivity index) can tell it is stale.

pub mod commit;
pub mod convert;
pub mod islands;
pub mod model;

pub use commit::{BoardCommit, CommitEntry, CommitLog, RemovalReason, UndoRecord};
pub use model::*;

use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct Board {
    tracks: Vec<Option<Track>>,
    pads: Vec<Pad>,
    zones: Vec<Zone>,
    revision: u64,
}

/// Item counts, used by the CLI `stats` output and cleanup reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub traces: usize,
    pub arcs: usize,
    pub vias: usize,
    pub pads: usize,
    pub zones: usize,
    pub nets: usize,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track at the end of the sequence.
    pub fn add_track(&mut self, track: Track) -> TrackId {
        self.tracks.push(Some(track));
        self.revision += 1;
        TrackId(self.tracks.len() - 1)
    }

    pub fn add_pad(&mut self, pad: Pad) -> PadId {
        self.pads.push(pad);
        self.revision += 1;
        PadId(self.pads.len() - 1)
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.push(zone);
        self.revision += 1;
    }

    /// Monotonic counter of structural changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.track(id).is_some()
    }

    /// Live tracks in sequence order.
    pub fn tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|t| (TrackId(i), t)))
    }

    /// Live tracks following `id` in the sequence.
    pub fn tracks_after(&self, id: TrackId) -> impl Iterator<Item = (TrackId, &Track)> {
        let from = (id.0 + 1).min(self.tracks.len());
        self.tracks[from..]
            .iter()
            .enumerate()
            .filter_map(move |(i, slot)| slot.as_ref().map(|t| (TrackId(from + i), t)))
    }

    /// Snapshot of live track ids, for scans that mutate the board.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks().map(|(id, _)| id).collect()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.track_count() == 0
    }

    /// Apply `edit` to a track and return a copy of it as it was before.
    pub fn modify_track<F>(&mut self, id: TrackId, edit: F) -> Option<Track>
    where
        F: FnOnce(&mut Track),
    {
        let track = self.tracks.get_mut(id.0)?.as_mut()?;
        let before = track.clone();
        edit(track);
        self.revision += 1;
        Some(before)
    }

    /// Remove a track from the board, handing it back to the caller.
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let removed = self.tracks.get_mut(id.0)?.take();
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Put a track back into its original slot (undo of a removal or edit).
    pub fn restore_track(&mut self, id: TrackId, track: Track) {
        if id.0 >= self.tracks.len() {
            self.tracks.resize(id.0 + 1, None);
        }
        self.tracks[id.0] = Some(track);
        self.revision += 1;
    }

    /// Stable sort of the track sequence by net code.
    ///
    /// Compacts the arena, so every previously issued [`TrackId`] is void.
    pub fn sort_tracks_by_net(&mut self) {
        let mut live: Vec<Track> = self.tracks.drain(..).flatten().collect();
        live.sort_by_key(|t| t.net);
        self.tracks = live.into_iter().map(Some).collect();
        self.revision += 1;
    }

    pub fn pads(&self) -> impl Iterator<Item = (PadId, &Pad)> {
        self.pads.iter().enumerate().map(|(i, p)| (PadId(i), p))
    }

    pub fn pad(&self, id: PadId) -> Option<&Pad> {
        self.pads.get(id.0)
    }

    pub fn pads_in_net(&self, net: u32) -> impl Iterator<Item = (PadId, &Pad)> {
        self.pads().filter(move |(_, p)| p.net == net)
    }

    /// Pads located exactly at `point` on any of `layers`.
    pub fn pads_at<'a>(
        &'a self,
        point: Point,
        layers: &'a LayerSet,
    ) -> impl Iterator<Item = (PadId, &'a Pad)> + 'a {
        self.pads().filter(move |(_, p)| p.hit_test(point, layers))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// First filled zone of `net` covering `point` on a layer in `top..=bottom`.
    pub fn hit_test_filled_zone(
        &self,
        point: Point,
        top: Layer,
        bottom: Layer,
        net: u32,
    ) -> Option<&Zone> {
        self.zones
            .iter()
            .filter(|z| z.net == net)
            .find(|z| z.hit_test_filled_area(point, top, bottom))
    }

    /// Routed length of a net in nanometres (vias contribute nothing).
    pub fn net_length(&self, net: u32) -> f64 {
        self.tracks()
            .filter(|(_, t)| t.net == net && !t.is_via())
            .map(|(_, t)| t.length())
            .sum()
    }

    /// Distinct net codes carried by tracks or pads, ascending. Net 0 is skipped.
    pub fn nets(&self) -> Vec<u32> {
        let mut nets: Vec<u32> = self
            .tracks()
            .map(|(_, t)| t.net)
            .chain(self.pads.iter().map(|p| p.net))
            .filter(|&n| n != 0)
            .collect();
        nets.sort_unstable();
        nets.dedup();
        nets
    }

    pub fn summary(&self) -> BoardSummary {
        let vias = self.tracks().filter(|(_, t)| t.is_via()).count();
        let arcs = self.tracks().filter(|(_, t)| t.is_arc()).count();
        BoardSummary {
            traces: self.track_count() - vias - arcs,
            arcs,
            vias,
            pads: self.pads.len(),
            zones: self.zones.len(),
            nets: self.nets().len(),
        }
    }
}
