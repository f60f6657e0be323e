//! Connectivity index
//!
//! Per-track contact data for one cleanup pass: which pads sit on each
//! endpoint and which other tracks share an endpoint on a common layer. The
//! index is a snapshot. It records the board revision it was built from and
//! must be rebuilt, never patched, after any removal or endpoint move.

use std::collections::HashMap;

use crate::board::{Board, Endpoint, PadId, Point, Track, TrackId};

/// Contacts of a single track.
#[derive(Debug, Clone, Default)]
pub struct TrackConnections {
    /// Pad under the start point, if any.
    pub start_pad: Option<PadId>,
    /// Pad under the end point, if any.
    pub end_pad: Option<PadId>,
    /// Every pad touching either endpoint, any net.
    pub pads: Vec<PadId>,
    /// Every other track touching either endpoint, any net, sequence order.
    pub tracks: Vec<TrackId>,
    /// Transient "to be removed" flag of the running pass.
    pub marked: bool,
}

impl TrackConnections {
    pub fn start_on_pad(&self) -> bool {
        self.start_pad.is_some()
    }

    pub fn end_on_pad(&self) -> bool {
        self.end_pad.is_some()
    }

    pub fn on_pad(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Start => self.start_on_pad(),
            Endpoint::End => self.end_on_pad(),
        }
    }
}

/// Filter for connected-track queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors<'a> {
    /// Only return tracks on the querying track's net.
    pub same_net: bool,
    /// Tracks that must not be returned, besides the querying track.
    pub exclude: &'a [TrackId],
}

impl<'a> Neighbors<'a> {
    pub fn same_net() -> Self {
        Self {
            same_net: true,
            exclude: &[],
        }
    }

    pub fn any_net() -> Self {
        Self::default()
    }

    pub fn excluding(mut self, exclude: &'a [TrackId]) -> Self {
        self.exclude = exclude;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityIndex {
    revision: u64,
    connections: HashMap<TrackId, TrackConnections>,
    endpoints: HashMap<Point, Vec<TrackId>>,
}

impl ConnectivityIndex {
    /// Scan every track and pad of the board once.
    pub fn build(board: &Board) -> Self {
        let mut endpoints: HashMap<Point, Vec<TrackId>> = HashMap::new();
        for (id, track) in board.tracks() {
            endpoints.entry(track.start).or_default().push(id);
            if track.end != track.start {
                endpoints.entry(track.end).or_default().push(id);
            }
        }

        let mut pads_by_point: HashMap<Point, Vec<PadId>> = HashMap::new();
        for (pad_id, pad) in board.pads() {
            pads_by_point.entry(pad.position).or_default().push(pad_id);
        }

        let mut connections = HashMap::with_capacity(endpoints.len());
        for (id, track) in board.tracks() {
            let layers = track.layer_set();
            let mut conn = TrackConnections::default();

            for endpoint in Endpoint::BOTH {
                let point = track.endpoint(endpoint);
                let pads = pads_by_point.get(&point).map(Vec::as_slice).unwrap_or(&[]);
                for &pad_id in pads {
                    if !board.pad(pad_id).map_or(false, |p| p.hit_test(point, &layers)) {
                        continue;
                    }
                    if !conn.pads.contains(&pad_id) {
                        conn.pads.push(pad_id);
                    }
                    let slot = match endpoint {
                        Endpoint::Start => &mut conn.start_pad,
                        Endpoint::End => &mut conn.end_pad,
                    };
                    slot.get_or_insert(pad_id);
                }

                for &other in endpoints.get(&point).map(Vec::as_slice).unwrap_or(&[]) {
                    if other == id || conn.tracks.contains(&other) {
                        continue;
                    }
                    let shares_layer = board
                        .track(other)
                        .map_or(false, |o| o.layer_set().intersects(&layers));
                    if shares_layer {
                        conn.tracks.push(other);
                    }
                }
            }

            conn.tracks.sort_unstable();
            connections.insert(id, conn);
        }

        Self {
            revision: board.revision(),
            connections,
            endpoints,
        }
    }

    /// Built from the board as it is now?
    pub fn is_current(&self, board: &Board) -> bool {
        self.revision == board.revision()
    }

    pub fn connections(&self, id: TrackId) -> Option<&TrackConnections> {
        self.connections.get(&id)
    }

    pub fn on_pad(&self, id: TrackId, endpoint: Endpoint) -> bool {
        self.connections
            .get(&id)
            .map_or(false, |c| c.on_pad(endpoint))
    }

    pub fn set_marked(&mut self, id: TrackId, marked: bool) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.marked = marked;
        }
    }

    pub fn is_marked(&self, id: TrackId) -> bool {
        self.connections.get(&id).map_or(false, |c| c.marked)
    }

    pub fn clear_marks(&mut self) {
        for conn in self.connections.values_mut() {
            conn.marked = false;
        }
    }

    /// Marked tracks in sequence order.
    pub fn marked(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.marked)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Items located at `point` that conduct on a layer shared with `track`,
    /// in sequence order.
    pub fn items_at(
        &self,
        board: &Board,
        track_id: TrackId,
        track: &Track,
        point: Point,
        filter: Neighbors<'_>,
    ) -> Vec<TrackId> {
        let layers = track.layer_set();
        let Some(candidates) = self.endpoints.get(&point) else {
            return Vec::new();
        };

        let mut found: Vec<TrackId> = candidates
            .iter()
            .copied()
            .filter(|&other| other != track_id && !filter.exclude.contains(&other))
            .filter(|&other| match board.track(other) {
                Some(o) => {
                    o.has_endpoint_at(point)
                        && o.layer_set().intersects(&layers)
                        && (!filter.same_net || o.net == track.net)
                }
                None => false,
            })
            .collect();
        found.sort_unstable();
        found
    }

    /// Tracks touching `endpoint` of `id`, in sequence order.
    pub fn connected_at(
        &self,
        board: &Board,
        id: TrackId,
        endpoint: Endpoint,
        filter: Neighbors<'_>,
    ) -> Vec<TrackId> {
        match board.track(id) {
            Some(track) => self.items_at(board, id, track, track.endpoint(endpoint), filter),
            None => Vec::new(),
        }
    }

    /// First track in sequence order touching `endpoint` of `id`.
    pub fn first_connected_at(
        &self,
        board: &Board,
        id: TrackId,
        endpoint: Endpoint,
        filter: Neighbors<'_>,
    ) -> Option<TrackId> {
        self.connected_at(board, id, endpoint, filter).into_iter().next()
    }
}
