//! Copper island analysis
//!
//! Counts, per net, how many electrically separate groups of copper the board
//! holds. Tracks, vias and pads are graph nodes; touching endpoints on a
//! shared layer, or an endpoint landing on a pad, are edges. A fully routed
//! net is a single island; every extra island is one missing connection in
//! the host's ratsnest.

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::model::{PadId, Point, TrackId};
use super::Board;

/// A node of the copper graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopperNode {
    Track(TrackId),
    Pad(PadId),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NetIslands {
    pub net: u32,
    pub items: usize,
    pub islands: usize,
}

impl NetIslands {
    /// Connections still missing for this net to be fully routed.
    pub fn unrouted(&self) -> usize {
        self.islands.saturating_sub(1)
    }
}

/// Build the copper graph of a single net.
pub fn net_graph(board: &Board, net: u32) -> UnGraph<CopperNode, ()> {
    let mut graph = UnGraph::new_undirected();
    let mut at_point: HashMap<Point, Vec<NodeIndex>> = HashMap::new();

    for (id, track) in board.tracks().filter(|(_, t)| t.net == net) {
        let node = graph.add_node(CopperNode::Track(id));
        at_point.entry(track.start).or_default().push(node);
        if track.end != track.start {
            at_point.entry(track.end).or_default().push(node);
        }
    }

    let mut edges = Vec::new();
    for nodes in at_point.values() {
        for (i, &a) in nodes.iter().enumerate() {
            for &b in &nodes[i + 1..] {
                if let (CopperNode::Track(ta), CopperNode::Track(tb)) = (graph[a], graph[b]) {
                    let (Some(ta), Some(tb)) = (board.track(ta), board.track(tb)) else {
                        continue;
                    };
                    if ta.layer_set().intersects(&tb.layer_set()) {
                        edges.push((a, b));
                    }
                }
            }
        }
    }

    for (pad_id, pad) in board.pads_in_net(net) {
        let node = graph.add_node(CopperNode::Pad(pad_id));
        if let Some(nodes) = at_point.get(&pad.position) {
            for &other in nodes {
                if let CopperNode::Track(tid) = graph[other] {
                    let touches = board
                        .track(tid)
                        .map(|t| pad.hit_test(pad.position, &t.layer_set()))
                        .unwrap_or(false);
                    if touches {
                        edges.push((node, other));
                    }
                }
            }
        }
    }

    for (a, b) in edges {
        graph.add_edge(a, b, ());
    }
    graph
}

/// Island count of every net on the board, keyed by net code.
pub fn count_islands(board: &Board) -> BTreeMap<u32, NetIslands> {
    board
        .nets()
        .into_iter()
        .map(|net| {
            let graph = net_graph(board, net);
            let islands = NetIslands {
                net,
                items: graph.node_count(),
                islands: connected_components(&graph),
            };
            (net, islands)
        })
        .collect()
}

/// Sum of missing connections over all nets.
pub fn total_unrouted(islands: &BTreeMap<u32, NetIslands>) -> usize {
    islands.values().map(NetIslands::unrouted).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::model::*;

    fn smd_pad(x: i64, y: i64, net: u32) -> Pad {
        Pad {
            reference: "U1".to_string(),
            number: "1".to_string(),
            position: Point::new(x, y),
            net,
            layers: LayerSet::single(Layer::FRONT),
            kind: PadKind::Smd,
        }
    }

    #[test]
    fn test_routed_net_is_one_island() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 1));
        board.add_pad(smd_pad(20, 0, 1));
        board.add_track(Track::trace(Point::new(0, 0), Point::new(10, 0), 100, Layer::FRONT, 1));
        board.add_track(Track::trace(Point::new(10, 0), Point::new(20, 0), 100, Layer::FRONT, 1));

        let islands = count_islands(&board);
        assert_eq!(islands[&1].islands, 1);
        assert_eq!(islands[&1].items, 4);
        assert_eq!(total_unrouted(&islands), 0);
    }

    #[test]
    fn test_layer_change_without_via_splits_net() {
        let mut board = Board::new();
        board.add_track(Track::trace(Point::new(0, 0), Point::new(10, 0), 100, Layer::FRONT, 1));
        board.add_track(Track::trace(Point::new(10, 0), Point::new(20, 0), 100, Layer::BACK, 1));
        assert_eq!(count_islands(&board)[&1].islands, 2);

        board.add_track(Track::via(Point::new(10, 0), 600, 1, ViaInfo::through(300)));
        assert_eq!(count_islands(&board)[&1].islands, 1);
    }

    #[test]
    fn test_unconnected_pads_count_as_islands() {
        let mut board = Board::new();
        board.add_pad(smd_pad(0, 0, 2));
        board.add_pad(smd_pad(50, 0, 2));
        board.add_pad(smd_pad(90, 0, 2));
        let islands = count_islands(&board);
        assert_eq!(islands[&2].unrouted(), 2);
    }
}
