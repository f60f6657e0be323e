//! Board construction from a parsed PCB file
//!
//! Converts the millimetre-based file schema into the integer board model:
//! pads get absolute positions, layer names become layer masks, and tracks
//! are stored net-sorted the way the editor keeps them. The returned
//! [`LoadedBoard`] remembers which document node every track came from so
//! that a cleaned board can be written back.

use std::collections::HashMap;

use super::model::*;
use super::Board;
use crate::parser::pcb_schema::{self, PadType, PcbDesign};

/// A board plus the document node each track was read from.
#[derive(Debug, Clone)]
pub struct LoadedBoard {
    pub board: Board,
    /// Track id to index of its node among the root children.
    pub sources: HashMap<TrackId, usize>,
}

/// Parse a pad layer list. `*.Cu` means every copper layer.
pub fn pad_layer_set(names: &[String]) -> LayerSet {
    let mut set = LayerSet::empty();
    for name in names {
        match name.as_str() {
            "*.Cu" => set = LayerSet(set.0 | LayerSet::all_copper().0),
            "F&B.Cu" => {
                set.insert(Layer::FRONT);
                set.insert(Layer::BACK);
            }
            other => {
                if let Some(layer) = Layer::from_name(other) {
                    set.insert(layer);
                }
            }
        }
    }
    set
}

/// Rotate a footprint-local offset by the footprint rotation (degrees).
pub fn rotate(x: f64, y: f64, degrees: f64) -> (f64, f64) {
    if degrees == 0.0 {
        return (x, y);
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos + y * sin, -x * sin + y * cos)
}

fn to_point(p: &pcb_schema::Position) -> Point {
    Point::new(mm_to_nm(p.x), mm_to_nm(p.y))
}

fn convert_via_type(via_type: &pcb_schema::ViaType) -> ViaType {
    match via_type {
        pcb_schema::ViaType::Through => ViaType::Through,
        pcb_schema::ViaType::Blind | pcb_schema::ViaType::Buried => ViaType::BlindBuried,
        pcb_schema::ViaType::Micro => ViaType::Micro,
    }
}

/// Build a board from a parsed design.
pub fn board_from_design(design: &PcbDesign) -> LoadedBoard {
    let mut items: Vec<(Track, usize)> =
        Vec::with_capacity(design.traces.len() + design.arcs.len() + design.vias.len());

    for trace in &design.traces {
        let Some(layer) = Layer::from_name(&trace.layer) else {
            tracing::warn!("Segment {} is on non-copper layer {}", trace.uuid, trace.layer);
            continue;
        };
        items.push((
            Track {
                uuid: trace.uuid.clone(),
                start: to_point(&trace.start),
                end: to_point(&trace.end),
                width: mm_to_nm(trace.width),
                layer,
                net: trace.net,
                kind: TrackKind::Trace,
            },
            trace.node,
        ));
    }

    for arc in &design.arcs {
        let Some(layer) = Layer::from_name(&arc.layer) else {
            tracing::warn!("Arc {} is on non-copper layer {}", arc.uuid, arc.layer);
            continue;
        };
        let mut track = Track::arc(
            to_point(&arc.start),
            to_point(&arc.mid),
            to_point(&arc.end),
            mm_to_nm(arc.width),
            layer,
            arc.net,
        );
        track.uuid = arc.uuid.clone();
        items.push((track, arc.node));
    }

    for via in &design.vias {
        let top = Layer::from_name(&via.layers.0).unwrap_or(Layer::FRONT);
        let bottom = Layer::from_name(&via.layers.1).unwrap_or(Layer::BACK);
        let info = ViaInfo {
            via_type: convert_via_type(&via.via_type),
            top,
            bottom,
            drill: mm_to_nm(via.drill),
        };
        let mut track = Track::via(to_point(&via.position), mm_to_nm(via.size), via.net, info);
        track.uuid = via.uuid.clone();
        items.push((track, via.node));
    }

    // File order first, then stable by net: same-net items end up adjacent
    items.sort_by_key(|(track, node)| (track.net, *node));

    let mut board = Board::new();
    let mut sources = HashMap::with_capacity(items.len());
    for (track, node) in items {
        let id = board.add_track(track);
        sources.insert(id, node);
    }

    for footprint in &design.footprints {
        for pad in &footprint.pads {
            let (dx, dy) = rotate(pad.position.x, pad.position.y, footprint.rotation);
            let position = Point::new(
                mm_to_nm(footprint.position.x + dx),
                mm_to_nm(footprint.position.y + dy),
            );
            let kind = match pad.pad_type {
                PadType::ThruHole => PadKind::ThroughHole,
                PadType::NPThruHole => PadKind::NonPlated,
                PadType::SMD | PadType::Connect => PadKind::Smd,
            };
            board.add_pad(Pad {
                reference: footprint.reference.clone(),
                number: pad.number.clone(),
                position,
                net: pad.net.unwrap_or(0),
                layers: pad_layer_set(&pad.layers),
                kind,
            });
        }
    }

    for zone in &design.zones {
        let fills = zone
            .filled_polygons
            .iter()
            .filter_map(|fp| {
                Some(ZoneFill {
                    layer: Layer::from_name(&fp.layer)?,
                    outline: fp.points.iter().map(to_point).collect(),
                })
            })
            .collect::<Vec<_>>();
        if !fills.is_empty() {
            board.add_zone(Zone { net: zone.net, fills });
        }
    }

    LoadedBoard { board, sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::pcb::PcbParser;

    const BOARD: &str = r#"(kicad_pcb (version 20221018)
  (net 0 "") (net 1 "A") (net 2 "B")
  (footprint "TH" (layer "F.Cu") (at 10 10 90)
    (pad "1" thru_hole circle (at 2 0) (size 1.6 1.6) (drill 0.8) (layers "*.Cu" "*.Mask") (net 2 "B")))
  (segment (start 0 0) (end 1 0) (width 0.2) (layer "F.Cu") (net 2) (uuid "s-b"))
  (segment (start 0 1) (end 1 1) (width 0.2) (layer "F.Cu") (net 1) (uuid "s-a"))
  (segment (start 0 2) (end 1 2) (width 0.2) (layer "Dwgs.User") (net 1) (uuid "s-bad"))
  (via (at 1 1) (size 0.6) (drill 0.3) (layers "F.Cu" "B.Cu") (net 1) (uuid "v-a"))
  (arc (start 1 0) (mid 1.5 0.5) (end 2 0) (width 0.2) (layer "F.Cu") (net 2) (uuid "a-b"))
)"#;

    fn load() -> LoadedBoard {
        let design = PcbParser::parse_pcb_str(BOARD, "t.kicad_pcb").unwrap();
        board_from_design(&design)
    }

    #[test]
    fn test_tracks_are_net_sorted() {
        let loaded = load();
        let uuids: Vec<&str> = loaded.board.tracks().map(|(_, t)| t.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["s-a", "v-a", "s-b", "a-b"]);
    }

    #[test]
    fn test_arc_becomes_arc_track() {
        let loaded = load();
        let (_, arc) = loaded
            .board
            .tracks()
            .find(|(_, t)| t.uuid == "a-b")
            .expect("Arc should be on the board");
        assert!(arc.is_arc());
        assert_eq!(arc.kind, TrackKind::Arc { mid: Point::new(1_500_000, 500_000) });
        assert_eq!(arc.start, Point::new(1_000_000, 0));
        assert_eq!(arc.end, Point::new(2_000_000, 0));
    }

    #[test]
    fn test_sources_map_to_nodes() {
        let loaded = load();
        assert_eq!(loaded.sources.len(), 4);
        let root = PcbParser::parse_root(BOARD).unwrap();
        let items = root.as_list().unwrap();
        for (id, node) in &loaded.sources {
            let uuid = &loaded.board.track(*id).unwrap().uuid;
            assert_eq!(items[*node].value("uuid", 0), Some(uuid.as_str()));
        }
    }

    #[test]
    fn test_pad_position_is_rotated() {
        let loaded = load();
        let (_, pad) = loaded.board.pads().next().unwrap();
        // (2, 0) rotated by 90 degrees becomes (0, -2)
        assert_eq!(pad.position, Point::new(10_000_000, 8_000_000));
        assert!(pad.is_on_all_copper_layers());
        assert_eq!(pad.kind, PadKind::ThroughHole);
    }

    #[test]
    fn test_units_are_nanometres() {
        let loaded = load();
        let (_, track) = loaded.board.tracks().next().unwrap();
        assert_eq!(track.width, 200_000);
        assert_eq!(track.end, Point::new(1_000_000, 1_000_000));
    }

    #[test]
    fn test_pad_layer_set() {
        let set = pad_layer_set(&["F.Cu".to_string(), "F.Mask".to_string()]);
        assert!(set.contains(Layer::FRONT));
        assert!(!set.contains(Layer::BACK));
        assert!(pad_layer_set(&["*.Cu".to_string()]).covers_all_copper());
    }
}
