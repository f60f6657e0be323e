//! KiCAD PCB Parser
//!
//! This module parses KiCAD PCB files (.kicad_pcb) following the official
//! S-Expression board format, keeping track of
//! where every segment and via sits in the document.
//!
//! Key format details:
//! - All values are in millimeters
//! - Layers are identified by ordinal number and canonical name
//! - Traces are stored as (segment ...) and (arc ...) elements, vias as (via ...)
//! - Zones contain filled polygon data
//! - Nets are referenced by number (KiCad 6-8) or by name (KiCad 9+)

use std::path::Path;
use crate::parser::pcb_schema::*;
use crate::parser::sexp::{SExp, SExpParser, ParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Coordinate out of range in '{key}': {value} mm")]
    CoordinateOutOfRange { key: String, value: f64 },
}

/// Largest coordinate magnitude a board can hold: `i32::MAX` nanometres.
pub const MAX_COORDINATE_MM: f64 = 2147.483647;

/// Parser for KiCAD PCB files in the S-expression format (KiCad 5-9).
///
/// Items the cleaner does not need (graphics, text, dimensions) are skipped;
/// they stay in the document tree and are written back untouched. A copper
/// item with an unreadable field is skipped with a warning, but a coordinate
/// beyond [`MAX_COORDINATE_MM`] fails the whole file.
pub struct PcbParser;

impl PcbParser {
    /// Parse a PCB file from disk.
    pub fn parse_pcb(path: &Path) -> Result<PcbDesign, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        Self::parse_pcb_str(&content, &filename)
    }

    /// Parse PCB from string.
    pub fn parse_pcb_str(content: &str, filename: &str) -> Result<PcbDesign, PcbParseError> {
        let root = Self::parse_root(content)?;
        Self::extract_design(&root, filename)
    }

    /// Tokenize a board file and check its root tag.
    pub fn parse_root(content: &str) -> Result<SExp, PcbParseError> {
        let root = SExpParser::new(content).parse()?;

        match root.tag() {
            Some("kicad_pcb") => Ok(root),
            Some(other) => Err(PcbParseError::InvalidFormat(format!(
                "Expected kicad_pcb, found {}",
                other
            ))),
            None => Err(PcbParseError::InvalidFormat(
                "Expected kicad_pcb root".to_string(),
            )),
        }
    }

    /// Build the typed design from an already parsed document.
    pub fn extract_design(root: &SExp, filename: &str) -> Result<PcbDesign, PcbParseError> {
        let root_list = root
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Root must be a list".to_string()))?;

        let mut pcb = PcbDesign {
            uuid: Self::get_string_value(root, "uuid")
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            filename: filename.to_string(),
            version: Self::get_string_value(root, "version"),
            ..Default::default()
        };

        // Nets first: segments and pads may refer to them by name.
        for item in root_list.iter().skip(1) {
            match item.tag() {
                Some("layers") => pcb.layers = Self::parse_layers(item),
                Some("net") => {
                    if let Ok(net) = Self::parse_net(item) {
                        pcb.nets.push(net);
                    }
                }
                _ => {}
            }
        }

        for (node, item) in root_list.iter().enumerate() {
            match item.tag() {
                Some("footprint") | Some("module") => {
                    match Self::parse_footprint(item, &pcb.nets) {
                        Ok(fp) => pcb.footprints.push(fp),
                        Err(e) => Self::skip_item("footprint", e)?,
                    }
                }
                Some("segment") => match Self::parse_trace(item, &pcb.nets, node) {
                    Ok(trace) => pcb.traces.push(trace),
                    Err(e) => Self::skip_item("segment", e)?,
                },
                Some("arc") => match Self::parse_arc(item, &pcb.nets, node) {
                    Ok(arc) => pcb.arcs.push(arc),
                    Err(e) => Self::skip_item("arc", e)?,
                },
                Some("via") => match Self::parse_via(item, &pcb.nets, node) {
                    Ok(via) => pcb.vias.push(via),
                    Err(e) => Self::skip_item("via", e)?,
                },
                Some("zone") => pcb.zones.push(Self::parse_zone(item, &pcb.nets)),
                _ => {}
            }
        }

        tracing::debug!(
            "Parsed {}: {} nets, {} footprints, {} segments, {} arcs, {} vias, {} zones",
            filename,
            pcb.nets.len(),
            pcb.footprints.len(),
            pcb.traces.len(),
            pcb.arcs.len(),
            pcb.vias.len(),
            pcb.zones.len()
        );

        Ok(pcb)
    }

    /// Warn about an unreadable item, unless its coordinates are out of range.
    fn skip_item(kind: &str, error: PcbParseError) -> Result<(), PcbParseError> {
        match error {
            PcbParseError::CoordinateOutOfRange { .. } => Err(error),
            other => {
                tracing::warn!("Skipping {}: {}", kind, other);
                Ok(())
            }
        }
    }

    fn get_string_value(sexp: &SExp, key: &str) -> Option<String> {
        sexp.value(key, 0).map(|s| s.to_string())
    }

    fn get_float_value(sexp: &SExp, key: &str) -> Option<f64> {
        sexp.value(key, 0).and_then(|s| s.parse().ok())
    }

    /// Resolve `(net 3)`, `(net 3 "GND")` or `(net "GND")` to a net code.
    fn resolve_net(sexp: &SExp, nets: &[PcbNet]) -> Option<u32> {
        let first = sexp.value("net", 0)?;
        first
            .parse()
            .ok()
            .or_else(|| nets.iter().find(|n| n.name == first).map(|n| n.id))
    }

    fn parse_layers(sexp: &SExp) -> Vec<PcbLayer> {
        let mut layers = Vec::new();

        for item in sexp.as_list().unwrap_or(&[]).iter().skip(1) {
            let Some(layer_list) = item.as_list() else {
                continue;
            };
            if layer_list.len() < 3 {
                continue;
            }
            let ordinal = layer_list[0]
                .as_atom()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let canonical_name = layer_list[1].as_atom().unwrap_or("").to_string();
            let layer_type = match layer_list[2].as_atom().unwrap_or("signal") {
                "signal" => LayerType::Signal,
                "power" => LayerType::Power,
                "mixed" => LayerType::Mixed,
                "jumper" => LayerType::Jumper,
                "user" => LayerType::User,
                _ => LayerType::Unknown,
            };
            let user_name = layer_list
                .get(3)
                .and_then(|s| s.as_atom())
                .map(|s| s.to_string());

            layers.push(PcbLayer {
                ordinal,
                canonical_name,
                layer_type,
                user_name,
            });
        }

        layers
    }

    fn parse_net(sexp: &SExp) -> Result<PcbNet, PcbParseError> {
        let list = sexp
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Net must be a list".to_string()))?;

        if list.len() < 3 {
            return Err(PcbParseError::InvalidFormat(
                "Net requires id and name".to_string(),
            ));
        }

        let id = list[1]
            .as_atom()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PcbParseError::MissingField("net id".to_string()))?;

        let name = list[2].as_atom().unwrap_or("").to_string();

        Ok(PcbNet { id, name })
    }

    fn parse_footprint(sexp: &SExp, nets: &[PcbNet]) -> Result<Footprint, PcbParseError> {
        let uuid = Self::get_string_value(sexp, "uuid")
            .or_else(|| Self::get_string_value(sexp, "tstamp"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        // Footprint library is the second element
        let footprint_lib = sexp
            .as_list()
            .and_then(|l| l.get(1))
            .and_then(|a| a.as_atom())
            .unwrap_or("")
            .to_string();

        let layer = Self::get_string_value(sexp, "layer").unwrap_or_else(|| "F.Cu".to_string());
        let (position, rotation) = Self::parse_at(sexp)?;

        let mut reference = String::new();
        let mut value = String::new();

        for prop in sexp.get_all("property") {
            let key = prop.as_list().and_then(|l| l.get(1)).and_then(|a| a.as_atom());
            let val = prop.as_list().and_then(|l| l.get(2)).and_then(|a| a.as_atom());
            match (key, val) {
                (Some("Reference"), Some(v)) => reference = v.to_string(),
                (Some("Value"), Some(v)) => value = v.to_string(),
                _ => {}
            }
        }

        // Older format keeps reference/value in fp_text
        for text in sexp.get_all("fp_text") {
            let kind = text.as_list().and_then(|l| l.get(1)).and_then(|a| a.as_atom());
            let val = text.as_list().and_then(|l| l.get(2)).and_then(|a| a.as_atom());
            match (kind, val) {
                (Some("reference"), Some(v)) => reference = v.to_string(),
                (Some("value"), Some(v)) => value = v.to_string(),
                _ => {}
            }
        }

        let mut pads = Vec::new();
        for pad in sexp.get_all("pad") {
            match Self::parse_pad(pad, nets) {
                Ok(pad) => pads.push(pad),
                Err(e @ PcbParseError::CoordinateOutOfRange { .. }) => return Err(e),
                Err(_) => {}
            }
        }

        Ok(Footprint {
            uuid,
            reference,
            value,
            footprint_lib,
            layer,
            position,
            rotation,
            pads,
        })
    }

    fn parse_pad(sexp: &SExp, nets: &[PcbNet]) -> Result<Pad, PcbParseError> {
        let list = sexp
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Pad must be a list".to_string()))?;

        if list.len() < 4 {
            return Err(PcbParseError::InvalidFormat(
                "Pad requires number, type, shape".to_string(),
            ));
        }

        let number = list[1].as_atom().unwrap_or("").to_string();

        let pad_type = match list[2].as_atom().unwrap_or("") {
            "thru_hole" => PadType::ThruHole,
            "smd" => PadType::SMD,
            "connect" => PadType::Connect,
            "np_thru_hole" => PadType::NPThruHole,
            _ => PadType::SMD,
        };

        let (position, _) = Self::parse_at(sexp)?;

        let layers = sexp
            .child("layers")
            .and_then(|l| l.as_list())
            .map(|items| {
                items
                    .iter()
                    .skip(1)
                    .filter_map(|l| l.as_atom())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let net = Self::resolve_net(sexp, nets);
        let net_name = sexp
            .value("net", 1)
            .map(|s| s.to_string())
            .or_else(|| net.and_then(|id| nets.iter().find(|n| n.id == id)).map(|n| n.name.clone()));

        Ok(Pad {
            number,
            pad_type,
            position,
            layers,
            net,
            net_name,
        })
    }

    fn parse_trace(sexp: &SExp, nets: &[PcbNet], node: usize) -> Result<Trace, PcbParseError> {
        let uuid = Self::get_string_value(sexp, "uuid")
            .or_else(|| Self::get_string_value(sexp, "tstamp"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let start = Self::parse_xy(sexp, "start")?;
        let end = Self::parse_xy(sexp, "end")?;

        let width = Self::get_float_value(sexp, "width")
            .ok_or_else(|| PcbParseError::MissingField("trace width".to_string()))?;

        let layer = Self::get_string_value(sexp, "layer")
            .ok_or_else(|| PcbParseError::MissingField("trace layer".to_string()))?;

        Ok(Trace {
            uuid,
            start,
            end,
            width,
            layer,
            net: Self::resolve_net(sexp, nets).unwrap_or(0),
            locked: sexp.has_flag("locked"),
            node,
        })
    }

    fn parse_arc(sexp: &SExp, nets: &[PcbNet], node: usize) -> Result<TraceArc, PcbParseError> {
        let uuid = Self::get_string_value(sexp, "uuid")
            .or_else(|| Self::get_string_value(sexp, "tstamp"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let start = Self::parse_xy(sexp, "start")?;
        let mid = Self::parse_xy(sexp, "mid")?;
        let end = Self::parse_xy(sexp, "end")?;

        let width = Self::get_float_value(sexp, "width")
            .ok_or_else(|| PcbParseError::MissingField("arc width".to_string()))?;

        let layer = Self::get_string_value(sexp, "layer")
            .ok_or_else(|| PcbParseError::MissingField("arc layer".to_string()))?;

        Ok(TraceArc {
            uuid,
            start,
            mid,
            end,
            width,
            layer,
            net: Self::resolve_net(sexp, nets).unwrap_or(0),
            locked: sexp.has_flag("locked"),
            node,
        })
    }

    fn parse_via(sexp: &SExp, nets: &[PcbNet], node: usize) -> Result<Via, PcbParseError> {
        let uuid = Self::get_string_value(sexp, "uuid")
            .or_else(|| Self::get_string_value(sexp, "tstamp"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let (position, _) = Self::parse_at(sexp)?;

        let size = Self::get_float_value(sexp, "size")
            .ok_or_else(|| PcbParseError::MissingField("via size".to_string()))?;

        let drill = Self::get_float_value(sexp, "drill").unwrap_or(0.0);

        let layers = (
            sexp.value("layers", 0).unwrap_or("F.Cu").to_string(),
            sexp.value("layers", 1).unwrap_or("B.Cu").to_string(),
        );

        // Via type is a bare symbol: (via blind (at ...) ...)
        let via_type = if sexp.has_flag("micro") {
            ViaType::Micro
        } else if sexp.has_flag("blind") {
            ViaType::Blind
        } else if sexp.has_flag("buried") {
            ViaType::Buried
        } else {
            ViaType::Through
        };

        Ok(Via {
            uuid,
            position,
            size,
            drill,
            layers,
            net: Self::resolve_net(sexp, nets).unwrap_or(0),
            via_type,
            locked: sexp.has_flag("locked"),
            node,
        })
    }

    fn parse_zone(sexp: &SExp, nets: &[PcbNet]) -> Zone {
        let uuid = Self::get_string_value(sexp, "uuid")
            .or_else(|| Self::get_string_value(sexp, "tstamp"))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let net = Self::resolve_net(sexp, nets).unwrap_or(0);
        let net_name = Self::get_string_value(sexp, "net_name").unwrap_or_default();

        let mut layers: Vec<String> = Vec::new();
        if let Some(layer) = Self::get_string_value(sexp, "layer") {
            layers.push(layer);
        }
        if let Some(list) = sexp.child("layers").and_then(|l| l.as_list()) {
            layers.extend(list.iter().skip(1).filter_map(|l| l.as_atom()).map(|s| s.to_string()));
        }

        let default_layer = layers.first().cloned().unwrap_or_default();
        let filled_polygons = sexp
            .get_all("filled_polygon")
            .into_iter()
            .map(|fp| FilledPolygon {
                layer: Self::get_string_value(fp, "layer").unwrap_or_else(|| default_layer.clone()),
                points: fp.child("pts").map(Self::parse_pts).unwrap_or_default(),
            })
            .collect();

        Zone {
            uuid,
            net,
            net_name,
            layers,
            filled_polygons,
        }
    }

    /// `(at x y [rotation])`
    fn parse_at(sexp: &SExp) -> Result<(Position, f64), PcbParseError> {
        let at = Self::parse_xy(sexp, "at")?;
        let rotation = sexp
            .value("at", 2)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);
        Ok((at, rotation))
    }

    fn parse_xy(sexp: &SExp, key: &str) -> Result<Position, PcbParseError> {
        let x = sexp
            .value(key, 0)
            .ok_or_else(|| PcbParseError::MissingField(key.to_string()))?;
        let y = sexp
            .value(key, 1)
            .ok_or_else(|| PcbParseError::InvalidFormat(format!("Invalid '{}' format", key)))?;

        let (x, y): (f64, f64) = match (x.parse(), y.parse()) {
            (Ok(x), Ok(y)) => (x, y),
            _ => {
                return Err(PcbParseError::InvalidFormat(format!(
                    "Invalid '{}' coordinates: {} {}",
                    key, x, y
                )))
            }
        };

        for value in [x, y] {
            if !value.is_finite() || value.abs() > MAX_COORDINATE_MM {
                return Err(PcbParseError::CoordinateOutOfRange {
                    key: key.to_string(),
                    value,
                });
            }
        }
        Ok(Position::new(x, y))
    }

    fn parse_pts(sexp: &SExp) -> Vec<Position> {
        sexp.get_all("xy")
            .into_iter()
            .filter_map(|xy| {
                let items = xy.as_list()?;
                let x = items.get(1)?.as_atom()?.parse().ok()?;
                let y = items.get(2)?.as_atom()?.parse().ok()?;
                Some(Position::new(x, y))
            })
            .collect()
    }
}
