//! PCB Schema Definitions
//!
//! Data structures for the parts of a KiCad PCB file (.kicad_pcb) the track
//! cleaner reads. Values are kept in file units (millimetres); conversion to
//! board units happens in [`crate::board::convert`].

use serde::{Deserialize, Serialize};

/// The copper-relevant content of a PCB file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PcbDesign {
    pub uuid: String,
    pub filename: String,
    pub version: Option<String>,
    pub layers: Vec<PcbLayer>,
    pub nets: Vec<PcbNet>,
    pub footprints: Vec<Footprint>,
    pub traces: Vec<Trace>,
    pub arcs: Vec<TraceArc>,
    pub vias: Vec<Via>,
    pub zones: Vec<Zone>,
}

impl PcbDesign {
    pub fn net_name(&self, id: u32) -> Option<&str> {
        self.nets.iter().find(|n| n.id == id).map(|n| n.name.as_str())
    }

    pub fn net_id(&self, name: &str) -> Option<u32> {
        self.nets.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Names of the copper layers declared in the `(layers ...)` section.
    pub fn copper_layers(&self) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|l| l.canonical_name.ends_with(".Cu"))
            .map(|l| l.canonical_name.as_str())
            .collect()
    }
}

/// PCB Layer definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcbLayer {
    pub ordinal: u32,
    pub canonical_name: String,   // e.g., "F.Cu", "B.Cu", "In1.Cu"
    pub layer_type: LayerType,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LayerType {
    #[default]
    Signal,
    Power,
    Mixed,
    Jumper,
    User,
    Unknown,
}

/// Net definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcbNet {
    pub id: u32,
    pub name: String,
}

/// 2D position in millimetres
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Footprint (component) on PCB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub uuid: String,
    pub reference: String,
    pub value: String,
    pub footprint_lib: String,
    pub layer: String,
    pub position: Position,
    /// Degrees, counter-clockwise as displayed.
    pub rotation: f64,
    pub pads: Vec<Pad>,
}

/// Pad on a footprint. `position` is relative to the footprint origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pad {
    pub number: String,
    pub pad_type: PadType,
    pub position: Position,
    pub layers: Vec<String>,
    pub net: Option<u32>,
    pub net_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PadType {
    ThruHole,
    SMD,
    Connect,
    NPThruHole,  // Non-plated through hole
}

/// Copper segment: a `(segment ...)` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub uuid: String,
    pub start: Position,
    pub end: Position,
    pub width: f64,
    pub layer: String,
    pub net: u32,
    pub locked: bool,
    /// Index of the node among the children of the root list.
    #[serde(skip)]
    pub node: usize,
}

impl Trace {
    pub fn length(&self) -> f64 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        dx.hypot(dy)
    }
}

/// Copper arc: an `(arc ...)` node at the board level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceArc {
    pub uuid: String,
    pub start: Position,
    pub mid: Position,
    pub end: Position,
    pub width: f64,
    pub layer: String,
    pub net: u32,
    pub locked: bool,
    #[serde(skip)]
    pub node: usize,
}

/// A `(via ...)` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Via {
    pub uuid: String,
    pub position: Position,
    pub size: f64,
    pub drill: f64,
    pub layers: (String, String),
    pub net: u32,
    pub via_type: ViaType,
    pub locked: bool,
    #[serde(skip)]
    pub node: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViaType {
    Through,
    Blind,
    Buried,
    Micro,
}

/// Copper zone with its computed fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub uuid: String,
    pub net: u32,
    pub net_name: String,
    pub layers: Vec<String>,
    pub filled_polygons: Vec<FilledPolygon>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilledPolygon {
    pub layer: String,
    pub points: Vec<Position>,
}
