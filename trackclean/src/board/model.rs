//! Board item definitions
//!
//! Integer-coordinate representation of the copper items the cleaner works on.
//! All lengths are nanometres, the internal unit KiCad itself uses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanometres per millimetre.
pub const NM_PER_MM: f64 = 1_000_000.0;

/// Convert a millimetre value from a board file to internal units.
pub fn mm_to_nm(mm: f64) -> i64 {
    (mm * NM_PER_MM).round() as i64
}

/// Convert internal units back to millimetres.
pub fn nm_to_mm(nm: i64) -> f64 {
    nm as f64 / NM_PER_MM
}

/// A point on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx.hypot(dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", nm_to_mm(self.x), nm_to_mm(self.y))
    }
}

/// Copper layer number: `F.Cu` is 0, inner layers follow, `B.Cu` is 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    pub const FRONT: Layer = Layer(0);
    pub const BACK: Layer = Layer(31);
    pub const COPPER_COUNT: u8 = 32;

    /// Map a KiCad layer name to a copper layer. Non-copper names yield `None`.
    pub fn from_name(name: &str) -> Option<Layer> {
        match name {
            "F.Cu" => Some(Layer::FRONT),
            "B.Cu" => Some(Layer::BACK),
            _ => {
                let inner = name.strip_prefix("In")?.strip_suffix(".Cu")?;
                let n: u8 = inner.parse().ok()?;
                (1..=30).contains(&n).then_some(Layer(n))
            }
        }
    }

    pub fn name(&self) -> String {
        match self.0 {
            0 => "F.Cu".to_string(),
            31 => "B.Cu".to_string(),
            n => format!("In{}.Cu", n),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Bit mask of copper layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerSet(pub u64);

impl LayerSet {
    pub const fn empty() -> Self {
        LayerSet(0)
    }

    pub const fn all_copper() -> Self {
        LayerSet(0xFFFF_FFFF)
    }

    pub fn single(layer: Layer) -> Self {
        LayerSet(1u64 << layer.0)
    }

    /// Every layer between `a` and `b`, inclusive, in either order.
    pub fn span(a: Layer, b: Layer) -> Self {
        let (lo, hi) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let mut bits = 0u64;
        for n in lo..=hi {
            bits |= 1u64 << n;
        }
        LayerSet(bits)
    }

    pub fn insert(&mut self, layer: Layer) {
        self.0 |= 1u64 << layer.0;
    }

    pub fn contains(&self, layer: Layer) -> bool {
        self.0 & (1u64 << layer.0) != 0
    }

    pub fn intersects(&self, other: &LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when this set covers every copper layer.
    pub fn covers_all_copper(&self) -> bool {
        let all = LayerSet::all_copper().0;
        self.0 & all == all
    }
}

/// Stable identifier of a track slot in a [`Board`](super::Board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub usize);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a pad in a [`Board`](super::Board).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PadId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViaType {
    Through,
    BlindBuried,
    Micro,
}

/// Via-only data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaInfo {
    pub via_type: ViaType,
    pub top: Layer,
    pub bottom: Layer,
    pub drill: i64,
}

impl ViaInfo {
    pub fn through(drill: i64) -> Self {
        Self {
            via_type: ViaType::Through,
            top: Layer::FRONT,
            bottom: Layer::BACK,
            drill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Trace,
    /// Circular arc from `start` through `mid` to `end`.
    Arc { mid: Point },
    Via(ViaInfo),
}

/// One of the two ends of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    pub const BOTH: [Endpoint; 2] = [Endpoint::Start, Endpoint::End];

    pub fn opposite(self) -> Endpoint {
        match self {
            Endpoint::Start => Endpoint::End,
            Endpoint::End => Endpoint::Start,
        }
    }
}

/// A straight copper segment, an arc or a via.
///
/// Vias reuse the segment shape with `start == end`; `width` is the via
/// diameter and `layer` is the top layer of the span. Arcs connect only at
/// their two ends and are never reshaped by the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub uuid: String,
    pub start: Point,
    pub end: Point,
    pub width: i64,
    pub layer: Layer,
    pub net: u32,
    pub kind: TrackKind,
}

impl Track {
    pub fn trace(start: Point, end: Point, width: i64, layer: Layer, net: u32) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            start,
            end,
            width,
            layer,
            net,
            kind: TrackKind::Trace,
        }
    }

    pub fn arc(start: Point, mid: Point, end: Point, width: i64, layer: Layer, net: u32) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            start,
            end,
            width,
            layer,
            net,
            kind: TrackKind::Arc { mid },
        }
    }

    pub fn via(position: Point, diameter: i64, net: u32, info: ViaInfo) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            start: position,
            end: position,
            width: diameter,
            layer: info.top,
            net,
            kind: TrackKind::Via(info),
        }
    }

    pub fn is_via(&self) -> bool {
        matches!(self.kind, TrackKind::Via(_))
    }

    pub fn is_trace(&self) -> bool {
        matches!(self.kind, TrackKind::Trace)
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, TrackKind::Arc { .. })
    }

    /// Item name used in logs and reports.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TrackKind::Trace => "segment",
            TrackKind::Arc { .. } => "arc",
            TrackKind::Via(_) => "via",
        }
    }

    pub fn via_info(&self) -> Option<&ViaInfo> {
        match &self.kind {
            TrackKind::Via(info) => Some(info),
            TrackKind::Trace | TrackKind::Arc { .. } => None,
        }
    }

    pub fn is_through_via(&self) -> bool {
        matches!(self.via_info(), Some(info) if info.via_type == ViaType::Through)
    }

    pub fn endpoint(&self, which: Endpoint) -> Point {
        match which {
            Endpoint::Start => self.start,
            Endpoint::End => self.end,
        }
    }

    pub fn set_endpoint(&mut self, which: Endpoint, point: Point) {
        match which {
            Endpoint::Start => self.start = point,
            Endpoint::End => self.end = point,
        }
    }

    /// Copper layers this item conducts on.
    pub fn layer_set(&self) -> LayerSet {
        match &self.kind {
            TrackKind::Trace | TrackKind::Arc { .. } => LayerSet::single(self.layer),
            TrackKind::Via(info) => match info.via_type {
                ViaType::Through => LayerSet::span(Layer::FRONT, Layer::BACK),
                _ => LayerSet::span(info.top, info.bottom),
            },
        }
    }

    /// Top and bottom layer, used for zone queries.
    pub fn layer_pair(&self) -> (Layer, Layer) {
        match &self.kind {
            TrackKind::Trace | TrackKind::Arc { .. } => (self.layer, self.layer),
            TrackKind::Via(info) => match info.via_type {
                ViaType::Through => (Layer::FRONT, Layer::BACK),
                _ => (info.top, info.bottom),
            },
        }
    }

    pub fn length(&self) -> f64 {
        match &self.kind {
            TrackKind::Arc { mid } => arc_length(self.start, *mid, self.end),
            _ => self.start.distance(&self.end),
        }
    }

    /// Does either end of this item sit on `point`?
    pub fn has_endpoint_at(&self, point: Point) -> bool {
        self.start == point || self.end == point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadKind {
    ThroughHole,
    Smd,
    /// Non-plated hole: carries no copper connection.
    NonPlated,
}

/// A component terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub reference: String,
    pub number: String,
    pub position: Point,
    pub net: u32,
    pub layers: LayerSet,
    pub kind: PadKind,
}

impl Pad {
    /// Exact-position hit test on any shared copper layer.
    pub fn hit_test(&self, point: Point, layers: &LayerSet) -> bool {
        self.kind != PadKind::NonPlated && self.position == point && self.layers.intersects(layers)
    }

    pub fn is_on_all_copper_layers(&self) -> bool {
        self.layers.covers_all_copper()
    }

    pub fn name(&self) -> String {
        format!("{}.{}", self.reference, self.number)
    }
}

/// A filled copper zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub net: u32,
    pub fills: Vec<ZoneFill>,
}

/// One filled polygon of a zone on a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFill {
    pub layer: Layer,
    pub outline: Vec<Point>,
}

impl Zone {
    /// Is `point` inside a filled area on a layer between `top` and `bottom`?
    pub fn hit_test_filled_area(&self, point: Point, top: Layer, bottom: Layer) -> bool {
        let span = LayerSet::span(top, bottom);
        self.fills
            .iter()
            .filter(|fill| span.contains(fill.layer))
            .any(|fill| point_in_polygon(point, &fill.outline))
    }
}

/// Length of the circular arc through three points. Degenerate (collinear)
/// arcs are measured as the polyline.
pub fn arc_length(start: Point, mid: Point, end: Point) -> f64 {
    let (ax, ay) = (start.x as f64, start.y as f64);
    let (bx, by) = (mid.x as f64, mid.y as f64);
    let (cx, cy) = (end.x as f64, end.y as f64);

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < f64::EPSILON {
        return start.distance(&mid) + mid.distance(&end);
    }

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;
    let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
    let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
    let radius = (ax - ux).hypot(ay - uy);

    // Sweep from start to end passing through mid
    let angle = |x: f64, y: f64| (y - uy).atan2(x - ux);
    let tau = std::f64::consts::TAU;
    let (a0, am, a1) = (angle(ax, ay), angle(bx, by), angle(cx, cy));
    let ccw = |from: f64, to: f64| (to - from).rem_euclid(tau);
    let sweep = if ccw(a0, am) <= ccw(a0, a1) {
        ccw(a0, a1)
    } else {
        tau - ccw(a0, a1)
    };
    radius * sweep
}

/// Ray casting point-in-polygon test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let px = point.x as f64;
    let py = point.y as f64;
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x as f64, polygon[i].y as f64);
        let (xj, yj) = (polygon[j].x as f64, polygon[j].y as f64);

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }

        j = i;
    }

    inside
}
