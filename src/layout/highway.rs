use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::geometry::{EPS, Point, Rect, Span, spans_overlap};

/// Owner path of the pseudo container that surrounds the root box.
pub const CANVAS_PATH: &str = "@canvas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Up, Side::Down];

    /// Left/Right sides are vertical edges; a connector leaving them runs horizontally.
    pub fn is_horizontal_exit(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Down and Right point toward growing coordinates.
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Right | Self::Down)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadKind {
    /// Runs between packing lines, across the whole container.
    Main,
    /// Runs between two items of one line, across that line only.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadOrientation {
    Horizontal,
    Vertical,
}

impl RoadOrientation {
    pub fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Road {
    pub name: String,
    pub owner: String,
    pub kind: RoadKind,
    pub orientation: RoadOrientation,
    pub rect: Rect,
    pub lanes: BTreeSet<i32>,
}

impl Road {
    pub fn main_name(owner: &str, index: usize) -> String {
        format!("{owner} main {index}")
    }

    pub fn secondary_name(owner: &str, line: usize, index: usize) -> String {
        format!("{owner} secondary {line}.{index}")
    }

    /// Width across the road, i.e. the room available for lanes.
    pub fn thickness(&self) -> f32 {
        match self.orientation {
            RoadOrientation::Horizontal => self.rect.height,
            RoadOrientation::Vertical => self.rect.width,
        }
    }

    /// Range of lane coordinates (y for horizontal roads, x for vertical ones).
    pub fn lane_span(&self) -> Span {
        match self.orientation {
            RoadOrientation::Horizontal => self.rect.span_y(),
            RoadOrientation::Vertical => self.rect.span_x(),
        }
    }

    /// Range covered along the direction of travel.
    pub fn along_span(&self) -> Span {
        match self.orientation {
            RoadOrientation::Horizontal => self.rect.span_x(),
            RoadOrientation::Vertical => self.rect.span_y(),
        }
    }

    /// Coordinate of the road end in the direction of `forward` (toward growing
    /// coordinates when true), inset by half the road thickness.
    pub fn end_toward(&self, forward: bool) -> f32 {
        let (start, end) = self.along_span();
        let inset = self.thickness() / 2.0;
        if forward { end - inset } else { start + inset }
    }

    /// Signed distance from `offset` to the nearer end of the road.
    pub fn distance_to_nearest_end(&self, offset: f32) -> f32 {
        let (start, end) = self.along_span();
        if offset - start < end - offset {
            start - offset
        } else {
            end - offset
        }
    }

    /// Point on lane `lane` at position `along`.
    pub fn point_on_lane(&self, lane: f32, along: f32) -> Point {
        match self.orientation {
            RoadOrientation::Horizontal => (along, lane),
            RoadOrientation::Vertical => (lane, along),
        }
    }

    /// Projects `point` onto the road's direction of travel.
    pub fn along_of(&self, point: Point) -> f32 {
        match self.orientation {
            RoadOrientation::Horizontal => point.0,
            RoadOrientation::Vertical => point.1,
        }
    }
}

/// Roads adjacent to a placed box and the border offsets claimed on it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Address {
    pub roads: BTreeMap<Side, String>,
    pub claimed: BTreeMap<Side, BTreeSet<i32>>,
}

impl Address {
    pub fn road(&self, side: Side) -> Option<&str> {
        self.roads.get(&side).map(String::as_str)
    }
}

/// A straight connector piece laid outside of any road.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "axis", rename_all = "snake_case")]
pub enum OffroadSegment {
    Horizontal { y: f32, x1: f32, x2: f32 },
    Vertical { x: f32, y1: f32, y2: f32 },
}

impl OffroadSegment {
    pub fn between(a: Point, b: Point) -> Option<Self> {
        if (a.1 - b.1).abs() <= EPS && (a.0 - b.0).abs() > EPS {
            Some(Self::Horizontal {
                y: a.1,
                x1: a.0.min(b.0),
                x2: a.0.max(b.0),
            })
        } else if (a.0 - b.0).abs() <= EPS && (a.1 - b.1).abs() > EPS {
            Some(Self::Vertical {
                x: a.0,
                y1: a.1.min(b.1),
                y2: a.1.max(b.1),
            })
        } else {
            None
        }
    }
}

/// Extent of a planned straight segment whose fixed coordinate is still being
/// chosen by the allocator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffroadProbe {
    /// Horizontal segment over `x1..x2`; the candidate offset is its `y`.
    Horizontal { x1: f32, x2: f32 },
    /// Vertical segment over `y1..y2`; the candidate offset is its `x`.
    Vertical { y1: f32, y2: f32 },
}

/// Corridor registry for one layout run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HighwayMap {
    pub roads: BTreeMap<String, Road>,
    pub addresses: BTreeMap<String, Address>,
    pub final_roads: BTreeSet<String>,
    pub offroad: Vec<OffroadSegment>,
}

impl HighwayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_road(
        &mut self,
        name: String,
        owner: &str,
        kind: RoadKind,
        orientation: RoadOrientation,
        rect: Rect,
    ) {
        self.roads.insert(
            name.clone(),
            Road {
                name,
                owner: owner.to_string(),
                kind,
                orientation,
                rect,
                lanes: BTreeSet::new(),
            },
        );
    }

    pub fn road(&self, name: &str) -> Option<&Road> {
        self.roads.get(name)
    }

    pub fn mark_final(&mut self, name: String) {
        self.final_roads.insert(name);
    }

    pub fn is_final(&self, name: &str) -> bool {
        self.final_roads.contains(name)
    }

    /// Closing main road of the container at `owner`.
    pub fn closing_main_road(&self, owner: &str) -> Option<&Road> {
        self.roads.values().find(|road| {
            road.owner == owner && road.kind == RoadKind::Main && self.is_final(&road.name)
        })
    }

    pub fn roads_of(&self, owner: &str) -> impl Iterator<Item = &Road> {
        self.roads.values().filter(move |road| road.owner == owner)
    }

    pub fn set_address(&mut self, path: &str, side: Side, road: String) {
        self.addresses
            .entry(path.to_string())
            .or_default()
            .roads
            .insert(side, road);
    }

    pub fn address(&self, path: &str) -> Option<&Address> {
        self.addresses.get(path)
    }

    /// Road adjacent to the box at `path` on `side`.
    pub fn adjacent_road(&self, path: &str, side: Side) -> Option<&Road> {
        let name = self.addresses.get(path)?.road(side)?;
        self.roads.get(name)
    }

    pub fn is_border_offset_free(&self, path: &str, side: Side, offset: i32) -> bool {
        self.addresses
            .get(path)
            .and_then(|address| address.claimed.get(&side))
            .is_none_or(|claimed| !claimed.contains(&offset))
    }

    pub fn claim_border_offset(&mut self, path: &str, side: Side, offset: i32) {
        self.addresses
            .entry(path.to_string())
            .or_default()
            .claimed
            .entry(side)
            .or_default()
            .insert(offset);
    }

    pub fn is_lane_free(&self, road: &str, lane: i32) -> bool {
        self.roads
            .get(road)
            .is_some_and(|road| !road.lanes.contains(&lane))
    }

    pub fn claim_lane(&mut self, road: &str, lane: i32) {
        if let Some(road) = self.roads.get_mut(road) {
            road.lanes.insert(lane);
        }
    }

    /// True when a straight segment at `offset` over the probe extent would run
    /// along a committed off-road segment.
    pub fn collides_offroad(&self, offset: i32, probe: OffroadProbe) -> bool {
        let offset = offset as f32;
        self.offroad.iter().any(|segment| match (probe, *segment) {
            (OffroadProbe::Horizontal { x1, x2 }, OffroadSegment::Horizontal { y, x1: a, x2: b }) => {
                (y - offset).abs() <= EPS && spans_overlap((x1.min(x2), x1.max(x2)), (a, b))
            }
            (OffroadProbe::Vertical { y1, y2 }, OffroadSegment::Vertical { x, y1: a, y2: b }) => {
                (x - offset).abs() <= EPS && spans_overlap((y1.min(y2), y1.max(y2)), (a, b))
            }
            _ => false,
        })
    }

    pub fn commit_offroad(&mut self, segment: OffroadSegment) {
        self.offroad.push(segment);
    }

    /// Commits every axis-aligned piece of `points` as an off-road segment.
    pub fn commit_polyline(&mut self, points: &[Point]) {
        for pair in points.windows(2) {
            if let Some(segment) = OffroadSegment::between(pair[0], pair[1]) {
                self.offroad.push(segment);
            }
        }
    }

    /// Offsets both claimed on a border side, as `(path, side, offset)`.
    pub fn border_claims(&self) -> Vec<(String, Side, i32)> {
        let mut out = Vec::new();
        for (path, address) in &self.addresses {
            for (side, offsets) in &address.claimed {
                out.extend(offsets.iter().map(|offset| (path.clone(), *side, *offset)));
            }
        }
        out
    }

    /// Moves every road by `(dx, dy)`; used when a container is placed.
    pub fn translate_roads_of(&mut self, owner: &str, dx: f32, dy: f32) {
        for road in self.roads.values_mut().filter(|road| road.owner == owner) {
            road.rect = road.rect.translate(dx, dy);
        }
    }
}
