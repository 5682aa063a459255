use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ir::{BoxKind, ConnectionStyle};

use super::geometry::{Point, Rect};
use super::highway::{HighwayMap, Side};
use super::notes::NoteBands;

#[derive(Debug, Clone, Serialize)]
pub struct BoxLayout {
    pub path: String,
    pub id: String,
    pub name: String,
    pub kind: BoxKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Nesting level; the root is 0.
    pub depth: usize,
    pub has_children: bool,
    pub color: Option<String>,
    pub note: Option<String>,
    pub title_font_size: f32,
    pub title_font_family: String,
}

impl BoxLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    Direct,
    SingleBend,
    Roads,
}

impl RouteStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::SingleBend => "single_bend",
            Self::Roads => "roads",
        }
    }
}

/// A route that was produced but may overlap other connectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteWarning {
    SelfConnection,
    UnknownBox { path: String },
    BorderExhausted { path: String, side: Side },
    LaneExhausted { road: String },
    MissingRoad { path: String, side: Side },
}

impl fmt::Display for RouteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfConnection => write!(f, "connection starts and ends on the same box"),
            Self::UnknownBox { path } => write!(f, "`{path}` has no layout"),
            Self::BorderExhausted { path, side } => {
                write!(f, "no free border offset on {} side of `{path}`", side.as_str())
            }
            Self::LaneExhausted { road } => write!(f, "no free lane on road `{road}`"),
            Self::MissingRoad { path, side } => {
                write!(f, "no road on {} side of `{path}`", side.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaneClaim {
    Border { path: String, side: Side, offset: i32 },
    Road { road: String, lane: i32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionLayout {
    pub name: String,
    pub from: String,
    pub to: String,
    pub points: Vec<Point>,
    /// `None` when no polyline could be produced at all.
    pub strategy: Option<RouteStrategy>,
    pub warnings: Vec<RouteWarning>,
    pub claims: Vec<LaneClaim>,
    pub style: ConnectionStyleLayout,
}

impl ConnectionLayout {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionStyleLayout {
    pub color: Option<String>,
    pub line: Option<String>,
}

impl From<&ConnectionStyle> for ConnectionStyleLayout {
    fn from(style: &ConnectionStyle) -> Self {
        Self {
            color: style.color.clone(),
            line: style.line.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    /// An endpoint is hidden, removed or inside a hidden box.
    SkippedConnection { name: String, path: String },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedConnection { name, path } => {
                write!(f, "connection `{name}` skipped: `{path}` is not visible")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub boxes: BTreeMap<String, BoxLayout>,
    pub connections: Vec<ConnectionLayout>,
    pub highway: HighwayMap,
    pub notes: NoteBands,
    pub warnings: Vec<LayoutWarning>,
}

impl Layout {
    pub fn box_rect(&self, path: &str) -> Option<Rect> {
        self.boxes.get(path).map(BoxLayout::rect)
    }

    pub fn connection(&self, name: &str) -> Option<&ConnectionLayout> {
        self.connections.iter().find(|conn| conn.name == name)
    }

    /// Boxes ordered parents first, as they should be painted.
    pub fn boxes_by_depth(&self) -> Vec<&BoxLayout> {
        let mut ordered: Vec<&BoxLayout> = self.boxes.values().collect();
        ordered.sort_by_key(|item| item.depth);
        ordered
    }
}
