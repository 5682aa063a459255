use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Packing axis of a container.
///
/// `LeftRight` fills a line left to right and a break starts a new line below;
/// `TopDown` fills a column top to bottom and a break starts a new column to
/// the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    TopDown,
    #[default]
    LeftRight,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "td" | "tb" | "top_down" | "topdown" => Some(Self::TopDown),
            "lr" | "left_right" | "leftright" => Some(Self::LeftRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxKind {
    Actor,
    Component,
    Activity,
    Frame,
    Folder,
    Database,
    Package,
    Group,
    #[default]
    Container,
}

impl BoxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Component => "component",
            Self::Activity => "activity",
            Self::Frame => "frame",
            Self::Folder => "folder",
            Self::Database => "database",
            Self::Package => "package",
            Self::Group => "group",
            Self::Container => "container",
        }
    }
}

/// Per-box overrides of the layout style. `None` falls back to the config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleOverride {
    pub margin: Option<f32>,
    pub padding: Option<f32>,
    pub title_height: Option<f32>,
    pub title_font_size: Option<f32>,
    pub title_font_family: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Box(DiagramBox),
    /// Forces a new packing line inside the parent. Has no geometry.
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramBox {
    pub id: String,
    pub name: String,
    pub path: String,
    pub kind: BoxKind,
    pub children: Vec<Child>,
    pub hidden: bool,
    pub removed: bool,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub orientation: Option<Orientation>,
    pub style: StyleOverride,
    /// Free text drawn in a note band above or below the diagram.
    pub note: Option<String>,
    // Filled in by the sizer. Position is relative to the parent box.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DiagramBox {
    pub fn new(id: &str, kind: BoxKind) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            path: id.to_string(),
            kind,
            children: Vec::new(),
            hidden: false,
            removed: false,
            min_width: None,
            min_height: None,
            orientation: None,
            style: StyleOverride::default(),
            note: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_min_size(mut self, width: f32, height: f32) -> Self {
        self.min_width = Some(width);
        self.min_height = Some(height);
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_child(mut self, child: DiagramBox) -> Self {
        self.children.push(Child::Box(child));
        self
    }

    pub fn with_break(mut self) -> Self {
        self.children.push(Child::Break);
        self
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden && !self.removed
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(|child| matches!(child, Child::Box(_)))
    }

    pub fn boxes(&self) -> impl Iterator<Item = &DiagramBox> {
        self.children.iter().filter_map(|child| match child {
            Child::Box(inner) => Some(inner),
            Child::Break => None,
        })
    }

    pub fn visible_boxes(&self) -> impl Iterator<Item = &DiagramBox> {
        self.boxes().filter(|inner| inner.is_visible())
    }

    /// Recomputes every `path` below (and including) this box from the ids,
    /// joining the ownership chain with `_`.
    pub fn assign_paths(&mut self, prefix: Option<&str>) {
        self.path = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}_{}", self.id),
            _ => self.id.clone(),
        };
        let path = self.path.clone();
        for child in &mut self.children {
            if let Child::Box(inner) = child {
                inner.assign_paths(Some(&path));
            }
        }
    }

    /// Finds a box by path. Hidden and removed boxes are still reachable.
    pub fn find(&self, path: &str) -> Option<&DiagramBox> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(self.path.as_str()) {
            return None;
        }
        self.boxes().find_map(|inner| inner.find(path))
    }

    pub fn walk<'a>(&'a self, out: &mut Vec<&'a DiagramBox>) {
        out.push(self);
        for inner in self.boxes() {
            inner.walk(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    One(String),
    Many(Vec<String>),
}

impl Endpoint {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::One(path) => vec![path.as_str()],
            Self::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStyle {
    pub color: Option<String>,
    /// Line text in the `-->`, `<..>`, `#~~>>` family. Drives arrowheads and dashes.
    pub line: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub name: String,
    pub from: Endpoint,
    pub to: Endpoint,
    pub style: ConnectionStyle,
}

/// One endpoint pair produced by decomposing a fan-out/fan-in connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleConnection {
    pub name: String,
    pub from: String,
    pub to: String,
    pub style: ConnectionStyle,
}

impl Connection {
    pub fn new(name: &str, from: &str, to: &str) -> Self {
        Self {
            name: name.to_string(),
            from: Endpoint::One(from.to_string()),
            to: Endpoint::One(to.to_string()),
            style: ConnectionStyle::default(),
        }
    }

    pub fn fan_out(name: &str, from: &str, to: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            from: Endpoint::One(from.to_string()),
            to: Endpoint::Many(to.iter().map(|path| path.to_string()).collect()),
            style: ConnectionStyle::default(),
        }
    }

    pub fn fan_in(name: &str, from: &[&str], to: &str) -> Self {
        Self {
            name: name.to_string(),
            from: Endpoint::Many(from.iter().map(|path| path.to_string()).collect()),
            to: Endpoint::One(to.to_string()),
            style: ConnectionStyle::default(),
        }
    }

    /// Splits list endpoints into single connections named `name:index`,
    /// preserving list order. One-to-one connections keep their name.
    pub fn decompose(&self) -> Vec<SingleConnection> {
        let single = |name: String, from: &str, to: &str| SingleConnection {
            name,
            from: from.to_string(),
            to: to.to_string(),
            style: self.style.clone(),
        };
        match (&self.from, &self.to) {
            (Endpoint::One(from), Endpoint::One(to)) => vec![single(self.name.clone(), from, to)],
            (Endpoint::Many(froms), Endpoint::One(to)) => froms
                .iter()
                .enumerate()
                .map(|(idx, from)| single(format!("{}:{idx}", self.name), from, to))
                .collect(),
            (Endpoint::One(from), Endpoint::Many(tos)) => tos
                .iter()
                .enumerate()
                .map(|(idx, to)| single(format!("{}:{idx}", self.name), from, to))
                .collect(),
            // Rejected by `Diagram::validate`; nothing sensible to route.
            (Endpoint::Many(_), Endpoint::Many(_)) => Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DiagramError {
    #[error("duplicate box path `{0}`")]
    DuplicatePath(String),
    #[error("connection `{connection}` references unknown box `{path}`")]
    UnknownEndpoint { connection: String, path: String },
    #[error("connection `{0}` connects a list to a list")]
    ManyToMany(String),
    #[error("connection `{0}` has an empty endpoint list")]
    EmptyEndpointList(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub root: DiagramBox,
    pub connections: Vec<Connection>,
}

impl Diagram {
    pub fn new(mut root: DiagramBox) -> Self {
        root.assign_paths(None);
        Self {
            root,
            connections: Vec::new(),
        }
    }

    pub fn connect(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Rejects trees and connections the layout core does not handle.
    pub fn validate(&self) -> Result<(), DiagramError> {
        let mut all = Vec::new();
        self.root.walk(&mut all);
        let mut seen = HashSet::new();
        for item in &all {
            if !seen.insert(item.path.as_str()) {
                return Err(DiagramError::DuplicatePath(item.path.clone()));
            }
        }
        for connection in &self.connections {
            if connection.from.is_many() && connection.to.is_many() {
                return Err(DiagramError::ManyToMany(connection.name.clone()));
            }
            for endpoint in [&connection.from, &connection.to] {
                let paths = endpoint.paths();
                if paths.is_empty() {
                    return Err(DiagramError::EmptyEndpointList(connection.name.clone()));
                }
                for path in paths {
                    if !seen.contains(path) {
                        return Err(DiagramError::UnknownEndpoint {
                            connection: connection.name.clone(),
                            path: path.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn single_connections(&self) -> Vec<SingleConnection> {
        self.connections
            .iter()
            .flat_map(Connection::decompose)
            .collect()
    }
}
