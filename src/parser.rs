use crate::ir::{
    BoxKind, Child, Connection, ConnectionStyle, Diagram, DiagramBox, Endpoint, Orientation,
    StyleOverride,
};
use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").unwrap());

/// Lowercases `raw` and strips every non-word character.
pub fn sanitize_id(raw: &str) -> String {
    NON_WORD_RE.replace_all(&raw.to_lowercase(), "").into_owned()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentFile {
    root: BoxFile,
    #[serde(default)]
    connections: Vec<ConnectionFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<BoxKind>,
    #[serde(default)]
    children: Vec<ChildFile>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    removed: bool,
    #[serde(default)]
    min_width: Option<f32>,
    #[serde(default)]
    min_height: Option<f32>,
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    style: Option<StyleOverride>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildFile {
    Marker(String),
    Box(Box<BoxFile>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionFile {
    #[serde(default)]
    name: Option<String>,
    from: Endpoint,
    to: Endpoint,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    line: Option<String>,
}

/// Reads a JSON5 document of the form `{ root: {...}, connections: [...] }`
/// and validates the resulting diagram.
pub fn parse_document(input: &str) -> Result<Diagram> {
    let file: DocumentFile = json5::from_str(input)?;
    let root = build_box(file.root)?;
    let mut diagram = Diagram::new(root);
    for (idx, connection) in file.connections.into_iter().enumerate() {
        let name = connection
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("connection{idx}"));
        diagram = diagram.connect(Connection {
            name,
            from: connection.from,
            to: connection.to,
            style: ConnectionStyle {
                color: connection.color,
                line: connection.line,
            },
        });
    }
    diagram.validate()?;
    Ok(diagram)
}

fn build_box(file: BoxFile) -> Result<DiagramBox> {
    let name = file.name.unwrap_or_default();
    let id = match file.id.as_deref().map(sanitize_id) {
        Some(id) if !id.is_empty() => id,
        _ => sanitize_id(&name),
    };
    if id.is_empty() {
        return Err(anyhow!("box `{name}` has neither an id nor a usable name"));
    }
    let kind = file.kind.unwrap_or(if file.children.is_empty() {
        BoxKind::Component
    } else {
        BoxKind::Container
    });

    let mut item = DiagramBox::new(&id, kind);
    item.name = if name.is_empty() { id.clone() } else { name };
    item.hidden = file.hidden;
    item.removed = file.removed;
    item.min_width = file.min_width;
    item.min_height = file.min_height;
    if let Some(token) = file.orientation.as_deref() {
        item.orientation = Some(
            Orientation::from_token(token)
                .ok_or_else(|| anyhow!("box `{id}`: unknown orientation `{token}`"))?,
        );
    }
    item.style = file.style.unwrap_or_default();
    if file.color.is_some() {
        item.style.color = file.color;
    }
    item.note = file.note.filter(|note| !note.trim().is_empty());

    for child in file.children {
        match child {
            ChildFile::Marker(marker) if marker.eq_ignore_ascii_case("break") => {
                item.children.push(Child::Break);
            }
            ChildFile::Marker(marker) => {
                return Err(anyhow!("box `{id}`: unexpected child `{marker}`"));
            }
            ChildFile::Box(inner) => item.children.push(Child::Box(build_box(*inner)?)),
        }
    }
    Ok(item)
}
