use crate::layout::{LaneClaim, Layout, NoteLayout, RouteStrategy};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub boxes: Vec<BoxDump>,
    pub connections: Vec<ConnectionDump>,
    pub roads: Vec<RoadDump>,
    pub notes: Vec<NoteLayout>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BoxDump {
    pub path: String,
    pub name: String,
    pub kind: String,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub name: String,
    pub from: String,
    pub to: String,
    pub strategy: Option<RouteStrategy>,
    pub points: Vec<[f32; 2]>,
    pub claims: Vec<LaneClaim>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoadDump {
    pub name: String,
    pub owner: String,
    pub kind: String,
    pub orientation: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lanes: Vec<i32>,
    pub closing: bool,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let boxes = layout
            .boxes_by_depth()
            .into_iter()
            .map(|item| BoxDump {
                path: item.path.clone(),
                name: item.name.clone(),
                kind: item.kind.as_str().to_string(),
                depth: item.depth,
                x: item.x,
                y: item.y,
                width: item.width,
                height: item.height,
            })
            .collect();

        let connections = layout
            .connections
            .iter()
            .map(|connection| ConnectionDump {
                name: connection.name.clone(),
                from: connection.from.clone(),
                to: connection.to.clone(),
                strategy: connection.strategy,
                points: connection.points.iter().map(|(x, y)| [*x, *y]).collect(),
                claims: connection.claims.clone(),
                warnings: connection.warnings.iter().map(ToString::to_string).collect(),
            })
            .collect();

        let roads = layout
            .highway
            .roads
            .values()
            .map(|road| RoadDump {
                name: road.name.clone(),
                owner: road.owner.clone(),
                kind: format!("{:?}", road.kind),
                orientation: format!("{:?}", road.orientation),
                x: road.rect.x,
                y: road.rect.y,
                width: road.rect.width,
                height: road.rect.height,
                lanes: road.lanes.iter().copied().collect(),
                closing: layout.highway.is_final(&road.name),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            boxes,
            connections,
            roads,
            notes: layout.notes.notes.clone(),
            warnings: layout.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{BoxKind, Connection, Diagram, DiagramBox};
    use crate::layout::compute_layout;

    #[test]
    fn dump_lists_boxes_connections_and_roads() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(DiagramBox::new("a", BoxKind::Component))
            .with_child(DiagramBox::new("b", BoxKind::Component).with_note("billing"));
        let diagram = Diagram::new(root).connect(Connection::new("c", "sys_a", "sys_b"));
        let layout = compute_layout(&diagram, &LayoutConfig::default());
        let dump = LayoutDump::from_layout(&layout);
        assert_eq!(dump.boxes[0].path, "sys");
        assert_eq!(dump.boxes.len(), 3);
        assert_eq!(dump.connections[0].strategy, Some(RouteStrategy::Direct));
        assert_eq!(dump.connections[0].claims.len(), 2);
        assert!(dump.roads.iter().any(|road| road.name == "sys main 1" && road.closing));

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["connections"][0]["strategy"], "direct");
        assert_eq!(json["connections"][0]["claims"][0]["kind"], "border");
        assert_eq!(json["notes"][0]["path"], "sys_b");
        assert_eq!(json["notes"][0]["band"], "bottom");
    }

    #[test]
    fn writes_pretty_json() {
        let diagram = Diagram::new(DiagramBox::new("solo", BoxKind::Component));
        let layout = compute_layout(&diagram, &LayoutConfig::default());
        let path = std::env::temp_dir().join(format!("archroute-dump-{}.json", std::process::id()));
        write_layout_dump(&path, &layout).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(text.contains("\"solo\""));
    }
}
