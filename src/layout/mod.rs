pub mod geometry;
pub mod highway;
pub mod lanes;
pub mod notes;
pub mod routing;
pub mod sizer;
pub(crate) mod types;

pub use highway::{CANVAS_PATH, HighwayMap, Road, RoadKind, RoadOrientation, Side};
pub use lanes::LaneSettings;
pub use notes::{NoteBand, NoteBands, NoteLayout};
pub use routing::{IsObstacle, ObstacleKinds, Router, Scene, SceneBox};
pub use types::*;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::ir::{Diagram, DiagramBox};

use geometry::Rect;
use sizer::{BoxStyle, LayoutContext, size_tree};

/// Sizes and places every visible box, then routes the connections in
/// declaration order. Boxes of the configured obstacle kinds are avoided.
pub fn compute_layout(diagram: &Diagram, config: &LayoutConfig) -> Layout {
    let obstacles = ObstacleKinds(config.obstacle_kinds.clone());
    compute_layout_with(diagram, config, &obstacles)
}

pub fn compute_layout_with(diagram: &Diagram, config: &LayoutConfig, obstacles: &dyn IsObstacle) -> Layout {
    let mut root = diagram.root.clone();
    let mut ctx = LayoutContext::new(config);
    let (width, height) = size_tree(&mut root, config.orientation, &mut ctx);

    let mut placement = Placement {
        config,
        map: ctx.map,
        boxes: BTreeMap::new(),
        scene: Scene::new(),
    };
    if root.is_visible() {
        placement.place(&root, (0.0, 0.0), 0, None);
    }
    let Placement {
        mut map,
        boxes,
        scene,
        ..
    } = placement;

    let mut connections = Vec::new();
    let mut warnings = Vec::new();
    let mut router = Router::new(&scene, &mut map, obstacles, LaneSettings::from_config(config));
    for connection in diagram.single_connections() {
        let hidden = [&connection.from, &connection.to]
            .into_iter()
            .find(|path| scene.get(path).is_none() && root.find(path).is_some());
        if let Some(path) = hidden {
            warn!(connection = %connection.name, path = %path, "skipping connection to invisible box");
            warnings.push(LayoutWarning::SkippedConnection {
                name: connection.name.clone(),
                path: path.clone(),
            });
            continue;
        }
        connections.push(router.route(&connection));
    }

    let notes = notes::place_notes(&boxes, width, height, config);
    debug!(
        boxes = boxes.len(),
        connections = connections.len(),
        width,
        height,
        "layout complete"
    );
    Layout {
        width,
        height,
        boxes,
        connections,
        highway: map,
        notes,
        warnings,
    }
}

/// Turns parent-relative positions into absolute ones and moves each
/// container's roads along with it.
struct Placement<'a> {
    config: &'a LayoutConfig,
    map: HighwayMap,
    boxes: BTreeMap<String, BoxLayout>,
    scene: Scene,
}

impl Placement<'_> {
    fn place(&mut self, item: &DiagramBox, origin: (f32, f32), depth: usize, parent: Option<&str>) {
        let x = origin.0 + item.x;
        let y = origin.1 + item.y;
        self.map.translate_roads_of(&item.path, x, y);
        let rect = Rect::new(x, y, item.width, item.height);
        self.scene.insert(&item.path, item.kind, rect, parent);

        let style = BoxStyle::resolve(item, self.config);
        self.boxes.insert(
            item.path.clone(),
            BoxLayout {
                path: item.path.clone(),
                id: item.id.clone(),
                name: item.name.clone(),
                kind: item.kind,
                x,
                y,
                width: item.width,
                height: item.height,
                depth,
                has_children: item.visible_boxes().next().is_some(),
                color: item.style.color.clone(),
                note: item.note.clone(),
                title_font_size: style.title_font_size,
                title_font_family: style.title_font_family,
            },
        );
        for inner in item.visible_boxes() {
            self.place(inner, (x, y), depth + 1, Some(&item.path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BoxKind, Connection};

    fn config() -> LayoutConfig {
        LayoutConfig {
            min_width: 60.0,
            min_height: 30.0,
            ..LayoutConfig::default()
        }
    }

    fn leaf(id: &str) -> DiagramBox {
        DiagramBox::new(id, BoxKind::Component).named("")
    }

    #[test]
    fn positions_are_absolute() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .named("")
            .with_child(DiagramBox::new("g", BoxKind::Group).named("").with_child(leaf("x")));
        let layout = compute_layout(&Diagram::new(root), &config());
        let sys = layout.box_rect("sys").unwrap();
        let group = layout.box_rect("sys_g").unwrap();
        let x = layout.box_rect("sys_g_x").unwrap();
        assert_eq!((sys.x, sys.y), (30.0, 30.0));
        assert_eq!((group.x, group.y), (sys.x + 30.0, sys.y + 55.0));
        assert_eq!((x.x, x.y), (group.x + 30.0, group.y + 55.0));
        assert!(sys.contains_rect(&group) && group.contains_rect(&x));
        assert_eq!(layout.boxes["sys_g_x"].depth, 2);
        assert!(layout.boxes["sys_g"].has_children);
    }

    #[test]
    fn roads_follow_their_container() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .named("")
            .with_child(leaf("a"));
        let layout = compute_layout(&Diagram::new(root), &config());
        let first = layout.highway.road("sys main 0").unwrap();
        let sys = layout.box_rect("sys").unwrap();
        assert_eq!(first.rect.x, sys.x + 10.0);
        assert_eq!(first.rect.y, sys.y + 35.0);
        assert!(sys.contains_rect(&first.rect));
    }

    #[test]
    fn neighbours_connect_directly() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(leaf("b"));
        let diagram = Diagram::new(root).connect(Connection::new("c", "sys_a", "sys_b"));
        let layout = compute_layout(&diagram, &config());
        let routed = layout.connection("c").unwrap();
        assert_eq!(routed.strategy, Some(RouteStrategy::Direct));
        let a = layout.box_rect("sys_a").unwrap();
        let b = layout.box_rect("sys_b").unwrap();
        assert_eq!(routed.points.first().unwrap().0, a.right());
        assert_eq!(routed.points.last().unwrap().0, b.x);
    }

    #[test]
    fn connections_to_hidden_boxes_are_skipped() {
        let mut hidden = leaf("b");
        hidden.hidden = true;
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(hidden);
        let diagram = Diagram::new(root).connect(Connection::new("c", "sys_a", "sys_b"));
        let layout = compute_layout(&diagram, &config());
        assert!(layout.connections.is_empty());
        assert_eq!(
            layout.warnings,
            vec![LayoutWarning::SkippedConnection {
                name: "c".to_string(),
                path: "sys_b".to_string(),
            }]
        );
        assert!(!layout.boxes.contains_key("sys_b"));
    }

    #[test]
    fn custom_obstacle_predicate_is_used() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(leaf("mid"))
            .with_child(leaf("b"));
        let diagram = Diagram::new(root).connect(Connection::new("c", "sys_a", "sys_b"));
        let none = |_: &SceneBox| false;
        let open = compute_layout_with(&diagram, &config(), &none);
        assert_eq!(open.connection("c").unwrap().strategy, Some(RouteStrategy::Direct));

        let middle = |item: &SceneBox| item.path == "sys_mid";
        let blocked = compute_layout_with(&diagram, &config(), &middle);
        let routed = blocked.connection("c").unwrap();
        assert_ne!(routed.strategy, Some(RouteStrategy::Direct));
        let mid = blocked.box_rect("sys_mid").unwrap();
        assert!(!geometry::polyline_crosses_rect(&routed.points, &mid));
    }
}
