use tracing::debug;

use crate::config::LayoutConfig;
use crate::ir::{Child, DiagramBox, Orientation};
use crate::text_metrics::text_width;

use super::geometry::Rect;
use super::highway::{CANVAS_PATH, HighwayMap, Road, RoadKind, RoadOrientation, Side};

/// Mutable state threaded through the recursive sizing pass.
pub struct LayoutContext<'a> {
    pub config: &'a LayoutConfig,
    pub map: HighwayMap,
}

impl<'a> LayoutContext<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            map: HighwayMap::new(),
        }
    }
}

/// Resolved per-box style.
#[derive(Debug, Clone)]
pub struct BoxStyle {
    pub margin: f32,
    pub padding: f32,
    pub title_height: f32,
    pub title_font_size: f32,
    pub title_font_family: String,
}

impl BoxStyle {
    pub fn resolve(item: &DiagramBox, config: &LayoutConfig) -> Self {
        Self {
            margin: item.style.margin.unwrap_or(config.margin),
            padding: item.style.padding.unwrap_or(config.padding),
            title_height: item.style.title_height.unwrap_or(config.title_height),
            title_font_size: item.style.title_font_size.unwrap_or(config.title_font_size),
            title_font_family: item
                .style
                .title_font_family
                .clone()
                .unwrap_or_else(|| config.title_font_family.clone()),
        }
    }
}

/// Maps packing coordinates to screen coordinates. `u` runs along a line,
/// `v` across lines.
#[derive(Debug, Clone, Copy)]
struct Axes(Orientation);

impl Axes {
    fn point(self, u: f32, v: f32) -> (f32, f32) {
        match self.0 {
            Orientation::LeftRight => (u, v),
            Orientation::TopDown => (v, u),
        }
    }

    fn rect(self, u: f32, v: f32, du: f32, dv: f32) -> Rect {
        let (x, y) = self.point(u, v);
        let (width, height) = self.point(du, dv);
        Rect::new(x, y, width, height)
    }

    /// `(u size, v size)` of a box.
    fn extent(self, item: &DiagramBox) -> (f32, f32) {
        match self.0 {
            Orientation::LeftRight => (item.width, item.height),
            Orientation::TopDown => (item.height, item.width),
        }
    }

    fn main_orientation(self) -> RoadOrientation {
        match self.0 {
            Orientation::LeftRight => RoadOrientation::Horizontal,
            Orientation::TopDown => RoadOrientation::Vertical,
        }
    }

    /// Sides facing the previous and next item of the same line.
    fn along_sides(self) -> (Side, Side) {
        match self.0 {
            Orientation::LeftRight => (Side::Left, Side::Right),
            Orientation::TopDown => (Side::Up, Side::Down),
        }
    }

    /// Sides facing the previous and next line.
    fn across_sides(self) -> (Side, Side) {
        match self.0 {
            Orientation::LeftRight => (Side::Up, Side::Down),
            Orientation::TopDown => (Side::Left, Side::Right),
        }
    }
}

struct Packing<'p> {
    owner: &'p str,
    axes: Axes,
    gap: f32,
    origin_u: f32,
    origin_v: f32,
}

/// Places the items of `lines` and registers the container's roads.
/// Returns the far `(u, v)` corner of the packed area.
fn pack_lines(lines: &mut [Vec<&mut DiagramBox>], packing: &Packing<'_>, map: &mut HighwayMap) -> (f32, f32) {
    let Packing {
        owner,
        axes,
        gap,
        origin_u,
        origin_v,
    } = *packing;
    let (before_u, after_u) = axes.along_sides();
    let (before_v, after_v) = axes.across_sides();

    let mut main_starts: Vec<f32> = Vec::with_capacity(lines.len() + 1);
    let mut max_u = origin_u;
    let mut v = origin_v;

    for (line_idx, line) in lines.iter_mut().enumerate() {
        main_starts.push(v);
        v += gap;
        let thickness = line
            .iter()
            .map(|item| axes.extent(item).1)
            .fold(0.0f32, f32::max);

        let mut u = origin_u;
        let mut secondary = Vec::with_capacity(line.len() + 1);
        secondary.push(u);
        u += gap;
        for (item_idx, item) in line.iter_mut().enumerate() {
            let (du, _) = axes.extent(item);
            let (x, y) = axes.point(u, v);
            item.x = x;
            item.y = y;
            map.set_address(&item.path, before_u, Road::secondary_name(owner, line_idx, item_idx));
            map.set_address(&item.path, after_u, Road::secondary_name(owner, line_idx, item_idx + 1));
            map.set_address(&item.path, before_v, Road::main_name(owner, line_idx));
            map.set_address(&item.path, after_v, Road::main_name(owner, line_idx + 1));
            u += du;
            secondary.push(u);
            u += gap;
        }
        for (idx, start) in secondary.iter().enumerate() {
            map.add_road(
                Road::secondary_name(owner, line_idx, idx),
                owner,
                RoadKind::Secondary,
                axes.main_orientation().perpendicular(),
                axes.rect(*start, v, gap, thickness),
            );
        }
        map.mark_final(Road::secondary_name(owner, line_idx, secondary.len() - 1));
        max_u = max_u.max(u);
        v += thickness;
    }
    main_starts.push(v);
    v += gap;

    // Main roads span the widest line, known only once every line is placed.
    let length = max_u - origin_u;
    for (idx, start) in main_starts.iter().enumerate() {
        map.add_road(
            Road::main_name(owner, idx),
            owner,
            RoadKind::Main,
            axes.main_orientation(),
            axes.rect(origin_u, *start, length, gap),
        );
    }
    map.mark_final(Road::main_name(owner, main_starts.len() - 1));
    (max_u, v)
}

/// Splits the visible children into packing lines at Break markers.
fn visible_lines(children: &mut [Child]) -> Vec<Vec<&mut DiagramBox>> {
    let mut lines: Vec<Vec<&mut DiagramBox>> = Vec::new();
    let mut current: Vec<&mut DiagramBox> = Vec::new();
    for child in children.iter_mut() {
        match child {
            Child::Box(item) if item.is_visible() => current.push(item),
            Child::Box(_) => {}
            Child::Break => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Post-order sizing of `item` and its visible subtree. Positions of the
/// children are relative to `item`; roads are registered in local coordinates.
pub fn size_box(item: &mut DiagramBox, inherited: Orientation, ctx: &mut LayoutContext<'_>) {
    let orientation = item.orientation.unwrap_or(inherited);
    let style = BoxStyle::resolve(item, ctx.config);
    let min_width = item.min_width.unwrap_or(ctx.config.min_width);
    let min_height = item.min_height.unwrap_or(ctx.config.min_height);
    let title_width = text_width(
        &item.name,
        style.title_font_size,
        &style.title_font_family,
        ctx.config.text_measure,
    ) + ctx.config.icon_space;

    for child in item.children.iter_mut() {
        if let Child::Box(inner) = child
            && inner.is_visible()
        {
            size_box(inner, orientation, ctx);
        }
    }

    let path = item.path.clone();
    let mut lines = visible_lines(&mut item.children);
    if lines.is_empty() {
        item.width = min_width.max(title_width);
        item.height = min_height;
        debug!(path = %path, width = item.width, height = item.height, "sized leaf");
        return;
    }

    let axes = Axes(orientation);
    let (origin_u, origin_v) = match orientation {
        Orientation::LeftRight => (style.padding, style.padding + style.title_height),
        Orientation::TopDown => (style.padding + style.title_height, style.padding),
    };
    let packing = Packing {
        owner: &path,
        axes,
        gap: 2.0 * style.margin,
        origin_u,
        origin_v,
    };
    let (end_u, end_v) = pack_lines(&mut lines, &packing, &mut ctx.map);
    let line_count = lines.len();
    let (packed_width, packed_height) = axes.point(end_u + style.padding, end_v + style.padding);

    let reserve = 2.0 * style.margin + 2.0 * style.padding;
    item.width = packed_width.max(min_width).max(title_width).max(reserve);
    item.height = packed_height
        .max(min_height)
        .max(reserve + style.title_height);
    debug!(
        path = %path,
        lines = line_count,
        width = item.width,
        height = item.height,
        "packed container"
    );
}

/// Sizes the whole tree and places the root inside the canvas corridors.
/// Returns the canvas size.
pub fn size_tree(root: &mut DiagramBox, orientation: Orientation, ctx: &mut LayoutContext<'_>) -> (f32, f32) {
    let root_margin = ctx.config.root_margin;
    if !root.is_visible() {
        return (2.0 * root_margin, 2.0 * root_margin);
    }
    size_box(root, orientation, ctx);

    let axes = Axes(orientation);
    let packing = Packing {
        owner: CANVAS_PATH,
        axes,
        gap: root_margin,
        origin_u: 0.0,
        origin_v: 0.0,
    };
    let mut lines = vec![vec![root]];
    let (end_u, end_v) = pack_lines(&mut lines, &packing, &mut ctx.map);
    axes.point(end_u, end_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BoxKind, Diagram};

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

    fn sized(root: DiagramBox, config: &LayoutConfig) -> (DiagramBox, HighwayMap) {
        let mut diagram = Diagram::new(root);
        let mut ctx = LayoutContext::new(config);
        size_tree(&mut diagram.root, config.orientation, &mut ctx);
        (diagram.root, ctx.map)
    }

    fn child<'a>(parent: &'a DiagramBox, path: &str) -> &'a DiagramBox {
        parent.find(path).unwrap()
    }

    #[test]
    fn leaf_is_at_least_its_title() {
        let config = config();
        let mut item = DiagramBox::new("svc", BoxKind::Component).named("Payment gateway");
        let mut ctx = LayoutContext::new(&config);
        size_box(&mut item, Orientation::LeftRight, &mut ctx);
        assert_eq!(item.width, 15.0 * 9.0 + 50.0);
        assert_eq!(item.height, 30.0);
    }

    #[test]
    fn single_line_packs_along_u_with_double_margin_gaps() {
        let config = config();
        let root = DiagramBox::new("sys", BoxKind::Container)
            .named("")
            .with_child(leaf("a"))
            .with_child(leaf("b"));
        let (root, map) = sized(root, &config);
        let a = child(&root, "sys_a");
        let b = child(&root, "sys_b");
        assert_eq!((a.x, a.y), (30.0, 55.0));
        assert_eq!((b.x, b.y), (30.0 + 60.0 + 20.0, 55.0));
        // padding + road + a + road + b + road + padding
        assert_eq!(root.width, 10.0 + 20.0 + 60.0 + 20.0 + 60.0 + 20.0 + 10.0);
        assert_eq!(root.height, 10.0 + 25.0 + 20.0 + 30.0 + 20.0 + 10.0);
        assert_eq!(map.address("sys_a").unwrap().road(Side::Right), Some("sys secondary 0.1"));
        assert_eq!(map.address("sys_b").unwrap().road(Side::Left), Some("sys secondary 0.1"));
        assert_eq!(map.address("sys_b").unwrap().road(Side::Down), Some("sys main 1"));
    }

    #[test]
    fn break_starts_a_new_line_and_main_road() {
        let config = config();
        let flat = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(leaf("b"));
        let wrapped = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_break()
            .with_child(leaf("b"));
        let (flat, flat_map) = sized(flat, &config);
        let (wrapped, wrapped_map) = sized(wrapped, &config);
        let mains = |map: &HighwayMap| {
            map.roads_of("sys")
                .filter(|road| road.kind == RoadKind::Main)
                .count()
        };
        assert_eq!(mains(&wrapped_map), mains(&flat_map) + 1);
        assert!(wrapped_map.road("sys main 2").is_some());

        let a = child(&wrapped, "sys_a");
        let b = child(&wrapped, "sys_b");
        assert_eq!(a.x, b.x);
        assert_eq!(b.y, a.y + a.height + 20.0);
        assert_eq!(wrapped_map.address("sys_b").unwrap().road(Side::Up), Some("sys main 1"));
        assert!(wrapped.width < flat.width);
    }

    #[test]
    fn main_roads_are_widened_to_the_longest_line() {
        let config = config();
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_break()
            .with_child(leaf("b"))
            .with_child(leaf("c"));
        let (_, map) = sized(root, &config);
        let first = map.road("sys main 0").unwrap();
        let last = map.road("sys main 2").unwrap();
        assert_eq!(first.rect.width, 20.0 + 60.0 + 20.0 + 60.0 + 20.0);
        assert_eq!(first.rect.width, last.rect.width);
        assert!(map.is_final("sys main 2"));
        assert!(map.is_final("sys secondary 0.1"));
        assert!(map.is_final("sys secondary 1.2"));
        assert!(!map.is_final("sys secondary 1.1"));
    }

    #[test]
    fn hidden_children_take_no_room_and_no_roads() {
        let config = config();
        let mut hidden = leaf("b");
        hidden.hidden = true;
        let with_hidden = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(hidden);
        let alone = DiagramBox::new("sys", BoxKind::Container).with_child(leaf("a"));
        let (with_hidden, map) = sized(with_hidden, &config);
        let (alone, _) = sized(alone, &config);
        assert_eq!(with_hidden.width, alone.width);
        assert_eq!(with_hidden.height, alone.height);
        assert!(map.address("sys_b").is_none());
        assert!(map.road("sys secondary 0.2").is_none());
        assert!(with_hidden.find("sys_b").is_some());
    }

    #[test]
    fn top_down_stacks_along_y() {
        let config = LayoutConfig {
            orientation: Orientation::TopDown,
            ..config()
        };
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(leaf("b"));
        let (root, map) = sized(root, &config);
        let a = child(&root, "sys_a");
        let b = child(&root, "sys_b");
        assert_eq!(a.x, b.x);
        assert_eq!(b.y, a.y + a.height + 20.0);
        assert_eq!(map.road("sys main 0").unwrap().orientation, RoadOrientation::Vertical);
        assert_eq!(map.address("sys_a").unwrap().road(Side::Down), Some("sys secondary 0.1"));
        assert_eq!(map.address("sys_a").unwrap().road(Side::Left), Some("sys main 0"));
    }

    #[test]
    fn orientation_override_applies_to_subtree() {
        let config = config();
        let inner = DiagramBox::new("col", BoxKind::Group)
            .with_orientation(Orientation::TopDown)
            .with_child(leaf("a"))
            .with_child(leaf("b"));
        let root = DiagramBox::new("sys", BoxKind::Container).with_child(inner);
        let (root, _) = sized(root, &config);
        let a = child(&root, "sys_col_a");
        let b = child(&root, "sys_col_b");
        assert_eq!(a.x, b.x);
        assert!(b.y > a.y);
    }

    #[test]
    fn root_sits_inside_canvas_corridors() {
        let config = config();
        let root = DiagramBox::new("sys", BoxKind::Container).with_child(leaf("a"));
        let mut diagram = Diagram::new(root);
        let mut ctx = LayoutContext::new(&config);
        let (width, height) = size_tree(&mut diagram.root, config.orientation, &mut ctx);
        assert_eq!((diagram.root.x, diagram.root.y), (30.0, 30.0));
        assert_eq!(width, diagram.root.width + 60.0);
        assert_eq!(height, diagram.root.height + 60.0);
        assert_eq!(
            ctx.map.address("sys").unwrap().road(Side::Down),
            Some("@canvas main 1")
        );
    }

    #[test]
    fn sizing_is_idempotent() {
        let config = config();
        let build = || {
            DiagramBox::new("sys", BoxKind::Container)
                .with_child(leaf("a"))
                .with_break()
                .with_child(DiagramBox::new("g", BoxKind::Group).with_child(leaf("x")))
        };
        let (once, map_once) = sized(build(), &config);
        let mut twice = once.clone();
        let mut ctx = LayoutContext::new(&config);
        size_tree(&mut twice, config.orientation, &mut ctx);
        assert_eq!(once, twice);
        let rects = |map: &HighwayMap| map.roads.values().map(|road| road.rect).collect::<Vec<_>>();
        assert_eq!(rects(&map_once), rects(&ctx.map));
    }
}
