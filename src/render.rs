use crate::config::RenderConfig;
use crate::ir::BoxKind;
use crate::layout::geometry::Point;
use crate::layout::{BoxLayout, ConnectionLayout, Layout, NoteLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Arrowhead drawn at one end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowHead {
    Simple,
    Filled,
    Square,
}

impl ArrowHead {
    fn id(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Filled => "filled",
            Self::Square => "square",
        }
    }
}

/// Decoration parsed from a connection's line text such as `<-->`, `#~~>>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineStyle {
    pub start: Option<ArrowHead>,
    pub end: Option<ArrowHead>,
    pub dash: Option<&'static str>,
}

pub fn parse_line_style(line: &str) -> LineStyle {
    let line = line.trim();
    let start = if line.starts_with("<<") {
        Some(ArrowHead::Filled)
    } else if line.starts_with('<') {
        Some(ArrowHead::Simple)
    } else if line.starts_with('#') {
        Some(ArrowHead::Square)
    } else {
        None
    };
    let end = if line.ends_with(">>") {
        Some(ArrowHead::Filled)
    } else if line.ends_with('>') {
        Some(ArrowHead::Simple)
    } else if line.len() > 1 && line.ends_with('#') {
        Some(ArrowHead::Square)
    } else {
        None
    };
    let dash = if line.contains('~') {
        Some("2, 2")
    } else if line.contains('.') {
        Some("4, 4")
    } else {
        None
    };
    LineStyle { start, end, dash }
}

/// Accepts `#RRGGBB`, bare `RRGGBB` and named colors. The result is
/// attribute-safe.
pub fn normalize_color(color: &str) -> String {
    let color = color.trim();
    let is_hex = matches!(color.len(), 3 | 6 | 8) && color.chars().all(|ch| ch.is_ascii_hexdigit());
    if is_hex {
        format!("#{color}")
    } else {
        escape_xml(color)
    }
}

pub fn render_svg(layout: &Layout, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let notes = &layout.notes;
    let width = layout.width.max(notes.width).max(1.0);
    let height = (notes.top_height + layout.height + notes.bottom_height).max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&config.background)
    ));

    svg.push_str("<defs>");
    push_gradient(&mut svg, "actor-fill", &theme.actor_fill, &theme.actor_fill_end);
    push_gradient(&mut svg, "component-fill", &theme.component_fill, &theme.component_fill_end);
    if theme.shadow {
        svg.push_str(
            "<filter id=\"shadow\" x=\"-10%\" y=\"-10%\" width=\"130%\" height=\"130%\"><feDropShadow dx=\"3\" dy=\"3\" stdDeviation=\"2\" flood-opacity=\"0.35\"/></filter>",
        );
    }
    for (idx, connection) in layout.connections.iter().enumerate() {
        let style = parse_line_style(connection.style.line.as_deref().unwrap_or("-->"));
        let color = connection_color(connection, theme);
        for head in [style.start, style.end].into_iter().flatten() {
            push_marker(&mut svg, idx, head, &color);
        }
    }
    svg.push_str("</defs>");
    svg.push_str(&format!("<g transform=\"translate(0, {})\">", notes.top_height));

    if config.show_roads {
        for road in layout.highway.roads.values() {
            svg.push_str(&format!(
                "<rect class=\"road\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.5\"><title>{}</title></rect>",
                road.rect.x,
                road.rect.y,
                road.rect.width,
                road.rect.height,
                theme.road_fill,
                theme.road_stroke,
                escape_xml(&road.name)
            ));
        }
    }

    for item in layout.boxes_by_depth() {
        push_box(&mut svg, item, theme);
    }

    for (idx, connection) in layout.connections.iter().enumerate() {
        if connection.points.len() < 2 {
            continue;
        }
        let style = parse_line_style(connection.style.line.as_deref().unwrap_or("-->"));
        let mut attrs = String::new();
        if let Some(dash) = style.dash {
            attrs.push_str(&format!(" stroke-dasharray=\"{dash}\""));
        }
        if let Some(head) = style.start {
            attrs.push_str(&format!(" marker-start=\"url(#{})\"", marker_id(idx, head)));
        }
        if let Some(head) = style.end {
            attrs.push_str(&format!(" marker-end=\"url(#{})\"", marker_id(idx, head)));
        }
        svg.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{attrs}><title>{}</title></polyline>",
            points_attr(&connection.points),
            connection_color(connection, theme),
            config.stroke_width,
            escape_xml(&connection.name)
        ));
    }

    for note in &notes.notes {
        push_note(&mut svg, note, theme);
    }

    svg.push_str("</g></svg>");
    svg
}

fn connection_color(connection: &ConnectionLayout, theme: &Theme) -> String {
    connection
        .style
        .color
        .as_deref()
        .map(normalize_color)
        .unwrap_or_else(|| theme.line_color.clone())
}

fn marker_id(idx: usize, head: ArrowHead) -> String {
    format!("arrow-{idx}-{}", head.id())
}

fn push_gradient(svg: &mut String, id: &str, from: &str, to: &str) {
    svg.push_str(&format!(
        "<linearGradient id=\"{id}\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\"><stop offset=\"0%\" stop-color=\"{from}\"/><stop offset=\"100%\" stop-color=\"{to}\"/></linearGradient>"
    ));
}

fn push_marker(svg: &mut String, idx: usize, head: ArrowHead, color: &str) {
    let (shape, fill) = match head {
        ArrowHead::Simple => ("<path d=\"M 0 0 L 10 5 L 0 10\"", "none"),
        ArrowHead::Filled => ("<path d=\"M 0 0 L 10 5 L 0 10 z\"", color),
        ArrowHead::Square => ("<rect x=\"2\" y=\"2\" width=\"6\" height=\"6\"", color),
    };
    svg.push_str(&format!(
        "<marker id=\"{}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto-start-reverse\">{shape} fill=\"{fill}\" stroke=\"{color}\"/></marker>",
        marker_id(idx, head)
    ));
}

fn push_box(svg: &mut String, item: &BoxLayout, theme: &Theme) {
    let shadow = if theme.shadow { " filter=\"url(#shadow)\"" } else { "" };
    let custom = item.color.as_deref().map(normalize_color);
    let (fill, stroke, text_color, dashed) = match item.kind {
        BoxKind::Activity => (
            custom.unwrap_or_else(|| theme.activity_fill.clone()),
            theme.activity_border.clone(),
            theme.activity_text.clone(),
            false,
        ),
        BoxKind::Actor => (
            custom.unwrap_or_else(|| "url(#actor-fill)".to_string()),
            theme.actor_border.clone(),
            theme.text_color.clone(),
            false,
        ),
        BoxKind::Component => (
            custom.unwrap_or_else(|| "url(#component-fill)".to_string()),
            theme.component_border.clone(),
            theme.text_color.clone(),
            false,
        ),
        _ => (
            "none".to_string(),
            custom.unwrap_or_else(|| theme.container_border.clone()),
            theme.text_color.clone(),
            true,
        ),
    };

    if dashed {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-dasharray=\"6 4\" stroke-width=\"1\"/>",
            item.x, item.y, item.width, item.height
        ));
    } else {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.2\"{shadow}/>",
            item.x, item.y, item.width, item.height
        ));
        push_glyph(svg, item, theme);
    }

    let title = if dashed {
        format!("{} «{}»", item.name, item.kind.as_str())
    } else {
        item.name.clone()
    };
    svg.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{text_color}\">{}</text>",
        item.x + 8.0,
        item.y + item.title_font_size + 6.0,
        escape_xml(&item.title_font_family),
        item.title_font_size,
        escape_xml(&title)
    ));
}

/// Small kind glyph in the top-right corner of filled boxes.
fn push_glyph(svg: &mut String, item: &BoxLayout, theme: &Theme) {
    let x = item.x + item.width - 28.0;
    let y = item.y + 8.0;
    let stroke = &theme.line_color;
    match item.kind {
        BoxKind::Actor => svg.push_str(&format!(
            "<g stroke=\"{stroke}\" fill=\"{}\" stroke-width=\"1\"><circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\"/><path d=\"M {:.2} {:.2} v 9 m -6 -5 h 12 m -6 5 l -5 6 m 5 -6 l 5 6\" fill=\"none\"/></g>",
            theme.icon_fill,
            x + 10.0,
            y + 4.0,
            x + 10.0,
            y + 8.0
        )),
        BoxKind::Component => svg.push_str(&format!(
            "<g stroke=\"{stroke}\" fill=\"{}\" stroke-width=\"1\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"16\" height=\"18\"/><rect x=\"{:.2}\" y=\"{:.2}\" width=\"8\" height=\"4\"/><rect x=\"{:.2}\" y=\"{:.2}\" width=\"8\" height=\"4\"/></g>",
            theme.icon_fill,
            x + 6.0,
            y,
            x + 2.0,
            y + 4.0,
            x + 2.0,
            y + 10.0
        )),
        _ => {}
    }
}

/// Folded-corner note with a dashed leader to its box.
fn push_note(svg: &mut String, note: &NoteLayout, theme: &Theme) {
    const FOLD: f32 = 10.0;
    let (x, y) = (note.x, note.y);
    let width = note.width + 10.0;
    let height = note.height + 20.0;
    svg.push_str(&format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"2, 2\"/>",
        x + width / 2.0,
        y + height / 2.0,
        note.anchor.0,
        note.anchor.1,
        theme.line_color
    ));
    let outline = [
        (x, y),
        (x + width - FOLD, y),
        (x + width, y + FOLD),
        (x + width, y + height),
        (x, y + height),
    ];
    let fold = [(x + width - FOLD, y), (x + width, y + FOLD), (x + width - FOLD, y + FOLD)];
    for shape in [&outline[..], &fold[..]] {
        svg.push_str(&format!(
            "<polygon class=\"note\" points=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            points_attr(shape),
            theme.note_fill,
            theme.note_border
        ));
    }
    for (idx, line) in note.lines.iter().enumerate() {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            x + 5.0,
            y + 20.0 + note.font_size * idx as f32,
            escape_xml(&note.font_family),
            note.font_size,
            theme.text_color,
            escape_xml(line)
        ));
    }
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().to_string())
        .unwrap_or_else(|| "Arial".to_string());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::{Connection, ConnectionStyle, Diagram, DiagramBox};
    use crate::layout::compute_layout;

    fn sample_layout(line: &str) -> Layout {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .named("Shop & Co")
            .with_child(DiagramBox::new("user", BoxKind::Actor))
            .with_child(DiagramBox::new("api", BoxKind::Component))
            .with_child(DiagramBox::new("check", BoxKind::Activity));
        let mut connection = Connection::new("login", "sys_user", "sys_api");
        connection.style = ConnectionStyle {
            color: Some("FF0000".to_string()),
            line: Some(line.to_string()),
        };
        let diagram = Diagram::new(root).connect(connection);
        compute_layout(&diagram, &Config::default().layout)
    }

    #[test]
    fn line_text_drives_heads_and_dashes() {
        assert_eq!(
            parse_line_style("<-->>"),
            LineStyle {
                start: Some(ArrowHead::Simple),
                end: Some(ArrowHead::Filled),
                dash: None,
            }
        );
        let style = parse_line_style("#~~>");
        assert_eq!(style.start, Some(ArrowHead::Square));
        assert_eq!(style.end, Some(ArrowHead::Simple));
        assert_eq!(style.dash, Some("2, 2"));
        assert_eq!(parse_line_style("..").dash, Some("4, 4"));
        assert_eq!(parse_line_style("--"), LineStyle::default());
    }

    #[test]
    fn bare_hex_colors_get_a_hash() {
        assert_eq!(normalize_color("FF8800"), "#FF8800");
        assert_eq!(normalize_color("#FF8800"), "#FF8800");
        assert_eq!(normalize_color("red"), "red");
    }

    #[test]
    fn render_svg_basic() {
        let layout = sample_layout("-.->>");
        let config = Config::default();
        let svg = render_svg(&layout, &config.theme, &config.render);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Shop &amp; Co"));
        assert!(svg.contains("url(#component-fill)"));
        assert!(svg.contains("stroke=\"#FF0000\""));
        assert!(svg.contains("stroke-dasharray=\"4, 4\""));
        assert!(svg.contains("marker-end=\"url(#arrow-0-filled)\""));
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("class=\"road\""));
    }

    #[test]
    fn road_overlay_is_optional() {
        let layout = sample_layout("-->");
        let mut config = Config::default();
        config.render.show_roads = true;
        let svg = render_svg(&layout, &config.theme, &config.render);
        assert!(svg.contains("class=\"road\""));
        assert!(svg.contains("sys main 0"));
    }

    #[test]
    fn quoted_colors_stay_inside_the_attribute() {
        assert_eq!(normalize_color("red\" onload=\"x"), "red&quot; onload=&quot;x");
        let mut layout = sample_layout("-->");
        layout.connections[0].style.color = Some("blue\"/><script/>".to_string());
        let config = Config::default();
        let svg = render_svg(&layout, &config.theme, &config.render);
        assert!(!svg.contains("<script"));
        assert!(svg.contains("stroke=\"blue&quot;/&gt;&lt;script/&gt;\""));
    }

    #[test]
    fn notes_grow_the_canvas_and_point_at_their_box() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(DiagramBox::new("a", BoxKind::Component).with_note("top <note>"))
            .with_break()
            .with_child(DiagramBox::new("b", BoxKind::Component).with_note("bottom\\nnote"));
        let layout = compute_layout(&Diagram::new(root), &Config::default().layout);
        let notes = &layout.notes;
        assert!(notes.top_height > 0.0 && notes.bottom_height > 0.0);

        let config = Config::default();
        let svg = render_svg(&layout, &config.theme, &config.render);
        let height = notes.top_height + layout.height + notes.bottom_height;
        assert!(svg.contains(&format!("height=\"{height}\"")));
        assert!(svg.contains(&format!("<g transform=\"translate(0, {})\">", notes.top_height)));
        assert_eq!(svg.matches("class=\"note\"").count(), 4);
        assert!(svg.contains("fill=\"#FFFFCB\""));
        assert!(svg.contains("top &lt;note&gt;"));
        assert!(svg.contains(">bottom</text>"));
        assert!(svg.contains(">note</text>"));

        let upper = notes.note("sys_a").unwrap();
        assert!(svg.contains(&format!(
            "x2=\"{:.2}\" y2=\"{:.2}\"",
            upper.anchor.0, upper.anchor.1
        )));
    }

    #[test]
    fn escapes_xml() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
