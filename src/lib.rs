#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use ir::{BoxKind, Connection, Diagram, DiagramBox, DiagramError, Orientation};
pub use layout::{Layout, compute_layout, compute_layout_with};
pub use parser::parse_document;
pub use render::render_svg;
pub use theme::Theme;

/// Everything needed to turn a document into SVG in one call.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::classic()
    }
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::from_config(Config::default())
    }

    pub fn modern() -> Self {
        let mut options = Self::classic();
        options.theme = Theme::modern();
        options.render.background = options.theme.background.clone();
        options
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            theme: config.theme,
            layout: config.layout,
            render: config.render,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.layout.orientation = orientation;
        self
    }

    pub fn with_roads(mut self, show_roads: bool) -> Self {
        self.render.show_roads = show_roads;
        self
    }
}

/// Parses a JSON5 document, lays it out and renders it.
pub fn render_with_options(document: &str, options: RenderOptions) -> anyhow::Result<String> {
    let diagram = parse_document(document)?;
    let layout = compute_layout(&diagram, &options.layout);
    Ok(render_svg(&layout, &options.theme, &options.render))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_document_end_to_end() {
        let document = r#"{
            root: { id: "sys", children: [{ id: "a" }, { id: "b" }] },
            connections: [{ from: "sys_a", to: "sys_b", line: "-->" }],
        }"#;
        let svg = render_with_options(document, RenderOptions::modern().with_roads(true)).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("class=\"road\""));
    }

    #[test]
    fn invalid_documents_are_errors() {
        assert!(render_with_options("{ root: ", RenderOptions::classic()).is_err());
    }
}
