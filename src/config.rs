use crate::ir::{BoxKind, Orientation};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMeasure {
    /// Fixed advance of 0.6 × font size per character.
    #[default]
    Estimate,
    /// Glyph advances of a system font, falling back to the estimate.
    Font,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Space outside a box border. Items of one line are `2 * margin` apart.
    pub margin: f32,
    /// Space inside a box border.
    pub padding: f32,
    pub title_height: f32,
    pub title_font_family: String,
    pub title_font_size: f32,
    /// Corridor left around the root box for outward connectors.
    pub root_margin: f32,
    pub orientation: Orientation,
    pub obstacle_kinds: Vec<BoxKind>,
    pub min_width: f32,
    pub min_height: f32,
    /// Horizontal room reserved next to the title for the kind glyph.
    pub icon_space: f32,
    pub text_measure: TextMeasure,
    pub lane_step: i32,
    pub min_border_range: f32,
    /// Space around notes in the note bands.
    pub note_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 10.0,
            padding: 10.0,
            title_height: 25.0,
            title_font_family: "Consolas".to_string(),
            title_font_size: 15.0,
            root_margin: 30.0,
            orientation: Orientation::LeftRight,
            obstacle_kinds: vec![BoxKind::Activity],
            min_width: 200.0,
            min_height: 50.0,
            icon_space: 50.0,
            text_measure: TextMeasure::Estimate,
            lane_step: 10,
            min_border_range: 5.0,
            note_margin: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub background: String,
    pub show_roads: bool,
    pub stroke_width: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            show_roads: false,
            stroke_width: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin: Option<f32>,
    padding: Option<f32>,
    title_height: Option<f32>,
    title_font_family: Option<String>,
    title_font_size: Option<f32>,
    root_margin: Option<f32>,
    orientation: Option<String>,
    obstacle_kinds: Option<Vec<BoxKind>>,
    min_width: Option<f32>,
    min_height: Option<f32>,
    icon_space: Option<f32>,
    text_measure: Option<TextMeasure>,
    lane_step: Option<i32>,
    min_border_range: Option<f32>,
    note_margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    background: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    activity_fill: Option<String>,
    activity_border: Option<String>,
    component_fill: Option<String>,
    component_border: Option<String>,
    actor_fill: Option<String>,
    actor_border: Option<String>,
    container_border: Option<String>,
    note_fill: Option<String>,
    note_border: Option<String>,
    shadow: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    show_roads: Option<bool>,
    stroke_width: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.activity_fill {
            config.theme.activity_fill = v;
        }
        if let Some(v) = vars.activity_border {
            config.theme.activity_border = v;
        }
        if let Some(v) = vars.component_fill {
            config.theme.component_fill_end = v.clone();
            config.theme.component_fill = v;
        }
        if let Some(v) = vars.component_border {
            config.theme.component_border = v;
        }
        if let Some(v) = vars.actor_fill {
            config.theme.actor_fill_end = v.clone();
            config.theme.actor_fill = v;
        }
        if let Some(v) = vars.actor_border {
            config.theme.actor_border = v;
        }
        if let Some(v) = vars.container_border {
            config.theme.container_border = v;
        }
        if let Some(v) = vars.note_fill {
            config.theme.note_fill = v;
        }
        if let Some(v) = vars.note_border {
            config.theme.note_border = v;
        }
        if let Some(v) = vars.shadow {
            config.theme.shadow = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.margin {
            target.margin = v.max(0.0);
        }
        if let Some(v) = layout.padding {
            target.padding = v.max(0.0);
        }
        if let Some(v) = layout.title_height {
            target.title_height = v.max(0.0);
        }
        if let Some(v) = layout.title_font_family {
            target.title_font_family = v;
        }
        if let Some(v) = layout.title_font_size {
            target.title_font_size = v.max(1.0);
        }
        if let Some(v) = layout.root_margin {
            target.root_margin = v.max(0.0);
        }
        if let Some(token) = layout.orientation.as_deref() {
            target.orientation = Orientation::from_token(token)
                .ok_or_else(|| anyhow::anyhow!("unknown orientation `{token}`"))?;
        }
        if let Some(v) = layout.obstacle_kinds {
            target.obstacle_kinds = v;
        }
        if let Some(v) = layout.min_width {
            target.min_width = v.max(0.0);
        }
        if let Some(v) = layout.min_height {
            target.min_height = v.max(0.0);
        }
        if let Some(v) = layout.icon_space {
            target.icon_space = v.max(0.0);
        }
        if let Some(v) = layout.text_measure {
            target.text_measure = v;
        }
        if let Some(v) = layout.lane_step {
            target.lane_step = v.max(1);
        }
        if let Some(v) = layout.min_border_range {
            target.min_border_range = v.max(0.0);
        }
        if let Some(v) = layout.note_margin {
            target.note_margin = v.max(0.0);
        }
    }

    if let Some(v) = parsed.show_roads {
        config.render.show_roads = v;
    }
    if let Some(v) = parsed.stroke_width {
        config.render.stroke_width = v.max(0.1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(json: &str) -> anyhow::Result<Config> {
        let mut config = Config::default();
        let parsed: ConfigFile = serde_json::from_str(json)?;
        apply_config_file(&mut config, parsed)?;
        Ok(config)
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.margin, 10.0);
        assert_eq!(config.layout.title_font_family, "Consolas");
        assert_eq!(config.layout.obstacle_kinds, vec![BoxKind::Activity]);
        assert_eq!(config.layout.orientation, Orientation::LeftRight);
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let config = apply(
            r##"{
                "theme": "modern",
                "themeVariables": { "noteFill": "#FFF0F0" },
                "layout": { "margin": 6, "orientation": "td", "obstacleKinds": ["activity", "database"], "noteMargin": 20 },
                "showRoads": true
            }"##,
        )
        .unwrap();
        assert_eq!(config.layout.margin, 6.0);
        assert_eq!(config.layout.padding, 10.0);
        assert_eq!(config.layout.orientation, Orientation::TopDown);
        assert_eq!(
            config.layout.obstacle_kinds,
            vec![BoxKind::Activity, BoxKind::Database]
        );
        assert!(config.render.show_roads);
        assert!(!config.theme.shadow);
        assert_eq!(config.layout.note_margin, 20.0);
        assert_eq!(config.theme.note_fill, "#FFF0F0");
        assert_eq!(config.theme.note_border, "#E6D3A3");
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(apply(r#"{ "theme": "neon" }"#).is_err());
        assert!(apply(r#"{ "layout": { "orientation": "diagonal" } }"#).is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let path = std::env::temp_dir().join(format!("archroute-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "layout": { "rootMargin": 44 } }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.layout.root_margin, 44.0);
    }
}
