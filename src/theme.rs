use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub background: String,
    pub text_color: String,
    pub line_color: String,
    pub activity_fill: String,
    pub activity_border: String,
    pub activity_text: String,
    pub actor_fill: String,
    pub actor_fill_end: String,
    pub actor_border: String,
    pub component_fill: String,
    pub component_fill_end: String,
    pub component_border: String,
    pub container_border: String,
    pub icon_fill: String,
    pub road_fill: String,
    pub road_stroke: String,
    pub note_fill: String,
    pub note_border: String,
    pub shadow: bool,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Arial".to_string(),
            background: "#FFFFFF".to_string(),
            text_color: "#000000".to_string(),
            line_color: "#000000".to_string(),
            activity_fill: "#C5FFA6".to_string(),
            activity_border: "#145B17".to_string(),
            activity_text: "#085D24".to_string(),
            actor_fill: "#D9FCFF".to_string(),
            actor_fill_end: "#C6E6FF".to_string(),
            actor_border: "#145B17".to_string(),
            component_fill: "#C2E5FE".to_string(),
            component_fill_end: "#96B1DA".to_string(),
            component_border: "#4E4E97".to_string(),
            container_border: "#000000".to_string(),
            icon_fill: "#FFFFFF".to_string(),
            road_fill: "rgba(255, 0, 0, 0.08)".to_string(),
            road_stroke: "#FF8080".to_string(),
            note_fill: "#FFFFCB".to_string(),
            note_border: "#FFCC66".to_string(),
            shadow: true,
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            activity_fill: "#EAF7EE".to_string(),
            activity_border: "#7BB58C".to_string(),
            activity_text: "#1F5130".to_string(),
            actor_fill: "#F8FAFF".to_string(),
            actor_fill_end: "#EEF2F8".to_string(),
            actor_border: "#C7D2E5".to_string(),
            component_fill: "#F7FAFF".to_string(),
            component_fill_end: "#E3EBF8".to_string(),
            component_border: "#9FB1D1".to_string(),
            container_border: "#AAB6CC".to_string(),
            icon_fill: "#FFFFFF".to_string(),
            road_fill: "rgba(122, 138, 166, 0.10)".to_string(),
            road_stroke: "#D7E0F0".to_string(),
            note_fill: "#FFFBEA".to_string(),
            note_border: "#E6D3A3".to_string(),
            shadow: false,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}
