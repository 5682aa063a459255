use archroute::{Orientation, RenderOptions, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    orientation: Option<String>,
    show_roads: Option<bool>,
}

fn build_render_options(options: DiagramRenderOptions) -> Result<RenderOptions, String> {
    let mut render_options = if options.theme.as_deref() == Some("modern") {
        RenderOptions::modern()
    } else {
        RenderOptions::classic()
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(token) = options.orientation.as_deref() {
        let orientation =
            Orientation::from_token(token).ok_or_else(|| format!("unknown orientation `{token}`"))?;
        render_options = render_options.with_orientation(orientation);
    }
    if let Some(show_roads) = options.show_roads {
        render_options = render_options.with_roads(show_roads);
    }
    Ok(render_options)
}

#[wasm_bindgen]
pub fn render_diagram_svg(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<DiagramRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        DiagramRenderOptions::default()
    };

    let render_options = build_render_options(options).map_err(|error| JsValue::from_str(&error))?;
    render_with_options(document, render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
