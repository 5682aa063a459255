use crate::config::TextMeasure;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Advance of one character in the estimate mode, relative to the font size.
const ESTIMATE_CHAR_RATIO: f32 = 0.6;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of a single line of `text`.
pub fn text_width(text: &str, font_size: f32, font_family: &str, mode: TextMeasure) -> f32 {
    match mode {
        TextMeasure::Estimate => estimate_text_width(text, font_size),
        TextMeasure::Font => measure_text_width(text, font_size, font_family)
            .unwrap_or_else(|| estimate_text_width(text, font_size)),
    }
}

pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * ESTIMATE_CHAR_RATIO * font_size.max(0.0)
}

/// Measures with the first installed font matching the CSS-like family list.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontData>>,
}

struct FontData {
    bytes: Vec<u8>,
    index: u32,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_ascii_lowercase();
        if !self.faces.contains_key(&key) {
            let loaded = self.load(font_family);
            self.faces.insert(key.clone(), loaded);
        }
        let data = self.faces.get(&key)?.as_ref()?;
        let face = Face::parse(&data.bytes, data.index).ok()?;
        let scale = font_size / face.units_per_em().max(1) as f32;
        let fallback = font_size * ESTIMATE_CHAR_RATIO;
        let width = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map(|advance| advance as f32 * scale)
                    .unwrap_or(fallback)
            })
            .sum::<f32>();
        Some(width)
    }

    fn load(&mut self, font_family: &str) -> Option<FontData> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index).ok().map(|_| FontData {
                    bytes: data.to_vec(),
                    index,
                })
            })
            .flatten()
    }
}
