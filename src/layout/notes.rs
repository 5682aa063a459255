use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::text_metrics::text_width;

use super::geometry::{Point, Rect};
use super::types::BoxLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteBand {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteLayout {
    pub path: String,
    pub band: NoteBand,
    pub lines: Vec<String>,
    /// Text extent in layout coordinates. Top notes sit above `y = 0`, bottom
    /// notes start at the canvas height.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Middle of the box edge facing the note's band.
    pub anchor: Point,
    pub font_size: f32,
    pub font_family: String,
}

impl NoteLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Notes stacked in a band above and a band below the canvas.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteBands {
    pub notes: Vec<NoteLayout>,
    pub top_height: f32,
    pub bottom_height: f32,
    /// Right edge of the widest band, margin included.
    pub width: f32,
}

impl NoteBands {
    pub fn band(&self, band: NoteBand) -> impl Iterator<Item = &NoteLayout> {
        self.notes.iter().filter(move |note| note.band == band)
    }

    pub fn note(&self, path: &str) -> Option<&NoteLayout> {
        self.notes.iter().find(|note| note.path == path)
    }
}

/// Splits note text into lines. A literal `\n` breaks the line too.
pub fn note_lines(text: &str) -> Vec<String> {
    text.replace("\\n", "\n").lines().map(str::to_string).collect()
}

/// Moves a note at `x` right so that it starts at `target_x`, without its
/// margin passing `right_most`. Never moves it left.
pub fn shift_to_right(x: f32, width: f32, target_x: f32, right_most: f32, margin: f32) -> f32 {
    let limit = (target_x + width + margin).min(right_most);
    let delta = limit - (x + width + margin);
    if delta > 0.0 { x + delta } else { x }
}

/// Places the note of every visible box. A box whose centre lies in the upper
/// half of the canvas gets its note in the top band, otherwise the bottom band.
/// Within a band notes follow their boxes left to right.
pub fn place_notes(
    boxes: &BTreeMap<String, BoxLayout>,
    width: f32,
    height: f32,
    config: &LayoutConfig,
) -> NoteBands {
    let margin = config.note_margin;
    let font_size = config.title_font_size;
    let mut top = Vec::new();
    let mut bottom = Vec::new();

    for item in boxes.values() {
        let Some(text) = item.note.as_deref() else {
            continue;
        };
        let lines = note_lines(text);
        if lines.is_empty() {
            continue;
        }
        let note_width = lines
            .iter()
            .map(|line| text_width(line, font_size, &config.title_font_family, config.text_measure))
            .fold(0.0, f32::max);
        let rect = item.rect();
        let (cx, cy) = rect.center();
        let (band, anchor) = if cy < height / 2.0 {
            (NoteBand::Top, (cx, rect.y))
        } else {
            (NoteBand::Bottom, (cx, rect.bottom()))
        };
        let note = NoteLayout {
            path: item.path.clone(),
            band,
            height: font_size * lines.len() as f32,
            lines,
            x: 0.0,
            y: 0.0,
            width: note_width,
            anchor,
            font_size,
            font_family: config.title_font_family.clone(),
        };
        match band {
            NoteBand::Top => top.push(note),
            NoteBand::Bottom => bottom.push(note),
        }
    }

    top.sort_by(|a, b| a.anchor.0.total_cmp(&b.anchor.0));
    bottom.sort_by(|a, b| a.anchor.0.total_cmp(&b.anchor.0));
    let top_height = band_height(&top, margin);
    let bottom_height = band_height(&bottom, margin);
    stack_band(&mut top, -top_height, width, margin);
    stack_band(&mut bottom, height, width, margin);

    let notes: Vec<NoteLayout> = top.into_iter().chain(bottom).collect();
    let bands_width = notes
        .iter()
        .map(|note| note.x + note.width + margin)
        .fold(0.0, f32::max);
    if !notes.is_empty() {
        debug!(notes = notes.len(), top_height, bottom_height, "notes placed");
    }
    NoteBands {
        notes,
        top_height,
        bottom_height,
        width: bands_width,
    }
}

fn band_height(notes: &[NoteLayout], margin: f32) -> f32 {
    notes
        .iter()
        .map(|note| note.height + margin)
        .fold(0.0, f32::max)
}

/// Lays the band out left-aligned, then slides notes right, last first, each
/// bounded by the note after it.
fn stack_band(notes: &mut [NoteLayout], y: f32, right_end: f32, margin: f32) {
    let mut x = 0.0;
    for note in notes.iter_mut() {
        note.x = x;
        note.y = y;
        x += note.width + margin;
    }
    let mut right_most = right_end;
    for note in notes.iter_mut().rev() {
        note.x = shift_to_right(note.x, note.width, note.anchor.0, right_most, margin);
        right_most = note.x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BoxKind, Diagram, DiagramBox};
    use crate::layout::compute_layout;

    fn leaf(id: &str) -> DiagramBox {
        DiagramBox::new(id, BoxKind::Component)
    }

    #[test]
    fn literal_newlines_split_notes() {
        assert_eq!(note_lines("one\\ntwo"), vec!["one", "two"]);
        assert_eq!(note_lines("one\ntwo\n"), vec!["one", "two"]);
        assert!(note_lines("").is_empty());
    }

    #[test]
    fn shift_moves_right_up_to_the_next_note() {
        assert_eq!(shift_to_right(0.0, 100.0, 300.0, 1000.0, 50.0), 300.0);
        assert_eq!(shift_to_right(0.0, 100.0, 300.0, 200.0, 50.0), 50.0);
        assert_eq!(shift_to_right(100.0, 100.0, 50.0, 1000.0, 50.0), 100.0);
    }

    #[test]
    fn band_follows_the_box_centre() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a").with_note("upper"))
            .with_break()
            .with_child(leaf("b").with_note("lower\\nhalf"));
        let layout = compute_layout(&Diagram::new(root), &LayoutConfig::default());
        let notes = &layout.notes;

        let upper = notes.note("sys_a").unwrap();
        let a = layout.box_rect("sys_a").unwrap();
        assert_eq!(upper.band, NoteBand::Top);
        assert_eq!(notes.top_height, 15.0 + 50.0);
        assert_eq!(upper.y, -notes.top_height);
        assert_eq!(upper.anchor, (a.center().0, a.y));

        let lower = notes.note("sys_b").unwrap();
        let b = layout.box_rect("sys_b").unwrap();
        assert_eq!(lower.band, NoteBand::Bottom);
        assert_eq!(lower.lines, vec!["lower", "half"]);
        assert_eq!(notes.bottom_height, 30.0 + 50.0);
        assert_eq!(lower.y, layout.height);
        assert_eq!(lower.anchor, (b.center().0, b.bottom()));
    }

    #[test]
    fn notes_slide_toward_their_boxes_in_order() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a").with_note("alpha"))
            .with_child(leaf("b"))
            .with_child(leaf("c").with_note("gamma"));
        let layout = compute_layout(&Diagram::new(root), &LayoutConfig::default());
        let notes: Vec<&NoteLayout> = layout.notes.band(NoteBand::Bottom).collect();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].path, "sys_a");
        assert_eq!(notes[1].path, "sys_c");
        for note in &notes {
            assert!((note.x - note.anchor.0).abs() < 0.01, "{} at {}", note.path, note.x);
        }
        assert!(notes[0].x + notes[0].width + 50.0 <= notes[1].x);
        assert_eq!(layout.notes.top_height, 0.0);
    }

    #[test]
    fn crowded_band_keeps_notes_apart() {
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a").with_note("a fairly long note about a"))
            .with_child(leaf("b").with_note("b"));
        let layout = compute_layout(&Diagram::new(root), &LayoutConfig::default());
        let notes: Vec<&NoteLayout> = layout.notes.band(NoteBand::Bottom).collect();
        assert_eq!(notes.len(), 2);
        for pair in notes.windows(2) {
            assert!(pair[0].x + pair[0].width + 50.0 <= pair[1].x + 0.01);
        }
        for note in &notes {
            assert!(note.x <= note.anchor.0 + 0.01);
            assert!(note.x >= 0.0);
        }
    }

    #[test]
    fn hidden_boxes_have_no_note() {
        let mut hidden = leaf("b").with_note("gone");
        hidden.hidden = true;
        let root = DiagramBox::new("sys", BoxKind::Container)
            .with_child(leaf("a"))
            .with_child(hidden);
        let layout = compute_layout(&Diagram::new(root), &LayoutConfig::default());
        assert!(layout.notes.notes.is_empty());
        assert_eq!(layout.notes.width, 0.0);
    }
}
