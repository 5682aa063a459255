use crate::config::LayoutConfig;

use super::geometry::Span;
use super::highway::{HighwayMap, OffroadProbe, Side};

// ── Probe pattern ───────────────────────────────────────────────────
/// Starting shifts tried in turn so repeated allocations interleave around
/// the midpoint instead of stacking next to it.
const PROBE_STRIDES: [i32; 4] = [0, 5, 2, 8];
/// Step used when a range is narrower than twice the configured step.
const NARROW_STEP: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSettings {
    pub step: i32,
    pub min_range: f32,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            step: 10,
            min_range: 5.0,
        }
    }
}

impl LaneSettings {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            step: config.lane_step.max(1),
            min_range: config.min_border_range,
        }
    }
}

/// Candidate offsets inside `range`, in probing order: outward from the
/// midpoint, one stride family at a time. Empty when the range is too narrow.
pub fn probe_offsets(range: Span, settings: LaneSettings) -> Vec<i32> {
    let width = range.1 - range.0;
    if width <= settings.min_range {
        return Vec::new();
    }
    let delta = (width / 2.0) as i32;
    let middle = (range.0 + delta as f32) as i32;
    let step = if width < (2 * settings.step) as f32 {
        NARROW_STEP
    } else {
        settings.step
    };
    let mut out: Vec<i32> = Vec::new();
    for init in PROBE_STRIDES {
        let mut shift = init;
        while shift < delta {
            for candidate in [middle + shift, middle - shift] {
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
            shift += step;
        }
    }
    out
}

fn widest_first(ranges: &[Span]) -> Vec<Span> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by(|a, b| (b.1 - b.0).total_cmp(&(a.1 - a.0)));
    sorted
}

/// First offset in `ranges` that `accept` allows, widest range first.
fn probe_ranges(ranges: &[Span], settings: LaneSettings, mut accept: impl FnMut(i32) -> bool) -> Option<i32> {
    widest_first(ranges)
        .into_iter()
        .flat_map(|range| probe_offsets(range, settings))
        .find(|candidate| accept(*candidate))
}

/// Finds a free border offset on `side` of `path` without claiming it.
pub fn find_border_offset(
    map: &HighwayMap,
    path: &str,
    side: Side,
    ranges: &[Span],
    probe: Option<OffroadProbe>,
    settings: LaneSettings,
) -> Option<i32> {
    probe_ranges(ranges, settings, |candidate| {
        map.is_border_offset_free(path, side, candidate)
            && probe.is_none_or(|probe| !map.collides_offroad(candidate, probe))
    })
}

pub fn allocate_border_offset(
    map: &mut HighwayMap,
    path: &str,
    side: Side,
    ranges: &[Span],
    probe: Option<OffroadProbe>,
    settings: LaneSettings,
) -> Option<i32> {
    let offset = find_border_offset(map, path, side, ranges, probe, settings)?;
    map.claim_border_offset(path, side, offset);
    Some(offset)
}

/// Finds one offset free on both `(path, side)` pairs, for a straight
/// connector between two facing borders.
pub fn find_shared_border_offset(
    map: &HighwayMap,
    first: (&str, Side),
    second: (&str, Side),
    ranges: &[Span],
    probe: Option<OffroadProbe>,
    settings: LaneSettings,
) -> Option<i32> {
    probe_ranges(ranges, settings, |candidate| {
        map.is_border_offset_free(first.0, first.1, candidate)
            && map.is_border_offset_free(second.0, second.1, candidate)
            && probe.is_none_or(|probe| !map.collides_offroad(candidate, probe))
    })
}

pub fn allocate_shared_border_offset(
    map: &mut HighwayMap,
    first: (&str, Side),
    second: (&str, Side),
    ranges: &[Span],
    probe: Option<OffroadProbe>,
    settings: LaneSettings,
) -> Option<i32> {
    let offset = find_shared_border_offset(map, first, second, ranges, probe, settings)?;
    map.claim_border_offset(first.0, first.1, offset);
    map.claim_border_offset(second.0, second.1, offset);
    Some(offset)
}

/// Finds a coordinate for a straight segment outside any road that does not
/// run along an already committed one. Nothing is claimed.
pub fn find_offroad_lane(
    map: &HighwayMap,
    range: Span,
    probe: OffroadProbe,
    settings: LaneSettings,
) -> Option<i32> {
    probe_ranges(&[range], settings, |candidate| !map.collides_offroad(candidate, probe))
}

pub fn find_road_lane(map: &HighwayMap, road: &str, settings: LaneSettings) -> Option<i32> {
    let span = map.road(road)?.lane_span();
    probe_ranges(&[span], settings, |candidate| map.is_lane_free(road, candidate))
}

/// Claims a lane on `road`. A `reuse` allocation made on the same road is
/// returned unchanged so a connector stays on one lane through a shared road.
pub fn allocate_road_lane(
    map: &mut HighwayMap,
    road: &str,
    reuse: Option<(&str, i32)>,
    settings: LaneSettings,
) -> Option<i32> {
    if let Some((reuse_road, lane)) = reuse
        && reuse_road == road
    {
        return Some(lane);
    }
    let lane = find_road_lane(map, road, settings)?;
    map.claim_lane(road, lane);
    Some(lane)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::Rect;
    use crate::layout::highway::{OffroadSegment, RoadKind, RoadOrientation};

    fn settings() -> LaneSettings {
        LaneSettings::default()
    }

    #[test]
    fn probe_starts_at_midpoint_and_interleaves() {
        let order = probe_offsets((0.0, 40.0), settings());
        assert_eq!(&order[..5], &[20, 30, 10, 25, 15]);
        assert!(order.iter().all(|offset| (0..=40).contains(offset)));
    }

    #[test]
    fn narrow_ranges_use_small_step_or_nothing() {
        assert!(probe_offsets((0.0, 5.0), settings()).is_empty());
        let narrow = probe_offsets((0.0, 12.0), settings());
        assert_eq!(&narrow[..3], &[6, 9, 3]);
    }

    #[test]
    fn border_offsets_are_never_reused() {
        let mut map = HighwayMap::new();
        let mut seen = Vec::new();
        for _ in 0..6 {
            let offset =
                allocate_border_offset(&mut map, "a", Side::Down, &[(0.0, 100.0)], None, settings())
                    .unwrap();
            assert!(!seen.contains(&offset));
            seen.push(offset);
        }
        assert_eq!(seen[0], 50);
    }

    #[test]
    fn widest_range_is_tried_first() {
        let map = HighwayMap::new();
        let offset = find_border_offset(
            &map,
            "a",
            Side::Right,
            &[(0.0, 10.0), (40.0, 100.0)],
            None,
            settings(),
        );
        assert_eq!(offset, Some(70));
    }

    #[test]
    fn offroad_segments_block_the_same_coordinate() {
        let mut map = HighwayMap::new();
        map.commit_offroad(OffroadSegment::Horizontal {
            y: 10.0,
            x1: 0.0,
            x2: 100.0,
        });
        let probe = OffroadProbe::Horizontal { x1: 50.0, x2: 150.0 };
        let offset = find_shared_border_offset(
            &map,
            ("a", Side::Right),
            ("b", Side::Left),
            &[(0.0, 20.0)],
            Some(probe),
            settings(),
        );
        assert_eq!(offset, Some(15));
    }

    #[test]
    fn exhausted_range_returns_none_without_claims() {
        let mut map = HighwayMap::new();
        for offset in probe_offsets((0.0, 8.0), settings()) {
            map.claim_border_offset("a", Side::Up, offset);
        }
        let before = map.border_claims().len();
        assert_eq!(
            allocate_border_offset(&mut map, "a", Side::Up, &[(0.0, 8.0)], None, settings()),
            None
        );
        assert_eq!(map.border_claims().len(), before);
    }

    #[test]
    fn road_lanes_reuse_and_spread() {
        let mut map = HighwayMap::new();
        map.add_road(
            "r".to_string(),
            "sys",
            RoadKind::Main,
            RoadOrientation::Horizontal,
            Rect::new(0.0, 100.0, 400.0, 20.0),
        );
        let first = allocate_road_lane(&mut map, "r", None, settings()).unwrap();
        let second = allocate_road_lane(&mut map, "r", None, settings()).unwrap();
        assert_eq!(first, 110);
        assert_ne!(first, second);
        assert_eq!(allocate_road_lane(&mut map, "r", Some(("r", first)), settings()), Some(first));
        assert_eq!(map.road("r").unwrap().lanes.len(), 2);
        assert_eq!(allocate_road_lane(&mut map, "missing", None, settings()), None);
    }
}
