use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::ir::{BoxKind, SingleConnection};

use super::geometry::{
    EPS, Point, Rect, Span, border_intersection, polyline_crosses_rect, same_column, same_row,
    simplify_polyline, span_intersection, spans_overlap, subtract_spans,
};
use super::highway::{HighwayMap, OffroadProbe, OffroadSegment, Road, RoadKind, RoadOrientation, Side};
use super::lanes::{self, LaneSettings};
use super::types::{ConnectionLayout, LaneClaim, RouteStrategy, RouteWarning};

/// Decides which boxes connectors must not cross.
pub trait IsObstacle {
    fn is_obstacle(&self, item: &SceneBox) -> bool;
}

/// Treats every box of the listed kinds as an obstacle.
#[derive(Debug, Clone)]
pub struct ObstacleKinds(pub Vec<BoxKind>);

impl IsObstacle for ObstacleKinds {
    fn is_obstacle(&self, item: &SceneBox) -> bool {
        self.0.contains(&item.kind)
    }
}

impl<F> IsObstacle for F
where
    F: Fn(&SceneBox) -> bool,
{
    fn is_obstacle(&self, item: &SceneBox) -> bool {
        self(item)
    }
}

/// Absolute geometry of a placed box, as seen by the router.
#[derive(Debug, Clone)]
pub struct SceneBox {
    pub path: String,
    pub kind: BoxKind,
    pub rect: Rect,
    /// Paths from the root down to this box, both included.
    pub chain: Vec<String>,
}

impl SceneBox {
    pub fn parent(&self) -> Option<&str> {
        let len = self.chain.len();
        (len >= 2).then(|| self.chain[len - 2].as_str())
    }

    pub fn is_ancestor_of(&self, other: &SceneBox) -> bool {
        other.path != self.path && other.chain.contains(&self.path)
    }

    fn is_related(&self, other: &SceneBox) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    boxes: BTreeMap<String, SceneBox>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a box. The parent, when given, must already be in the scene.
    pub fn insert(&mut self, path: &str, kind: BoxKind, rect: Rect, parent: Option<&str>) {
        let mut chain = parent
            .and_then(|parent| self.boxes.get(parent))
            .map(|parent| parent.chain.clone())
            .unwrap_or_default();
        chain.push(path.to_string());
        self.boxes.insert(
            path.to_string(),
            SceneBox {
                path: path.to_string(),
                kind,
                rect,
                chain,
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<&SceneBox> {
        self.boxes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneBox> {
        self.boxes.values()
    }
}

/// Index in both chains of the deepest shared ancestor.
fn common_depth(a: &SceneBox, b: &SceneBox) -> Option<usize> {
    let shared = a
        .chain
        .iter()
        .zip(b.chain.iter())
        .take_while(|(left, right)| left == right)
        .count();
    shared.checked_sub(1)
}

/// Swaps the axes so both orientations of a strategy share one code path.
#[derive(Debug, Clone, Copy)]
struct Frame {
    transposed: bool,
}

impl Frame {
    const STRAIGHT: Frame = Frame { transposed: false };
    const TRANSPOSED: Frame = Frame { transposed: true };

    fn rect(self, rect: &Rect) -> Rect {
        if self.transposed {
            Rect::new(rect.y, rect.x, rect.height, rect.width)
        } else {
            *rect
        }
    }

    fn point(self, point: Point) -> Point {
        if self.transposed { (point.1, point.0) } else { point }
    }

    fn side(self, side: Side) -> Side {
        if !self.transposed {
            return side;
        }
        match side {
            Side::Left => Side::Up,
            Side::Up => Side::Left,
            Side::Right => Side::Down,
            Side::Down => Side::Right,
        }
    }

    fn probe(self, probe: OffroadProbe) -> OffroadProbe {
        if !self.transposed {
            return probe;
        }
        match probe {
            OffroadProbe::Horizontal { x1, x2 } => OffroadProbe::Vertical { y1: x1, y2: x2 },
            OffroadProbe::Vertical { y1, y2 } => OffroadProbe::Horizontal { x1: y1, x2: y2 },
        }
    }
}

/// Range of border offsets along `side` of `rect`.
fn side_span(rect: &Rect, side: Side) -> Span {
    if side.is_horizontal_exit() {
        rect.span_y()
    } else {
        rect.span_x()
    }
}

fn point_on_side(rect: &Rect, side: Side, offset: f32) -> Point {
    match side {
        Side::Left => (rect.x, offset),
        Side::Right => (rect.right(), offset),
        Side::Up => (offset, rect.y),
        Side::Down => (offset, rect.bottom()),
    }
}

/// Moves along a road of `orientation` from `from` until lane coordinate `lane`
/// of a crossing road is reached.
fn advance(orientation: RoadOrientation, from: Point, lane: f32) -> Point {
    match orientation {
        RoadOrientation::Horizontal => (lane, from.1),
        RoadOrientation::Vertical => (from.0, lane),
    }
}

/// Border-to-border segment along the centre line. Last resort only.
fn straight_fallback(a: &SceneBox, b: &SceneBox) -> Vec<Point> {
    let (ax, ay) = a.rect.center();
    let (bx, by) = b.rect.center();
    vec![
        border_intersection(&a.rect, (bx - ax, by - ay)),
        border_intersection(&b.rect, (ax - bx, ay - by)),
    ]
}

#[derive(Debug, Default)]
struct Ledger {
    claims: Vec<LaneClaim>,
    warnings: Vec<RouteWarning>,
}

impl Ledger {
    fn border(&mut self, path: &str, side: Side, offset: i32) {
        self.claims.push(LaneClaim::Border {
            path: path.to_string(),
            side,
            offset,
        });
    }

    fn road(&mut self, road: &str, lane: i32) {
        self.claims.push(LaneClaim::Road {
            road: road.to_string(),
            lane,
        });
    }
}

struct Routed {
    points: Vec<Point>,
    strategy: RouteStrategy,
    ledger: Ledger,
}

/// Points walked outward from one endpoint.
#[derive(Debug, Default)]
struct Walk {
    points: Vec<Point>,
    /// Roads travelled, with the lane used and the index of the first point on it.
    roads: Vec<(String, i32, usize)>,
    /// Index into the other walk's points where this walk joined it.
    met: Option<usize>,
}

impl Walk {
    fn lane_on(&self, road: &str) -> Option<(i32, usize)> {
        self.roads
            .iter()
            .find(|(name, _, _)| name == road)
            .map(|(_, lane, idx)| (*lane, *idx))
    }

    fn enter(&mut self, road: &str, lane: i32, point: Point) {
        self.points.push(point);
        self.roads.push((road.to_string(), lane, self.points.len() - 1));
    }
}

struct Bend {
    points: Vec<Point>,
    extender: (Side, i32),
    target: (Side, i32),
}

pub struct Router<'a> {
    scene: &'a Scene,
    map: &'a mut HighwayMap,
    obstacles: &'a dyn IsObstacle,
    settings: LaneSettings,
}

impl<'a> Router<'a> {
    pub fn new(
        scene: &'a Scene,
        map: &'a mut HighwayMap,
        obstacles: &'a dyn IsObstacle,
        settings: LaneSettings,
    ) -> Self {
        Self {
            scene,
            map,
            obstacles,
            settings,
        }
    }

    /// Routes one connection, committing its lanes and offsets to the map.
    pub fn route(&mut self, connection: &SingleConnection) -> ConnectionLayout {
        let mut layout = ConnectionLayout {
            name: connection.name.clone(),
            from: connection.from.clone(),
            to: connection.to.clone(),
            points: Vec::new(),
            strategy: None,
            warnings: Vec::new(),
            claims: Vec::new(),
            style: (&connection.style).into(),
        };
        if connection.from == connection.to {
            warn!(connection = %connection.name, "self connection is not routed");
            layout.warnings.push(RouteWarning::SelfConnection);
            return layout;
        }
        let scene = self.scene;
        let (Some(a), Some(b)) = (scene.get(&connection.from), scene.get(&connection.to)) else {
            let path = if scene.get(&connection.from).is_none() {
                connection.from.clone()
            } else {
                connection.to.clone()
            };
            warn!(connection = %connection.name, path = %path, "endpoint has no layout");
            layout.warnings.push(RouteWarning::UnknownBox { path });
            return layout;
        };

        let routed = match self.try_direct(a, b) {
            Some(routed) => routed,
            None => match self.try_single_bend(a, b) {
                Some(routed) => routed,
                None => self.route_via_roads(a, b),
            },
        };
        debug!(
            connection = %connection.name,
            strategy = routed.strategy.as_str(),
            points = routed.points.len(),
            "routed connection"
        );
        for warning in &routed.ledger.warnings {
            warn!(connection = %connection.name, "degraded route: {warning}");
        }
        layout.points = routed.points;
        layout.strategy = Some(routed.strategy);
        layout.claims = routed.ledger.claims;
        layout.warnings = routed.ledger.warnings;
        layout
    }

    /// Obstacle rectangles that neither endpoint sits in.
    fn obstacle_rects(&self, a: &SceneBox, b: &SceneBox) -> Vec<Rect> {
        self.scene
            .iter()
            .filter(|item| self.obstacles.is_obstacle(item))
            .filter(|item| !a.chain.contains(&item.path) && !b.chain.contains(&item.path))
            .map(|item| item.rect)
            .collect()
    }

    // ── Direct ──────────────────────────────────────────────────────

    fn try_direct(&mut self, a: &SceneBox, b: &SceneBox) -> Option<Routed> {
        if a.is_related(b) || a.rect.intersects(&b.rect) {
            return None;
        }
        let frame = if same_row(&a.rect, &b.rect) {
            Frame::STRAIGHT
        } else if same_column(&a.rect, &b.rect) {
            Frame::TRANSPOSED
        } else {
            return None;
        };
        let (ra, rb) = (frame.rect(&a.rect), frame.rect(&b.rect));
        let (near, far, a_is_near) = if ra.right() <= rb.x + EPS {
            (ra, rb, true)
        } else if rb.right() <= ra.x + EPS {
            (rb, ra, false)
        } else {
            return None;
        };
        let gap = (near.right(), far.x);
        if gap.1 - gap.0 <= EPS {
            return None;
        }
        let shared = span_intersection(near.span_y(), far.span_y())?;
        let holes: Vec<Span> = self
            .obstacle_rects(a, b)
            .iter()
            .map(|rect| frame.rect(rect))
            .filter(|rect| spans_overlap(rect.span_x(), gap))
            .map(|rect| rect.span_y())
            .collect();
        let ranges = subtract_spans(shared, &holes);

        let (near_box, far_box) = if a_is_near { (a, b) } else { (b, a) };
        let near_side = frame.side(Side::Right);
        let far_side = frame.side(Side::Left);
        let probe = frame.probe(OffroadProbe::Horizontal {
            x1: gap.0,
            x2: gap.1,
        });
        let offset = lanes::allocate_shared_border_offset(
            self.map,
            (&near_box.path, near_side),
            (&far_box.path, far_side),
            &ranges,
            Some(probe),
            self.settings,
        )?;

        let lane = offset as f32;
        let mut points = vec![frame.point((gap.0, lane)), frame.point((gap.1, lane))];
        if !a_is_near {
            points.reverse();
        }
        self.map.commit_polyline(&points);
        let mut ledger = Ledger::default();
        ledger.border(&a.path, if a_is_near { near_side } else { far_side }, offset);
        ledger.border(&b.path, if a_is_near { far_side } else { near_side }, offset);
        Some(Routed {
            points,
            strategy: RouteStrategy::Direct,
            ledger,
        })
    }

    // ── Single bend ─────────────────────────────────────────────────

    /// Main roads bounding the line a box was packed into.
    fn bounding_main_roads(&self, path: &str) -> Vec<&str> {
        let Some(address) = self.map.address(path) else {
            return Vec::new();
        };
        address
            .roads
            .values()
            .filter(|name| {
                self.map
                    .road(name)
                    .is_some_and(|road| road.kind == RoadKind::Main)
            })
            .map(String::as_str)
            .collect()
    }

    fn try_single_bend(&mut self, a: &SceneBox, b: &SceneBox) -> Option<Routed> {
        if a.is_related(b) {
            return None;
        }
        let depth = common_depth(a, b)?;
        let (ca, cb) = (a.chain.get(depth + 1)?, b.chain.get(depth + 1)?);
        let bounds_a = self.bounding_main_roads(ca);
        if bounds_a.is_empty() || bounds_a != self.bounding_main_roads(cb) {
            return None;
        }

        let mut candidates: Vec<(bool, Side)> = Vec::new();
        for (a_extends, ext, tgt) in [(true, &a.rect, &b.rect), (false, &b.rect, &a.rect)] {
            if ext.bottom() <= tgt.y + EPS {
                candidates.push((a_extends, Side::Down));
            }
            if ext.y >= tgt.bottom() - EPS {
                candidates.push((a_extends, Side::Up));
            }
            if ext.right() <= tgt.x + EPS {
                candidates.push((a_extends, Side::Right));
            }
            if ext.x >= tgt.right() - EPS {
                candidates.push((a_extends, Side::Left));
            }
        }
        // Extending down or right keeps the bend clear of container titles.
        candidates.sort_by_key(|(a_extends, side)| (!side.is_forward(), !*a_extends));

        let obstacles = self.obstacle_rects(a, b);
        for (a_extends, side) in candidates {
            let (ext, tgt) = if a_extends { (a, b) } else { (b, a) };
            let Some(bend) = self.plan_bend(ext, tgt, side, &obstacles) else {
                continue;
            };
            self.map.claim_border_offset(&ext.path, bend.extender.0, bend.extender.1);
            self.map.claim_border_offset(&tgt.path, bend.target.0, bend.target.1);
            self.map.commit_polyline(&bend.points);
            let mut ledger = Ledger::default();
            ledger.border(&ext.path, bend.extender.0, bend.extender.1);
            ledger.border(&tgt.path, bend.target.0, bend.target.1);
            let mut points = bend.points;
            if !a_extends {
                points.reverse();
            }
            return Some(Routed {
                points,
                strategy: RouteStrategy::SingleBend,
                ledger,
            });
        }
        None
    }

    /// Probes an L from `side` of `ext` to the facing side of `tgt`. Nothing is claimed.
    fn plan_bend(&self, ext: &SceneBox, tgt: &SceneBox, side: Side, obstacles: &[Rect]) -> Option<Bend> {
        let frame = if side.is_horizontal_exit() {
            Frame::TRANSPOSED
        } else {
            Frame::STRAIGHT
        };
        let e = frame.rect(&ext.rect);
        let t = frame.rect(&tgt.rect);
        let blocks: Vec<Rect> = obstacles.iter().map(|rect| frame.rect(rect)).collect();
        let down = frame.side(side) == Side::Down;

        let (leg_start, band, target_span) = if down {
            (e.bottom(), (e.bottom(), t.bottom()), (t.y.max(e.bottom()), t.bottom()))
        } else {
            (e.y, (t.y, e.y), (t.y, t.bottom().min(e.y)))
        };
        let mut holes = vec![t.span_x()];
        holes.extend(
            blocks
                .iter()
                .filter(|rect| spans_overlap(rect.span_y(), band))
                .map(|rect| rect.span_x()),
        );
        let ranges = subtract_spans(e.span_x(), &holes);
        let probe = frame.probe(OffroadProbe::Vertical {
            y1: band.0,
            y2: band.1,
        });
        let along =
            lanes::find_border_offset(&*self.map, &ext.path, side, &ranges, Some(probe), self.settings)?;
        let along_f = along as f32;

        let (edge, facing) = if along_f < t.x {
            (t.x, Side::Left)
        } else {
            (t.right(), Side::Right)
        };
        let leg = (along_f.min(edge), along_f.max(edge));
        let holes: Vec<Span> = blocks
            .iter()
            .filter(|rect| spans_overlap(rect.span_x(), leg))
            .map(|rect| rect.span_y())
            .collect();
        let ranges = subtract_spans(target_span, &holes);
        let target_side = frame.side(facing);
        let probe = frame.probe(OffroadProbe::Horizontal { x1: leg.0, x2: leg.1 });
        let across = lanes::find_border_offset(
            &*self.map,
            &tgt.path,
            target_side,
            &ranges,
            Some(probe),
            self.settings,
        )?;
        let across_f = across as f32;

        let points: Vec<Point> = [(along_f, leg_start), (along_f, across_f), (edge, across_f)]
            .into_iter()
            .map(|point| frame.point(point))
            .collect();
        if obstacles.iter().any(|rect| polyline_crosses_rect(&points, rect)) {
            return None;
        }
        Some(Bend {
            points,
            extender: (side, along),
            target: (target_side, across),
        })
    }

    // ── Roads ───────────────────────────────────────────────────────

    fn route_via_roads(&mut self, a: &SceneBox, b: &SceneBox) -> Routed {
        let mut ledger = Ledger::default();
        let points = if b.is_ancestor_of(a) {
            self.route_to_ancestor(a, b, &mut ledger)
        } else if a.is_ancestor_of(b) {
            let mut points = self.route_to_ancestor(b, a, &mut ledger);
            points.reverse();
            points
        } else if let Some(depth) = common_depth(a, b) {
            let stop_at = a.chain[depth].as_str();
            let walk_a = self.walk(a, stop_at, b.rect.center(), None, &mut ledger);
            let target = walk_a
                .points
                .last()
                .copied()
                .unwrap_or_else(|| a.rect.center());
            let walk_b = self.walk(b, stop_at, target, Some(&walk_a), &mut ledger);
            match walk_b.met {
                Some(idx) => {
                    let mut points = walk_a.points[..=idx].to_vec();
                    points.extend(walk_b.points.iter().rev());
                    points
                }
                None => {
                    let bridge = self.bridge(&walk_a, &walk_b, &mut ledger);
                    let mut points = walk_a.points;
                    points.extend(bridge);
                    points.extend(walk_b.points.iter().rev());
                    points
                }
            }
        } else {
            Vec::new()
        };

        let mut points = simplify_polyline(&points);
        if points.len() < 2 {
            points = straight_fallback(a, b);
        }
        Routed {
            points,
            strategy: RouteStrategy::Roads,
            ledger,
        }
    }

    fn border_offset(&mut self, path: &str, side: Side, span: Span, ledger: &mut Ledger) -> i32 {
        match lanes::allocate_border_offset(self.map, path, side, &[span], None, self.settings) {
            Some(offset) => {
                ledger.border(path, side, offset);
                offset
            }
            None => {
                ledger.warnings.push(RouteWarning::BorderExhausted {
                    path: path.to_string(),
                    side,
                });
                ((span.0 + span.1) / 2.0) as i32
            }
        }
    }

    /// Lane for `road`, reusing the other walk's lane when it travelled the
    /// same road. Marks the walk as met in that case.
    fn road_lane(&mut self, road: &Road, walk: &mut Walk, other: Option<&Walk>, ledger: &mut Ledger) -> i32 {
        let reuse = other.and_then(|other| other.lane_on(&road.name));
        if let Some((_, idx)) = reuse {
            walk.met = Some(idx);
        }
        let reuse_arg = reuse.map(|(lane, _)| (road.name.as_str(), lane));
        match lanes::allocate_road_lane(self.map, &road.name, reuse_arg, self.settings) {
            Some(lane) => {
                if reuse.is_none() {
                    ledger.road(&road.name, lane);
                }
                lane
            }
            None => {
                ledger.warnings.push(RouteWarning::LaneExhausted {
                    road: road.name.clone(),
                });
                let (start, end) = road.lane_span();
                ((start + end) / 2.0) as i32
            }
        }
    }

    /// Picks between the `(backward, forward)` sides of `path`, toward
    /// `forward` when the target lies ahead, and prefers a road the other
    /// walk already travels.
    fn choose_side(&self, path: &str, pair: (Side, Side), toward_forward: bool, other: Option<&Walk>) -> Side {
        let (preferred, alternative) = if toward_forward {
            (pair.1, pair.0)
        } else {
            (pair.0, pair.1)
        };
        if let Some(other) = other {
            let used = |side: Side| {
                self.map
                    .address(path)
                    .and_then(|address| address.road(side))
                    .is_some_and(|road| other.lane_on(road).is_some())
            };
            if !used(preferred) && used(alternative) {
                return alternative;
            }
        }
        preferred
    }

    /// Walks from `start` outward until reaching a main road of `stop_at`.
    fn walk(
        &mut self,
        start: &SceneBox,
        stop_at: &str,
        target: Point,
        other: Option<&Walk>,
        ledger: &mut Ledger,
    ) -> Walk {
        let mut walk = Walk::default();
        let center = start.rect.center();
        let vertical_exit = self
            .map
            .adjacent_road(&start.path, Side::Down)
            .is_some_and(|road| road.kind == RoadKind::Main);
        let side = if vertical_exit {
            self.choose_side(&start.path, (Side::Up, Side::Down), target.1 - center.1 >= 0.0, other)
        } else {
            self.choose_side(&start.path, (Side::Left, Side::Right), target.0 - center.0 >= 0.0, other)
        };
        let Some(mut road) = self.map.adjacent_road(&start.path, side).cloned() else {
            ledger.warnings.push(RouteWarning::MissingRoad {
                path: start.path.clone(),
                side,
            });
            return walk;
        };

        let offset = self.border_offset(&start.path, side, side_span(&start.rect, side), ledger);
        let exit = point_on_side(&start.rect, side, offset as f32);
        let lane = self.road_lane(&road, &mut walk, other, ledger);
        walk.points.push(exit);
        walk.enter(&road.name, lane, advance(road.orientation.perpendicular(), exit, lane as f32));
        if walk.met.is_some() {
            return walk;
        }

        let mut current = start.parent().map(str::to_string);
        while let Some(container) = current.take() {
            if container == stop_at {
                break;
            }
            // Leave the container along the road we are on.
            let Some(&last) = walk.points.last() else {
                break;
            };
            let pair = match road.orientation {
                RoadOrientation::Horizontal => (Side::Left, Side::Right),
                RoadOrientation::Vertical => (Side::Up, Side::Down),
            };
            let forward = match road.orientation {
                RoadOrientation::Horizontal => target.0 - last.0 >= 0.0,
                RoadOrientation::Vertical => target.1 - last.1 >= 0.0,
            };
            let side = self.choose_side(&container, pair, forward, other);
            let Some(next) = self.map.adjacent_road(&container, side).cloned() else {
                ledger.warnings.push(RouteWarning::MissingRoad {
                    path: container.clone(),
                    side,
                });
                break;
            };
            let lane = self.road_lane(&next, &mut walk, other, ledger);
            walk.enter(&next.name, lane, advance(road.orientation, last, lane as f32));
            if walk.met.is_some() {
                break;
            }
            road = next;

            if road.kind == RoadKind::Secondary {
                // Hop onto the main road bounding the container's line.
                let Some(&last) = walk.points.last() else {
                    break;
                };
                let pair = match road.orientation {
                    RoadOrientation::Horizontal => (Side::Left, Side::Right),
                    RoadOrientation::Vertical => (Side::Up, Side::Down),
                };
                let forward = match road.orientation {
                    RoadOrientation::Horizontal => target.0 - last.0 >= 0.0,
                    RoadOrientation::Vertical => target.1 - last.1 >= 0.0,
                };
                let side = self.choose_side(&container, pair, forward, other);
                let Some(main) = self.map.adjacent_road(&container, side).cloned() else {
                    ledger.warnings.push(RouteWarning::MissingRoad {
                        path: container.clone(),
                        side,
                    });
                    break;
                };
                let lane = self.road_lane(&main, &mut walk, other, ledger);
                walk.enter(&main.name, lane, advance(road.orientation, last, lane as f32));
                if walk.met.is_some() {
                    break;
                }
                road = main;
            }
            current = self
                .scene
                .get(&container)
                .and_then(|item| item.parent())
                .map(str::to_string);
        }
        walk
    }

    /// Joins two walks that ended on different roads of their common ancestor.
    fn bridge(&mut self, walk_a: &Walk, walk_b: &Walk, ledger: &mut Ledger) -> Vec<Point> {
        let (Some((name_a, lane_a, _)), Some((name_b, lane_b, _))) =
            (walk_a.roads.last(), walk_b.roads.last())
        else {
            return Vec::new();
        };
        let (Some(&pa), Some(&pb)) = (walk_a.points.last(), walk_b.points.last()) else {
            return Vec::new();
        };
        let (Some(ra), Some(rb)) = (self.map.road(name_a).cloned(), self.map.road(name_b).cloned()) else {
            return Vec::new();
        };
        if ra.orientation != rb.orientation {
            return vec![advance(ra.orientation, pa, *lane_b as f32)];
        }

        // The walk ending nearer to an end of its road places the bridge there.
        let dist_a = ra.distance_to_nearest_end(ra.along_of(pa)).abs();
        let dist_b = rb.distance_to_nearest_end(rb.along_of(pb)).abs();
        let (master, anchor) = if dist_a <= dist_b { (&ra, pa) } else { (&rb, pb) };
        let forward = master.distance_to_nearest_end(master.along_of(anchor)) > 0.0;
        let end = master.end_toward(forward);
        let half = master.thickness() / 2.0;
        let low = (*lane_a).min(*lane_b) as f32;
        let high = (*lane_a).max(*lane_b) as f32;
        let probe = match master.orientation {
            RoadOrientation::Horizontal => OffroadProbe::Vertical { y1: low, y2: high },
            RoadOrientation::Vertical => OffroadProbe::Horizontal { x1: low, x2: high },
        };
        let across = match lanes::find_offroad_lane(&*self.map, (end - half, end + half), probe, self.settings) {
            Some(across) => across as f32,
            None => {
                ledger.warnings.push(RouteWarning::LaneExhausted {
                    road: master.name.clone(),
                });
                end
            }
        };
        let first = ra.point_on_lane(*lane_a as f32, across);
        let second = rb.point_on_lane(*lane_b as f32, across);
        if let Some(segment) = OffroadSegment::between(first, second) {
            self.map.commit_offroad(segment);
        }
        debug!(master = %master.name, across, "bridged parallel roads");
        vec![first, second]
    }

    /// Route from `desc` out to the border of its ancestor `anc`, leaving
    /// through the ancestor's closing main road.
    fn route_to_ancestor(&mut self, desc: &SceneBox, anc: &SceneBox, ledger: &mut Ledger) -> Vec<Point> {
        let Some(closing) = self.map.closing_main_road(&anc.path).cloned() else {
            ledger.warnings.push(RouteWarning::MissingRoad {
                path: anc.path.clone(),
                side: Side::Down,
            });
            return Vec::new();
        };
        let exit_side = match closing.orientation {
            RoadOrientation::Horizontal => Side::Down,
            RoadOrientation::Vertical => Side::Right,
        };
        let (mid_x, mid_y) = anc.rect.center();
        let middle = if exit_side == Side::Down { mid_x } else { mid_y };
        let target = point_on_side(&anc.rect, exit_side, middle);

        let walk = self.walk(desc, &anc.path, target, None, ledger);
        let Some((road_name, mut lane, _)) = walk.roads.last().cloned() else {
            return walk.points;
        };
        let mut points = walk.points;
        if road_name != closing.name
            && let Some(road) = self.map.road(&road_name).cloned()
            && let Some(&last) = points.last()
        {
            let forward = road.distance_to_nearest_end(road.along_of(last)) > 0.0;
            let end = road.end_toward(forward);
            let at_end = road.point_on_lane(lane as f32, end);
            let mut scratch = Walk::default();
            let closing_lane = self.road_lane(&closing, &mut scratch, None, ledger);
            let on_closing = closing.point_on_lane(closing_lane as f32, end);
            if let Some(segment) = OffroadSegment::between(at_end, on_closing) {
                self.map.commit_offroad(segment);
            }
            points.push(at_end);
            points.push(on_closing);
            lane = closing_lane;
        }
        let offset = self.border_offset(&anc.path, exit_side, closing.along_span(), ledger);
        points.push(closing.point_on_lane(lane as f32, offset as f32));
        points.push(point_on_side(&anc.rect, exit_side, offset as f32));
        points
    }
}
