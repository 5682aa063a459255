use serde::Serialize;

/// Tolerance used when comparing coordinates produced by the sizer.
pub const EPS: f32 = 1e-4;

pub type Point = (f32, f32);
/// Closed interval `(start, end)` with `start <= end`.
pub type Span = (f32, f32);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn span_x(&self) -> Span {
        (self.x, self.right())
    }

    pub fn span_y(&self) -> Span {
        (self.y, self.bottom())
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        spans_overlap(self.span_x(), other.span_x()) && spans_overlap(self.span_y(), other.span_y())
    }
}

/// Unit vector in the direction of `v`. The zero vector maps to itself.
pub fn normalize(v: Point) -> Point {
    let magnitude = (v.0 * v.0 + v.1 * v.1).sqrt();
    if magnitude <= f32::EPSILON {
        return (0.0, 0.0);
    }
    (v.0 / magnitude, v.1 / magnitude)
}

/// Point where a ray from the centre of `rect` along `dir` leaves the rectangle.
/// A zero direction yields the bottom-centre of the rectangle.
pub fn border_intersection(rect: &Rect, dir: Point) -> Point {
    let (cx, cy) = rect.center();
    let (dx, dy) = normalize(dir);
    if dx == 0.0 && dy == 0.0 {
        return (cx, rect.bottom());
    }
    if dx == 0.0 {
        return if dy > 0.0 {
            (cx, rect.bottom())
        } else {
            (cx, rect.y)
        };
    }
    let tan_rect = if rect.width > 0.0 {
        rect.height / rect.width
    } else {
        f32::INFINITY
    };
    if (dy / dx).abs() <= tan_rect {
        let edge = if dx < 0.0 { rect.x } else { rect.right() };
        let t = (edge - cx) / dx;
        (edge, cy + t * dy)
    } else {
        let edge = if dy > 0.0 { rect.bottom() } else { rect.y };
        let t = (edge - cy) / dy;
        (cx + t * dx, edge)
    }
}

/// Positive-length overlap of two closed intervals.
pub fn spans_overlap(a: Span, b: Span) -> bool {
    a.0.max(b.0) < a.1.min(b.1) - EPS
}

pub fn span_intersection(a: Span, b: Span) -> Option<Span> {
    let start = a.0.max(b.0);
    let end = a.1.min(b.1);
    (end - start > EPS).then_some((start, end))
}

/// Same "row": the vertical extents overlap.
pub fn same_row(a: &Rect, b: &Rect) -> bool {
    spans_overlap(a.span_y(), b.span_y())
}

/// Same "column": the horizontal extents overlap.
pub fn same_column(a: &Rect, b: &Rect) -> bool {
    spans_overlap(a.span_x(), b.span_x())
}

/// `range` minus the union of `holes`, as ordered disjoint sub-ranges.
pub fn subtract_spans(range: Span, holes: &[Span]) -> Vec<Span> {
    let mut sorted: Vec<Span> = holes
        .iter()
        .filter_map(|hole| span_intersection(range, *hole))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = Vec::new();
    let mut cursor = range.0;
    for (start, end) in sorted {
        if start > cursor + EPS {
            out.push((cursor, start));
        }
        cursor = cursor.max(end);
    }
    if range.1 > cursor + EPS {
        out.push((cursor, range.1));
    }
    out
}

/// Drops repeated points and interior points that lie on a straight run.
pub fn simplify_polyline(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&last) = deduped.last()
            && (point.0 - last.0).abs() <= EPS
            && (point.1 - last.1).abs() <= EPS
        {
            continue;
        }
        deduped.push(point);
    }
    if deduped.len() <= 2 {
        return deduped;
    }
    let mut out: Vec<Point> = Vec::with_capacity(deduped.len());
    out.push(deduped[0]);
    for idx in 1..deduped.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = deduped[idx];
        let next = deduped[idx + 1];
        let vertical_run = (curr.0 - prev.0).abs() <= EPS && (next.0 - curr.0).abs() <= EPS;
        let horizontal_run = (curr.1 - prev.1).abs() <= EPS && (next.1 - curr.1).abs() <= EPS;
        if vertical_run || horizontal_run {
            continue;
        }
        out.push(curr);
    }
    out.push(deduped[deduped.len() - 1]);
    out
}

/// True when the axis-aligned segment `a`-`b` passes through the interior of `rect`.
pub fn segment_crosses_rect(a: Point, b: Point, rect: &Rect) -> bool {
    let seg_x = (a.0.min(b.0), a.0.max(b.0));
    let seg_y = (a.1.min(b.1), a.1.max(b.1));
    let inside_x = |x: f32| x > rect.x + EPS && x < rect.right() - EPS;
    let inside_y = |y: f32| y > rect.y + EPS && y < rect.bottom() - EPS;
    if (a.1 - b.1).abs() <= EPS {
        inside_y(a.1) && spans_overlap(seg_x, rect.span_x())
    } else if (a.0 - b.0).abs() <= EPS {
        inside_x(a.0) && spans_overlap(seg_y, rect.span_y())
    } else {
        spans_overlap(seg_x, rect.span_x()) && spans_overlap(seg_y, rect.span_y())
    }
}

pub fn polyline_crosses_rect(points: &[Point], rect: &Rect) -> bool {
    points
        .windows(2)
        .any(|pair| segment_crosses_rect(pair[0], pair[1], rect))
}

pub fn is_orthogonal(points: &[Point]) -> bool {
    points
        .windows(2)
        .all(|pair| (pair[0].0 - pair[1].0).abs() <= EPS || (pair[0].1 - pair[1].1).abs() <= EPS)
}
