//! Path construction (`m`, `l`, `c`, `v`, `y`, `h`, `re`).

use crate::geometry::{BBox, Ctm, Point};

/// A segment of a path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathSegment {
    /// Move to a new point (starts a new subpath).
    MoveTo(Point),
    /// Straight line from current point to target.
    LineTo(Point),
    /// Cubic Bezier curve with two control points and an endpoint.
    CurveTo {
        /// First control point.
        cp1: Point,
        /// Second control point.
        cp2: Point,
        /// Endpoint of the curve.
        end: Point,
    },
    /// Close the current subpath (line back to the subpath start).
    ClosePath,
}

impl PathSegment {
    fn map(&self, m: &Ctm) -> PathSegment {
        match self {
            PathSegment::MoveTo(p) => PathSegment::MoveTo(m.transform_point(*p)),
            PathSegment::LineTo(p) => PathSegment::LineTo(m.transform_point(*p)),
            PathSegment::CurveTo { cp1, cp2, end } => PathSegment::CurveTo {
                cp1: m.transform_point(*cp1),
                cp2: m.transform_point(*cp2),
                end: m.transform_point(*end),
            },
            PathSegment::ClosePath => PathSegment::ClosePath,
        }
    }
}

/// A complete path consisting of one or more subpaths.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    /// The path segments. Every `MoveTo` starts a new subpath.
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// Apply `m` to every point of the path.
    pub fn transformed(&self, m: &Ctm) -> Path {
        Path {
            segments: self.segments.iter().map(|s| s.map(m)).collect(),
        }
    }

    /// Split the segment list at each `MoveTo`.
    pub fn subpaths(&self) -> Vec<&[PathSegment]> {
        let mut out = Vec::new();
        let mut start = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            if matches!(seg, PathSegment::MoveTo(_)) && i > start {
                out.push(&self.segments[start..i]);
                start = i;
            }
        }
        if start < self.segments.len() {
            out.push(&self.segments[start..]);
        }
        out
    }

    /// All explicit points, including Bezier control points.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments.iter().flat_map(|seg| match seg {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => vec![*p],
            PathSegment::CurveTo { cp1, cp2, end } => vec![*cp1, *cp2, *end],
            PathSegment::ClosePath => Vec::new(),
        })
    }

    /// Control-point bounding box, `None` for an empty path.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points())
    }
}

/// Builder for constructing paths from path operators.
///
/// Coordinates are transformed through the CTM before storage, so the
/// accumulated path is in PDF device space (bottom-left origin).
#[derive(Debug, Clone)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
    current_point: Option<Point>,
    subpath_start: Option<Point>,
    ctm: Ctm,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new(Ctm::identity())
    }
}

impl PathBuilder {
    pub fn new(ctm: Ctm) -> Self {
        Self {
            segments: Vec::new(),
            current_point: None,
            subpath_start: None,
            ctm,
        }
    }

    /// Update the CTM used for subsequent points.
    pub fn set_ctm(&mut self, ctm: Ctm) {
        self.ctm = ctm;
    }

    pub fn ctm(&self) -> &Ctm {
        &self.ctm
    }

    /// `m` operator: move to a new point, starting a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::MoveTo(p));
        self.current_point = Some(p);
        self.subpath_start = Some(p);
    }

    /// `l` operator: straight line from current point to `(x, y)`.
    ///
    /// Without a current point the line degrades into a move.
    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.current_point.is_none() {
            self.move_to(x, y);
            return;
        }
        let p = self.ctm.transform_point(Point::new(x, y));
        self.segments.push(PathSegment::LineTo(p));
        self.current_point = Some(p);
    }

    /// `c` operator: cubic Bezier curve with three coordinate pairs.
    ///
    /// Without a current point a subpath starts at the first control point.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        if self.current_point.is_none() {
            self.move_to(x1, y1);
        }
        let cp1 = self.ctm.transform_point(Point::new(x1, y1));
        let cp2 = self.ctm.transform_point(Point::new(x2, y2));
        let end = self.ctm.transform_point(Point::new(x3, y3));
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `v` operator: first control point equals the current point.
    pub fn curve_to_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) {
        let Some(cp1) = self.current_point else {
            return;
        };
        let cp2 = self.ctm.transform_point(Point::new(x2, y2));
        let end = self.ctm.transform_point(Point::new(x3, y3));
        self.segments.push(PathSegment::CurveTo { cp1, cp2, end });
        self.current_point = Some(end);
    }

    /// `y` operator: last control point equals the endpoint.
    pub fn curve_to_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) {
        if self.current_point.is_none() {
            self.move_to(x1, y1);
        }
        let cp1 = self.ctm.transform_point(Point::new(x1, y1));
        let end = self.ctm.transform_point(Point::new(x3, y3));
        self.segments
            .push(PathSegment::CurveTo { cp1, cp2: end, end });
        self.current_point = Some(end);
    }

    /// `h` operator: close the current subpath.
    pub fn close_path(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        self.segments.push(PathSegment::ClosePath);
        if let Some(start) = self.subpath_start {
            self.current_point = Some(start);
        }
    }

    /// `re` operator: append a rectangle as moveto + 3 lineto + closepath.
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    /// Current point, already CTM-transformed.
    pub fn current_point(&self) -> Option<Point> {
        self.current_point
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Take the accumulated segments as a `Path` and reset the builder.
    pub fn take_and_reset(&mut self) -> Path {
        let segments = std::mem::take(&mut self.segments);
        self.current_point = None;
        self.subpath_start = None;
        Path { segments }
    }
}
