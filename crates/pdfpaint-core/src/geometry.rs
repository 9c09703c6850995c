//! Points, affine matrices, and bounding boxes.
//!
//! Matrices follow the PDF row-vector convention: a point `(x, y)` is
//! transformed as `[x y 1] × M`, so `a.concat(&b)` applies `a` first and
//! then `b`.

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 6-value affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ctm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Ctm {
    fn default() -> Self {
        Self::identity()
    }
}

impl Ctm {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity matrix `[1 0 0 1 0 0]`.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Matrix mapping PDF space (bottom-left origin) into output space
    /// (top-left origin) for a page of the given height.
    pub fn y_flip(page_height: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, -1.0, 0.0, page_height)
    }

    /// Build a matrix from a slice of six values, if it has at least six.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f, ..] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// Compose `self × other`: the result applies `self` first, then `other`.
    pub fn concat(&self, other: &Ctm) -> Ctm {
        Ctm {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Transform a displacement (ignores translation).
    pub fn transform_vector(&self, dx: f64, dy: f64) -> Point {
        Point {
            x: self.a * dx + self.c * dy,
            y: self.b * dx + self.d * dy,
        }
    }

    /// Geometric mean scale factor, `sqrt(|ad - bc|)`.
    pub fn mean_scale(&self) -> f64 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Bounding box with top-left origin coordinate system.
///
/// - `x0`: left edge
/// - `top`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of page)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Smallest box enclosing all points. `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<BBox> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = BBox::new(first.x, first.y, first.x, first.y);
        Some(iter.fold(init, |acc, p| BBox {
            x0: acc.x0.min(p.x),
            top: acc.top.min(p.y),
            x1: acc.x1.max(p.x),
            bottom: acc.bottom.max(p.y),
        }))
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_approx(p: Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < 1e-9, "x: expected {x}, got {}", p.x);
        assert!((p.y - y).abs() < 1e-9, "y: expected {y}, got {}", p.y);
    }

    #[test]
    fn identity_leaves_points_alone() {
        let p = Ctm::identity().transform_point(Point::new(3.0, 4.0));
        assert_point_approx(p, 3.0, 4.0);
    }

    #[test]
    fn concat_applies_left_operand_first() {
        let scale = Ctm::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Ctm::translation(10.0, 0.0);
        // scale then translate
        let p = scale.concat(&shift).transform_point(Point::new(1.0, 1.0));
        assert_point_approx(p, 12.0, 2.0);
        // translate then scale
        let p = shift.concat(&scale).transform_point(Point::new(1.0, 1.0));
        assert_point_approx(p, 22.0, 2.0);
    }

    #[test]
    fn y_flip_maps_bottom_to_top() {
        let flip = Ctm::y_flip(200.0);
        assert_point_approx(flip.transform_point(Point::new(10.0, 10.0)), 10.0, 190.0);
        assert_point_approx(flip.transform_point(Point::new(0.0, 200.0)), 0.0, 0.0);
    }

    #[test]
    fn from_slice_needs_six_values() {
        assert!(Ctm::from_slice(&[1.0, 0.0, 0.0, 1.0, 0.0]).is_none());
        assert_eq!(
            Ctm::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Some(Ctm::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0))
        );
    }

    #[test]
    fn transform_vector_ignores_translation() {
        let m = Ctm::new(2.0, 0.0, 0.0, 3.0, 100.0, 100.0);
        assert_point_approx(m.transform_vector(1.0, 1.0), 2.0, 3.0);
    }

    #[test]
    fn mean_scale_of_uniform_scale() {
        let m = Ctm::new(0.0, 4.0, -4.0, 0.0, 7.0, 7.0);
        assert!((m.mean_scale() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn bbox_from_points() {
        let bbox = BBox::from_points([
            Point::new(5.0, 8.0),
            Point::new(1.0, 9.0),
            Point::new(3.0, 2.0),
        ])
        .unwrap();
        assert_eq!(bbox, BBox::new(1.0, 2.0, 5.0, 9.0));
        assert_eq!(bbox.width(), 4.0);
        assert_eq!(bbox.height(), 7.0);
        assert!(BBox::from_points(Vec::new()).is_none());
    }

    #[test]
    fn bbox_union() {
        let a = BBox::new(10.0, 20.0, 30.0, 40.0);
        let b = BBox::new(5.0, 25.0, 35.0, 45.0);
        assert_eq!(a.union(&b), BBox::new(5.0, 20.0, 35.0, 45.0));
    }
}
