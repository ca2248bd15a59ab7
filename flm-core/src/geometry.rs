//! Normalized rectangles and the two similarity metrics built on them
//!
//! Every rectangle inside the engine is expressed as `(x1, y1, x2, y2)` relative
//! to image width and height. Values outside [0, 1] are tolerated and never clamped.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl NormalizedRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Area, which is zero for degenerate rectangles
    pub fn area(&self) -> f64 {
        (self.width() * self.height()).max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Intersection over union of two rectangles
///
/// Returns 0.0 when the rectangles do not overlap (intersection width or height
/// ≤ 0) and when the union area is zero.
pub fn iou(a: &NormalizedRect, b: &NormalizedRect) -> f64 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    if ix2 <= ix1 || iy2 <= iy1 {
        return 0.0;
    }

    let intersection = (ix2 - ix1) * (iy2 - iy1);
    let union = a.width() * a.height() + b.width() * b.height() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Distance between rectangle centers, normalized by the diagonal of their union box
///
/// Returns 1.0 when the union box has a zero diagonal.
pub fn center_distance(a: &NormalizedRect, b: &NormalizedRect) -> f64 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    let dist = (ax - bx).hypot(ay - by);

    let ux1 = a.x1.min(b.x1);
    let uy1 = a.y1.min(b.y1);
    let ux2 = a.x2.max(b.x2);
    let uy2 = a.y2.max(b.y2);
    let diagonal = (ux2 - ux1).hypot(uy2 - uy1);

    if diagonal > 0.0 {
        dist / diagonal
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> NormalizedRect {
        NormalizedRect::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_iou_identity() {
        let a = rect(0.1, 0.2, 0.4, 0.6);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_symmetric_and_bounded() {
        let cases = [
            (rect(0.0, 0.0, 0.5, 0.5), rect(0.25, 0.25, 0.75, 0.75)),
            (rect(0.1, 0.1, 0.2, 0.9), rect(0.0, 0.5, 1.0, 0.6)),
            (rect(0.3, 0.3, 0.4, 0.4), rect(0.0, 0.0, 1.0, 1.0)),
        ];
        for (a, b) in cases {
            let ab = iou(&a, &b);
            let ba = iou(&b, &a);
            assert_eq!(ab, ba, "IoU must be symmetric for {:?} / {:?}", a, b);
            assert!((0.0..=1.0).contains(&ab), "IoU out of range: {}", ab);
        }
    }

    #[test]
    fn test_iou_quarter_overlap() {
        // Intersection 0.0625, union 0.4375
        let value = iou(&rect(0.0, 0.0, 0.5, 0.5), &rect(0.25, 0.25, 0.75, 0.75));
        assert!((value - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        assert_eq!(iou(&rect(0.0, 0.0, 0.2, 0.2), &rect(0.5, 0.5, 0.7, 0.7)), 0.0);
        // Shared edge has zero intersection width
        assert_eq!(iou(&rect(0.0, 0.0, 0.2, 0.2), &rect(0.2, 0.0, 0.4, 0.2)), 0.0);
    }

    #[test]
    fn test_iou_degenerate() {
        let point = rect(0.5, 0.5, 0.5, 0.5);
        assert_eq!(iou(&point, &point), 0.0);
        assert_eq!(point.area(), 0.0);
    }

    #[test]
    fn test_center_distance_same_center() {
        let a = rect(0.4, 0.4, 0.6, 0.6);
        let b = rect(0.3, 0.3, 0.7, 0.7);
        assert_eq!(center_distance(&a, &b), 0.0);
    }

    #[test]
    fn test_center_distance_uses_union_diagonal() {
        let a = rect(0.0, 0.0, 0.2, 0.2);
        let b = rect(0.2, 0.0, 0.4, 0.2);
        // Centers 0.2 apart, union box 0.4 x 0.2
        let expected = 0.2 / (0.4f64.powi(2) + 0.2f64.powi(2)).sqrt();
        assert!((center_distance(&a, &b) - expected).abs() < 1e-12);
        assert_eq!(center_distance(&a, &b), center_distance(&b, &a));
    }

    #[test]
    fn test_center_distance_zero_diagonal() {
        let point = rect(0.3, 0.3, 0.3, 0.3);
        assert_eq!(center_distance(&point, &point), 1.0);
    }

    #[test]
    fn test_center_distance_range() {
        let a = rect(0.0, 0.0, 0.01, 0.01);
        let b = rect(0.99, 0.99, 1.0, 1.0);
        let d = center_distance(&a, &b);
        assert!(d > 0.9 && d <= 2f64.sqrt(), "unexpected distance {}", d);
    }
}
