//! Conversions between each system's native face rectangle and [`NormalizedRect`]
//!
//! Legacy rectangles are normalized `(top, left, width, height)` where `top` holds
//! the bottom edge. Modern rectangles are pixel boxes that need the image size.

use crate::geometry::NormalizedRect;
use serde::{Deserialize, Serialize};

/// Legacy face rectangle as stored, with `top` holding the bottom edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl LegacyRect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn to_normalized(&self) -> NormalizedRect {
        NormalizedRect::new(
            self.left,
            self.top - self.height,
            self.left + self.width,
            self.top,
        )
    }

    pub fn from_normalized(rect: &NormalizedRect) -> Self {
        Self {
            top: rect.y2,
            left: rect.x1,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

/// Image dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: i32,
    pub height: i32,
}

impl ImageSize {
    /// Fallback used when neither face rows nor exif data carry dimensions
    pub const FALLBACK: ImageSize = ImageSize {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Both dimensions strictly positive
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Build from nullable columns, rejecting missing or non-positive values
    pub fn from_optional(width: Option<i32>, height: Option<i32>) -> Option<Self> {
        let size = Self::new(width?, height?);
        size.is_valid().then_some(size)
    }
}

/// Modern face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Divide by image dimensions; `None` when the size is zero or negative
    pub fn normalize(&self, size: ImageSize) -> Option<NormalizedRect> {
        if !size.is_valid() {
            return None;
        }
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        Some(NormalizedRect::new(
            f64::from(self.x1) / w,
            f64::from(self.y1) / h,
            f64::from(self.x2) / w,
            f64::from(self.y2) / h,
        ))
    }
}

/// Pixel region in the shape the modern face-creation endpoint expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl NormalizedRect {
    /// Scale back to pixels, rounding each edge to the nearest pixel
    pub fn to_pixel_box(&self, size: ImageSize) -> PixelBox {
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        PixelBox::new(
            to_pixel(self.x1 * w),
            to_pixel(self.y1 * h),
            to_pixel(self.x2 * w),
            to_pixel(self.y2 * h),
        )
    }

    /// Top-left origin plus size in pixels
    pub fn to_face_region(&self, size: ImageSize) -> FaceRegion {
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        FaceRegion {
            x: to_pixel(self.x1 * w),
            y: to_pixel(self.y1 * h),
            width: to_pixel(self.width() * w),
            height: to_pixel(self.height() * h),
        }
    }
}

fn to_pixel(value: f64) -> i32 {
    // `as` saturates on overflow and maps NaN to 0
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_top_is_bottom_edge() {
        let rect = LegacyRect::new(0.75, 0.25, 0.25, 0.5).to_normalized();
        assert_eq!(rect, NormalizedRect::new(0.25, 0.25, 0.5, 0.75));
    }

    #[test]
    fn test_legacy_round_trip() {
        let original = LegacyRect::new(0.625, 0.125, 0.25, 0.375);
        let back = LegacyRect::from_normalized(&original.to_normalized());
        assert_eq!(back, original);

        // Arbitrary decimals survive within float precision
        let original = LegacyRect::new(0.4127, 0.3318, 0.0912, 0.1371);
        let back = LegacyRect::from_normalized(&original.to_normalized());
        assert!((back.top - original.top).abs() < 1e-12);
        assert!((back.left - original.left).abs() < 1e-12);
        assert!((back.width - original.width).abs() < 1e-12);
        assert!((back.height - original.height).abs() < 1e-12);
    }

    #[test]
    fn test_legacy_out_of_range_not_clamped() {
        let rect = LegacyRect::new(0.1, -0.05, 0.2, 0.3).to_normalized();
        assert!(rect.y1 < 0.0);
        assert!(rect.x1 < 0.0);
    }

    #[test]
    fn test_pixel_normalize() {
        let rect = PixelBox::new(100, 50, 300, 250)
            .normalize(ImageSize::new(1000, 500))
            .expect("valid size");
        assert_eq!(rect, NormalizedRect::new(0.1, 0.1, 0.3, 0.5));
    }

    #[test]
    fn test_pixel_normalize_rejects_missing_size() {
        let b = PixelBox::new(1, 1, 2, 2);
        assert!(b.normalize(ImageSize::new(0, 100)).is_none());
        assert!(b.normalize(ImageSize::new(100, 0)).is_none());
        assert!(ImageSize::from_optional(None, Some(10)).is_none());
        assert!(ImageSize::from_optional(Some(-4), Some(10)).is_none());
        assert_eq!(
            ImageSize::from_optional(Some(640), Some(480)),
            Some(ImageSize::new(640, 480))
        );
    }

    #[test]
    fn test_pixel_round_trip() {
        let size = ImageSize::new(4032, 3024);
        let original = PixelBox::new(1234, 987, 1777, 1603);
        let rect = original.normalize(size).expect("valid size");
        assert_eq!(rect.to_pixel_box(size), original);
    }

    #[test]
    fn test_face_region_rounds_to_nearest_pixel() {
        let region = NormalizedRect::new(0.1004, 0.2, 0.3006, 0.45).to_face_region(ImageSize::new(1000, 200));
        assert_eq!(
            region,
            FaceRegion {
                x: 100,
                y: 40,
                width: 200,
                height: 50
            }
        );
    }
}
