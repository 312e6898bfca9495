//! Small geometry value types threaded through the pipeline stages.

use serde::Serialize;

/// Top-left offset of a warped footprint in panorama coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PointI {
    pub x: i32,
    pub y: i32,
}

impl PointI {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel extent of an image or warped footprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SizeI {
    pub w: i32,
    pub h: i32,
}

impl SizeI {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Axis-aligned rectangle in panorama coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_corner_size(corner: PointI, size: SizeI) -> Self {
        Self::new(corner.x, corner.y, size.w, size.h)
    }

    pub fn corner(&self) -> PointI {
        PointI::new(self.x, self.y)
    }

    pub fn size(&self) -> SizeI {
        SizeI::new(self.w, self.h)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Intersection with `other`; disjoint rectangles collapse to zero size.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    /// Scale every coordinate by `s`, rounding the origin down and the
    /// extent up so the scaled rectangle still covers its source.
    pub fn scaled(&self, s: f32) -> Rect {
        let x = (self.x as f32 * s).floor() as i32;
        let y = (self.y as f32 * s).floor() as i32;
        let right = (self.right() as f32 * s).ceil() as i32;
        let bottom = (self.bottom() as f32 * s).ceil() as i32;
        Rect::new(x, y, right - x, bottom - y)
    }
}
