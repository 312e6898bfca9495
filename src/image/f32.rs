//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! Intensities are kept in [0, 1]. Provides the sampling and rescaling
//! primitives the pipeline stages build on: bilinear lookup for inverse
//! warping and area-average decimation for the resolution tiers.

/// Owned grayscale float buffer.
#[derive(Clone, Debug, Default)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Backing storage in row-major order, length `w * h`
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap an existing row-major buffer; `data.len()` must equal `w * h`.
    pub fn from_raw(w: usize, h: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), w * h, "buffer length must match dimensions");
        Self { w, h, data }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = y * self.w + x;
        self.data[i] = v;
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.w;
        let end = start + self.w;
        &mut self.data[start..end]
    }

    /// Bilinear sample at a fractional position, `None` outside the image.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> Option<f32> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        if x < 0.0 || y < 0.0 || x > (self.w - 1) as f32 || y > (self.h - 1) as f32 {
            return None;
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.w - 1);
        let y1 = (y0 + 1).min(self.h - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let top = self.get(x0, y0) * (1.0 - fx) + self.get(x1, y0) * fx;
        let bot = self.get(x0, y1) * (1.0 - fx) + self.get(x1, y1) * fx;
        Some(top * (1.0 - fy) + bot * fy)
    }

    /// Rescale to `nw × nh` with box-filter averaging.
    ///
    /// Each destination pixel averages the source rectangle it covers, which
    /// is the right filter for the heavy decimation used by the LOW and
    /// MEDIUM tiers and degrades to bilinear-ish behaviour near scale 1.
    pub fn resize_area(&self, nw: usize, nh: usize) -> ImageF32 {
        assert!(nw > 0 && nh > 0, "target dimensions must be positive");
        if nw == self.w && nh == self.h {
            return self.clone();
        }
        let mut out = ImageF32::new(nw, nh);
        let sx = self.w as f32 / nw as f32;
        let sy = self.h as f32 / nh as f32;
        for y in 0..nh {
            let y0 = (y as f32 * sy).floor() as usize;
            let y1 = (((y + 1) as f32 * sy).ceil() as usize).clamp(y0 + 1, self.h);
            let dst = out.row_mut(y);
            for (x, dst_px) in dst.iter_mut().enumerate() {
                let x0 = (x as f32 * sx).floor() as usize;
                let x1 = (((x + 1) as f32 * sx).ceil() as usize).clamp(x0 + 1, self.w);
                let mut sum = 0.0f32;
                for yy in y0..y1 {
                    let row = &self.data[yy * self.w..yy * self.w + self.w];
                    for &px in &row[x0..x1] {
                        sum += px;
                    }
                }
                *dst_px = sum / ((y1 - y0) * (x1 - x0)) as f32;
            }
        }
        out
    }

    /// Copy out the sub-image `[x, x+w) × [y, y+h)`; the window must lie
    /// fully inside the image.
    pub fn crop(&self, x: usize, y: usize, w: usize, h: usize) -> ImageF32 {
        assert!(x + w <= self.w && y + h <= self.h, "crop window out of bounds");
        let mut out = ImageF32::new(w, h);
        for row in 0..h {
            let src = &self.row(y + row)[x..x + w];
            out.row_mut(row).copy_from_slice(src);
        }
        out
    }
}
