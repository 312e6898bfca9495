//! Binary validity masks travelling alongside their images.
//!
//! A pixel is valid when its byte is non-zero (written as 255). Masks must
//! stay pixel-registered with the image they accompany through warp, crop
//! and seam stages.

/// Owned 8-bit binary mask, row-major, stride == width.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaskU8 {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl MaskU8 {
    /// All-invalid mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    /// All-valid mask of size `w × h`.
    pub fn filled(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![255; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, valid: bool) {
        let i = y * self.w + x;
        self.data[i] = if valid { 255 } else { 0 };
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.w;
        let end = start + self.w;
        &mut self.data[start..end]
    }

    /// Number of valid pixels.
    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// In-place intersection with `other`; sizes must match.
    pub fn intersect_with(&mut self, other: &MaskU8) {
        assert_eq!(
            (self.w, self.h),
            (other.w, other.h),
            "mask sizes must match for intersection"
        );
        for (dst, &src) in self.data.iter_mut().zip(&other.data) {
            if src == 0 {
                *dst = 0;
            }
        }
    }

    /// Nearest-neighbour rescale to `nw × nh` (used to lift seam masks from
    /// the low tier to the final tier).
    pub fn resize_nearest(&self, nw: usize, nh: usize) -> MaskU8 {
        assert!(nw > 0 && nh > 0, "target dimensions must be positive");
        let mut out = MaskU8::new(nw, nh);
        for y in 0..nh {
            let sy = ((y as f32 + 0.5) * self.h as f32 / nh as f32) as usize;
            let sy = sy.min(self.h - 1);
            let src = self.row(sy);
            let dst = out.row_mut(y);
            for (x, dst_px) in dst.iter_mut().enumerate() {
                let sx = ((x as f32 + 0.5) * self.w as f32 / nw as f32) as usize;
                *dst_px = src[sx.min(self.w - 1)];
            }
        }
        out
    }

    /// Copy out the sub-mask `[x, x+w) × [y, y+h)`.
    pub fn crop(&self, x: usize, y: usize, w: usize, h: usize) -> MaskU8 {
        assert!(x + w <= self.w && y + h <= self.h, "crop window out of bounds");
        let mut out = MaskU8::new(w, h);
        for row in 0..h {
            let src = &self.row(y + row)[x..x + w];
            out.row_mut(row).copy_from_slice(src);
        }
        out
    }
}
