//! Sobel gradient magnitude used by the seam cost function.
//!
//! Convolves the 3×3 Sobel kernel pair with border clamping. Seam search
//! only needs the magnitude, so the directional components are not kept.

use crate::image::ImageF32;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Per-pixel Sobel magnitude `sqrt(gx^2 + gy^2)` of a single-channel image.
pub fn sobel_magnitude(l: &ImageF32) -> ImageF32 {
    let w = l.w;
    let h = l.h;
    let mut mag = ImageF32::new(w, h);
    if w == 0 || h == 0 {
        return mag;
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out = mag.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                let kx_row = &SOBEL_KERNEL_X[ky];
                let ky_row = &SOBEL_KERNEL_Y[ky];
                sum_x += row[x_idx[0]] * kx_row[0]
                    + row[x_idx[1]] * kx_row[1]
                    + row[x_idx[2]] * kx_row[2];
                sum_y += row[x_idx[0]] * ky_row[0]
                    + row[x_idx[1]] * ky_row[1]
                    + row[x_idx[2]] * ky_row[2];
            }
            out[x] = (sum_x * sum_x + sum_y * sum_y).sqrt();
        }
    }
    mag
}
