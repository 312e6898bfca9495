//! Largest interior rectangle of a binary mask.
//!
//! Row-by-row histogram of consecutive valid pixels plus the classic
//! monotonic-stack "largest rectangle in a histogram" scan. O(W·H) total.

use crate::image::MaskU8;
use crate::types::Rect;

/// Largest axis-aligned rectangle of valid pixels; zero-size when the mask
/// has none.
pub fn largest_interior_rectangle(mask: &MaskU8) -> Rect {
    if mask.w == 0 || mask.h == 0 {
        return Rect::default();
    }

    let mut heights = vec![0u32; mask.w];
    let mut best = Rect::default();
    for y in 0..mask.h {
        let row = mask.row(y);
        for (x, &px) in row.iter().enumerate() {
            heights[x] = if px != 0 { heights[x] + 1 } else { 0 };
        }
        let candidate = max_rect_in_histogram(&heights, y);
        if candidate.w as i64 * candidate.h as i64 > best.w as i64 * best.h as i64 {
            best = candidate;
        }
    }
    best
}

/// Largest rectangle under the histogram `heights`, anchored so its bottom
/// row is `bottom_y`.
fn max_rect_in_histogram(heights: &[u32], bottom_y: usize) -> Rect {
    let mut stack: Vec<usize> = Vec::new();
    let mut best = Rect::default();
    let mut consider = |x_left: usize, x_right: usize, height: u32| {
        let width = (x_right - x_left) as i64;
        if width * height as i64 > best.w as i64 * best.h as i64 {
            best = Rect::new(
                x_left as i32,
                (bottom_y + 1) as i32 - height as i32,
                width as i32,
                height as i32,
            );
        }
    };

    for x in 0..=heights.len() {
        let current = if x < heights.len() { heights[x] } else { 0 };
        while let Some(&top) = stack.last() {
            if heights[top] <= current {
                break;
            }
            stack.pop();
            let left = stack.last().map_or(0, |&below| below + 1);
            consider(left, x, heights[top]);
        }
        stack.push(x);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> MaskU8 {
        let h = rows.len();
        let w = rows[0].len();
        let mut mask = MaskU8::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                mask.set(x, y, c == '#');
            }
        }
        mask
    }

    #[test]
    fn full_mask_is_whole_rect() {
        let mask = MaskU8::filled(5, 4);
        assert_eq!(largest_interior_rectangle(&mask), Rect::new(0, 0, 5, 4));
    }

    #[test]
    fn empty_mask_is_zero_rect() {
        let mask = MaskU8::new(5, 4);
        assert!(largest_interior_rectangle(&mask).is_empty());
    }

    #[test]
    fn l_shaped_region() {
        let mask = mask_from_rows(&[
            "####..",
            "####..",
            "######",
            "######",
        ]);
        let rect = largest_interior_rectangle(&mask);
        assert_eq!(rect.w as i64 * rect.h as i64, 16);
    }

    #[test]
    fn staircase_picks_best_block() {
        let mask = mask_from_rows(&[
            "#.....",
            "##....",
            "###...",
            "####..",
            "#####.",
        ]);
        let rect = largest_interior_rectangle(&mask);
        // Best is the 3x3 block in the lower-left corner.
        assert_eq!(rect.w as i64 * rect.h as i64, 9);
    }

    #[test]
    fn rect_pixels_are_all_valid() {
        let mask = mask_from_rows(&[
            ".####.",
            "######",
            "######",
            ".####.",
        ]);
        let rect = largest_interior_rectangle(&mask);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                assert!(mask.get(x as usize, y as usize));
            }
        }
    }
}
