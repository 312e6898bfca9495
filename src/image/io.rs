//! I/O helpers for grayscale maps and JSON reports.
//!
//! - `load_grayscale`: read a PNG/TIFF/etc. into a normalized [`ImageF32`].
//! - `save_grayscale`: write an [`ImageF32`] to an 8-bit grayscale PNG.
//! - `save_mask`: write a [`MaskU8`] to a PNG for inspection.
//! - `write_json_file`: pretty-print a serializable value to disk.

use super::{ImageF32, MaskU8};
use crate::error::{Result, StitchError};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk, convert to grayscale and normalize to [0, 1].
pub fn load_grayscale(path: &Path) -> Result<ImageF32> {
    let img = image::open(path)
        .map_err(|e| StitchError::Io(format!("failed to open {}: {e}", path.display())))?
        .into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img.into_raw().into_iter().map(|v| v as f32 / 255.0).collect();
    Ok(ImageF32::from_raw(w, h, data))
}

/// Save a float image to a grayscale PNG, clamping values into [0, 255].
pub fn save_grayscale(image: &ImageF32, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for y in 0..image.h {
        let row = image.row(y);
        for (x, &px) in row.iter().enumerate() {
            let v = (px * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| StitchError::Io(format!("failed to save {}: {e}", path.display())))
}

/// Save a binary mask to a PNG (valid pixels white).
pub fn save_mask(mask: &MaskU8, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let out = GrayImage::from_raw(mask.w as u32, mask.h as u32, mask.data.clone())
        .ok_or_else(|| StitchError::Io("mask buffer does not match dimensions".into()))?;
    out.save(path)
        .map_err(|e| StitchError::Io(format!("failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StitchError::Io(format!("failed to serialize {}: {e}", path.display())))?;
    fs::write(path, json)
        .map_err(|e| StitchError::Io(format!("failed to write {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| StitchError::Io(format!("failed to create {}: {e}", parent.display())))?;
        }
    }
    Ok(())
}
