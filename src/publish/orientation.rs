//! EXIF orientation correction.

use image::DynamicImage;

pub type Transform = fn(DynamicImage) -> DynamicImage;

/// Transforms indexed by `orientation code - 1`.
pub const ORIENTATION_TABLE: [(&str, Transform); 8] = [
    ("identity", identity),
    ("flip-horizontal", flip_horizontal),
    ("rotate-180", rotate_180),
    ("flip-vertical", flip_vertical),
    ("transpose", transpose),
    ("rotate-90-cw", rotate_90_cw),
    ("transverse", transverse),
    ("rotate-270-cw", rotate_270_cw),
];

/// Look up the transform for an EXIF orientation code.
///
/// Absent or out-of-range codes map to the identity.
pub fn transform_for(code: Option<u16>) -> (&'static str, Transform) {
    code.and_then(|c| usize::from(c).checked_sub(1))
        .and_then(|i| ORIENTATION_TABLE.get(i))
        .copied()
        .unwrap_or(ORIENTATION_TABLE[0])
}

/// Apply the correction for `code` exactly once.
pub fn apply(img: DynamicImage, code: Option<u16>) -> DynamicImage {
    let (_, transform) = transform_for(code);
    transform(img)
}

fn identity(img: DynamicImage) -> DynamicImage {
    img
}

fn flip_horizontal(img: DynamicImage) -> DynamicImage {
    img.fliph()
}

fn rotate_180(img: DynamicImage) -> DynamicImage {
    img.rotate180()
}

fn flip_vertical(img: DynamicImage) -> DynamicImage {
    img.flipv()
}

// (x, y) -> (y, x)
fn transpose(img: DynamicImage) -> DynamicImage {
    img.rotate90().fliph()
}

fn rotate_90_cw(img: DynamicImage) -> DynamicImage {
    img.rotate90()
}

// (x, y) -> (h - 1 - y, w - 1 - x)
fn transverse(img: DynamicImage) -> DynamicImage {
    img.rotate270().fliph()
}

fn rotate_270_cw(img: DynamicImage) -> DynamicImage {
    img.rotate270()
}
