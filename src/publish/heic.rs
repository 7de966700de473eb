//! HEIC decoding. `image` has no HEVC codec, so this goes through libheif.
//!
//! libheif applies the container's rotation and mirror properties while
//! decoding, so the result is already upright.

use std::path::Path;

use image::error::ImageFormatHint;
use image::{DynamicImage, ImageError};

use crate::error::Error;

fn heic_hint() -> ImageFormatHint {
    ImageFormatHint::Name("HEIC".to_string())
}

#[cfg(feature = "heic")]
pub fn decode(path: &Path) -> Result<DynamicImage, Error> {
    use image::RgbImage;
    use image::error::DecodingError;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let bad_layout =
        |msg: &str| Error::Codec(ImageError::Decoding(DecodingError::new(heic_hint(), msg.to_string())));

    let bytes = std::fs::read(path)?;
    let ctx = HeifContext::read_from_bytes(&bytes)?;
    let handle = ctx.primary_image_handle()?;
    let decoded = LibHeif::new().decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)?;
    let plane = decoded
        .planes()
        .interleaved
        .ok_or_else(|| bad_layout("no interleaved rgb plane"))?;

    let row = plane.width as usize * 3;
    let mut pixels = Vec::with_capacity(row * plane.height as usize);
    for y in 0..plane.height as usize {
        let start = y * plane.stride;
        let line = plane
            .data
            .get(start..start + row)
            .ok_or_else(|| bad_layout("plane shorter than its stride"))?;
        pixels.extend_from_slice(line);
    }
    RgbImage::from_raw(plane.width, plane.height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| bad_layout("pixel buffer does not match dimensions"))
}

#[cfg(not(feature = "heic"))]
pub fn decode(_path: &Path) -> Result<DynamicImage, Error> {
    use image::error::{UnsupportedError, UnsupportedErrorKind};

    Err(Error::Codec(ImageError::Unsupported(
        UnsupportedError::from_format_and_kind(
            heic_hint(),
            UnsupportedErrorKind::Format(heic_hint()),
        ),
    )))
}
