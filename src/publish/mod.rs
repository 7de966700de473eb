//! Writes the currently selected media to its fixed output slot.
//!
//! Photos and videos have independent slots, each behind its own lock. A
//! slot is replaced by writing a temporary sibling and renaming it into
//! place, so the static file server sees either the old or the new file.

mod heic;
pub mod orientation;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tokio::sync::Mutex;
use tracing::debug;

use crate::catalog::{MediaEntry, MediaFormat, MediaKind};
use crate::error::Error;
use crate::metadata::CaptureMetadata;

pub const PHOTO_JPEG_SLOT: &str = "next.jpg";
pub const PHOTO_PNG_SLOT: &str = "next.png";
pub const VIDEO_SLOT: &str = "next.mov";

pub struct AssetPublisher {
    out_dir: PathBuf,
    jpeg_quality: u8,
    photo_slot: Mutex<()>,
    video_slot: Mutex<()>,
}

impl AssetPublisher {
    pub fn new(out_dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            out_dir: out_dir.into(),
            jpeg_quality,
            photo_slot: Mutex::new(()),
            video_slot: Mutex::new(()),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Publish `entry` and return the slot's path relative to the html root.
    ///
    /// # Errors
    /// Any read, decode, encode or write failure; there is no fallback asset.
    pub async fn publish(
        &self,
        entry: &MediaEntry,
        metadata: &CaptureMetadata,
    ) -> Result<&'static str, Error> {
        match entry.kind() {
            MediaKind::Video => self.publish_video(entry).await,
            MediaKind::Photo => self.publish_photo(entry, metadata.orientation).await,
        }
    }

    async fn publish_video(&self, entry: &MediaEntry) -> Result<&'static str, Error> {
        let target = self.out_dir.join(VIDEO_SLOT);
        let source = entry.path.clone();
        let _slot = self.video_slot.lock().await;
        tokio::task::spawn_blocking(move || {
            let bytes = fs::read(&source)?;
            replace_atomically(&target, |w| w.write_all(&bytes).map_err(Error::from))
        })
        .await??;
        debug!(path = %entry.path.display(), slot = VIDEO_SLOT, "video published");
        Ok(VIDEO_SLOT)
    }

    async fn publish_photo(
        &self,
        entry: &MediaEntry,
        code: Option<u16>,
    ) -> Result<&'static str, Error> {
        let format = entry.format;
        // libheif has already applied the container's own orientation.
        let code = if format == MediaFormat::Heic { None } else { code };
        let slot = photo_slot_for(format);
        let target = self.out_dir.join(slot);
        let source = entry.path.clone();
        let quality = self.jpeg_quality;
        let (transform, _) = orientation::transform_for(code);

        let _slot = self.photo_slot.lock().await;
        tokio::task::spawn_blocking(move || {
            let img = orientation::apply(decode(&source, format)?, code);
            replace_atomically(&target, |w| encode(&img, slot, quality, w))
        })
        .await??;
        debug!(
            path = %entry.path.display(),
            slot,
            transform,
            "photo published"
        );
        Ok(slot)
    }
}

fn decode(source: &Path, format: MediaFormat) -> Result<DynamicImage, Error> {
    match format {
        MediaFormat::Heic => heic::decode(source),
        _ => Ok(image::ImageReader::open(source)?
            .with_guessed_format()?
            .decode()?),
    }
}

/// `.png` sources stay PNG; everything else becomes JPEG.
pub fn photo_slot_for(format: MediaFormat) -> &'static str {
    match format {
        MediaFormat::Png => PHOTO_PNG_SLOT,
        _ => PHOTO_JPEG_SLOT,
    }
}

fn encode(img: &DynamicImage, slot: &str, quality: u8, w: &mut dyn Write) -> Result<(), Error> {
    if slot == PHOTO_PNG_SLOT {
        // PNG encoding needs a seekable sink; buffer it first.
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        w.write_all(buf.get_ref())?;
    } else {
        let encoder = JpegEncoder::new_with_quality(w, quality);
        DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    }
    Ok(())
}

/// Write `target` through a temporary sibling, then rename over it.
fn replace_atomically(
    target: &Path,
    write: impl FnOnce(&mut dyn Write) -> Result<(), Error>,
) -> Result<(), Error> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = target.with_file_name(format!(".{name}.tmp"));
    let result = (|| -> Result<(), Error> {
        let mut out = BufWriter::new(fs::File::create(&tmp)?);
        write(&mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp, target)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
