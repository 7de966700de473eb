//! Capture time and location for a selected media entry.
//!
//! Each field is resolved by walking an ordered list of sources and taking
//! the first one that produces a value. A source that fails is logged and
//! skipped; extraction itself never fails on bad or missing metadata.

pub mod geocode;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{MediaEntry, MediaKind};
use crate::error::Error;
use geocode::ReverseGeocoder;

const DAY_FORMAT: &str = "%Y-%m-%d";
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub village: String,
    pub city: String,
    pub country: String,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.village.is_empty() && self.city.is_empty() && self.country.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureMetadata {
    pub time: String,
    pub location: Location,
    /// EXIF orientation code, consumed by the publisher.
    #[serde(skip)]
    pub orientation: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything read from disk for one entry, before any network lookup.
#[derive(Debug, Default)]
pub struct SourceFacts {
    pub modified: Option<SystemTime>,
    pub exif: Option<ExifFacts>,
}

#[derive(Debug, Default)]
pub struct ExifFacts {
    /// Raw EXIF date string, e.g. `2021:06:30 18:04:11`.
    pub captured: Option<String>,
    pub gps: Option<GpsCoordinates>,
    pub orientation: Option<u16>,
}

/// Candidate sources for the `time` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    ExifCaptureDate,
    FileModified,
}

/// Candidate sources for the `location` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    ReverseGeocode,
}

const PHOTO_TIME_CHAIN: &[TimeSource] = &[TimeSource::ExifCaptureDate, TimeSource::FileModified];
const VIDEO_TIME_CHAIN: &[TimeSource] = &[TimeSource::FileModified];
const PHOTO_LOCATION_CHAIN: &[LocationSource] = &[LocationSource::ReverseGeocode];
const VIDEO_LOCATION_CHAIN: &[LocationSource] = &[];

impl TimeSource {
    pub fn chain_for(kind: MediaKind) -> &'static [Self] {
        match kind {
            MediaKind::Photo => PHOTO_TIME_CHAIN,
            MediaKind::Video => VIDEO_TIME_CHAIN,
        }
    }

    pub fn resolve(self, facts: &SourceFacts) -> Option<String> {
        match self {
            Self::ExifCaptureDate => {
                let raw = facts.exif.as_ref()?.captured.as_deref()?;
                let day = exif_day(raw);
                if day.is_none() {
                    debug!(raw, "malformed exif date");
                }
                day
            }
            Self::FileModified => facts.modified.map(format_day),
        }
    }
}

impl LocationSource {
    pub fn chain_for(kind: MediaKind) -> &'static [Self] {
        match kind {
            MediaKind::Photo => PHOTO_LOCATION_CHAIN,
            MediaKind::Video => VIDEO_LOCATION_CHAIN,
        }
    }
}

/// Resolve the `time` field from the first source in `chain` that has one.
pub fn resolve_time(chain: &[TimeSource], facts: &SourceFacts) -> String {
    chain
        .iter()
        .find_map(|source| source.resolve(facts))
        .unwrap_or_default()
}

/// Format an EXIF `YYYY:MM:DD HH:MM:SS` value as `YYYY-MM-DD`.
pub fn exif_day(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATE_FORMAT)
        .ok()
        .map(|dt| dt.format(DAY_FORMAT).to_string())
}

pub fn format_day(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format(DAY_FORMAT).to_string()
}

pub struct MetadataExtractor {
    geocoder: Option<ReverseGeocoder>,
}

impl MetadataExtractor {
    pub fn new(geocoder: Option<ReverseGeocoder>) -> Self {
        Self { geocoder }
    }

    /// Derive capture metadata for `entry`.
    ///
    /// # Errors
    /// Only fails if the blocking read task itself dies; unreadable or
    /// malformed metadata degrades to empty fields.
    pub async fn extract(&self, entry: &MediaEntry) -> Result<CaptureMetadata, Error> {
        let facts = {
            let entry = entry.clone();
            tokio::task::spawn_blocking(move || read_facts(&entry)).await?
        };

        let kind = entry.kind();
        let time = resolve_time(TimeSource::chain_for(kind), &facts);
        let location = self
            .resolve_location(LocationSource::chain_for(kind), &facts, &entry.path)
            .await;

        Ok(CaptureMetadata {
            time,
            location,
            orientation: facts.exif.as_ref().and_then(|e| e.orientation),
        })
    }

    async fn resolve_location(
        &self,
        chain: &[LocationSource],
        facts: &SourceFacts,
        path: &Path,
    ) -> Location {
        for source in chain {
            let found = match source {
                LocationSource::ReverseGeocode => self.reverse_geocode(facts, path).await,
            };
            if let Some(location) = found {
                return location;
            }
        }
        Location::default()
    }

    async fn reverse_geocode(&self, facts: &SourceFacts, path: &Path) -> Option<Location> {
        let exif = facts.exif.as_ref()?;
        let Some(gps) = exif.gps else {
            info!(path = %path.display(), "no gps data");
            return None;
        };
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.lookup(gps).await {
            Ok(found) => found,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "reverse geocode failed");
                None
            }
        }
    }
}

/// Read modification time and EXIF tags for `entry` (blocking).
pub fn read_facts(entry: &MediaEntry) -> SourceFacts {
    let path = entry.path.as_path();
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => Some(t),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read modification time");
            None
        }
    };

    let exif = match entry.kind() {
        MediaKind::Video => None,
        MediaKind::Photo => match read_exif(path) {
            Ok(exif) => Some(exif_facts(&exif)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to decode exif");
                None
            }
        },
    };

    SourceFacts { modified, exif }
}

/// JPEG, PNG and HEIF containers are told apart by content, not extension.
fn read_exif(path: &Path) -> Result<exif::Exif, exif::Error> {
    let mut buf = BufReader::new(File::open(path)?);
    exif::Reader::new().read_from_container(&mut buf)
}

pub fn exif_facts(parsed: &exif::Exif) -> ExifFacts {
    let captured = [
        exif::Tag::DateTimeOriginal,
        exif::Tag::DateTimeDigitized,
        exif::Tag::DateTime,
    ]
    .into_iter()
    .find_map(|tag| ascii_field(parsed, tag));

    let orientation = parsed
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .and_then(|v| u16::try_from(v).ok());

    ExifFacts {
        captured,
        gps: gps_coordinates(parsed),
        orientation,
    }
}

fn ascii_field(parsed: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = parsed.get_field(tag, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(v) if !v.is_empty() => std::str::from_utf8(&v[0])
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn gps_coordinates(parsed: &exif::Exif) -> Option<GpsCoordinates> {
    let degrees = |tag| -> Option<f64> {
        let field = parsed.get_field(tag, exif::In::PRIMARY)?;
        match &field.value {
            exif::Value::Rational(v) if v.len() >= 3 => {
                Some(v[0].to_f64() + v[1].to_f64() / 60.0 + v[2].to_f64() / 3600.0)
            }
            _ => None,
        }
    };
    let negative = |tag, marker: u8| {
        parsed
            .get_field(tag, exif::In::PRIMARY)
            .is_some_and(|f| match &f.value {
                exif::Value::Ascii(v) => v.first().and_then(|s| s.first()) == Some(&marker),
                _ => false,
            })
    };

    let mut latitude = degrees(exif::Tag::GPSLatitude)?;
    let mut longitude = degrees(exif::Tag::GPSLongitude)?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if negative(exif::Tag::GPSLatitudeRef, b'S') {
        latitude = -latitude;
    }
    if negative(exif::Tag::GPSLongitudeRef, b'W') {
        longitude = -longitude;
    }
    Some(GpsCoordinates {
        latitude,
        longitude,
    })
}
