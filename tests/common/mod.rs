//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

#[derive(Debug, Default, Clone)]
pub struct ExifSpec {
    pub orientation: Option<u16>,
    pub date_time_original: Option<&'static str>,
    /// (latitude, longitude) in signed decimal degrees.
    pub gps: Option<(f64, f64)>,
}

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

fn ascii(tag: u16, s: &str) -> Entry {
    let mut data = s.as_bytes().to_vec();
    data.push(0);
    Entry {
        tag,
        kind: ASCII,
        count: data.len() as u32,
        data,
    }
}

fn long(tag: u16, v: u32) -> Entry {
    Entry {
        tag,
        kind: LONG,
        count: 1,
        data: v.to_be_bytes().to_vec(),
    }
}

fn dms(tag: u16, value: f64) -> Entry {
    let value = value.abs();
    let deg = value.trunc();
    let minutes = ((value - deg) * 60.0).trunc();
    let seconds = ((value - deg) * 60.0 - minutes) * 60.0;
    let mut data = Vec::new();
    for (num, den) in [
        (deg as u32, 1u32),
        (minutes as u32, 1),
        ((seconds * 1000.0).round() as u32, 1000),
    ] {
        data.extend_from_slice(&num.to_be_bytes());
        data.extend_from_slice(&den.to_be_bytes());
    }
    Entry {
        tag,
        kind: RATIONAL,
        count: 3,
        data,
    }
}

fn padded_len(data: &[u8]) -> usize {
    if data.len() <= 4 { 0 } else { data.len() + data.len() % 2 }
}

fn ifd_size(entries: &[Entry]) -> usize {
    2 + 12 * entries.len() + 4 + entries.iter().map(|e| padded_len(&e.data)).sum::<usize>()
}

fn write_ifd(out: &mut Vec<u8>, entries: &[Entry]) {
    let start = out.len();
    let mut data_at = start + 2 + 12 * entries.len() + 4;
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        out.extend_from_slice(&e.tag.to_be_bytes());
        out.extend_from_slice(&e.kind.to_be_bytes());
        out.extend_from_slice(&e.count.to_be_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&(data_at as u32).to_be_bytes());
            data_at += padded_len(&e.data);
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    for e in entries.iter().filter(|e| e.data.len() > 4) {
        out.extend_from_slice(&e.data);
        if e.data.len() % 2 == 1 {
            out.push(0);
        }
    }
}

/// Build a big-endian TIFF block carrying the requested tags.
pub fn exif_tiff(fields: &ExifSpec) -> Vec<u8> {
    let exif_ifd: Vec<Entry> = fields
        .date_time_original
        .map(|d| vec![ascii(0x9003, d)])
        .unwrap_or_default();
    let gps_ifd: Vec<Entry> = fields
        .gps
        .map(|(lat, lon)| {
            vec![
                ascii(0x0001, if lat < 0.0 { "S" } else { "N" }),
                dms(0x0002, lat),
                ascii(0x0003, if lon < 0.0 { "W" } else { "E" }),
                dms(0x0004, lon),
            ]
        })
        .unwrap_or_default();

    let build_ifd0 = |exif_at: u32, gps_at: u32| {
        let mut ifd0 = Vec::new();
        if let Some(o) = fields.orientation {
            ifd0.push(Entry {
                tag: 0x0112,
                kind: SHORT,
                count: 1,
                data: o.to_be_bytes().to_vec(),
            });
        }
        if !exif_ifd.is_empty() {
            ifd0.push(long(0x8769, exif_at));
        }
        if !gps_ifd.is_empty() {
            ifd0.push(long(0x8825, gps_at));
        }
        ifd0
    };

    let ifd0_size = ifd_size(&build_ifd0(0, 0));
    let exif_at = 8 + ifd0_size;
    let gps_at = exif_at + if exif_ifd.is_empty() { 0 } else { ifd_size(&exif_ifd) };

    let mut out = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
    write_ifd(&mut out, &build_ifd0(exif_at as u32, gps_at as u32));
    if !exif_ifd.is_empty() {
        write_ifd(&mut out, &exif_ifd);
    }
    if !gps_ifd.is_empty() {
        write_ifd(&mut out, &gps_ifd);
    }
    out
}

/// A `w`x`h` image whose left half is red and right half is blue.
pub fn two_tone(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, _| {
        if x < w / 2 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    }))
}

pub fn jpeg_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, 95);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .unwrap();
    out
}

pub fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Splice an APP1 `Exif` segment right after the JPEG SOI marker.
pub fn jpeg_with_exif(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a jpeg");
    let len = (2 + 6 + tiff.len()) as u16;
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Insert an `eXIf` chunk right after the PNG IHDR chunk.
pub fn png_with_exif(png: &[u8], tiff: &[u8]) -> Vec<u8> {
    // signature (8) + IHDR length/type/data/crc (4 + 4 + 13 + 4)
    let split = 8 + 25;
    let mut chunk = (tiff.len() as u32).to_be_bytes().to_vec();
    let mut body = b"eXIf".to_vec();
    body.extend_from_slice(tiff);
    chunk.extend_from_slice(&body);
    chunk.extend_from_slice(&crc32(&body).to_be_bytes());

    let mut out = png[..split].to_vec();
    out.extend(chunk);
    out.extend_from_slice(&png[split..]);
    out
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

fn boxed(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

fn full_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut inner = vec![0, 0, 0, 0];
    inner.extend_from_slice(body);
    boxed(kind, &inner)
}

/// A HEIF container with no image data, only an `Exif` item stored in `idat`.
pub fn heic_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut payload = 6u32.to_be_bytes().to_vec();
    payload.extend_from_slice(b"Exif\0\0");
    payload.extend_from_slice(tiff);

    let mut infe = vec![2, 0, 0, 0];
    infe.extend_from_slice(&1u16.to_be_bytes());
    infe.extend_from_slice(&0u16.to_be_bytes());
    infe.extend_from_slice(b"Exif");
    infe.push(0);
    let mut iinf_body = 1u16.to_be_bytes().to_vec();
    iinf_body.extend(boxed(b"infe", &infe));

    // iloc version 1: 4-byte offsets and lengths, construction method 1 (idat).
    let mut iloc = vec![1, 0, 0, 0, 0x44, 0x00];
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&0u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&0u32.to_be_bytes());
    iloc.extend_from_slice(&(payload.len() as u32).to_be_bytes());

    let mut meta = full_box(b"iinf", &iinf_body);
    meta.extend(boxed(b"iloc", &iloc));
    meta.extend(boxed(b"idat", &payload));

    let mut file = boxed(b"ftyp", b"heic\0\0\0\0mif1heic");
    file.extend(full_box(b"meta", &meta));
    file
}

// 64x64 HEIC written by libheif; its EXIF carries only Software and ExifVersion.
const SAMPLE_HEIC: &str = concat!(
    "AAAAGGZ0eXBoZWljAAAAAG1pZjFoZWljAAABbG1ldGEAAAAAAAAAIWhkbHIAAAAAAAAAAHBpY3QAAAAAAAAAAAAAAAAAAAAADnBp",
    "dG0AAAAAAAEAAAA0aWxvYwAAAABEQAACAAEAAAAAAYwAAQAAAAAAAACfAAIAAAAAAisAAQAAAAAAAABTAAAAOGlpbmYAAAAAAAIA",
    "AAAVaW5mZQIAAAAAAQAAaHZjMQAAAAAVaW5mZQIAAAEAAgAARXhpZgAAAACraXBycAAAAI5pcGNvAAAAcmh2Y0MBBAgAAAAAAAAA",
    "AAAe8AD8/Pj4AAAPAyAAAQAXQAEMAf//BAgAAAMAn/gAAAMAAB66AkAhAAEAJkIBAQQIAAADAJ/4AAADAAAewIIEFlupJKa5sCAA",
    "AAMAIAAAAwAhIgABAAdEAcFysCJAAAAAFGlzcGUAAAAAAAAAQAAAAEAAAAAVaXBtYQAAAAAAAAABAAECgQIAAAAaaXJlZgAAAAAA",
    "AAAOY2RzYwACAAEAAQAAAPptZGF0AAAAmygBriejNehDjnNvkmZ1refYPhOGd74zuXFjBZOC7JOnELNN52+VH0tjqNRiu8LlS1lA",
    "YcoFQWhOA/x5cRdAluwf8z/Z9+suXK7gkw1OjYRsC6AFmphfIurERbhEtI6SVsqfpNQRS5vJJLExxcOmislzo3AEV6ykhSG8er9d",
    "RYchqK27RI8pzIcBMROEcwGT/5OqVeSGloQljcfmAAAAAE1NACoAAAAIAAIBMQACAAAAFwAAADiHaQAEAAAAAQAAACYAAAAAAAGQ",
    "AAAHAAAABDAyMzEAAAAAbGliaGVpZiArIGthbWFkYWstZXhpZgA=",
);

pub fn sample_heic() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(SAMPLE_HEIC)
        .unwrap()
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}
