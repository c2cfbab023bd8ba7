//! Per-format structural summaries of carved files.
//!
//! Every walk is hard-capped so malformed or self-referential input always
//! terminates.

use serde::{Deserialize, Serialize};

use super::matcher::{matches, read_u16_be, read_u16_le, read_u32_be, read_u32_le};
use super::pe;
use super::signatures::FormatKind;

pub const MAX_JPEG_SEGMENTS: usize = 50;
pub const MAX_PNG_CHUNKS: usize = 50;
pub const MAX_ZIP_ENTRIES: usize = 100;

const PNG_SIGNATURE_LEN: usize = 8;
const JPEG_SOS: u8 = 0xDA;
const ZIP_LOCAL_HEADER: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const ZIP_DATA_DESCRIPTOR_FLAG: u16 = 0x0008;

/// Structural metadata attached to a carved file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg: Option<JpegMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<PngMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<ZipMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe: Option<PeMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfMetadata>,
}

impl FileMetadata {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JpegMetadata {
    pub segments: Vec<JpegSegment>,
}

/// One marker segment; `length` includes its own two bytes, 0 for standalone markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegSegment {
    pub marker: u16,
    pub length: u16,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PngMetadata {
    pub chunks: Vec<PngChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PngChunk {
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub length: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipMetadata {
    pub files: Vec<ZipEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipEntry {
    pub filename: String,
    pub compressed_size: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeMetadata {
    pub machine: u16,
    pub section_count: u16,
    pub pe32_plus: bool,
    pub size_of_image: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub version: String,
}

/// Run the extractor for `kind` over a carved file's bytes
pub fn extract(kind: FormatKind, data: &[u8]) -> FileMetadata {
    let mut meta = FileMetadata::default();
    match kind {
        FormatKind::Jpeg => meta.jpeg = Some(jpeg_segments(data)),
        FormatKind::Png => meta.png = Some(png_chunks(data)),
        k if k.is_zip_family() => meta.zip = Some(zip_entries(data)),
        FormatKind::Pe => meta.pe = pe_summary(data),
        FormatKind::Pdf => meta.pdf = pdf_version(data),
        _ => {}
    }
    meta
}

/// Marker segments from after SOI up to and including Start-Of-Scan
pub fn jpeg_segments(data: &[u8]) -> JpegMetadata {
    let mut segments = Vec::new();
    let mut pos = 2;

    while segments.len() < MAX_JPEG_SEGMENTS {
        let (Some(&0xFF), Some(&marker)) = (data.get(pos), data.get(pos + 1)) else {
            break;
        };
        // Fill bytes before a marker
        if marker == 0xFF {
            pos += 1;
            continue;
        }

        let standalone = matches!(marker, 0x01 | 0xD0..=0xD8);
        let length = if standalone {
            0
        } else {
            match read_u16_be(data, pos + 2) {
                Some(len) => len,
                None => break,
            }
        };

        segments.push(JpegSegment {
            marker: 0xFF00 | marker as u16,
            length,
            offset: pos,
        });

        if marker == JPEG_SOS || (!standalone && length < 2) {
            break;
        }
        pos += 2 + length as usize;
    }

    JpegMetadata { segments }
}

/// Chunks after the 8-byte signature up to and including `IEND`
pub fn png_chunks(data: &[u8]) -> PngMetadata {
    let mut chunks = Vec::new();
    let mut pos = PNG_SIGNATURE_LEN;

    while chunks.len() < MAX_PNG_CHUNKS {
        let Some(length) = read_u32_be(data, pos) else {
            break;
        };
        let Some(tag) = data.get(pos + 4..pos + 8) else {
            break;
        };

        chunks.push(PngChunk {
            chunk_type: String::from_utf8_lossy(tag).into_owned(),
            length,
            offset: pos,
        });

        if tag == b"IEND" {
            break;
        }
        // length + type + data + crc
        pos = pos.saturating_add(12).saturating_add(length as usize);
    }

    PngMetadata { chunks }
}

/// Entries while local file headers recur back to back
pub fn zip_entries(data: &[u8]) -> ZipMetadata {
    let mut files = Vec::new();
    let mut pos = 0usize;

    while files.len() < MAX_ZIP_ENTRIES && matches(data, pos, ZIP_LOCAL_HEADER) {
        let (Some(flags), Some(compressed), Some(name_len), Some(extra_len)) = (
            read_u16_le(data, pos + 6),
            read_u32_le(data, pos + 18),
            read_u16_le(data, pos + 26),
            read_u16_le(data, pos + 28),
        ) else {
            break;
        };

        let name_start = pos + 30;
        let Some(name) = data.get(name_start..name_start + name_len as usize) else {
            break;
        };

        files.push(ZipEntry {
            filename: String::from_utf8_lossy(name).into_owned(),
            compressed_size: compressed,
            offset: pos,
        });

        // Size lives in a trailing data descriptor; the next header can't be located
        if flags & ZIP_DATA_DESCRIPTOR_FLAG != 0 && compressed == 0 {
            break;
        }
        pos = name_start
            .saturating_add(name_len as usize + extra_len as usize)
            .saturating_add(compressed as usize);
    }

    ZipMetadata { files }
}

pub fn pe_summary(data: &[u8]) -> Option<PeMetadata> {
    let h = pe::parse_headers(data, 0)?;
    Some(PeMetadata {
        machine: h.machine,
        section_count: h.section_count,
        pe32_plus: h.pe32_plus,
        size_of_image: h.size_of_image,
    })
}

/// Version digits following the `%PDF-` header
pub fn pdf_version(data: &[u8]) -> Option<PdfMetadata> {
    let rest = data.strip_prefix(b"%PDF-")?;
    let version: String = rest
        .iter()
        .take(8)
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();
    (!version.is_empty()).then_some(PdfMetadata { version })
}
