//! Heuristic confidence scoring (0-100) for carved files.
//!
//! Score = 50 base + size plausibility + footer match + a bounded structural
//! walk for ZIP, PDF and JPEG. Validator faults contribute nothing.

use memchr::memmem;

use super::matcher::{matches, read_u16_le, read_u32_le};
use super::signatures::{FormatKind, SignatureVariant};
use crate::error::ValidationError;

pub const BASE_SCORE: u32 = 50;
pub const PLAUSIBLE_SIZE_BONUS: u32 = 20;
pub const LARGE_SIZE_BONUS: u32 = 10;
pub const FOOTER_BONUS: u32 = 30;
pub const MAX_STRUCTURE_BONUS: u32 = 15;

const PLAUSIBLE_MIN: usize = 100;
const PLAUSIBLE_MAX: usize = 10 * 1024 * 1024;
const MAX_ZIP_ENTRIES: usize = 100;
const MAX_ZIP_FIELD_LEN: u16 = 1024;
const JPEG_MARKER_WINDOW: usize = 1024;

const LOCAL_FILE_HEADER: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const CENTRAL_DIRECTORY_HEADER: &[u8] = &[0x50, 0x4B, 0x01, 0x02];

/// Score a carved byte range in `[0, 100]`
pub fn score(kind: FormatKind, variant: &SignatureVariant, data: &[u8]) -> u8 {
    let mut total = BASE_SCORE + size_bonus(data.len());

    if let Some(footer) = variant.footer {
        if data.ends_with(footer) {
            total += FOOTER_BONUS;
        }
    }

    total += structure_bonus(kind, data);
    total.min(100) as u8
}

fn size_bonus(size: usize) -> u32 {
    if size > PLAUSIBLE_MAX {
        LARGE_SIZE_BONUS
    } else if size >= PLAUSIBLE_MIN {
        PLAUSIBLE_SIZE_BONUS
    } else {
        0
    }
}

/// Format-specific walk, capped at 15; faults are logged and count as zero
pub fn structure_bonus(kind: FormatKind, data: &[u8]) -> u32 {
    let result = match kind {
        k if k.is_zip_family() => validate_zip(data),
        FormatKind::Pdf => validate_pdf(data),
        FormatKind::Jpeg => validate_jpeg(data),
        _ => Ok(0),
    };

    match result {
        Ok(bonus) => bonus.min(MAX_STRUCTURE_BONUS),
        Err(e) => {
            tracing::debug!(kind = %kind, error = %e, "Structural validation failed");
            0
        }
    }
}

/// Walk local file headers checking name/extra length sanity
pub fn validate_zip(data: &[u8]) -> Result<u32, ValidationError> {
    let mut pos = 0usize;
    let mut entries = 0usize;

    while entries < MAX_ZIP_ENTRIES && matches(data, pos, LOCAL_FILE_HEADER) {
        let compressed = read_u32_le(data, pos + 18)
            .ok_or(ValidationError::Truncated { offset: pos + 18 })?;
        let name_len =
            read_u16_le(data, pos + 26).ok_or(ValidationError::Truncated { offset: pos + 26 })?;
        let extra_len =
            read_u16_le(data, pos + 28).ok_or(ValidationError::Truncated { offset: pos + 28 })?;

        if name_len == 0 || name_len > MAX_ZIP_FIELD_LEN {
            return Err(ValidationError::Implausible {
                field: "filename length",
                value: name_len as u64,
                offset: pos + 26,
            });
        }
        if extra_len > MAX_ZIP_FIELD_LEN {
            return Err(ValidationError::Implausible {
                field: "extra field length",
                value: extra_len as u64,
                offset: pos + 28,
            });
        }

        entries += 1;
        pos = pos
            .saturating_add(30 + name_len as usize + extra_len as usize)
            .saturating_add(compressed as usize);
    }

    if entries == 0 {
        return Err(ValidationError::MissingMarker("local file header"));
    }

    let mut bonus = 10;
    if matches(data, pos, CENTRAL_DIRECTORY_HEADER) {
        bonus += 5;
    }
    Ok(bonus)
}

/// Keyword presence: header, objects, xref table, trailer, final `%%EOF`
pub fn validate_pdf(data: &[u8]) -> Result<u32, ValidationError> {
    if !data.starts_with(b"%PDF-") {
        return Err(ValidationError::MissingMarker("%PDF-"));
    }

    let mut found = 1u32;
    for keyword in [&b"obj"[..], b"endobj", b"xref", b"trailer"] {
        if memmem::find(data, keyword).is_some() {
            found += 1;
        }
    }
    if data.trim_ascii_end().ends_with(b"%%EOF") {
        found += 1;
    }

    Ok(found * MAX_STRUCTURE_BONUS / 6)
}

/// Marker density in the first 1024 bytes plus a trailing EOI
pub fn validate_jpeg(data: &[u8]) -> Result<u32, ValidationError> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(ValidationError::MissingMarker("SOI"));
    }

    let window = &data[..data.len().min(JPEG_MARKER_WINDOW)];
    let markers = window
        .windows(2)
        .filter(|w| w[0] == 0xFF && (0xC0..=0xFE).contains(&w[1]))
        .count();

    let mut bonus = match markers {
        0..=1 => 0,
        2..=3 => 5,
        _ => 10,
    };
    if data.ends_with(&[0xFF, 0xD9]) {
        bonus += 5;
    }
    Ok(bonus)
}
