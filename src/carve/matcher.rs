//! Bounds-safe byte matching primitives.
//!
//! Every read is range-checked first; out-of-range access yields "no match"
//! (or `None` for integer reads) and never panics.

use super::pe;
use super::signatures::{SecondaryCheck, SignatureVariant};

/// Bytes decoded for a context substring check
pub const CONTEXT_WINDOW: usize = 1024;

/// True iff `pattern` equals `data[offset..offset + pattern.len()]` and the range is in bounds.
pub fn matches(data: &[u8], offset: usize, pattern: &[u8]) -> bool {
    match offset.checked_add(pattern.len()) {
        Some(end) if end <= data.len() => data[offset..end] == *pattern,
        _ => false,
    }
}

/// Verify the variant's second anchor relative to the candidate start.
///
/// Variants without a secondary check always pass. The PE anchor is resolved
/// in two steps: read the header pointer at +60, then look for `PE\0\0` there.
pub fn secondary_check(data: &[u8], primary_offset: usize, variant: &SignatureVariant) -> bool {
    match variant.secondary {
        None => true,
        Some(SecondaryCheck::Fixed { bytes, offset }) => match primary_offset.checked_add(offset) {
            Some(at) => matches(data, at, bytes),
            None => false,
        },
        Some(SecondaryCheck::PeHeader) => pe::resolve_pe_header(data, primary_offset).is_some(),
    }
}

/// Case-insensitive containment of `text` in up to 1024 bytes decoded permissively from `offset`.
pub fn context_check(data: &[u8], offset: usize, text: &str) -> bool {
    if offset >= data.len() {
        return false;
    }
    let end = offset.saturating_add(CONTEXT_WINDOW).min(data.len());
    let window = String::from_utf8_lossy(&data[offset..end]).to_lowercase();
    window.contains(&text.to_lowercase())
}

/// Run primary, secondary and context checks for `variant` at file start `offset`.
pub fn variant_matches(data: &[u8], offset: usize, variant: &SignatureVariant) -> bool {
    let Some(magic_at) = offset.checked_add(variant.offset) else {
        return false;
    };
    matches(data, magic_at, variant.magic)
        && secondary_check(data, offset, variant)
        && variant
            .context
            .map_or(true, |text| context_check(data, offset, text))
}

pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn read_u32_be(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
