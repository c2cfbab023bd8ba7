//! Minimal PE/COFF header walk.
//!
//! Only the fields the carver needs: header location, COFF file header,
//! optional-header magic and `SizeOfImage`, and the raw extents of the
//! section table. All offsets returned are absolute within the buffer.

use super::matcher::{matches, read_u16_le, read_u32_le};

/// Offset of `e_lfanew` within the DOS header
pub const PE_POINTER_OFFSET: usize = 60;
pub const PE_SIGNATURE: &[u8] = b"PE\0\0";

const COFF_HEADER_LEN: usize = 20;
const SECTION_HEADER_LEN: usize = 40;
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
/// `SizeOfImage` sits at the same optional-header offset for PE32 and PE32+
const SIZE_OF_IMAGE_OFFSET: usize = 56;

/// Parsed PE header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeHeaders {
    /// Absolute offset of the `MZ` header
    pub dos_offset: usize,
    /// Absolute offset of the `PE\0\0` signature
    pub pe_offset: usize,
    pub machine: u16,
    pub section_count: u16,
    pub optional_header_size: u16,
    pub pe32_plus: bool,
    pub size_of_image: Option<u32>,
}

impl PeHeaders {
    /// Absolute offset of the first section header
    pub fn section_table_offset(&self) -> usize {
        self.pe_offset + 4 + COFF_HEADER_LEN + self.optional_header_size as usize
    }
}

/// Resolve the `PE\0\0` anchor for an `MZ` header at `start`.
///
/// Reads the little-endian pointer at `start + 60` and checks the signature
/// there; returns the absolute signature offset.
pub fn resolve_pe_header(data: &[u8], start: usize) -> Option<usize> {
    let e_lfanew = read_u32_le(data, start.checked_add(PE_POINTER_OFFSET)?)? as usize;
    let pe_offset = start.checked_add(e_lfanew)?;
    matches(data, pe_offset, PE_SIGNATURE).then_some(pe_offset)
}

/// Parse the COFF and optional header fields for an `MZ` header at `start`
pub fn parse_headers(data: &[u8], start: usize) -> Option<PeHeaders> {
    let pe_offset = resolve_pe_header(data, start)?;
    let coff = pe_offset + 4;
    let machine = read_u16_le(data, coff)?;
    let section_count = read_u16_le(data, coff + 2)?;
    let optional_header_size = read_u16_le(data, coff + 16)?;

    let optional = coff + COFF_HEADER_LEN;
    let magic = read_u16_le(data, optional);
    let pe32_plus = magic == Some(PE32_PLUS_MAGIC);
    let size_of_image = match magic {
        Some(PE32_MAGIC) | Some(PE32_PLUS_MAGIC)
            if optional_header_size as usize >= SIZE_OF_IMAGE_OFFSET + 4 =>
        {
            read_u32_le(data, optional + SIZE_OF_IMAGE_OFFSET)
        }
        _ => None,
    };

    Some(PeHeaders {
        dos_offset: start,
        pe_offset,
        machine,
        section_count,
        optional_header_size,
        pe32_plus,
        size_of_image,
    })
}

/// Largest `PointerToRawData + SizeOfRawData` over at most `max_sections` headers,
/// relative to the `MZ` start. `None` when no section header is readable.
pub fn last_section_end(data: &[u8], headers: &PeHeaders, max_sections: usize) -> Option<u64> {
    let table = headers.section_table_offset();
    let count = (headers.section_count as usize).min(max_sections);

    let mut max_end: Option<u64> = None;
    for i in 0..count {
        let sec = table + i * SECTION_HEADER_LEN;
        let (Some(raw_size), Some(raw_ptr)) =
            (read_u32_le(data, sec + 16), read_u32_le(data, sec + 20))
        else {
            break;
        };
        let end = raw_ptr as u64 + raw_size as u64;
        max_end = Some(max_end.map_or(end, |m| m.max(end)));
    }
    max_end
}
