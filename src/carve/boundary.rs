//! End-of-file resolution for a matched signature.
//!
//! Resolution order per format:
//! 1. ZIP family: End-Of-Central-Directory record (+22 + comment length)
//! 2. PDF: last `%%EOF` in the buffer, searched backward
//! 3. PE: `SizeOfImage` from the optional header, when plausible
//! 4. Footer scan for formats that declare one
//! 5. Next known signature within the fallback window, else the window cap

use std::collections::HashMap;

use memchr::memmem;
use serde::{Deserialize, Serialize};

use super::matcher::{matches, read_u16_le, secondary_check};
use super::pe;
use super::signatures::{FormatKind, VariantRef};
use crate::config::CarvingConfig;

pub const EOCD_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x05, 0x06];
/// Fixed part of the EOCD record; the comment length sits at +20
pub const EOCD_LEN: usize = 22;
pub const PDF_TRAILER: &[u8] = b"%%EOF";

/// How the end of a carved file was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMethod {
    /// Used the format's internal size fields (PE `SizeOfImage`)
    InternalSize,
    /// Found the format's footer bytes
    FooterScan,
    /// Found a self-describing trailer (ZIP EOCD, PDF `%%EOF`)
    Trailer,
    /// Hit another file header
    NextHeader,
    /// Hit the fallback window or the end of the buffer
    MaxSizeCap,
}

/// Resolved exclusive end offset and the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub end: usize,
    pub method: BoundaryMethod,
}

/// Trailer lookups already answered during one scan of one buffer
#[derive(Debug, Default)]
struct SearchMemo {
    /// footer -> (search origin, first full occurrence at or after it)
    next: HashMap<&'static [u8], (usize, Option<usize>)>,
    /// Last `%%EOF` anywhere in the buffer
    last_pdf_trailer: Option<Option<usize>>,
    /// Bytes handed to substring search so far
    searched: u64,
}

/// Resolves file ends against the shared variant table.
///
/// A resolver serves a single buffer: trailer searches are memoized so
/// repeated candidates without a trailer do not rescan the remainder.
pub struct BoundaryResolver<'a> {
    variants: &'a [VariantRef],
    dispatch: &'a [Vec<usize>; 256],
    config: &'a CarvingConfig,
    memo: SearchMemo,
}

impl<'a> BoundaryResolver<'a> {
    pub fn new(
        variants: &'a [VariantRef],
        dispatch: &'a [Vec<usize>; 256],
        config: &'a CarvingConfig,
    ) -> Self {
        Self {
            variants,
            dispatch,
            config,
            memo: SearchMemo::default(),
        }
    }

    /// Bytes scanned by trailer and footer searches so far
    pub fn bytes_searched(&self) -> u64 {
        self.memo.searched
    }

    /// Resolve the end of the file that starts at `start` and matched `vref`
    pub fn resolve(&mut self, data: &[u8], start: usize, vref: &VariantRef) -> Boundary {
        let variant = vref.variant;
        let sig_end = (start + variant.offset + variant.magic.len()).min(data.len());
        let window_end = cap(start, self.config.max_file_size, data.len());
        let kind = vref.kind();

        if kind.is_zip_family() {
            if let Some(end) = self.zip_end(data, sig_end, window_end) {
                return Boundary {
                    end,
                    method: BoundaryMethod::Trailer,
                };
            }
        } else if kind == FormatKind::Pdf {
            if let Some(end) = self.pdf_end(data, sig_end) {
                return Boundary {
                    end,
                    method: BoundaryMethod::Trailer,
                };
            }
        } else if kind == FormatKind::Pe {
            if let Some(end) = self.pe_image_end(data, start) {
                return Boundary {
                    end,
                    method: BoundaryMethod::InternalSize,
                };
            }
        }

        if let Some(footer) = variant.footer {
            if let Some(pos) = self.next_footer(data, footer, sig_end, window_end) {
                return Boundary {
                    end: pos + footer.len(),
                    method: BoundaryMethod::FooterScan,
                };
            }
        }

        self.fallback(data, start, kind)
    }

    /// First full `footer` in `data[from..to]`.
    ///
    /// A miss searches to the buffer end once; later queries starting at or
    /// after that origin are answered from the memo until the cursor passes
    /// the remembered hit.
    fn next_footer(
        &mut self,
        data: &[u8],
        footer: &'static [u8],
        from: usize,
        to: usize,
    ) -> Option<usize> {
        let to = to.min(data.len());
        if footer.is_empty() || from >= to {
            return None;
        }
        let hit = match self.memo.next.get(footer) {
            Some(&(origin, hit)) if origin <= from && hit.map_or(true, |p| p >= from) => hit,
            _ => {
                let hit = find_footer(data, footer, from, data.len());
                let scanned = hit.map_or(data.len(), |p| p + footer.len()) - from;
                self.memo.searched += scanned as u64;
                self.memo.next.insert(footer, (from, hit));
                hit
            }
        };
        hit.filter(|&p| p + footer.len() <= to)
    }

    /// First EOCD record in `data[from..to]`; end = EOCD + 22 + comment length
    fn zip_end(&mut self, data: &[u8], from: usize, to: usize) -> Option<usize> {
        let eocd = self.next_footer(data, EOCD_SIGNATURE, from, to)?;
        let comment_len = read_u16_le(data, eocd + 20)? as usize;
        Some((eocd + EOCD_LEN + comment_len).min(data.len()))
    }

    /// Last `%%EOF` at or after `from`
    fn pdf_end(&mut self, data: &[u8], from: usize) -> Option<usize> {
        let last = match self.memo.last_pdf_trailer {
            Some(last) => last,
            None => {
                let last = memmem::rfind(data, PDF_TRAILER);
                self.memo.searched += data.len() as u64;
                self.memo.last_pdf_trailer = Some(last);
                last
            }
        };
        last.filter(|&p| p >= from).map(|p| p + PDF_TRAILER.len())
    }

    fn pe_image_end(&self, data: &[u8], start: usize) -> Option<usize> {
        let size = pe::parse_headers(data, start)?.size_of_image? as u64;
        if size == 0 || size >= self.config.pe_max_image_size {
            return None;
        }
        Some(cap(start, size, data.len()))
    }

    /// Next known signature past a short skip, bounded by the fallback window
    fn fallback(&self, data: &[u8], start: usize, kind: FormatKind) -> Boundary {
        let skip = if kind == FormatKind::Pe {
            self.config.pe_fallback_skip
        } else {
            self.config.fallback_skip
        };
        let limit = cap(start, self.config.fallback_window, data.len());
        let from = cap(start, skip, data.len());

        for pos in from..limit {
            let hit = self.dispatch[data[pos] as usize].iter().any(|&i| {
                let v = self.variants[i].variant;
                matches(data, pos + v.offset, v.magic) && secondary_check(data, pos, v)
            });
            if hit {
                return Boundary {
                    end: pos,
                    method: BoundaryMethod::NextHeader,
                };
            }
        }

        Boundary {
            end: limit,
            method: BoundaryMethod::MaxSizeCap,
        }
    }
}

/// `start + len`, saturating and clamped to `data_len`
fn cap(start: usize, len: u64, data_len: usize) -> usize {
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    start.saturating_add(len).min(data_len)
}

/// Scan forward in `data[from..to]` for `footer`, returning its absolute offset
pub fn find_footer(data: &[u8], footer: &[u8], from: usize, to: usize) -> Option<usize> {
    let to = to.min(data.len());
    if footer.is_empty() || from >= to {
        return None;
    }
    memmem::find(&data[from..to], footer).map(|pos| from + pos)
}
