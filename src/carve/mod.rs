//! File carving module - Extract embedded files from a byte buffer by signature.
//!
//! A single linear scan over an in-memory buffer finds file headers,
//! resolves each file's end, and copies the byte range out.
//!
//! # Design
//!
//! - **Signature dispatch**: First-byte index for O(1) candidate lookup,
//!   offset variants (MP4 `ftyp` at +4) probed from every cursor position
//! - **First match wins**: Candidates are tried in registry order, so the
//!   narrower ZIP containers (JAR, DOCX, ...) are decided before plain ZIP
//! - **Boundaries**: Trailers, internal size fields and footers before the
//!   next-signature fallback (see [`boundary`])
//! - **No overlap**: After a carve the cursor jumps to the resolved end
//! - **Bounded copies**: Each carved file owns its bytes; the total copied is
//!   capped by `max_total_carved_bytes`

pub mod boundary;
pub mod confidence;
pub mod matcher;
pub mod metadata;
pub mod pe;
pub mod signatures;

use humansize::{format_size, BINARY};
use serde::{Deserialize, Serialize};

use crate::analysis::CancelFlag;
use crate::config::CarvingConfig;
use crate::error::{EngineError, Result};
use crate::timeline::Timeline;
pub use boundary::{Boundary, BoundaryMethod, BoundaryResolver};
use metadata::FileMetadata;
pub use signatures::{FileType, FormatKind};
use signatures::{build_dispatch_index, ordered_variants, VariantRef};

/// The scan stops this many bytes before the end of the buffer
pub const SCAN_TAIL: usize = 16;

/// A file carved out of the input buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarvedFile {
    /// Stable identifier: carve index and start offset
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FormatKind,
    pub file_type: FileType,
    pub description: String,
    pub extension: String,
    /// Byte offset in the source buffer where this file starts
    pub offset: u64,
    pub size: u64,
    /// Owned copy of `source[offset..offset + size]`
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Heuristic score in `[0, 100]`
    pub confidence: u8,
    /// Leading bytes as space-separated uppercase hex pairs
    pub hex_preview: String,
    /// How the file end was determined
    pub boundary_method: BoundaryMethod,
    /// Blake3 hash of the carved bytes
    pub hash: String,
    pub metadata: FileMetadata,
}

impl CarvedFile {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Everything a single carve pass produced
#[derive(Debug, Clone, Default)]
pub struct CarveOutcome {
    /// Carved files, ordered by offset, non-overlapping
    pub files: Vec<CarvedFile>,
    /// Candidate variants probed
    pub signatures_checked: u64,
    /// Cursor positions the scan covered
    pub bytes_scanned: u64,
    /// The copy budget ran out before the end of the buffer
    pub budget_exhausted: bool,
}

/// The file carver engine
pub struct Carver {
    config: CarvingConfig,
    variants: Vec<VariantRef>,
    dispatch: [Vec<usize>; 256],
}

impl Carver {
    pub fn new(config: CarvingConfig) -> Self {
        let variants = ordered_variants();
        let dispatch = build_dispatch_index(&variants);
        Self {
            config,
            variants,
            dispatch,
        }
    }

    /// Scan `data` once from the start, carving every accepted match.
    ///
    /// Polls `cancel` every `cancel_check_interval` cursor steps and returns
    /// `EngineError::Cancelled` with the cursor position when it is set.
    pub fn carve(
        &self,
        data: &[u8],
        cancel: &CancelFlag,
        timeline: &mut Timeline,
    ) -> Result<CarveOutcome> {
        let mut resolver = BoundaryResolver::new(&self.variants, &self.dispatch, &self.config);
        let scan_end = data.len().saturating_sub(SCAN_TAIL);
        let interval = self.config.cancel_check_interval.max(1);

        tracing::debug!(
            buffer_len = data.len(),
            variants = self.variants.len(),
            "Starting carve scan"
        );

        let mut outcome = CarveOutcome::default();
        let mut copied: u64 = 0;
        let mut steps: u64 = 0;
        let mut offset = 0usize;

        while offset < scan_end {
            if steps % interval == 0 && cancel.is_cancelled() {
                tracing::warn!(offset, files = outcome.files.len(), "Carve cancelled");
                return Err(EngineError::Cancelled {
                    offset: offset as u64,
                });
            }
            steps += 1;

            let Some((vref, boundary)) =
                self.match_at(data, offset, &mut resolver, &mut outcome.signatures_checked)
            else {
                offset += 1;
                continue;
            };

            let size = (boundary.end - offset) as u64;
            if copied + size > self.config.max_total_carved_bytes {
                tracing::warn!(
                    offset,
                    copied,
                    budget = self.config.max_total_carved_bytes,
                    "Carve budget exhausted"
                );
                timeline.record(
                    "carve_budget_exhausted",
                    format!(
                        "Stopped carving at offset 0x{:08X} after copying {}",
                        offset,
                        format_size(copied, BINARY)
                    ),
                );
                outcome.budget_exhausted = true;
                break;
            }

            let file = self.materialize(data, outcome.files.len(), offset, &vref, boundary);
            copied += size;

            tracing::debug!(
                offset,
                size,
                kind = %file.kind,
                confidence = file.confidence,
                method = ?file.boundary_method,
                "Carved file"
            );
            timeline.record(
                "file_carved",
                format!(
                    "{} carved at offset 0x{:08X} ({}, confidence {}%)",
                    file.description,
                    offset,
                    format_size(size, BINARY),
                    file.confidence
                ),
            );

            outcome.files.push(file);
            offset = boundary.end;
        }

        outcome.bytes_scanned = offset.min(data.len()) as u64;
        tracing::info!(
            files = outcome.files.len(),
            signatures_checked = outcome.signatures_checked,
            copied,
            "Carve scan complete"
        );

        Ok(outcome)
    }

    /// First variant at `offset` (registry order) whose resolved size is in bounds
    fn match_at(
        &self,
        data: &[u8],
        offset: usize,
        resolver: &mut BoundaryResolver<'_>,
        checked: &mut u64,
    ) -> Option<(VariantRef, Boundary)> {
        for &i in &self.dispatch[data[offset] as usize] {
            let vref = self.variants[i];
            *checked += 1;

            if !matcher::variant_matches(data, offset, vref.variant) {
                continue;
            }

            let boundary = resolver.resolve(data, offset, &vref);
            let size = boundary.end.saturating_sub(offset) as u64;
            if size == 0 || size < self.config.min_file_size || size > self.config.max_file_size {
                tracing::debug!(offset, size, kind = %vref.kind(), "Candidate size out of bounds");
                continue;
            }

            return Some((vref, boundary));
        }
        None
    }

    fn materialize(
        &self,
        data: &[u8],
        index: usize,
        offset: usize,
        vref: &VariantRef,
        boundary: Boundary,
    ) -> CarvedFile {
        let bytes = data[offset..boundary.end].to_vec();
        let kind = vref.kind();

        CarvedFile {
            id: format!("carved_{:04}_{:08x}", index, offset),
            kind,
            file_type: vref.signature.file_type,
            description: vref.variant.description.to_string(),
            extension: vref.variant.extension.to_string(),
            offset: offset as u64,
            size: bytes.len() as u64,
            confidence: confidence::score(kind, vref.variant, &bytes),
            hex_preview: hex_preview(&bytes, self.config.hex_preview_len),
            boundary_method: boundary.method,
            hash: hex::encode(blake3::hash(&bytes).as_bytes()),
            metadata: metadata::extract(kind, &bytes),
            data: bytes,
        }
    }
}

/// `FF D8 FF E0 ...` rendering of the first `len` bytes
pub fn hex_preview(data: &[u8], len: usize) -> String {
    data.iter()
        .take(len)
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
