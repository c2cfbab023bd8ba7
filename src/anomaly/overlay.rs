//! PE overlay detection: bytes appended after the last declared section.

use memchr::memmem;
use serde::{Deserialize, Serialize};

use super::entropy::shannon_entropy;
use crate::carve::pe;
use crate::config::AnomalyConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayData {
    /// Offset of the `MZ` header owning the overlay
    pub pe_offset: u64,
    pub overlay_offset: u64,
    pub overlay_size: u64,
    pub entropy: f64,
}

/// First PE in the buffer whose trailing bytes past its last section exceed the threshold.
///
/// The section table is located from `SizeOfOptionalHeader`, so PE32 and
/// PE32+ images are both handled.
pub fn detect(data: &[u8], config: &AnomalyConfig) -> Option<OverlayData> {
    for mz in memmem::find_iter(data, b"MZ") {
        let Some(headers) = pe::parse_headers(data, mz) else {
            continue;
        };
        let Some(last_end) = pe::last_section_end(data, &headers, config.max_pe_sections) else {
            continue;
        };

        let overlay_offset = mz as u64 + last_end;
        let overlay_size = (data.len() as u64).saturating_sub(overlay_offset);
        if overlay_size <= config.overlay_threshold {
            continue;
        }

        let entropy = shannon_entropy(&data[overlay_offset as usize..]);
        tracing::debug!(
            pe_offset = mz,
            overlay_offset,
            overlay_size,
            entropy,
            pe32_plus = headers.pe32_plus,
            "PE overlay detected"
        );
        return Some(OverlayData {
            pe_offset: mz as u64,
            overlay_offset,
            overlay_size,
            entropy,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carve::pe::tests::build_pe;

    fn noise(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 256) as u8).collect()
    }

    #[test]
    fn overlay_past_last_section() {
        let mut data = build_pe(false, 1024, 4096);
        data.extend(noise(5000));
        let overlay = detect(&data, &AnomalyConfig::default()).unwrap();
        assert_eq!(overlay.pe_offset, 0);
        assert_eq!(overlay.overlay_offset, 1536);
        assert_eq!(overlay.overlay_size, 5000);
        assert!(overlay.entropy > 7.0);
    }

    #[test]
    fn pe32_plus_overlay() {
        let mut data = build_pe(true, 512, 4096);
        data.extend(noise(2048));
        let overlay = detect(&data, &AnomalyConfig::default()).unwrap();
        assert_eq!(overlay.overlay_offset, 1024);
        assert_eq!(overlay.overlay_size, 2048);
    }

    #[test]
    fn small_tail_not_reported() {
        let mut data = build_pe(false, 512, 4096);
        data.extend(noise(1024));
        assert!(detect(&data, &AnomalyConfig::default()).is_none());
    }

    #[test]
    fn embedded_pe_after_stray_mz() {
        let mut data = b"MZ not a header".to_vec();
        data.resize(100, b'-');
        data.extend(build_pe(false, 512, 4096));
        data.extend(noise(3000));
        let overlay = detect(&data, &AnomalyConfig::default()).unwrap();
        assert_eq!(overlay.pe_offset, 100);
        assert_eq!(overlay.overlay_offset, 100 + 1024);
    }

    #[test]
    fn no_pe_no_overlay() {
        assert!(detect(&vec![0u8; 4096], &AnomalyConfig::default()).is_none());
    }
}
