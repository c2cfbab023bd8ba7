//! Null-byte gap scan.

use serde::{Deserialize, Serialize};

use crate::config::AnomalyConfig;

pub const NULL_GAP: &str = "null_gap";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousRegion {
    pub offset: u64,
    pub size: u64,
    #[serde(rename = "type")]
    pub region_type: String,
    pub entropy: f64,
}

/// Contiguous `0x00` runs of at least `min_gap_len` bytes, first `max_gaps` in offset order
pub fn detect(data: &[u8], config: &AnomalyConfig) -> Vec<SuspiciousRegion> {
    let min_len = config.min_gap_len.max(1);
    let mut gaps = Vec::new();
    let mut pos = 0;

    while gaps.len() < config.max_gaps {
        let Some(start) = memchr::memchr(0, &data[pos..]).map(|i| pos + i) else {
            break;
        };
        let run = data[start..]
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(data.len() - start);

        if run >= min_len {
            gaps.push(SuspiciousRegion {
                offset: start as u64,
                size: run as u64,
                region_type: NULL_GAP.to_string(),
                entropy: 0.0,
            });
        }
        pos = start + run;
    }

    gaps
}
