//! Polyglot detection: more than one format declared in the leading bytes.

use serde::{Deserialize, Serialize};

use crate::carve::matcher::variant_matches;
use crate::carve::signatures::{build_dispatch_index, ordered_variants};
use crate::config::AnomalyConfig;

/// Label count above which a polyglot is high risk
const HIGH_RISK_LABELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolyglotAnalysis {
    /// `"{type}@{offset}"` for every signature found
    pub detected_types: Vec<String>,
    pub risk_level: RiskLevel,
}

/// Probe every offset in the leading window; only offset 0 and offsets past
/// `polyglot_min_offset` count. `None` unless two or more labels are found.
pub fn detect(data: &[u8], config: &AnomalyConfig) -> Option<PolyglotAnalysis> {
    let variants = ordered_variants();
    let dispatch = build_dispatch_index(&variants);
    let window = data.len().min(config.polyglot_window);

    let labels: Vec<String> = (0..window)
        .filter(|&offset| offset == 0 || offset > config.polyglot_min_offset)
        .filter_map(|offset| {
            dispatch[data[offset] as usize]
                .iter()
                .map(|&i| &variants[i])
                .find(|v| variant_matches(data, offset, v.variant))
                .map(|v| format!("{}@{}", v.kind(), offset))
        })
        .collect();

    if labels.len() < 2 {
        return None;
    }

    let risk_level = if labels.len() > HIGH_RISK_LABELS {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    };
    tracing::debug!(labels = ?labels, risk = ?risk_level, "Polyglot structure detected");

    Some(PolyglotAnalysis {
        detected_types: labels,
        risk_level,
    })
}
