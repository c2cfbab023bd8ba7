//! Whole-buffer anomaly detectors.
//!
//! Each pass reads the input independently, so they can run on the rayon
//! pool. Results are the same whether run in parallel or in sequence.

pub mod entropy;
pub mod gaps;
pub mod hidden;
pub mod overlay;
pub mod polyglot;

use crate::config::AnomalyConfig;
use crate::error::Result;
use gaps::SuspiciousRegion;
use hidden::{HiddenDataReport, HiddenDataScanner};
use overlay::OverlayData;
use polyglot::PolyglotAnalysis;

/// Combined output of every anomaly pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyReport {
    pub polyglot: Option<PolyglotAnalysis>,
    pub overlay: Option<OverlayData>,
    pub hidden: HiddenDataReport,
    pub gaps: Vec<SuspiciousRegion>,
}

/// Run all detectors over `data`
pub fn scan(data: &[u8], config: &AnomalyConfig, parallel: bool) -> Result<AnomalyReport> {
    let hidden_scanner = HiddenDataScanner::new(config)?;

    let report = if parallel {
        let ((polyglot, overlay), (hidden, gaps)) = rayon::join(
            || {
                rayon::join(
                    || polyglot::detect(data, config),
                    || overlay::detect(data, config),
                )
            },
            || rayon::join(|| hidden_scanner.scan(data), || gaps::detect(data, config)),
        );
        AnomalyReport {
            polyglot,
            overlay,
            hidden,
            gaps,
        }
    } else {
        AnomalyReport {
            polyglot: polyglot::detect(data, config),
            overlay: overlay::detect(data, config),
            hidden: hidden_scanner.scan(data),
            gaps: gaps::detect(data, config),
        }
    };

    tracing::debug!(
        polyglot = report.polyglot.is_some(),
        overlay = report.overlay.is_some(),
        risk_score = report.hidden.risk_score,
        gaps = report.gaps.len(),
        "Anomaly passes complete"
    );

    Ok(report)
}
