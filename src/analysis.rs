//! Analysis orchestration: carve, run the anomaly passes, assemble the report.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use humansize::{format_size, BINARY};
use serde::{Deserialize, Serialize};

use crate::anomaly::{self, gaps::SuspiciousRegion, hidden::HiddenDataReport};
use crate::anomaly::{overlay::OverlayData, polyglot::PolyglotAnalysis};
use crate::carve::{CarvedFile, Carver};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::timeline::{ScanStatistics, Timeline, TimelineEntry};

/// Cooperative cancellation shared between the caller and a running scan
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Caller-supplied description of the input buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
    pub name: String,
    pub size: u64,
    pub declared_type: Option<String>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            declared_type: None,
        }
    }

    /// Name from the final path component, declared type from the extension
    pub fn from_path(path: &Path, size: u64) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size,
            declared_type: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase()),
        }
    }
}

/// Full report for one input buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file: InputFile,
    pub timestamp: DateTime<Utc>,
    pub carved_files: Vec<CarvedFile>,
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyglot_analysis: Option<PolyglotAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_data: Option<OverlayData>,
    pub hidden_data: HiddenDataReport,
    pub suspicious_regions: Vec<SuspiciousRegion>,
    #[serde(flatten)]
    pub statistics: ScanStatistics,
    /// Carving stopped early at the copy budget
    pub truncated: bool,
}

impl AnalysisResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the carver and the anomaly passes with one configuration
pub struct Analyzer {
    config: EngineConfig,
    carver: Carver,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        let carver = Carver::new(config.carving.clone());
        Self { config, carver }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, data: &[u8], file: &InputFile) -> Result<AnalysisResult> {
        self.analyze_with_cancel(data, file, &CancelFlag::new())
    }

    /// Analyze `data`, stopping with `EngineError::Cancelled` once `cancel` is set
    pub fn analyze_with_cancel(
        &self,
        data: &[u8],
        file: &InputFile,
        cancel: &CancelFlag,
    ) -> Result<AnalysisResult> {
        let start = Instant::now();
        let mut timeline = Timeline::new();

        tracing::info!(
            name = %file.name,
            size = data.len(),
            declared_type = file.declared_type.as_deref().unwrap_or("unknown"),
            "Starting analysis"
        );
        timeline.record(
            "analysis_started",
            format!("Analyzing {} ({})", file.name, format_size(data.len(), BINARY)),
        );

        let outcome = self.carver.carve(data, cancel, &mut timeline)?;

        if cancel.is_cancelled() {
            tracing::warn!("Analysis cancelled before anomaly passes");
            return Err(EngineError::Cancelled {
                offset: outcome.bytes_scanned,
            });
        }

        let anomalies = anomaly::scan(
            data,
            &self.config.anomaly,
            self.config.general.parallel_anomaly_passes,
        )?;

        if let Some(polyglot) = &anomalies.polyglot {
            timeline.record(
                "polyglot_detected",
                format!("Multiple formats found: {}", polyglot.detected_types.join(", ")),
            );
        }
        if let Some(overlay) = &anomalies.overlay {
            timeline.record(
                "overlay_detected",
                format!(
                    "{} of overlay data at offset 0x{:08X} (entropy {:.2})",
                    format_size(overlay.overlay_size, BINARY),
                    overlay.overlay_offset,
                    overlay.entropy
                ),
            );
        }
        if anomalies.hidden.risk_score > 0 {
            timeline.record(
                "hidden_data_detected",
                format!("Hidden data risk score {}", anomalies.hidden.risk_score),
            );
        }
        if !anomalies.gaps.is_empty() {
            timeline.record(
                "null_gaps_detected",
                format!("{} null-byte gaps", anomalies.gaps.len()),
            );
        }

        let statistics = ScanStatistics::collect(
            data.len() as u64,
            outcome.signatures_checked,
            &outcome.files,
            start.elapsed().as_millis() as u64,
        );
        timeline.record(
            "analysis_complete",
            format!(
                "Carved {} files, recovered {}",
                statistics.files_carved,
                format_size(statistics.data_recovered, BINARY)
            ),
        );

        tracing::info!(
            files_carved = statistics.files_carved,
            data_recovered = statistics.data_recovered,
            signatures_checked = statistics.signatures_checked,
            risk_score = anomalies.hidden.risk_score,
            duration_ms = statistics.processing_time_ms,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            file: file.clone(),
            timestamp: Utc::now(),
            carved_files: outcome.files,
            timeline: timeline.into_entries(),
            polyglot_analysis: anomalies.polyglot,
            overlay_data: anomalies.overlay,
            hidden_data: anomalies.hidden,
            suspicious_regions: anomalies.gaps,
            statistics,
            truncated: outcome.budget_exhausted,
        })
    }

    /// Read the file once, then analyze it
    pub async fn analyze_path(&self, path: impl AsRef<Path>) -> anyhow::Result<AnalysisResult> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| EngineError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file = InputFile::from_path(path, data.len() as u64);
        Ok(self.analyze(&data, &file)?)
    }
}
