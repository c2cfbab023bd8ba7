//! Forensic timeline and scan counters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::carve::CarvedFile;

/// One event in scan order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub description: String,
}

/// Append-only event log
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: impl Into<String>, description: impl Into<String>) {
        self.entries.push(TimelineEntry {
            timestamp: Utc::now(),
            event: event.into(),
            description: description.into(),
        });
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TimelineEntry> {
        self.entries
    }
}

/// Counters for a completed scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatistics {
    /// Bytes of input examined
    pub total_scanned: u64,
    /// Candidate signature variants probed by the carver
    pub signatures_checked: u64,
    pub files_carved: usize,
    /// Sum of carved file sizes
    pub data_recovered: u64,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    /// Carved files per format, keyed by format name
    pub by_type: BTreeMap<String, usize>,
}

impl ScanStatistics {
    /// Aggregate counters over the carved files
    pub fn collect(
        total_scanned: u64,
        signatures_checked: u64,
        files: &[CarvedFile],
        processing_time_ms: u64,
    ) -> Self {
        let mut by_type = BTreeMap::new();
        for f in files {
            *by_type.entry(f.kind.as_str().to_string()).or_insert(0) += 1;
        }

        Self {
            total_scanned,
            signatures_checked,
            files_carved: files.len(),
            data_recovered: files.iter().map(|f| f.size).sum(),
            processing_time_ms,
            by_type,
        }
    }
}
