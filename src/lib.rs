//! Carvex Library
//!
//! Binary file-carving and anomaly engine - locates files embedded in an
//! arbitrary byte buffer by signature, resolves their boundaries, scores
//! them, and flags forensic anomalies in the buffer as a whole.
//!
//! # Features
//!
//! - **Signature Carving**: 29 formats, first-match-wins in a fixed registry order
//! - **Boundary Heuristics**: ZIP EOCD, PDF trailer, PE `SizeOfImage`, footers,
//!   next-signature fallback
//! - **Confidence Scoring**: Size, footer and bounded structural walks
//! - **Anomaly Passes**: Polyglots, PE overlays, hidden strings/URLs,
//!   high-entropy blocks, null-byte gaps
//! - **Bounded**: Every walk and report is capped; the scan always terminates
//!
//! # Example
//!
//! ```no_run
//! use carvex::{Analyzer, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let analyzer = Analyzer::new(EngineConfig::default());
//!     let result = analyzer.analyze_path("disk.img").await?;
//!
//!     println!("Carved {} files", result.carved_files.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod anomaly;
pub mod carve;
pub mod config;
pub mod error;
pub mod logging;
pub mod timeline;

// Re-export commonly used types
pub use analysis::{AnalysisResult, Analyzer, CancelFlag, InputFile};
pub use anomaly::gaps::SuspiciousRegion;
pub use anomaly::hidden::HiddenDataReport;
pub use anomaly::overlay::OverlayData;
pub use anomaly::polyglot::{PolyglotAnalysis, RiskLevel};
pub use carve::{BoundaryMethod, CarveOutcome, CarvedFile, Carver, FileType, FormatKind};
pub use config::{generate_sample_config, EngineConfig};
pub use error::{EngineError, Result, ValidationError};
pub use logging::init_tracing;
pub use timeline::{ScanStatistics, TimelineEntry};
