//! Standardized metrics collection and reporting.
//!
//! Reports are exported as JSON so runs can be compared by tooling.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Top-level metrics report.
///
/// This is the format of the metrics.json files written by runs and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Run identifier
    pub test_name: String,

    /// Timestamp when metrics were collected (RFC 3339)
    pub timestamp: String,

    /// Overall result
    pub result: TestResult,

    /// Boundary bookkeeping metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryMetrics>,

    /// Persistence/save metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceMetrics>,

    /// Execution metrics
    pub test_execution: TestExecutionMetrics,
}

/// Overall result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// All validations passed
    Pass,
    /// A validation failed
    Fail,
}

/// Counters for the boundary light-check protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryMetrics {
    /// Chunk load hooks run
    pub chunks_loaded: u64,

    /// Chunk unload hooks run
    pub chunks_unloaded: u64,

    /// Flag-set operations issued
    pub flags_set: u64,

    /// Flag words moved between chunks
    pub transfers: u64,

    /// Section bits moved between chunks
    pub bits_transferred: u64,

    /// Column recheck requests received by the engine
    pub column_rechecks: u64,

    /// Area recheck requests received by the engine
    pub area_rechecks: u64,

    /// Voxels covered by all recheck requests
    pub voxels_rechecked: u64,

    /// Chunks that reached light populated
    pub chunks_populated: u64,

    /// Chunks still owing checks at the end of the run
    pub chunks_with_pending_flags: u64,
}

/// Persistence counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Chunks saved
    pub chunks_saved: usize,

    /// Chunks loaded from disk
    pub chunks_loaded: usize,

    /// Average save time per chunk (microseconds)
    pub avg_save_time_us: f64,

    /// Average load time per chunk (microseconds)
    pub avg_load_time_us: f64,
}

/// Execution metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionMetrics {
    /// Total duration (seconds)
    pub duration_seconds: f64,

    /// Simulated ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<u64>,

    /// Number of validations passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations_passed: Option<usize>,
}

/// Builder for constructing metrics reports
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Create a new builder with test name
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                result: TestResult::Pass,
                boundary: None,
                persistence: None,
                test_execution: TestExecutionMetrics {
                    duration_seconds: 0.0,
                    ticks: None,
                    validations_passed: None,
                },
            },
        }
    }

    /// Set result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set boundary metrics
    pub fn boundary(mut self, metrics: BoundaryMetrics) -> Self {
        self.report.boundary = Some(metrics);
        self
    }

    /// Set persistence metrics
    pub fn persistence(mut self, metrics: PersistenceMetrics) -> Self {
        self.report.persistence = Some(metrics);
        self
    }

    /// Set execution metrics
    pub fn execution(mut self, metrics: TestExecutionMetrics) -> Self {
        self.report.test_execution = metrics;
        self
    }

    /// Build the metrics report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: std::path::PathBuf,
}

impl MetricsSink {
    /// Create a new metrics sink at the specified path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    /// Write metrics report to file
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
