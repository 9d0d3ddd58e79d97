//! High-level detection module

pub mod config;
pub mod detector;
pub mod job;

pub use config::AnalysisConfig;
pub use detector::{draw_objects, CapDetector, DetectionResult, DetectionSummary};
pub use job::{DetectionJob, JobReport, JobResult};
