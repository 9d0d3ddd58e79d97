//! Domain types shared by the bottle cap detection pipeline.
//!
//! Nothing in here touches pixels: classification labels, aggregate counts,
//! per-run object ids, error kinds and the ground-truth annotation model.

pub mod annotations;
pub mod classification;
pub mod error;
pub mod ids;

pub use classification::{ClassificationCounts, ClassificationType};
pub use error::CapScanError;
pub use ids::{ObjectId, ObjectIdAllocator};
