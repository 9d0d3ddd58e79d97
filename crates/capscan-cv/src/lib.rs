//! CapScan Computer Vision Library
//! 
//! Locates and classifies bottle caps on a single static video frame using OpenCV.
//! The pipeline runs strictly in sequence: static scene, region of interest,
//! threshold sweep, features, filtering, containment, size estimate, classification.

pub mod classify;
pub mod detection;
pub mod features;
pub mod filter;
pub mod object;
pub mod relations;
pub mod scene;
pub mod segmentation;
pub mod size;
pub mod utils;

// Re-export commonly used types
pub use classify::Classifier;
pub use detection::{AnalysisConfig, CapDetector, DetectionJob, DetectionResult, JobResult};
pub use object::{DetectedObject, ObjectSet};
pub use relations::RelationMap;
pub use scene::{FrameLoader, StaticScene, StaticSceneSelector};
pub use segmentation::{ObjectLocalizer, RegionOfInterest, RoiExtractor, ThresholdSearch};
pub use size::{CapSizeEstimate, SizeEstimator};

// Re-export opencv-match for convenience
pub use opencv_match::prelude::*;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use crate::object::DetectedObject;
    use crate::relations::RelationMap;
    use capscan_core::ClassificationType;

    /// Inputs shared by every classification pass of one run.
    #[derive(Debug, Clone, Copy)]
    pub struct PassContext {
        /// Expected cap side length, truncated to whole pixels.
        pub expected_size: i32,
        pub window_size: i32,
    }

    /// One step of the classification engine.
    ///
    /// A pass sees the labels produced by the previous pass as an immutable
    /// snapshot (`labels[i]` belongs to `objects[i]`) and returns the next
    /// label vector of the same length.
    pub trait ClassificationPass {
        fn name(&self) -> &'static str;

        fn apply(
            &self,
            objects: &[DetectedObject],
            labels: &[ClassificationType],
            relations: &RelationMap,
            ctx: &PassContext,
        ) -> Vec<ClassificationType>;
    }
}
