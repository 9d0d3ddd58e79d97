//! Classification engine
//!
//! Runs a fixed sequence of passes over the whole object set. Each pass reads
//! the labels of the previous one as an immutable snapshot, so the outcome
//! does not depend on object order within a pass.

pub mod passes;

pub use passes::{
    CoveringObjectPass, InnerObjectPass, NestedDistractorPass, SizeWindowPass, SurfacePass,
    UnknownToDistractorPass,
};

use crate::detection::config::ClassificationConfig;
use crate::object::{DetectedObject, ObjectSet};
use crate::relations::RelationMap;
use crate::size::CapSizeEstimate;
use crate::traits::{ClassificationPass, PassContext};
use capscan_core::ClassificationType;

pub struct Classifier {
    window_size: i32,
    passes: Vec<Box<dyn ClassificationPass>>,
}

impl Classifier {
    pub fn new(config: ClassificationConfig) -> Self {
        let passes: Vec<Box<dyn ClassificationPass>> = vec![
            Box::new(SizeWindowPass {
                below: config.window_below,
                above: config.window_above,
            }),
            Box::new(UnknownToDistractorPass),
            Box::new(InnerObjectPass),
            Box::new(CoveringObjectPass),
            Box::new(NestedDistractorPass),
            Box::new(SurfacePass {
                uniform_threshold: config.uniform_color_diff,
            }),
        ];
        Self {
            window_size: config.window_size,
            passes,
        }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn context(&self, estimate: &CapSizeEstimate) -> PassContext {
        PassContext {
            expected_size: estimate.expected_size(),
            window_size: self.window_size,
        }
    }

    /// Final labels for `objects`, starting from their current classification
    pub fn run(&self, objects: &[DetectedObject], relations: &RelationMap, ctx: &PassContext) -> Vec<ClassificationType> {
        let mut labels: Vec<ClassificationType> = objects.iter().map(|o| o.classification).collect();
        for pass in &self.passes {
            labels = pass.apply(objects, &labels, relations, ctx);
            tracing::trace!("Pass {} done: {:?}", pass.name(), labels);
        }
        labels
    }

    /// Classify every object in place
    pub fn classify(&self, objects: &mut ObjectSet, relations: &RelationMap, estimate: &CapSizeEstimate) {
        let ctx = self.context(estimate);
        let labels = self.run(objects.as_slice(), relations, &ctx);
        for (object, label) in objects.iter_mut().zip(labels) {
            object.classification = label;
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassificationConfig::default())
    }
}
