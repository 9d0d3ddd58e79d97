//! Cap detector: localization through classification on one ROI image

use super::config::{AnalysisConfig, VisualizationConfig};
use crate::classify::Classifier;
use crate::features::FeatureExtractor;
use crate::filter::ObjectFilter;
use crate::object::{ObjectReport, ObjectSet};
use crate::relations::RelationMap;
use crate::segmentation::ObjectLocalizer;
use crate::size::{CapSizeEstimate, SizeEstimator};
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use capscan_core::{ClassificationCounts, ObjectIdAllocator};
use opencv::{
    core::{Mat, Point, Point2f, Scalar},
    imgproc::{self, LINE_8},
    prelude::*,
};
use serde::Serialize;
use std::path::Path;

/// Everything one detection run produced
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Winning threshold of the localization sweep
    pub threshold: i32,
    /// Raw contours at the winning threshold
    pub contour_count: usize,
    /// Objects dropped by the plausibility filter
    pub filtered: usize,
    pub cap_iterations: usize,
    /// All surviving objects, including inner and ignored ones
    pub objects: ObjectSet,
    pub relations: RelationMap,
    pub size: CapSizeEstimate,
    pub processing_time_ms: u64,
}

/// Serializable summary of a detection run
#[derive(Debug, Clone, Serialize)]
pub struct DetectionSummary {
    pub threshold: i32,
    pub contour_count: usize,
    pub object_count: usize,
    pub size: CapSizeEstimate,
    pub counts: ClassificationCounts,
    pub objects: Vec<ObjectReport>,
    pub processing_time_ms: u64,
}

impl DetectionResult {
    pub fn counts(&self) -> ClassificationCounts {
        self.objects.counts()
    }

    pub fn expected_size(&self) -> f64 {
        self.size.avg_size
    }

    pub fn reports(&self) -> Vec<ObjectReport> {
        self.objects.reports()
    }

    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary {
            threshold: self.threshold,
            contour_count: self.contour_count,
            object_count: self.objects.len(),
            size: self.size,
            counts: self.counts(),
            objects: self.reports(),
            processing_time_ms: self.processing_time_ms,
        }
    }
}

/// Finds and classifies bottle caps in a region of interest
pub struct CapDetector {
    config: AnalysisConfig,
    localizer: ObjectLocalizer,
    extractor: FeatureExtractor,
    filter: ObjectFilter,
    estimator: SizeEstimator,
    classifier: Classifier,
}

impl CapDetector {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            localizer: ObjectLocalizer::new(config.localization.clone()),
            extractor: FeatureExtractor::new(config.shape.clone()),
            filter: ObjectFilter::new(config.filter.clone(), config.max_objects),
            estimator: SizeEstimator::new(config.classification.window_size),
            classifier: Classifier::new(config.classification.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Detect from an image file holding an already cropped ROI
    pub fn detect_from_file<P: AsRef<Path>>(&self, roi_path: P) -> Result<DetectionResult> {
        let roi = ImageUtils::load_color(&roi_path)
            .with_context(|| format!("Failed to load ROI image: {:?}", roi_path.as_ref()))?;
        self.detect_from_mat(&roi)
    }

    /// Detect from image::RgbImage using opencv-match conversions
    pub fn detect_from_rgb_image(&self, rgb_image: &image::RgbImage) -> Result<DetectionResult> {
        let roi = ImageUtils::rgb_to_mat(rgb_image)?;
        self.detect_from_mat(&roi)
    }

    /// Core detection from an OpenCV Mat (BGR)
    pub fn detect_from_mat(&self, roi: &Mat) -> Result<DetectionResult> {
        let start_time = std::time::Instant::now();

        let localization = self.localizer.localize(roi)?;
        let contour_count = localization.contours.len();

        let mut ids = ObjectIdAllocator::new();
        let candidates = self
            .extractor
            .extract_all(roi, &localization.contours, &mut ids)
            .context("Feature extraction failed")?;

        let outcome = self.filter.apply(candidates, roi.size()?);
        let mut objects = outcome.objects;

        let relations = RelationMap::resolve(&mut objects);
        let size = self.estimator.estimate(objects.as_slice())?;
        self.classifier.classify(&mut objects, &relations, &size);

        Ok(DetectionResult {
            threshold: localization.threshold,
            contour_count,
            filtered: outcome.filtered,
            cap_iterations: outcome.cap_iterations,
            objects,
            relations,
            size,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Copy of the ROI with the rotated rectangle of every reported object
    pub fn annotate(&self, roi: &Mat, objects: &ObjectSet) -> Result<Mat> {
        draw_objects(roi, objects, &self.config.visualization)
    }
}

/// Draw the outline of every reported object onto a copy of `roi`
pub fn draw_objects(roi: &Mat, objects: &ObjectSet, vis: &VisualizationConfig) -> Result<Mat> {
    let mut output = roi.try_clone()?;
    let (r, g, b) = vis.color;
    let color = Scalar::new(b as f64, g as f64, r as f64, 0.0);

    for object in objects.reported() {
        if vis.draw_rotated_rects {
            let mut corners = [Point2f::default(); 4];
            object.rotated_rect.points(&mut corners)?;
            for i in 0..corners.len() {
                let from = corners[i];
                let to = corners[(i + 1) % corners.len()];
                imgproc::line(
                    &mut output,
                    Point::new(from.x as i32, from.y as i32),
                    Point::new(to.x as i32, to.y as i32),
                    color,
                    vis.thickness,
                    LINE_8,
                    0,
                )?;
            }
        } else {
            imgproc::rectangle(&mut output, object.bounding_box, color, vis.thickness, LINE_8, 0)?;
        }
    }

    Ok(output)
}
