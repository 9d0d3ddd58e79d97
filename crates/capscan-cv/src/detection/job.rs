//! One detection job per video: decode, pick the static scene, crop, detect
//! and report.

use super::config::{AnalysisConfig, VisualizationConfig};
use super::detector::{draw_objects, CapDetector, DetectionResult, DetectionSummary};
use crate::scene::{FrameLoader, FrameSequence, StaticSceneSelector};
use crate::segmentation::RoiExtractor;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use capscan_core::annotations::{annotation_path_for, AnnotationFile};
use capscan_core::{CapScanError, ClassificationCounts};
use opencv::{
    core::{Mat, Rect},
    prelude::*,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of one job. Always produced, even when the job failed.
#[derive(Debug)]
pub struct JobResult {
    pub video: PathBuf,
    pub output_dir: PathBuf,
    /// `FileNotFound: ..`, `Validation: ..` or `Exception: ..`
    pub failed_msg: Option<String>,
    pub duration_ms: u64,
    pub static_scene_index: Option<usize>,
    pub roi: Option<Mat>,
    /// ROI position inside the static scene
    pub roi_region: Option<Rect>,
    pub detection: Option<DetectionResult>,
    pub counts: ClassificationCounts,
    /// Counts from the ground-truth file next to the video, if any
    pub annotation_counts: Option<ClassificationCounts>,
    visualization: VisualizationConfig,
}

/// Serializable job report
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub video: PathBuf,
    pub failed_msg: Option<String>,
    pub duration_ms: u64,
    pub static_scene_index: Option<usize>,
    pub detection: Option<DetectionSummary>,
    pub counts: ClassificationCounts,
    pub annotation_counts: Option<ClassificationCounts>,
}

impl JobResult {
    fn new(video: PathBuf, output_dir: PathBuf, visualization: VisualizationConfig) -> Self {
        Self {
            video,
            output_dir,
            failed_msg: None,
            duration_ms: 0,
            static_scene_index: None,
            roi: None,
            roi_region: None,
            detection: None,
            counts: ClassificationCounts::new(),
            annotation_counts: None,
            visualization,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_msg.is_none()
    }

    pub fn expected_size(&self) -> Option<f64> {
        self.detection.as_ref().map(DetectionResult::expected_size)
    }

    fn output_file(&self, extension: &str) -> PathBuf {
        let stem = self
            .video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        self.output_dir.join(format!("{}.{}", stem, extension))
    }

    /// CSV lines `idx,centerX,centerY,'Label'` for every reported object
    pub fn csv_lines(&self) -> Vec<String> {
        let (Some(idx), Some(detection)) = (self.static_scene_index, &self.detection) else {
            return Vec::new();
        };
        detection
            .objects
            .reported()
            .map(|o| {
                let c = o.center();
                format!("{},{},{},'{}'\r\n", idx, c.x, c.y, o.label())
            })
            .collect()
    }

    pub fn write_csv(&self) -> Result<PathBuf> {
        let path = self.output_file("csv");
        fs::write(&path, self.csv_lines().concat())
            .with_context(|| format!("Failed to write CSV: {:?}", path))?;
        tracing::info!("Results are written to output file: {:?}", path);
        Ok(path)
    }

    /// Annotated ROI as PNG, `None` if the job never got a ROI
    pub fn store_annotated_image(&self) -> Result<Option<PathBuf>> {
        let Some(roi) = &self.roi else {
            return Ok(None);
        };
        let annotated = match &self.detection {
            Some(detection) => draw_objects(roi, &detection.objects, &self.visualization)?,
            None => roi.try_clone()?,
        };
        let path = self.output_file("png");
        ImageUtils::save_image(&annotated, &path)?;
        Ok(Some(path))
    }

    pub fn report(&self) -> JobReport {
        JobReport {
            video: self.video.clone(),
            failed_msg: self.failed_msg.clone(),
            duration_ms: self.duration_ms,
            static_scene_index: self.static_scene_index,
            detection: self.detection.as_ref().map(DetectionResult::summary),
            counts: self.counts,
            annotation_counts: self.annotation_counts,
        }
    }

    pub fn export_json(&self) -> Result<PathBuf> {
        let path = self.output_file("json");
        let json = serde_json::to_string_pretty(&self.report())
            .context("Failed to serialize job report")?;
        fs::write(&path, json).with_context(|| format!("Failed to write JSON to: {:?}", path))?;
        Ok(path)
    }

    pub fn print_summary(&self) {
        if let Some(msg) = &self.failed_msg {
            tracing::warn!("Job for {:?} failed: {}", self.video, msg);
        }

        tracing::info!("DETECTED OBJECTS:");
        if let Some(detection) = &self.detection {
            for object in detection.objects.reported() {
                tracing::info!("   {}", object);
            }
        }

        let d = &self.counts;
        match &self.annotation_counts {
            Some(a) => tracing::info!(
                "BC_UP(detected/json): {}/{} BC_DOWN(detected/json): {}/{} DEFORMED(detected/json): {}/{} DISTRACTORS(detected): {} TOTAL(detected/json): {}/{} DIFF: {} TOTAL TIME [ms]: {}",
                d.face_up,
                a.face_up,
                d.face_down,
                a.face_down,
                d.deformed,
                a.deformed,
                d.distractor,
                d.total(),
                a.total(),
                d.cap_difference(a),
                self.duration_ms
            ),
            None => tracing::info!(
                "UP: {} DOWN: {} DEFORMED: {} DISTRACTORS: {} TOTAL: {} TOTAL TIME [ms]: {}",
                d.face_up,
                d.face_down,
                d.deformed,
                d.distractor,
                d.total(),
                self.duration_ms
            ),
        }
    }
}

/// Runs the full pipeline for one video
pub struct DetectionJob {
    video: PathBuf,
    output_dir: PathBuf,
    config: AnalysisConfig,
}

impl DetectionJob {
    pub fn new<V, O>(video: V, output_dir: O, config: AnalysisConfig) -> Self
    where
        V: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            video: video.into(),
            output_dir: output_dir.into(),
            config,
        }
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    /// Never fails: errors end up in `JobResult::failed_msg`
    pub fn process(&self) -> JobResult {
        tracing::info!("Process started for {:?}", self.video);
        let start = Instant::now();
        let mut result = self.empty_result();

        let outcome = FrameLoader::load(&self.video).and_then(|frames| self.run(frames, &mut result));
        self.finish(&mut result, outcome, start);
        result
    }

    /// Same as [`process`](Self::process) on an already decoded sequence
    pub fn process_frames(&self, frames: FrameSequence) -> JobResult {
        let start = Instant::now();
        let mut result = self.empty_result();
        let outcome = self.run(frames, &mut result);
        self.finish(&mut result, outcome, start);
        result
    }

    fn empty_result(&self) -> JobResult {
        JobResult::new(
            self.video.clone(),
            self.output_dir.clone(),
            self.config.visualization.clone(),
        )
    }

    fn finish(&self, result: &mut JobResult, outcome: Result<()>, start: Instant) {
        if let Err(err) = outcome {
            let msg = self.failure_message(&err);
            tracing::warn!("{}", msg);
            result.failed_msg = Some(msg);
        }
        result.duration_ms = start.elapsed().as_millis() as u64;
    }

    fn run(&self, frames: FrameSequence, result: &mut JobResult) -> Result<()> {
        let scene = StaticSceneSelector::new(self.config.min_frames).select(frames)?;
        result.static_scene_index = Some(scene.index);

        let roi = RoiExtractor::new(self.config.roi.clone()).extract(&scene.frame)?;
        result.roi_region = Some(roi.region);
        result.roi = Some(roi.image.try_clone()?);

        let detector = CapDetector::new(self.config.clone())?;
        let detection = detector.detect_from_mat(&roi.image)?;
        result.counts = detection.counts();
        result.detection = Some(detection);

        result.annotation_counts = self.analyse_annotations();
        Ok(())
    }

    fn failure_message(&self, err: &anyhow::Error) -> String {
        match err.downcast_ref::<CapScanError>() {
            Some(CapScanError::NotFound(_)) => {
                let name = self
                    .video
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("FileNotFound: {}", name)
            }
            Some(CapScanError::Validation(msg)) => format!("Validation: {}", msg),
            _ => format!("Exception: {:#}", err),
        }
    }

    /// Counts from the LabelMe file next to the video. A missing file gives
    /// `None`, an unreadable one zero counts.
    pub fn analyse_annotations(&self) -> Option<ClassificationCounts> {
        let path = annotation_path_for(&self.video)?;
        tracing::info!("Try to find json file: {:?}", path);
        if !path.exists() {
            tracing::warn!("Corresponding json file does not exist: {:?}", path);
            return None;
        }

        match AnnotationFile::load(&path) {
            Ok(file) => Some(file.counts()),
            Err(err) => {
                tracing::warn!("Could not read annotations: {:#}", err);
                Some(ClassificationCounts::new())
            }
        }
    }
}
