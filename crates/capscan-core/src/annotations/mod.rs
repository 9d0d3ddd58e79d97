//! Ground-truth annotations produced with LabelMe
//!
//! Only the parts needed for evaluation are modelled: the labelled polygon
//! shapes, reduced to their centroid, and a per-class count.

use crate::classification::ClassificationCounts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top level of a LabelMe JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationFile {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(rename = "imagePath", default)]
    pub image_path: Option<String>,
}

/// A single labelled polygon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shape {
    pub label: String,
    #[serde(default)]
    pub line_color: Option<serde_json::Value>,
    #[serde(default)]
    pub fill_color: Option<serde_json::Value>,
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
}

impl Shape {
    /// Mean of the polygon points, `None` without points.
    ///
    /// Every coordinate is truncated before summing and the sum is divided
    /// with integer division.
    pub fn centroid(&self) -> Option<(i32, i32)> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as i32;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0i32, 0i32), |(sx, sy), p| (sx + p[0] as i32, sy + p[1] as i32));
        Some((sx / n, sy / n))
    }
}

impl AnnotationFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotation file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse annotation file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid LabelMe JSON")
    }

    /// Count annotated caps per class. Distractors are never annotated.
    pub fn counts(&self) -> ClassificationCounts {
        let mut counts = ClassificationCounts::new();
        for shape in &self.shapes {
            let label = shape.label.as_str();
            if label.contains("BottleCapFaceDown") || label.contains("BottleCap_FaceDown") {
                counts.face_down += 1;
            } else if label.contains("BottleCapFaceUp") || label.contains("BottleCap_FaceUp") {
                counts.face_up += 1;
            } else if label.contains("BottleCapDeformed") || label.contains("BottleCap_Deformed") {
                counts.deformed += 1;
            }
        }
        counts
    }
}

/// Path of the annotation file expected next to a video.
///
/// Course videos are named `CV20_video_<n>.mp4` and their labels
/// `CV20_label_renamed_<n>.json`; any other video uses its own stem.
pub fn annotation_path_for(video: &Path) -> Option<PathBuf> {
    let name = video.file_name()?.to_str()?;
    let json_name = if name.starts_with("CV20") {
        name.replace("_video_", "_label_renamed_").replace(".mp4", ".json")
    } else {
        Path::new(name).with_extension("json").to_string_lossy().into_owned()
    };
    Some(video.with_file_name(json_name))
}
