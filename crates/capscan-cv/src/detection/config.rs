//! Detection configuration

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum length of the decoded frame sequence
    pub min_frames: usize,
    /// Objects kept after capping (smallest areas are dropped first)
    pub max_objects: usize,
    pub roi: RoiConfig,
    pub localization: LocalizationConfig,
    pub filter: FilterConfig,
    pub shape: ShapeConfig,
    pub classification: ClassificationConfig,
    pub visualization: VisualizationConfig,
}

/// Threshold scan used to binarize a blurred grayscale image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdScan {
    pub start: i32,
    pub end: i32,
    pub step: i32,
}

/// Region of interest extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiConfig {
    pub blur_kernel: i32,
    pub scan: ThresholdScan,
    pub morph_kernel: i32,
    pub morph_iterations: usize,
    pub side_extension: i32,
    pub min_size: (i32, i32), // (width, height)
}

/// Threshold sweep for object localization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    pub blur_kernel: i32,
    pub sweep: ThresholdScan,
    pub min_area: f64,
    pub max_area: f64,
}

/// Plausibility filter for candidate objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub min_area: f64,
    pub max_area: f64,
    /// Maximum bounding box size relative to the ROI
    pub roi_relation_size: f64,
    pub sliver_min_side: i32,
    pub sliver_side_factor: i32,
    pub edge_margin: i32,
}

/// Shape descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Polygon approximation epsilon relative to the contour perimeter
    pub approx_epsilon: f64,
    pub circle_min_ratio: f64,
    pub deformed_ratio: (f64, f64), // [min, max)
    pub color_samples: i32,
}

/// Size estimation and classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub window_size: i32,
    pub window_below: f64,
    pub window_above: f64,
    /// Caps with every channel diff below this count as face down
    pub uniform_color_diff: f32,
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    pub draw_rotated_rects: bool,
    pub color: (u8, u8, u8),
    pub thickness: i32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_frames: 40,
            max_objects: 15,
            roi: RoiConfig::default(),
            localization: LocalizationConfig::default(),
            filter: FilterConfig::default(),
            shape: ShapeConfig::default(),
            classification: ClassificationConfig::default(),
            visualization: VisualizationConfig::default(),
        }
    }
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 11,
            scan: ThresholdScan { start: 100, end: 150, step: 5 },
            morph_kernel: 5,
            morph_iterations: 10,
            side_extension: 20,
            min_size: (400, 300),
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 11,
            sweep: ThresholdScan { start: 100, end: 160, step: 2 },
            min_area: 500.0,
            max_area: 40000.0,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            max_area: 40000.0,
            roi_relation_size: 0.5,
            sliver_min_side: 30,
            sliver_side_factor: 6,
            edge_margin: 100,
        }
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            approx_epsilon: 0.02,
            circle_min_ratio: 0.8,
            deformed_ratio: (0.3, 0.8),
            color_samples: 10,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            window_below: 1.0,
            window_above: 2.5,
            uniform_color_diff: 100.0,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            draw_rotated_rects: true,
            color: (0, 255, 0),
            thickness: 1,
        }
    }
}

impl ThresholdScan {
    /// Thresholds of the scan in ascending order, both ends included
    pub fn thresholds(&self) -> impl Iterator<Item = i32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize)
    }
}

impl AnalysisConfig {
    /// Load a configuration from JSON; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_scans() {
        let config = AnalysisConfig::default();

        let roi: Vec<i32> = config.roi.scan.thresholds().collect();
        assert_eq!(roi.first(), Some(&100));
        assert_eq!(roi.last(), Some(&150));
        assert_eq!(roi.len(), 11);

        let sweep: Vec<i32> = config.localization.sweep.thresholds().collect();
        assert_eq!(sweep.last(), Some(&160));
        assert_eq!(sweep.len(), 31);
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let config: AnalysisConfig = serde_json::from_str(r#"{ "max_objects": 8 }"#)?;
        assert_eq!(config.max_objects, 8);
        assert_eq!(config.min_frames, 40);
        assert_eq!(config.classification.window_size, 20);
        Ok(())
    }
}
