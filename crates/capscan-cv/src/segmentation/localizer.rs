//! Threshold sweep for object localization

use crate::detection::config::LocalizationConfig;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{Mat, Point, Vector},
    imgproc,
};

/// Winning segmentation of the sweep
#[derive(Debug, Clone)]
pub struct Localization {
    pub threshold: i32,
    /// Contours with a plausible area
    pub score: i64,
    /// Every contour found at the winning threshold, unfiltered
    pub contours: Vector<Vector<Point>>,
}

/// Sweeps binarization thresholds and keeps the one yielding the most
/// contours of plausible size.
pub struct ObjectLocalizer {
    config: LocalizationConfig,
}

impl ObjectLocalizer {
    pub fn new(config: LocalizationConfig) -> Self {
        Self { config }
    }

    pub fn localize(&self, roi: &Mat) -> Result<Localization> {
        let gray = ImageUtils::blurred_grayscale(roi, self.config.blur_kernel)?;

        let mut best: Option<Localization> = None;
        for threshold in self.config.sweep.thresholds() {
            let contours = self.contours_at(&gray, threshold)?;
            let score = contours.len() as i64 - self.count_implausible(&contours)? as i64;

            // Later thresholds win ties
            if best.as_ref().map_or(true, |b| score >= b.score) {
                best = Some(Localization {
                    threshold,
                    score,
                    contours,
                });
            }
        }

        let best = best.context("Localization sweep is empty")?;
        tracing::info!(
            "Found most useful objects ({}) at threshold {}",
            best.score,
            best.threshold
        );
        Ok(best)
    }

    pub fn contours_at(&self, gray: &Mat, threshold: i32) -> Result<Vector<Vector<Point>>> {
        let binary = ImageUtils::binarize(gray, threshold)?;
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &binary,
            &mut contours,
            imgproc::RETR_LIST,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .with_context(|| format!("Contour extraction at threshold {} failed", threshold))?;
        Ok(contours)
    }

    fn count_implausible(&self, contours: &Vector<Vector<Point>>) -> Result<usize> {
        let mut count = 0;
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area < self.config.min_area || area > self.config.max_area {
                count += 1;
            }
        }
        Ok(count)
    }
}
