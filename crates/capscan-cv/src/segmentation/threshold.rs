//! Binarization threshold search

use crate::detection::config::ThresholdScan;
use crate::utils::ImageUtils;
use crate::Result;
use opencv::core::Mat;

/// Outcome of comparing one threshold with its predecessor in the scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdStep {
    pub threshold: i32,
    /// `|nonZero(previous) - nonZero(current)|`
    pub delta: i64,
}

/// Picks the threshold whose binarization changes least compared with the
/// previous step of the scan.
#[derive(Debug, Clone)]
pub struct ThresholdSearch {
    scan: ThresholdScan,
}

impl ThresholdSearch {
    pub fn new(scan: ThresholdScan) -> Self {
        Self { scan }
    }

    /// Difference of the non-zero pixel counts of two binary images
    pub fn compare_images(first: &Mat, second: &Mat) -> Result<i64> {
        let a = ImageUtils::count_non_zero(first)?;
        let b = ImageUtils::count_non_zero(second)?;
        Ok((a - b).abs())
    }

    /// Deltas for every threshold after the first one (the baseline).
    pub fn scan(&self, gray: &Mat) -> Result<Vec<ThresholdStep>> {
        let mut thresholds = self.scan.thresholds();
        let Some(baseline) = thresholds.next() else {
            return Ok(Vec::new());
        };

        let mut last = ImageUtils::binarize(gray, baseline)?;
        let mut steps = Vec::new();
        for threshold in thresholds {
            let current = ImageUtils::binarize(gray, threshold)?;
            let delta = Self::compare_images(&last, &current)?;
            steps.push(ThresholdStep { threshold, delta });
            last = current;
        }
        Ok(steps)
    }

    /// Threshold with the smallest delta; the first one wins on ties.
    /// Falls back to the scan start if the scan has a single threshold.
    pub fn find_best(&self, gray: &Mat) -> Result<i32> {
        let steps = self.scan(gray)?;
        let best = Self::pick(&steps).unwrap_or(self.scan.start);
        tracing::debug!("Determined best binarization threshold: {}", best);
        Ok(best)
    }

    fn pick(steps: &[ThresholdStep]) -> Option<i32> {
        let mut best: Option<ThresholdStep> = None;
        for step in steps {
            if best.map_or(true, |b| step.delta < b.delta) {
                best = Some(*step);
            }
        }
        best.map(|b| b.threshold)
    }
}
