//! Static scene selection by neighbouring frame comparison

use super::frames::FrameSequence;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use capscan_core::CapScanError;
use opencv::core::{self, Mat};

/// The chosen frame and its position in the sequence
#[derive(Debug)]
pub struct StaticScene {
    pub index: usize,
    pub frame: Mat,
}

/// Finds the frame least affected by motion.
///
/// Neighbouring materialized frames are compared pixel by pixel. Every index
/// that improves on the best change seen so far is recorded and the median
/// of those improving indices is chosen.
pub struct StaticSceneSelector {
    min_frames: usize,
}

impl StaticSceneSelector {
    pub fn new(min_frames: usize) -> Self {
        Self { min_frames }
    }

    /// Number of pixels that differ between two frames
    pub fn frame_change(first: &Mat, second: &Mat) -> Result<i64> {
        let a = ImageUtils::to_grayscale(first)?;
        let b = ImageUtils::to_grayscale(second)?;
        let mut diff = Mat::default();
        core::absdiff(&a, &b, &mut diff).context("Frame difference failed")?;
        ImageUtils::count_non_zero(&diff)
    }

    pub fn select(&self, mut frames: FrameSequence) -> Result<StaticScene> {
        if frames.is_empty() {
            return Err(CapScanError::validation("frame sequence is empty").into());
        }
        if frames.len() < self.min_frames {
            return Err(CapScanError::validation(format!(
                "expected at least {} frames, got {}",
                self.min_frames,
                frames.len()
            ))
            .into());
        }

        let first = frames.iter().position(Option::is_some);
        let last = frames.iter().rposition(Option::is_some);
        let (Some(first), Some(last)) = (first, last) else {
            return Err(CapScanError::validation("no frame was decoded").into());
        };

        let index = self.best_index(&frames, first, last)?;
        tracing::info!(
            "Found best static scene at idx {}. [Iterate from idx {} to {} of total {} (static scene at {:.2}%)]",
            index,
            first,
            last.saturating_sub(1),
            frames.len(),
            index as f64 * 100.0 / frames.len() as f64
        );

        // The chosen frame is moved out; every other buffer is dropped here.
        let frame = frames
            .swap_remove(index)
            .with_context(|| format!("Frame {} was not decoded", index))?;
        Ok(StaticScene { index, frame })
    }

    /// Median of the improving indices in `first..last - 1`. The last pair
    /// is never compared. Without any pair the first frame is taken.
    fn best_index(&self, frames: &FrameSequence, first: usize, last: usize) -> Result<usize> {
        let mut best_change = i64::MAX;
        let mut improving = Vec::new();

        for idx in first..last.saturating_sub(1) {
            let (Some(a), Some(b)) = (&frames[idx], &frames[idx + 1]) else {
                continue;
            };
            let change = Self::frame_change(a, b)?;
            if change < best_change {
                best_change = change;
                improving.push(idx);
            }
        }

        Ok(improving.get(improving.len() / 2).copied().unwrap_or(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Scalar, CV_8UC3};
    use opencv::imgproc;

    /// 20x30 frame whose first `lit` pixels (row-major) are white
    fn frame(lit: i32) -> Result<Mat> {
        let mut mat = Mat::new_rows_cols_with_default(20, 30, CV_8UC3, Scalar::all(0.0))?;
        let (rows, rest) = (lit / 30, lit % 30);
        let white = Scalar::all(255.0);
        if rows > 0 {
            imgproc::rectangle(&mut mat, Rect::new(0, 0, 30, rows), white, -1, imgproc::LINE_8, 0)?;
        }
        if rest > 0 {
            imgproc::rectangle(&mut mat, Rect::new(0, rows, rest, 1), white, -1, imgproc::LINE_8, 0)?;
        }
        Ok(mat)
    }

    fn sequence(lit: &[i32], offset: usize, total: usize) -> Result<FrameSequence> {
        let mut frames: FrameSequence = (0..total).map(|_| None).collect();
        for (i, &n) in lit.iter().enumerate() {
            frames[offset + i] = Some(frame(n)?);
        }
        Ok(frames)
    }

    #[test]
    fn test_median_of_improving_indices() -> Result<()> {
        // changes per pair: 50, 40, 45, 30, 30, 20, 25, 25, ...
        let mut lit = vec![0, 50, 90, 135, 165, 195, 215];
        while lit.len() < 21 {
            let next = lit[lit.len() - 1] + 25;
            lit.push(next);
        }
        let frames = sequence(&lit, 10, 40)?;

        let scene = StaticSceneSelector::new(40).select(frames)?;
        // improving indices are 10, 11, 13, 15
        assert_eq!(scene.index, 13);
        assert_eq!(ImageUtils::count_non_zero(&ImageUtils::to_grayscale(&scene.frame)?)?, 135);
        Ok(())
    }

    #[test]
    fn test_single_pair_range_takes_first() -> Result<()> {
        let frames = sequence(&[10, 20], 5, 40)?;
        let scene = StaticSceneSelector::new(40).select(frames)?;
        assert_eq!(scene.index, 5);
        Ok(())
    }

    #[test]
    fn test_frame_change() -> Result<()> {
        assert_eq!(StaticSceneSelector::frame_change(&frame(10)?, &frame(70)?)?, 60);
        assert_eq!(StaticSceneSelector::frame_change(&frame(70)?, &frame(70)?)?, 0);
        Ok(())
    }

    #[test]
    fn test_invalid_sequences() -> Result<()> {
        let selector = StaticSceneSelector::new(40);

        let empty = selector.select(Vec::new()).unwrap_err();
        assert!(matches!(empty.downcast_ref::<CapScanError>(), Some(CapScanError::Validation(_))));

        let short = selector.select(sequence(&[1, 2, 3], 0, 39)?).unwrap_err();
        assert!(matches!(short.downcast_ref::<CapScanError>(), Some(CapScanError::Validation(_))));

        let blank = selector.select((0..40).map(|_| None).collect()).unwrap_err();
        assert!(matches!(blank.downcast_ref::<CapScanError>(), Some(CapScanError::Validation(_))));
        Ok(())
    }
}
