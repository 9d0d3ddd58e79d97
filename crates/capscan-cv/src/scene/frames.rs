//! Video decoding into a sparse frame sequence

use crate::Result;
use anyhow::Context;
use capscan_core::CapScanError;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;

/// One slot per decoded frame; only the middle half is materialized
pub type FrameSequence = Vec<Option<Mat>>;

pub struct FrameLoader;

impl FrameLoader {
    /// Decode every frame of a video, keeping the pixels of frames between
    /// the first and the third quarter only.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FrameSequence> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CapScanError::NotFound(path.to_path_buf()).into());
        }

        let source = path.to_string_lossy();
        let mut capture = VideoCapture::from_file(&source, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video: {:?}", path))?;
        if !capture.is_opened()? {
            return Err(CapScanError::VideoOpen(path.to_path_buf()).into());
        }

        let total = capture.get(videoio::CAP_PROP_FRAME_COUNT)? as usize;
        let (first, third) = Self::materialized_range(total);
        tracing::debug!(
            "Extracting frames {} to {} from video (total frames: {})",
            first,
            third,
            total
        );

        let mut frames = FrameSequence::with_capacity(total);
        let mut frame = Mat::default();
        let mut position = 1;
        while capture.read(&mut frame)? {
            if frame.empty() {
                break;
            }
            if Self::is_materialized(position, first, third) {
                frames.push(Some(frame.try_clone()?));
            } else {
                frames.push(None);
            }
            position += 1;
        }

        Ok(frames)
    }

    /// `(first, third)` quarter bounds for a video with `total` frames
    pub fn materialized_range(total: usize) -> (usize, usize) {
        (total / 4, (total / 4) * 3)
    }

    /// Positions count from 1
    pub fn is_materialized(position: usize, first: usize, third: usize) -> bool {
        position >= first && position <= third
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialized_range() {
        assert_eq!(FrameLoader::materialized_range(100), (25, 75));
        assert_eq!(FrameLoader::materialized_range(103), (25, 75));
        assert_eq!(FrameLoader::materialized_range(3), (0, 0));
    }

    #[test]
    fn test_materialized_positions() {
        let (first, third) = FrameLoader::materialized_range(100);
        let kept: Vec<usize> = (1..=100)
            .filter(|&p| FrameLoader::is_materialized(p, first, third))
            .collect();
        assert_eq!(kept.first(), Some(&25));
        assert_eq!(kept.last(), Some(&75));
        assert_eq!(kept.len(), 51);
    }

    #[test]
    fn test_missing_video_is_not_found() {
        let err = FrameLoader::load("does/not/exist.mp4").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CapScanError>(),
            Some(CapScanError::NotFound(_))
        ));
    }
}
