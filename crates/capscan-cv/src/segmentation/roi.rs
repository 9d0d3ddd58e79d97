//! Region of interest extraction

use super::threshold::ThresholdSearch;
use crate::detection::config::RoiConfig;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{Mat, Point, Rect, Size, Vector},
    imgproc,
    prelude::*,
};

/// Working sub-image containing all candidate objects
#[derive(Debug)]
pub struct RegionOfInterest {
    pub image: Mat,
    /// Binarized, blurred grayscale version of the full frame
    pub binary_mask: Mat,
    pub threshold: i32,
    /// Cropped area in frame coordinates
    pub region: Rect,
    /// Extraction fell back to the whole frame
    pub took_complete_image: bool,
}

/// Finds the largest closed outline in the frame and crops around it
pub struct RoiExtractor {
    config: RoiConfig,
    search: ThresholdSearch,
}

impl RoiExtractor {
    pub fn new(config: RoiConfig) -> Self {
        let search = ThresholdSearch::new(config.scan);
        Self { config, search }
    }

    pub fn extract(&self, frame: &Mat) -> Result<RegionOfInterest> {
        let gray = ImageUtils::blurred_grayscale(frame, self.config.blur_kernel)?;
        let threshold = self.search.find_best(&gray)?;
        let binary_mask = ImageUtils::binarize(&gray, threshold)?;

        let closed = self.closed_edges(&binary_mask, threshold)?;
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &closed,
            &mut contours,
            imgproc::RETR_LIST,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction for ROI failed")?;

        let frame_rect = Rect::new(0, 0, frame.cols(), frame.rows());
        let Some(largest) = Self::largest_contour(&contours)? else {
            tracing::info!("No region outline found. Took complete image");
            return Ok(RegionOfInterest {
                image: frame.try_clone()?,
                binary_mask,
                threshold,
                region: frame_rect,
                took_complete_image: true,
            });
        };

        let rect = imgproc::bounding_rect(&largest)?;
        let (mut image, mut region) = self.crop_extended(frame, rect)?;

        let (min_width, min_height) = self.config.min_size;
        let mut took_complete_image = false;
        if image.cols() < min_width || image.rows() < min_height {
            tracing::info!(
                "ROI {}x{} is too small. Took complete image",
                image.cols(),
                image.rows()
            );
            image = frame.try_clone()?;
            region = frame_rect;
            took_complete_image = true;
        }

        Ok(RegionOfInterest {
            image,
            binary_mask,
            threshold,
            region,
            took_complete_image,
        })
    }

    /// Edge map closed by repeated dilate/erode rounds
    fn closed_edges(&self, binary: &Mat, threshold: i32) -> Result<Mat> {
        let mut edges = Mat::default();
        imgproc::canny_def(binary, &mut edges, threshold as f64, threshold as f64 * 2.0)
            .context("Edge detection failed")?;

        let kernel = imgproc::get_structuring_element_def(
            imgproc::MORPH_ELLIPSE,
            Size::new(self.config.morph_kernel, self.config.morph_kernel),
        )?;
        let mut dilated = Mat::default();
        for _ in 0..self.config.morph_iterations {
            imgproc::dilate_def(&edges, &mut dilated, &kernel)?;
            imgproc::erode_def(&dilated, &mut edges, &kernel)?;
        }
        Ok(edges)
    }

    /// Contour enclosing the largest positive area; first one wins on ties
    fn largest_contour(contours: &Vector<Vector<Point>>) -> Result<Option<Vector<Point>>> {
        let mut best: Option<(f64, Vector<Point>)> = None;
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area > best.as_ref().map_or(0.0, |(a, _)| *a) {
                best = Some((area, contour));
            }
        }
        Ok(best.map(|(_, contour)| contour))
    }

    /// Crop `rect` widened by the side extension, or `rect` itself if the
    /// widened crop leaves the frame.
    fn crop_extended(&self, frame: &Mat, rect: Rect) -> Result<(Mat, Rect)> {
        let ext = self.config.side_extension;
        let larger = Rect::new(rect.x - ext, rect.y - ext, rect.width + 2 * ext, rect.height + 2 * ext);

        match Mat::roi(frame, larger) {
            Ok(view) => Ok((view.try_clone()?, larger)),
            Err(_) => {
                tracing::info!("Could not extract larger rect. Took unexpanded rectangle");
                let view = Mat::roi(frame, rect).context("Failed to crop ROI")?;
                Ok((view.try_clone()?, rect))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    fn frame_with_panel(panel: Rect) -> Result<Mat> {
        let mut frame = Mat::new_rows_cols_with_default(1080, 1920, CV_8UC3, Scalar::all(20.0))?;
        imgproc::rectangle(&mut frame, panel, Scalar::all(210.0), -1, imgproc::LINE_8, 0)?;
        Ok(frame)
    }

    #[test]
    fn test_crops_around_bright_panel() -> Result<()> {
        let frame = frame_with_panel(Rect::new(500, 200, 800, 600))?;
        let roi = RoiExtractor::new(RoiConfig::default()).extract(&frame)?;

        assert!(!roi.took_complete_image);
        assert!(roi.image.cols() < frame.cols() && roi.image.rows() < frame.rows());
        assert!((820..=860).contains(&roi.image.cols()), "width {}", roi.image.cols());
        assert!((620..=660).contains(&roi.image.rows()), "height {}", roi.image.rows());
        assert!(roi.region.x < 500 && roi.region.y < 200);
        Ok(())
    }

    #[test]
    fn test_panel_near_border_keeps_plain_rect() -> Result<()> {
        let frame = frame_with_panel(Rect::new(10, 10, 900, 700))?;
        let roi = RoiExtractor::new(RoiConfig::default()).extract(&frame)?;

        assert!(!roi.took_complete_image);
        assert!(roi.region.x >= 0 && roi.region.y >= 0);
        assert!(roi.region.x <= 10 && roi.region.y <= 10);
        assert_eq!(roi.image.cols(), roi.region.width);
        assert_eq!(roi.image.rows(), roi.region.height);
        Ok(())
    }

    #[test]
    fn test_small_region_takes_complete_image() -> Result<()> {
        let frame = frame_with_panel(Rect::new(900, 500, 120, 100))?;
        let roi = RoiExtractor::new(RoiConfig::default()).extract(&frame)?;

        assert!(roi.took_complete_image);
        assert_eq!(roi.image.size()?, frame.size()?);
        Ok(())
    }

    #[test]
    fn test_blank_frame_takes_complete_image() -> Result<()> {
        let frame = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::all(0.0))?;
        let roi = RoiExtractor::new(RoiConfig::default()).extract(&frame)?;

        assert!(roi.took_complete_image);
        assert_eq!(roi.region, Rect::new(0, 0, 640, 480));
        Ok(())
    }
}
