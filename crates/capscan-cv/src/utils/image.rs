//! Image processing utilities shared by the pipeline stages

use crate::Result;
use anyhow::{bail, Context};
use opencv::{
    core::{self, Mat, Size, Vec3b, Vec4b},
    imgcodecs::{self, IMREAD_COLOR},
    imgproc,
    prelude::*,
};
use opencv_match::prelude::*;
use std::path::Path;

/// Image utility functions on top of OpenCV and opencv-match conversions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image directly from path as OpenCV Mat (BGR)
    pub fn load_color<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let path_str = path.as_ref().to_string_lossy();

        let mat = imgcodecs::imread(&path_str, IMREAD_COLOR)
            .with_context(|| format!("Failed to load color image: {}", path_str))?;
        if mat.empty() {
            bail!("Image is empty or unreadable: {}", path_str);
        }
        Ok(mat)
    }

    /// Save Mat as image
    pub fn save_image<P: AsRef<Path>>(mat: &Mat, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();

        imgcodecs::imwrite(&path_str, mat, &core::Vector::new())
            .with_context(|| format!("Failed to save image: {}", path_str))?;

        Ok(())
    }

    /// Convert image::RgbImage to OpenCV Mat using opencv-match
    pub fn rgb_to_mat(rgb_image: &image::RgbImage) -> Result<Mat> {
        rgb_image.try_into_cv()
            .context("Failed to convert RGB image to OpenCV Mat")
    }

    /// Convert OpenCV Mat to image::RgbImage using opencv-match
    pub fn mat_to_rgb(mat: &Mat) -> Result<image::RgbImage> {
        mat.try_into_cv()
            .context("Failed to convert OpenCV Mat to RGB image")
    }

    /// Grayscale copy of a BGR, BGRA or already single-channel image
    pub fn to_grayscale(mat: &Mat) -> Result<Mat> {
        let code = match mat.channels() {
            1 => return mat.try_clone().context("Failed to copy grayscale image"),
            3 => imgproc::COLOR_BGR2GRAY,
            4 => imgproc::COLOR_BGRA2GRAY,
            n => bail!("Unsupported channel count for grayscale conversion: {}", n),
        };

        let mut gray = Mat::default();
        imgproc::cvt_color_def(mat, &mut gray, code)
            .context("Grayscale conversion failed")?;
        Ok(gray)
    }

    /// Gaussian blur with a square kernel, sigma derived from the kernel size
    pub fn blur(gray: &Mat, kernel: i32) -> Result<Mat> {
        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(gray, &mut blurred, Size::new(kernel, kernel), 0.0)
            .context("Gaussian blur failed")?;
        Ok(blurred)
    }

    /// Grayscale conversion followed by a Gaussian blur
    pub fn blurred_grayscale(mat: &Mat, kernel: i32) -> Result<Mat> {
        let gray = Self::to_grayscale(mat)?;
        Self::blur(&gray, kernel)
    }

    /// Fixed binary threshold (`> threshold` becomes 255)
    pub fn binarize(gray: &Mat, threshold: i32) -> Result<Mat> {
        let mut binary = Mat::default();
        imgproc::threshold(gray, &mut binary, threshold as f64, 255.0, imgproc::THRESH_BINARY)
            .with_context(|| format!("Thresholding at {} failed", threshold))?;
        Ok(binary)
    }

    pub fn count_non_zero(mat: &Mat) -> Result<i64> {
        let count = core::count_non_zero(mat).context("count_non_zero failed")?;
        Ok(count as i64)
    }

    /// Read one pixel as `[r, g, b]`; single-channel images repeat the value
    pub fn sample_rgb(mat: &Mat, row: i32, col: i32) -> Result<[u8; 3]> {
        match mat.channels() {
            1 => {
                let v = *mat.at_2d::<u8>(row, col)?;
                Ok([v, v, v])
            }
            3 => {
                let px = mat.at_2d::<Vec3b>(row, col)?;
                Ok([px[2], px[1], px[0]])
            }
            4 => {
                let px = mat.at_2d::<Vec4b>(row, col)?;
                Ok([px[2], px[1], px[0]])
            }
            n => bail!("Unsupported channel count for sampling: {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1, CV_8UC3};

    #[test]
    fn test_image_conversions() -> Result<()> {
        // Create a test RGB image
        let rgb_img = image::RgbImage::new(100, 100);

        // Convert to Mat and back
        let mat = ImageUtils::rgb_to_mat(&rgb_img)?;
        let rgb_back = ImageUtils::mat_to_rgb(&mat)?;

        assert_eq!(rgb_img.dimensions(), rgb_back.dimensions());
        Ok(())
    }

    #[test]
    fn test_binarize_counts() -> Result<()> {
        let mut gray = Mat::new_rows_cols_with_default(10, 10, CV_8UC1, Scalar::all(50.0))?;
        for col in 0..4 {
            *gray.at_2d_mut::<u8>(0, col)? = 200;
        }

        let binary = ImageUtils::binarize(&gray, 120)?;
        assert_eq!(ImageUtils::count_non_zero(&binary)?, 4);

        let binary = ImageUtils::binarize(&gray, 30)?;
        assert_eq!(ImageUtils::count_non_zero(&binary)?, 100);
        Ok(())
    }

    #[test]
    fn test_sample_rgb_swaps_channel_order() -> Result<()> {
        let color = Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0))?;
        assert_eq!(ImageUtils::sample_rgb(&color, 1, 2)?, [30, 20, 10]);

        let gray = ImageUtils::to_grayscale(&color)?;
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.size()?, color.size()?);
        Ok(())
    }
}
