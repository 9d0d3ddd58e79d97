//! Geometric and colour descriptors per contour

use crate::detection::config::ShapeConfig;
use crate::object::{ColorDiff, DetectedObject};
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use capscan_core::{ObjectId, ObjectIdAllocator};
use opencv::{
    core::{Mat, Point, Point2f, Rect, RotatedRect, Vector},
    imgproc,
    prelude::*,
};

/// Spread of one colour channel over a sorted sample list.
///
/// With four or more samples the extreme minimum and maximum are dropped
/// before taking the range. Small lists follow fixed rules: one sample is
/// returned as is, two give their range, three give the middle value.
pub fn channel_diff(values: &[i32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    match sorted.len() {
        0 => f32::MAX,
        1 => sorted[0] as f32,
        2 => (sorted[1] - sorted[0]) as f32,
        3 => sorted[1] as f32,
        n => (sorted[n - 2] - sorted[1]) as f32,
    }
}

/// Colour samples collected across an object, kept per channel
#[derive(Debug, Clone, Default)]
pub struct ColorSamples {
    red: Vec<i32>,
    green: Vec<i32>,
    blue: Vec<i32>,
}

impl ColorSamples {
    pub fn push(&mut self, rgb: [u8; 3]) {
        self.red.push(rgb[0] as i32);
        self.green.push(rgb[1] as i32);
        self.blue.push(rgb[2] as i32);
    }

    pub fn len(&self) -> usize {
        self.red.len()
    }

    pub fn is_empty(&self) -> bool {
        self.red.is_empty()
    }

    pub fn diff(&self) -> ColorDiff {
        ColorDiff {
            red: channel_diff(&self.red),
            green: channel_diff(&self.green),
            blue: channel_diff(&self.blue),
        }
    }
}

/// Shorter over longer side of a rotated rectangle, in `[0, 1]`
pub fn side_ratio(rect: &RotatedRect) -> f64 {
    let long = rect.size.width.max(rect.size.height);
    let short = rect.size.width.min(rect.size.height);
    if long <= 0.0 {
        return 0.0;
    }
    (short / long) as f64
}

pub fn max_side(rect: &RotatedRect) -> f64 {
    rect.size.width.max(rect.size.height) as f64
}

/// Computes per-contour features and turns contours into objects
pub struct FeatureExtractor {
    config: ShapeConfig,
}

impl FeatureExtractor {
    pub fn new(config: ShapeConfig) -> Self {
        Self { config }
    }

    /// One object per contour, ids handed out in contour order
    pub fn extract_all(
        &self,
        roi: &Mat,
        contours: &Vector<Vector<Point>>,
        ids: &mut ObjectIdAllocator,
    ) -> Result<Vec<DetectedObject>> {
        let mut objects = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            objects.push(self.extract(roi, contour, ids.next_id())?);
        }
        Ok(objects)
    }

    pub fn extract(&self, roi: &Mat, contour: Vector<Point>, id: ObjectId) -> Result<DetectedObject> {
        let perimeter = imgproc::arc_length(&contour, true)?;
        let mut approx_polygon = Vector::<Point>::new();
        imgproc::approx_poly_dp(&contour, &mut approx_polygon, perimeter * self.config.approx_epsilon, true)
            .context("Polygon approximation failed")?;

        let mut enclosing_center = Point2f::default();
        let mut enclosing_radius = 0.0f32;
        imgproc::min_enclosing_circle(&contour, &mut enclosing_center, &mut enclosing_radius)?;

        let area = imgproc::contour_area(&contour, false)?;

        let mut convex_hull = Vector::<Point>::new();
        imgproc::convex_hull(&contour, &mut convex_hull, false, true)?;

        let bounding_box = imgproc::bounding_rect(&approx_polygon)?;
        let rotated_rect = imgproc::min_area_rect(&convex_hull)?;
        let ratio = side_ratio(&rotated_rect);

        let color_diff = self.sample_colors(roi, bounding_box)?.diff();

        let mut object = DetectedObject::new(id, bounding_box, area);
        object.contour = contour;
        object.convex_hull = convex_hull;
        object.approx_polygon = approx_polygon;
        object.rotated_rect = rotated_rect;
        object.enclosing_center = enclosing_center;
        object.enclosing_radius = enclosing_radius;
        object.is_circle = self.is_circle(ratio);
        object.is_deformed = self.is_deformed(ratio);
        object.max_side_length = max_side(&rotated_rect);
        object.color_diff = color_diff;
        Ok(object)
    }

    pub fn is_circle(&self, ratio: f64) -> bool {
        ratio >= self.config.circle_min_ratio
    }

    pub fn is_deformed(&self, ratio: f64) -> bool {
        let (min, max) = self.config.deformed_ratio;
        ratio >= min && ratio < max
    }

    /// Samples along the horizontal and the vertical middle line of the box
    pub fn sample_colors(&self, roi: &Mat, bounding_box: Rect) -> Result<ColorSamples> {
        let patch = Mat::roi(roi, bounding_box)
            .with_context(|| format!("Bounding box {:?} outside of ROI", bounding_box))?
            .try_clone()?;
        let (width, height) = (bounding_box.width, bounding_box.height);
        let per_axis = self.config.color_samples.max(1);
        let step_x = (width / per_axis).max(1);
        let step_y = (height / per_axis).max(1);

        let mut samples = ColorSamples::default();
        let mid_y = height / 2;
        for x in (0..width).step_by(step_x as usize) {
            samples.push(ImageUtils::sample_rgb(&patch, mid_y, x)?);
        }
        let mid_x = width / 2;
        for y in (0..height).step_by(step_y as usize) {
            samples.push(ImageUtils::sample_rgb(&patch, y, mid_x)?);
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Size2f, CV_8UC3};
    use opencv::prelude::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(ShapeConfig::default())
    }

    #[test]
    fn test_channel_diff_rules() {
        assert_eq!(channel_diff(&[]), f32::MAX);
        assert_eq!(channel_diff(&[42]), 42.0);
        assert_eq!(channel_diff(&[200, 50]), 150.0);
        assert_eq!(channel_diff(&[9, 1, 5]), 5.0);
        // extremes 0 and 255 are ignored
        assert_eq!(channel_diff(&[255, 10, 0, 40, 30]), 30.0);
    }

    #[test]
    fn test_shape_ratios() {
        let fx = extractor();
        assert!(fx.is_circle(0.8));
        assert!(!fx.is_deformed(0.8));
        assert!(fx.is_deformed(0.3));
        assert!(fx.is_deformed(0.79));
        assert!(!fx.is_circle(0.79));
        assert!(!fx.is_circle(0.29) && !fx.is_deformed(0.29));

        let rect = RotatedRect {
            center: Point2f::new(0.0, 0.0),
            size: Size2f::new(40.0, 80.0),
            angle: 30.0,
        };
        assert!((side_ratio(&rect) - 0.5).abs() < 1e-6);
        assert_eq!(max_side(&rect), 80.0);
    }

    #[test]
    fn test_filled_disc_features() -> Result<()> {
        let mut roi = Mat::new_rows_cols_with_default(300, 300, CV_8UC3, Scalar::all(0.0))?;
        imgproc::circle(&mut roi, Point::new(150, 150), 40, Scalar::all(255.0), -1, imgproc::LINE_8, 0)?;

        let binary = ImageUtils::binarize(&ImageUtils::to_grayscale(&roi)?, 128)?;
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(&binary, &mut contours, imgproc::RETR_LIST, imgproc::CHAIN_APPROX_SIMPLE, Point::new(0, 0))?;
        assert_eq!(contours.len(), 1);

        let mut ids = ObjectIdAllocator::new();
        let objects = extractor().extract_all(&roi, &contours, &mut ids)?;
        let disc = &objects[0];

        assert!(disc.is_circle);
        assert!(!disc.is_deformed);
        assert!((disc.max_side_length - 81.0).abs() < 3.0, "side {}", disc.max_side_length);
        assert!((disc.area - 5026.0).abs() < 250.0, "area {}", disc.area);
        assert!((disc.enclosing_radius - 40.0).abs() < 2.0);
        let center = disc.center();
        assert!((center.x - 150).abs() <= 2 && (center.y - 150).abs() <= 2);
        // a plain white disc has a uniform surface
        assert!(disc.color_diff.is_uniform(100.0));
        Ok(())
    }

    #[test]
    fn test_dotted_surface_is_not_uniform() -> Result<()> {
        let mut roi = Mat::new_rows_cols_with_default(200, 200, CV_8UC3, Scalar::all(0.0))?;
        imgproc::circle(&mut roi, Point::new(100, 100), 35, Scalar::all(255.0), -1, imgproc::LINE_8, 0)?;
        imgproc::circle(&mut roi, Point::new(100, 100), 10, Scalar::all(0.0), -1, imgproc::LINE_8, 0)?;

        let samples = extractor().sample_colors(&roi, Rect::new(65, 65, 71, 71))?;
        assert!(samples.len() >= 20);
        assert!(!samples.diff().is_uniform(100.0));
        Ok(())
    }

    #[test]
    fn test_bounding_box_ignores_small_spikes() -> Result<()> {
        let roi = Mat::new_rows_cols_with_default(300, 300, CV_8UC3, Scalar::all(0.0))?;
        // square with a 3 px spike on its bottom edge
        let contour = Vector::<Point>::from_iter([
            Point::new(100, 100),
            Point::new(200, 100),
            Point::new(200, 200),
            Point::new(152, 200),
            Point::new(150, 203),
            Point::new(148, 200),
            Point::new(100, 200),
        ]);
        let raw_box = imgproc::bounding_rect(&contour)?;
        assert_eq!(raw_box.height, 104);

        let mut ids = ObjectIdAllocator::new();
        let square = extractor().extract(&roi, contour, ids.next_id())?;

        assert_eq!(square.approx_polygon.len(), 4);
        assert_eq!(square.bounding_box, imgproc::bounding_rect(&square.approx_polygon)?);
        assert_eq!(square.bounding_box, Rect::new(100, 100, 101, 101));
        // the convex hull still sees the spike
        assert!(square.convex_hull.iter().any(|p| p.y == 203));
        Ok(())
    }

    #[test]
    fn test_elongated_shape_is_neither() -> Result<()> {
        let mut roi = Mat::new_rows_cols_with_default(300, 300, CV_8UC3, Scalar::all(0.0))?;
        imgproc::rectangle(&mut roi, Rect::new(50, 130, 150, 30), Scalar::all(255.0), -1, imgproc::LINE_8, 0)?;

        let binary = ImageUtils::binarize(&ImageUtils::to_grayscale(&roi)?, 128)?;
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(&binary, &mut contours, imgproc::RETR_LIST, imgproc::CHAIN_APPROX_SIMPLE, Point::new(0, 0))?;

        let mut ids = ObjectIdAllocator::new();
        let bar = extractor().extract(&roi, contours.get(0)?, ids.next_id())?;
        assert!(!bar.is_circle && !bar.is_deformed);
        assert!(bar.max_side_length >= 148.0);
        Ok(())
    }
}
