//! Detected objects and object collections
//!
//! Core abstraction for representing candidates from contour extraction up to
//! the final classification.

use capscan_core::{ClassificationCounts, ClassificationType, ObjectId};
use opencv::core::{Point, Point2f, Rect, RotatedRect, Size2f, Vector};
use serde::{Deserialize, Serialize};

/// Per-channel spread of the colours sampled across an object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorDiff {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl ColorDiff {
    /// Every channel below `threshold`: the surface looks uniform
    pub fn is_uniform(&self, threshold: f32) -> bool {
        self.red < threshold && self.green < threshold && self.blue < threshold
    }
}

impl Default for ColorDiff {
    fn default() -> Self {
        Self {
            red: f32::MAX,
            green: f32::MAX,
            blue: f32::MAX,
        }
    }
}

/// A contour-based object candidate with its features and classification
#[derive(Debug, Clone)]
pub struct DetectedObject {
    pub id: ObjectId,
    pub contour: Vector<Point>,
    pub convex_hull: Vector<Point>,
    pub approx_polygon: Vector<Point>,
    /// Axis-aligned box of the approximated polygon
    pub bounding_box: Rect,
    /// Minimal-area rectangle around the convex hull
    pub rotated_rect: RotatedRect,
    pub enclosing_center: Point2f,
    pub enclosing_radius: f32,
    pub area: f64,
    pub is_circle: bool,
    pub is_deformed: bool,
    pub max_side_length: f64,
    pub color_diff: ColorDiff,
    pub classification: ClassificationType,
    pub is_inner_object: bool,
    pub is_outer_object: bool,
    /// Last object found inside this one
    pub inner_foreign_id: Option<ObjectId>,
    /// Last object found around this one
    pub outer_foreign_id: Option<ObjectId>,
}

impl DetectedObject {
    /// Create a bare object from its bounding box and area. Shape features
    /// default to an axis-aligned rectangle matching the box.
    pub fn new(id: ObjectId, bounding_box: Rect, area: f64) -> Self {
        let center = Point2f::new(
            bounding_box.x as f32 + bounding_box.width as f32 / 2.0,
            bounding_box.y as f32 + bounding_box.height as f32 / 2.0,
        );
        let size = Size2f::new(bounding_box.width as f32, bounding_box.height as f32);
        Self {
            id,
            contour: Vector::new(),
            convex_hull: Vector::new(),
            approx_polygon: Vector::new(),
            bounding_box,
            rotated_rect: RotatedRect {
                center,
                size,
                angle: 0.0,
            },
            enclosing_center: center,
            enclosing_radius: size.width.max(size.height) / 2.0,
            area,
            is_circle: false,
            is_deformed: false,
            max_side_length: size.width.max(size.height) as f64,
            color_diff: ColorDiff::default(),
            classification: ClassificationType::Unknown,
            is_inner_object: false,
            is_outer_object: false,
            inner_foreign_id: None,
            outer_foreign_id: None,
        }
    }

    /// Integer center of the bounding box
    pub fn center(&self) -> Point {
        Point::new(
            self.bounding_box.x + self.bounding_box.width / 2,
            self.bounding_box.y + self.bounding_box.height / 2,
        )
    }

    /// Whether `other` lies inside this object: its box center falls strictly
    /// within this box and its area is strictly smaller.
    pub fn contains(&self, other: &DetectedObject) -> bool {
        if self.id == other.id {
            return false;
        }
        let bb = self.bounding_box;
        let c = other.center();

        c.x > bb.x
            && c.x < bb.x + bb.width
            && c.y > bb.y
            && c.y < bb.y + bb.height
            && other.area < self.area
    }

    pub fn is_reported(&self) -> bool {
        self.classification.is_reported()
    }

    pub fn label(&self) -> &'static str {
        self.classification.label()
    }

    pub fn with_classification(mut self, classification: ClassificationType) -> Self {
        self.classification = classification;
        self
    }

    pub fn to_report(&self) -> ObjectReport {
        let center = self.center();
        ObjectReport {
            id: self.id,
            center_x: center.x,
            center_y: center.y,
            label: self.label().to_string(),
            classification: self.classification,
            area: self.area,
            max_side_length: self.max_side_length,
        }
    }
}

impl std::fmt::Display for DetectedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(x={}, y={}) : {}",
            self.rotated_rect.center.x as i32, self.rotated_rect.center.y as i32, self.classification
        )
    }
}

/// Serializable view of a reported object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub id: ObjectId,
    pub center_x: i32,
    pub center_y: i32,
    pub label: String,
    pub classification: ClassificationType,
    pub area: f64,
    pub max_side_length: f64,
}

/// Collection of detected objects with batch operations
#[derive(Debug, Clone, Default)]
pub struct ObjectSet {
    objects: Vec<DetectedObject>,
}

impl ObjectSet {
    /// Create new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from vector of objects
    pub fn from_vec(objects: Vec<DetectedObject>) -> Self {
        Self { objects }
    }

    pub fn push(&mut self, object: DetectedObject) {
        self.objects.push(object);
    }

    pub fn as_slice(&self) -> &[DetectedObject] {
        &self.objects
    }

    pub fn as_mut_slice(&mut self) -> &mut [DetectedObject] {
        &mut self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&DetectedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Keep objects matching the predicate, returning how many were removed
    pub fn retain<F>(&mut self, f: F) -> usize
    where
        F: FnMut(&DetectedObject) -> bool,
    {
        let before = self.objects.len();
        self.objects.retain(f);
        before - self.objects.len()
    }

    /// Smallest area in the collection
    pub fn min_area(&self) -> Option<f64> {
        self.objects
            .iter()
            .map(|o| o.area)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Objects that appear in reports (no inner or ignored objects)
    pub fn reported(&self) -> impl Iterator<Item = &DetectedObject> {
        self.objects.iter().filter(|o| o.is_reported())
    }

    pub fn reports(&self) -> Vec<ObjectReport> {
        self.reported().map(DetectedObject::to_report).collect()
    }

    pub fn classifications(&self) -> Vec<ClassificationType> {
        self.objects.iter().map(|o| o.classification).collect()
    }

    pub fn counts(&self) -> ClassificationCounts {
        ClassificationCounts::from_types(self.objects.iter().map(|o| o.classification))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectedObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DetectedObject> {
        self.objects.iter_mut()
    }
}

impl IntoIterator for ObjectSet {
    type Item = DetectedObject;
    type IntoIter = std::vec::IntoIter<DetectedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

impl<'a> IntoIterator for &'a ObjectSet {
    type Item = &'a DetectedObject;
    type IntoIter = std::slice::Iter<'a, DetectedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl FromIterator<DetectedObject> for ObjectSet {
    fn from_iter<T: IntoIterator<Item = DetectedObject>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
