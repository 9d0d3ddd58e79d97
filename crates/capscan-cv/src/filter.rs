//! Plausibility filter and candidate capping

use crate::detection::config::FilterConfig;
use crate::object::{DetectedObject, ObjectSet};
use opencv::core::Size;

/// Reason an object was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AreaOutOfRange,
    TooLargeForRoi,
    Sliver,
    NearEdge,
}

/// Result of filtering and capping
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub objects: ObjectSet,
    pub filtered: usize,
    /// Rounds of smallest-area removal
    pub cap_iterations: usize,
}

pub struct ObjectFilter {
    config: FilterConfig,
    max_objects: usize,
}

impl ObjectFilter {
    pub fn new(config: FilterConfig, max_objects: usize) -> Self {
        Self { config, max_objects }
    }

    /// First rule the object breaks, if any
    pub fn rejection(&self, object: &DetectedObject, roi: Size) -> Option<Rejection> {
        let cfg = &self.config;
        let bb = object.bounding_box;

        if object.area < cfg.min_area || object.area > cfg.max_area {
            return Some(Rejection::AreaOutOfRange);
        }

        if bb.width as f64 > cfg.roi_relation_size * roi.width as f64
            || bb.height as f64 > cfg.roi_relation_size * roi.height as f64
        {
            return Some(Rejection::TooLargeForRoi);
        }

        // long thin stripes, typically along the ROI sides
        let thin_vertical = bb.width < cfg.sliver_min_side && bb.height >= cfg.sliver_side_factor * bb.width;
        let thin_horizontal = bb.height < cfg.sliver_min_side && bb.width >= cfg.sliver_side_factor * bb.height;
        if thin_vertical || thin_horizontal {
            return Some(Rejection::Sliver);
        }

        let margin = cfg.edge_margin;
        if bb.y < margin || bb.y > roi.height - margin || bb.x < margin || bb.x > roi.width - margin {
            return Some(Rejection::NearEdge);
        }

        None
    }

    pub fn apply(&self, objects: Vec<DetectedObject>, roi: Size) -> FilterOutcome {
        let mut filtered = 0;
        let mut kept = ObjectSet::new();
        for object in objects {
            match self.rejection(&object, roi) {
                Some(_) => filtered += 1,
                None => kept.push(object),
            }
        }
        tracing::info!("Filtered objects (based on size conditions): {}", filtered);

        let cap_iterations = self.cap(&mut kept);
        tracing::info!("Eliminated objects (because we found too many): {}", cap_iterations);

        FilterOutcome {
            objects: kept,
            filtered,
            cap_iterations,
        }
    }

    /// While too many objects remain, drop every object sharing the current
    /// minimum area. Small objects are most likely distractors.
    pub fn cap(&self, objects: &mut ObjectSet) -> usize {
        let mut iterations = 0;
        while objects.len() > self.max_objects {
            let Some(smallest) = objects.min_area() else {
                break;
            };
            objects.retain(|o| o.area != smallest);
            iterations += 1;
        }
        iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::object_at;
    use capscan_core::ObjectIdAllocator;
    use opencv::core::Rect;

    const ROI: Size = Size { width: 800, height: 600 };

    fn filter() -> ObjectFilter {
        ObjectFilter::new(FilterConfig::default(), 15)
    }

    #[test]
    fn test_rejection_rules() {
        let mut ids = ObjectIdAllocator::new();
        let f = filter();

        let fine = object_at(&mut ids, 200, 200, 70, 3800.0);
        assert_eq!(f.rejection(&fine, ROI), None);

        let tiny = object_at(&mut ids, 200, 200, 20, 400.0);
        assert_eq!(f.rejection(&tiny, ROI), Some(Rejection::AreaOutOfRange));

        let huge = object_at(&mut ids, 200, 200, 250, 40001.0);
        assert_eq!(f.rejection(&huge, ROI), Some(Rejection::AreaOutOfRange));

        let wide = DetectedObject::new(ids.next_id(), Rect::new(150, 200, 401, 60), 9000.0);
        assert_eq!(f.rejection(&wide, ROI), Some(Rejection::TooLargeForRoi));

        let sliver = DetectedObject::new(ids.next_id(), Rect::new(200, 150, 20, 120), 1500.0);
        assert_eq!(f.rejection(&sliver, ROI), Some(Rejection::Sliver));

        let stubby = DetectedObject::new(ids.next_id(), Rect::new(200, 150, 20, 119), 1500.0);
        assert_eq!(f.rejection(&stubby, ROI), None);

        let left = object_at(&mut ids, 99, 200, 70, 3800.0);
        assert_eq!(f.rejection(&left, ROI), Some(Rejection::NearEdge));

        let bottom = object_at(&mut ids, 200, 501, 70, 3800.0);
        assert_eq!(f.rejection(&bottom, ROI), Some(Rejection::NearEdge));

        // only the top left corner is checked against the far edges
        let right = object_at(&mut ids, 700, 200, 70, 3800.0);
        assert_eq!(f.rejection(&right, ROI), None);
    }

    #[test]
    fn test_apply_counts_filtered() {
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![
            object_at(&mut ids, 200, 200, 70, 3800.0),
            object_at(&mut ids, 10, 10, 70, 3800.0),
            object_at(&mut ids, 300, 300, 10, 90.0),
        ];

        let outcome = filter().apply(objects, ROI);
        assert_eq!(outcome.objects.len(), 1);
        assert_eq!(outcome.filtered, 2);
        assert_eq!(outcome.cap_iterations, 0);
    }

    #[test]
    fn test_cap_removes_all_ties_of_minimum() {
        let mut ids = ObjectIdAllocator::new();
        let mut objects = ObjectSet::new();
        for i in 0..14 {
            objects.push(object_at(&mut ids, 200, 200, 70, 2000.0 + i as f64 * 100.0));
        }
        // three objects share the smallest area
        for _ in 0..3 {
            objects.push(object_at(&mut ids, 200, 200, 30, 600.0));
        }
        assert_eq!(objects.len(), 17);

        let iterations = filter().cap(&mut objects);
        assert_eq!(iterations, 1);
        assert_eq!(objects.len(), 14);
        assert!(objects.iter().all(|o| o.area > 600.0));
    }

    #[test]
    fn test_cap_never_leaves_more_than_max() {
        let mut ids = ObjectIdAllocator::new();
        let mut objects = ObjectSet::new();
        for i in 0..25 {
            objects.push(object_at(&mut ids, 200, 200, 70, 1000.0 + i as f64));
        }

        let iterations = filter().cap(&mut objects);
        assert_eq!(iterations, 10);
        assert_eq!(objects.len(), 15);
        assert_eq!(objects.min_area(), Some(1010.0));
    }
}
