//! The six classification passes, applied in declaration order

use crate::object::DetectedObject;
use crate::relations::{position_of, RelationMap};
use crate::traits::{ClassificationPass, PassContext};
use capscan_core::{ClassificationType, ObjectId};

use ClassificationType::*;

/// Label of `id` in the snapshot, `Unknown` for ids outside the set
fn label_of(objects: &[DetectedObject], labels: &[ClassificationType], id: ObjectId) -> ClassificationType {
    position_of(objects, id).map_or(Unknown, |i| labels[i])
}

/// Labels objects whose side length falls into the window around the
/// expected size: circle, deformed or distractor.
pub struct SizeWindowPass {
    pub below: f64,
    pub above: f64,
}

impl SizeWindowPass {
    /// Inclusive side length range for a given expected size
    pub fn bounds(&self, ctx: &PassContext) -> (f64, f64) {
        let expected = ctx.expected_size as f64;
        let window = ctx.window_size as f64;
        let low = expected - self.below * window;
        let high = (expected + self.above * window) as i32 as f64;
        (low, high)
    }
}

impl ClassificationPass for SizeWindowPass {
    fn name(&self) -> &'static str {
        "size-window"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        _relations: &RelationMap,
        ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        let (low, high) = self.bounds(ctx);
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| {
                if o.max_side_length < low || o.max_side_length > high {
                    label
                } else if o.is_circle {
                    Bottlecap
                } else if o.is_deformed {
                    BottlecapDeformed
                } else {
                    Distractor
                }
            })
            .collect()
    }
}

/// Whatever stayed unknown is a distractor
pub struct UnknownToDistractorPass;

impl ClassificationPass for UnknownToDistractorPass {
    fn name(&self) -> &'static str {
        "unknown-to-distractor"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        _relations: &RelationMap,
        _ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| {
                if label == Unknown {
                    tracing::debug!("Object {} changed from UNKNOWN to DISTRACTOR", o.id);
                    Distractor
                } else {
                    label
                }
            })
            .collect()
    }
}

/// Objects lying inside a cap belong to that cap (print, rim, reflection)
pub struct InnerObjectPass;

impl ClassificationPass for InnerObjectPass {
    fn name(&self) -> &'static str {
        "inner-object"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        relations: &RelationMap,
        _ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| {
                let inside_cap = relations
                    .outer_of(o.id)
                    .any(|outer| matches!(label_of(objects, labels, outer), Bottlecap | BottlecapDeformed));
                if inside_cap { InnerObject } else { label }
            })
            .collect()
    }
}

/// Outlines surrounding a cap are shadows or rings around it
pub struct CoveringObjectPass;

impl ClassificationPass for CoveringObjectPass {
    fn name(&self) -> &'static str {
        "covering-object"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        relations: &RelationMap,
        _ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| {
                let covers_cap = relations
                    .inner_of(o.id)
                    .any(|inner| label_of(objects, labels, inner) == Bottlecap);
                if covers_cap { IgnoredObject } else { label }
            })
            .collect()
    }
}

/// A distractor inside another distractor is counted once
pub struct NestedDistractorPass;

impl ClassificationPass for NestedDistractorPass {
    fn name(&self) -> &'static str {
        "nested-distractor"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        relations: &RelationMap,
        _ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| {
                let nested = label == Distractor
                    && relations
                        .outer_of(o.id)
                        .any(|outer| label_of(objects, labels, outer) == Distractor);
                if nested { IgnoredObject } else { label }
            })
            .collect()
    }
}

/// Uniform caps show their plain back side, textured ones their print
pub struct SurfacePass {
    pub uniform_threshold: f32,
}

impl ClassificationPass for SurfacePass {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn apply(
        &self,
        objects: &[DetectedObject],
        labels: &[ClassificationType],
        _relations: &RelationMap,
        _ctx: &PassContext,
    ) -> Vec<ClassificationType> {
        objects
            .iter()
            .zip(labels)
            .map(|(o, &label)| match label {
                Bottlecap if o.color_diff.is_uniform(self.uniform_threshold) => BottlecapDown,
                Bottlecap => BottlecapUp,
                other => other,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::object_at;
    use crate::object::ColorDiff;
    use capscan_core::ObjectIdAllocator;

    const CTX: PassContext = PassContext {
        expected_size: 70,
        window_size: 20,
    };

    fn with_side(ids: &mut ObjectIdAllocator, side: i32) -> DetectedObject {
        object_at(ids, 200, 200, side, (side * side) as f64)
    }

    #[test]
    fn test_size_window_bounds_and_shapes() {
        let pass = SizeWindowPass { below: 1.0, above: 2.5 };
        assert_eq!(pass.bounds(&CTX), (50.0, 120.0));

        let mut ids = ObjectIdAllocator::new();
        let mut circle = with_side(&mut ids, 70);
        circle.is_circle = true;
        let mut deformed = with_side(&mut ids, 50);
        deformed.is_deformed = true;
        let bar = with_side(&mut ids, 120);
        let mut small_circle = with_side(&mut ids, 49);
        small_circle.is_circle = true;
        let large = with_side(&mut ids, 121);

        let objects = vec![circle, deformed, bar, small_circle, large];
        let labels = vec![Unknown; objects.len()];
        let next = pass.apply(&objects, &labels, &RelationMap::default(), &CTX);

        assert_eq!(next, vec![Bottlecap, BottlecapDeformed, Distractor, Unknown, Unknown]);
    }

    #[test]
    fn test_unknown_becomes_distractor() {
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![with_side(&mut ids, 70), with_side(&mut ids, 70)];
        let labels = vec![Unknown, Bottlecap];
        let next = UnknownToDistractorPass.apply(&objects, &labels, &RelationMap::default(), &CTX);
        assert_eq!(next, vec![Distractor, Bottlecap]);
    }

    #[test]
    fn test_inner_object_of_cap() {
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![
            with_side(&mut ids, 70),
            with_side(&mut ids, 20),
            with_side(&mut ids, 72),
            with_side(&mut ids, 22),
        ];
        let relations = RelationMap::from_pairs([(objects[0].id, objects[1].id), (objects[2].id, objects[3].id)]);
        let labels = vec![BottlecapDeformed, Distractor, Distractor, Bottlecap];

        let next = InnerObjectPass.apply(&objects, &labels, &relations, &CTX);
        assert_eq!(next, vec![BottlecapDeformed, InnerObject, Distractor, Bottlecap]);
    }

    #[test]
    fn test_object_covering_cap_is_ignored() {
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![
            with_side(&mut ids, 90),
            with_side(&mut ids, 70),
            with_side(&mut ids, 95),
            with_side(&mut ids, 70),
        ];
        let relations = RelationMap::from_pairs([(objects[0].id, objects[1].id), (objects[2].id, objects[3].id)]);
        let labels = vec![Distractor, Bottlecap, Distractor, BottlecapDeformed];

        let next = CoveringObjectPass.apply(&objects, &labels, &relations, &CTX);
        assert_eq!(next, vec![IgnoredObject, Bottlecap, Distractor, BottlecapDeformed]);
    }

    #[test]
    fn test_nested_distractor_is_ignored() {
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![
            with_side(&mut ids, 150),
            with_side(&mut ids, 40),
            with_side(&mut ids, 30),
        ];
        let relations = RelationMap::from_pairs([(objects[0].id, objects[1].id), (objects[0].id, objects[2].id)]);
        let labels = vec![Distractor, Distractor, BottlecapDeformed];

        let next = NestedDistractorPass.apply(&objects, &labels, &relations, &CTX);
        assert_eq!(next, vec![Distractor, IgnoredObject, BottlecapDeformed]);
    }

    #[test]
    fn test_surface_decides_face() {
        let mut ids = ObjectIdAllocator::new();
        let mut plain = with_side(&mut ids, 70);
        plain.color_diff = ColorDiff { red: 10.0, green: 20.0, blue: 30.0 };
        let mut printed = with_side(&mut ids, 70);
        printed.color_diff = ColorDiff { red: 10.0, green: 180.0, blue: 30.0 };
        let mut deformed = with_side(&mut ids, 70);
        deformed.color_diff = plain.color_diff;

        let objects = vec![plain, printed, deformed];
        let labels = vec![Bottlecap, Bottlecap, BottlecapDeformed];
        let pass = SurfacePass { uniform_threshold: 100.0 };

        let next = pass.apply(&objects, &labels, &RelationMap::default(), &CTX);
        assert_eq!(next, vec![BottlecapDown, BottlecapUp, BottlecapDeformed]);
    }

    #[test]
    fn test_passes_read_snapshot() {
        // A cap inside a cap inside a cap: every inner one sees its outer
        // neighbour as a cap in the snapshot, regardless of order.
        let mut ids = ObjectIdAllocator::new();
        let objects = vec![
            with_side(&mut ids, 50),
            with_side(&mut ids, 70),
            with_side(&mut ids, 90),
        ];
        let relations = RelationMap::from_pairs([
            (objects[2].id, objects[1].id),
            (objects[1].id, objects[0].id),
        ]);
        let labels = vec![Bottlecap; 3];

        let next = InnerObjectPass.apply(&objects, &labels, &relations, &CTX);
        assert_eq!(next, vec![InnerObject, InnerObject, Bottlecap]);
    }
}
