//! Containment relations between detected objects

use crate::object::{DetectedObject, ObjectSet};
use capscan_core::ObjectId;
use std::collections::{BTreeMap, BTreeSet};

/// Immutable view of which objects lie inside which.
///
/// Both directions keep every match. The per-object foreign id fields only
/// remember the last match seen during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationMap {
    contains: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
    contained_in: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
}

impl RelationMap {
    /// Pairwise check of every ordered pair. Flags and foreign ids on the
    /// objects are updated in place; the returned map holds all pairs.
    pub fn resolve(objects: &mut ObjectSet) -> Self {
        let mut map = Self::default();
        let slice = objects.as_mut_slice();

        for i in 0..slice.len() {
            for j in 0..slice.len() {
                if i == j || !slice[j].contains(&slice[i]) {
                    continue;
                }
                let (inner_id, outer_id) = (slice[i].id, slice[j].id);

                slice[i].is_inner_object = true;
                slice[i].outer_foreign_id = Some(outer_id);
                slice[j].is_outer_object = true;
                slice[j].inner_foreign_id = Some(inner_id);

                map.insert(outer_id, inner_id);
            }
        }

        tracing::debug!("Found {} containment relations", map.len());
        map
    }

    /// Build directly from `(outer, inner)` pairs
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ObjectId, ObjectId)>,
    {
        let mut map = Self::default();
        for (outer, inner) in pairs {
            map.insert(outer, inner);
        }
        map
    }

    fn insert(&mut self, outer: ObjectId, inner: ObjectId) {
        self.contains.entry(outer).or_default().insert(inner);
        self.contained_in.entry(inner).or_default().insert(outer);
    }

    /// Whether `inner` lies inside `outer`
    pub fn is_inside(&self, inner: ObjectId, outer: ObjectId) -> bool {
        self.contains.get(&outer).is_some_and(|set| set.contains(&inner))
    }

    /// Objects lying inside `id`
    pub fn inner_of(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.contains.get(&id).into_iter().flatten().copied()
    }

    /// Objects surrounding `id`
    pub fn outer_of(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.contained_in.get(&id).into_iter().flatten().copied()
    }

    /// Number of containment pairs
    pub fn len(&self) -> usize {
        self.contains.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.contains.is_empty()
    }

    /// All `(outer, inner)` pairs in id order
    pub fn pairs(&self) -> impl Iterator<Item = (ObjectId, ObjectId)> + '_ {
        self.contains
            .iter()
            .flat_map(|(outer, inners)| inners.iter().map(move |inner| (*outer, *inner)))
    }
}

/// Index of an object id inside a slice of objects
pub(crate) fn position_of(objects: &[DetectedObject], id: ObjectId) -> Option<usize> {
    objects.iter().position(|o| o.id == id)
}
