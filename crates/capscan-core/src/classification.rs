//! Classification labels and aggregate counts

use serde::{Deserialize, Serialize};
use std::fmt;

pub const LABEL_FACE_DOWN: &str = "BottleCap_FaceDown";
pub const LABEL_FACE_UP: &str = "BottleCap_FaceUp";
pub const LABEL_DEFORMED: &str = "BottleCap_Deformed";
pub const LABEL_DISTRACTOR: &str = "Distractor";
pub const LABEL_UNKNOWN: &str = "Unknown";

/// Final (or intermediate) class of a detected object.
///
/// `Bottlecap` only exists between the first and the last classification
/// pass; it is always resolved into `BottlecapUp` or `BottlecapDown`.
/// `InnerObject` and `IgnoredObject` stay in memory but are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationType {
    Bottlecap,
    BottlecapUp,
    BottlecapDown,
    BottlecapDeformed,
    Distractor,
    InnerObject,
    IgnoredObject,
    #[default]
    Unknown,
}

impl ClassificationType {
    /// Label used in CSV reports and annotation files.
    pub fn label(&self) -> &'static str {
        match self {
            ClassificationType::BottlecapDown => LABEL_FACE_DOWN,
            ClassificationType::BottlecapUp => LABEL_FACE_UP,
            ClassificationType::BottlecapDeformed => LABEL_DEFORMED,
            ClassificationType::Distractor => LABEL_DISTRACTOR,
            _ => LABEL_UNKNOWN,
        }
    }

    /// Whether objects of this class show up in reports and visualizations.
    pub fn is_reported(&self) -> bool {
        !matches!(
            self,
            ClassificationType::InnerObject | ClassificationType::IgnoredObject
        )
    }
}

impl fmt::Display for ClassificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassificationType::Bottlecap => "BOTTLECAP",
            ClassificationType::BottlecapUp => "BOTTLECAP_UP",
            ClassificationType::BottlecapDown => "BOTTLECAP_DOWN",
            ClassificationType::BottlecapDeformed => "BOTTLECAP_DEFORMED",
            ClassificationType::Distractor => "DISTRACTOR",
            ClassificationType::InnerObject => "INNER_OBJECT",
            ClassificationType::IgnoredObject => "IGNORED_OBJECT",
            ClassificationType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Number of objects per reported class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub face_up: usize,
    pub face_down: usize,
    pub deformed: usize,
    pub distractor: usize,
}

impl ClassificationCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a sequence of classifications. Unreported and unresolved types
    /// are skipped.
    pub fn from_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = ClassificationType>,
    {
        let mut counts = Self::new();
        for ty in types {
            counts.add(ty);
        }
        counts
    }

    pub fn add(&mut self, ty: ClassificationType) {
        match ty {
            ClassificationType::BottlecapUp => self.face_up += 1,
            ClassificationType::BottlecapDown => self.face_down += 1,
            ClassificationType::BottlecapDeformed => self.deformed += 1,
            ClassificationType::Distractor => self.distractor += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.face_up + self.face_down + self.deformed + self.distractor
    }

    /// Annotations never label distractors, so comparisons use this total.
    pub fn total_without_distractors(&self) -> usize {
        self.face_up + self.face_down + self.deformed
    }

    /// Signed difference of cap totals (`self - other`).
    pub fn cap_difference(&self, other: &ClassificationCounts) -> i64 {
        self.total_without_distractors() as i64 - other.total_without_distractors() as i64
    }
}
