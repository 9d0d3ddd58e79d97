//! Segmentation: threshold search, region of interest and object localization

pub mod localizer;
pub mod roi;
pub mod threshold;

pub use localizer::{Localization, ObjectLocalizer};
pub use roi::{RegionOfInterest, RoiExtractor};
pub use threshold::{ThresholdSearch, ThresholdStep};
