//! Frame decoding and static scene selection

pub mod frames;
pub mod selector;

pub use frames::{FrameLoader, FrameSequence};
pub use selector::{StaticScene, StaticSceneSelector};
