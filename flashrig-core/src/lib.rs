pub mod group;
pub mod layout;
pub mod marker;
pub mod sample;
pub mod sequence;
pub mod stimulus;
pub mod view;

pub use group::FlashGroups;
pub use layout::{GridGeometry, LayoutMode, RadialGeometry, Ring, RingSelection};
pub use marker::Marker;
pub use sample::SampleRecord;
pub use sequence::{Target, TargetSequence};
pub use stimulus::{Highlight, Stimulus, StimulusKind};
pub use view::{FrameState, SceneMode};
