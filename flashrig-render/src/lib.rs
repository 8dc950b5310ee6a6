pub mod render;

pub use render::{RenderOptions, SceneRenderer};
