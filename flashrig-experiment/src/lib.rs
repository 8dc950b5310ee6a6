pub mod builder;
pub mod config;
pub mod sequencer;
pub mod session;
pub mod words;

pub use builder::build;
pub use config::{CatalogEntry, SessionConfig, StimulationKind};
pub use sequencer::{
    FlashSequencer, Key, KeySource, MarkerSink, Outcome, Phase, Scene, SequencerError,
};
pub use session::SessionState;
