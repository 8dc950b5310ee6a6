use crate::stimulus::Stimulus;

/// What kind of frame the sequencer is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneMode {
    /// Everything dim, nothing special drawn.
    Basic,
    /// A flash group is bright; the photosensor patch is shown.
    Flash,
    /// The target cue is bright.
    Cue,
    /// A selected stimulus is bright.
    Choose,
    /// Pause screen.
    Pause,
}

/// A complete description of one frame, handed from the sequencer to
/// whatever presents it.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub stimuli: Vec<Stimulus>,
    pub mode: SceneMode,
    pub status: String,
    pub show_fixation: bool,
}

impl FrameState {
    pub fn highlighted(&self) -> Vec<usize> {
        self.stimuli
            .iter()
            .filter(|s| s.highlight == crate::stimulus::Highlight::Bright)
            .map(|s| s.index)
            .collect()
    }
}
