use std::path::PathBuf;

/// Current highlight state of a stimulus; drives per-frame opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Dim,
    Bright,
}

/// What a stimulus displays on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum StimulusKind {
    Text,
    Image { path: PathBuf, category: String },
}

impl StimulusKind {
    pub fn category(&self) -> Option<&str> {
        match self {
            StimulusKind::Text => None,
            StimulusKind::Image { category, .. } => Some(category),
        }
    }
}

/// One on-screen target: an opaque drawable decorated with identity,
/// visibility and (in image mode) a category label. Created once at session
/// start; only `visible` and `highlight` change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    pub index: usize,
    pub label: String,
    pub kind: StimulusKind,
    pub position: (f32, f32),
    pub size: f32,
    pub visible: bool,
    pub highlight: Highlight,
}

impl Stimulus {
    pub fn text(index: usize, label: impl Into<String>, position: (f32, f32), size: f32) -> Self {
        Self {
            index,
            label: label.into(),
            kind: StimulusKind::Text,
            position,
            size,
            visible: true,
            highlight: Highlight::Dim,
        }
    }

    pub fn image(
        index: usize,
        label: impl Into<String>,
        path: PathBuf,
        category: impl Into<String>,
        position: (f32, f32),
        size: f32,
    ) -> Self {
        Self {
            index,
            label: label.into(),
            kind: StimulusKind::Image {
                path,
                category: category.into(),
            },
            position,
            size,
            visible: true,
            highlight: Highlight::Dim,
        }
    }

    /// Opacity for the current highlight state.
    pub fn opacity(&self, dim_opacity: f32) -> f32 {
        match self.highlight {
            Highlight::Bright => 1.0,
            Highlight::Dim => dim_opacity,
        }
    }
}
