use flashrig_core::{GridGeometry, LayoutMode, RadialGeometry, RingSelection};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How a selection is translated back to the participant: spelled text or
/// per-category collection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulationKind {
    Speller,
    Trainer,
}

/// One entry of the trainer image catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub category: String,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Everything the builder, sequencer, renderer and launcher read. Loaded
/// from a JSON file with every field optional; missing fields take the
/// standard values below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Identifier naming the per-session output directory and files.
    pub session_code: String,
    pub output_dir: PathBuf,
    pub font_path: PathBuf,

    pub layout: LayoutMode,
    pub stimulation: StimulationKind,
    pub rings: RingSelection,
    /// Block at startup until the launcher opens the start gate.
    pub gated: bool,

    pub stimulus_names: Vec<String>,
    pub radial: RadialGeometry,
    pub grid: GridGeometry,
    pub image_catalog: Vec<CatalogEntry>,

    pub eeg_stream: String,
    pub photocell_stream: String,
    pub marker_stream: String,
    pub connect_retries: u32,

    pub flash_ms: u64,
    pub isi_ms: u64,
    pub trials_per_letter: usize,
    pub cue_hold_ms: u64,
    pub cue_flash_ms: u64,
    pub cue_repeats: usize,
    pub pause_timeout_ms: u64,

    pub words_per_session: usize,
    pub word_list_path: Option<PathBuf>,
    pub sequence_seed: Option<u64>,

    pub dim_opacity: f32,
    pub background: [u8; 4],
    pub stimulus_color: [u8; 4],
    pub fixation_color: [u8; 4],
    pub photosensor_pos: (f32, f32),
    pub photosensor_size: f32,
    pub status_pos: (f32, f32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_code: "session".into(),
            output_dir: PathBuf::from("data"),
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            layout: LayoutMode::Radial,
            stimulation: StimulationKind::Speller,
            rings: RingSelection::All,
            gated: false,
            stimulus_names: default_names(),
            radial: RadialGeometry::default(),
            grid: GridGeometry::default(),
            image_catalog: vec![
                CatalogEntry {
                    category: "apple".into(),
                    path: PathBuf::from("images/apple.png"),
                },
                CatalogEntry {
                    category: "tomato".into(),
                    path: PathBuf::from("images/tomato.png"),
                },
                CatalogEntry {
                    category: "grape".into(),
                    path: PathBuf::from("images/grape.png"),
                },
            ],
            eeg_stream: "eeg".into(),
            photocell_stream: "photocell".into(),
            marker_stream: "markers".into(),
            connect_retries: 3,
            flash_ms: 100,
            isi_ms: 100,
            trials_per_letter: 5,
            cue_hold_ms: 1000,
            cue_flash_ms: 100,
            cue_repeats: 5,
            pause_timeout_ms: 60_000,
            words_per_session: 4,
            word_list_path: None,
            sequence_seed: None,
            dim_opacity: 0.5,
            background: [0, 0, 0, 255],
            stimulus_color: [255, 255, 255, 255],
            fixation_color: [200, 40, 40, 255],
            photosensor_pos: (1230.0, 50.0),
            photosensor_size: 80.0,
            status_pos: (40.0, 40.0),
        }
    }
}

/// The stimulus table: the alphabet plus an underscore for word spacing,
/// filling the three 9-slot rings of the radial layout exactly.
fn default_names() -> Vec<String> {
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ_"
        .chars()
        .map(|c| c.to_string())
        .collect()
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<output_dir>/<session_code>`, the directory owning every file this
    /// session writes.
    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_code)
    }

    pub fn aims_path(&self) -> PathBuf {
        self.session_dir()
            .join(format!("{}_aims.txt", self.session_code))
    }

    pub fn recording_file(&self, tag: &str) -> String {
        format!("{}_{}.txt", self.session_code, tag)
    }

    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }

    pub fn isi(&self) -> Duration {
        Duration::from_millis(self.isi_ms)
    }

    pub fn cue_hold(&self) -> Duration {
        Duration::from_millis(self.cue_hold_ms)
    }

    pub fn cue_flash(&self) -> Duration {
        Duration::from_millis(self.cue_flash_ms)
    }

    pub fn pause_timeout(&self) -> Duration {
        Duration::from_millis(self.pause_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_the_radial_layout() {
        let config = SessionConfig::default();
        assert_eq!(config.stimulus_names.len(), config.radial.slots());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"session_code":"s01","layout":"grid"}"#).unwrap();
        assert_eq!(config.session_code, "s01");
        assert_eq!(config.layout, LayoutMode::Grid);
        assert_eq!(config.trials_per_letter, 5);
        assert_eq!(config.rings, RingSelection::All);
    }

    #[test]
    fn ring_selection_accepts_all_or_a_list() {
        let config: SessionConfig = serde_json::from_str(r#"{"rings":"all"}"#).unwrap();
        assert_eq!(config.rings, RingSelection::All);
        let config: SessionConfig =
            serde_json::from_str(r#"{"rings":["outer","inner"]}"#).unwrap();
        assert!(matches!(config.rings, RingSelection::Rings(ref r) if r.len() == 2));
    }

    #[test]
    fn session_paths_are_nested_under_the_code() {
        let config = SessionConfig {
            session_code: "s42".into(),
            output_dir: PathBuf::from("/tmp/rig"),
            ..SessionConfig::default()
        };
        assert_eq!(config.session_dir(), PathBuf::from("/tmp/rig/s42"));
        assert_eq!(config.aims_path(), PathBuf::from("/tmp/rig/s42/s42_aims.txt"));
        assert_eq!(config.recording_file("eeg"), "s42_eeg.txt");
    }
}
