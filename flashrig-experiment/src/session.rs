use crate::config::StimulationKind;
use flashrig_core::Stimulus;
use std::collections::BTreeMap;

/// Mutable bookkeeping for one session: loop indices, selection history and
/// the text shown in the status box. Owned exclusively by the sequencer.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub word: usize,
    pub letter: usize,
    pub trial: usize,
    /// Indices of every chosen stimulus, in selection order.
    pub chosen: Vec<usize>,
    pub spelled: String,
    pub tallies: BTreeMap<String, usize>,
    /// Set on selection; the status box re-renders on the next frame.
    pub dirty: bool,
}

impl SessionState {
    /// Trainer sessions start with every catalog category at zero so the
    /// status box lists them all from the first frame.
    pub fn new(categories: impl IntoIterator<Item = String>) -> Self {
        Self {
            tallies: categories.into_iter().map(|c| (c, 0)).collect(),
            ..Self::default()
        }
    }

    pub fn record_choice(&mut self, stimulus: &Stimulus, kind: StimulationKind) {
        match kind {
            StimulationKind::Speller => self.spelled.push_str(&stimulus.label),
            StimulationKind::Trainer => {
                if let Some(category) = stimulus.kind.category() {
                    *self.tallies.entry(category.to_string()).or_insert(0) += 1;
                }
            }
        }
        self.chosen.push(stimulus.index);
        self.dirty = true;
    }

    pub fn status_line(&self, kind: StimulationKind) -> String {
        match kind {
            StimulationKind::Speller => self.spelled.clone(),
            StimulationKind::Trainer => {
                let mut text = String::from("Collected items:");
                for (category, count) in &self.tallies {
                    text.push_str(&format!("\n{category} - {count}"));
                }
                text
            }
        }
    }
}
