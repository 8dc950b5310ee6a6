use serde::{Deserialize, Serialize};

/// One target letter: either a direct index into the stimulus table or a
/// name looked up case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Index(usize),
    Name(String),
}

impl Target {
    /// Deterministic resolution against the stimulus name table.
    pub fn resolve(&self, names: &[String]) -> Option<usize> {
        match self {
            Target::Index(i) => (*i < names.len()).then_some(*i),
            Target::Name(name) => names.iter().position(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

/// The ordered words (each an ordered list of targets) presented in one
/// session. Built once at session start and dumped to the aims file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetSequence {
    pub words: Vec<Vec<Target>>,
}

impl TargetSequence {
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let words = words
            .iter()
            .map(|w| {
                w.as_ref()
                    .chars()
                    .map(|c| Target::Name(c.to_string()))
                    .collect()
            })
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
