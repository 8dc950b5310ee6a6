use flashrig_core::TargetSequence;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::fs;
use std::io;
use std::path::Path;

/// Fallback pool when no word list file is configured.
const WORDS: &[&str] = &[
    "ABOUT", "HOUSE", "WORLD", "MUSIC", "LIGHT", "WATER", "PAPER", "GREEN", "STONE", "HEART",
    "PLANT", "SOUND", "BRAIN", "CHAIR", "CLOUD", "TRAIN",
];

/// Read a whitespace-separated word list, or fall back to the built-in pool.
pub fn load_word_list(path: Option<&Path>) -> io::Result<Vec<String>> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            Ok(contents.split_whitespace().map(str::to_string).collect())
        }
        None => Ok(WORDS.iter().map(|w| w.to_string()).collect()),
    }
}

/// Randomly sample `count` distinct words into a target sequence. A seed
/// makes the draw reproducible.
pub fn build_sequence(words: &[String], count: usize, seed: Option<u64>) -> TargetSequence {
    let mut seeded;
    let mut thread;
    let rng: &mut dyn rand::RngCore = match seed {
        Some(seed) => {
            seeded = rand::rngs::StdRng::seed_from_u64(seed);
            &mut seeded
        }
        None => {
            thread = rand::rng();
            &mut thread
        }
    };
    let picked: Vec<&String> = words.choose_multiple(rng, count).collect();
    TargetSequence::from_words(&picked)
}

/// Dump the chosen sequence to the aims file for reproducibility.
pub fn save_sequence(sequence: &TargetSequence, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, sequence).map_err(io::Error::other)
}

/// Parse an aims file back into the sequence it recorded.
pub fn load_sequence(path: &Path) -> io::Result<TargetSequence> {
    let file = fs::File::open(path)?;
    serde_json::from_reader(file).map_err(io::Error::other)
}
