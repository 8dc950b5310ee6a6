use crate::config::{SessionConfig, StimulationKind};
use crate::session::SessionState;
use flashrig_core::{
    FlashGroups, FrameState, Highlight, LayoutMode, Marker, SceneMode, Stimulus, Target,
    TargetSequence,
};
use flashrig_sync::StartGate;
use flashrig_timing::Timer;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Keys the sequencer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
    Other,
}

pub const ABORT_KEY: Key = Key::Char('s');
pub const PAUSE_KEY: Key = Key::Char('p');
pub const RESUME_KEY: Key = Key::Space;

/// Presents the frames the sequencer composes.
pub trait Scene {
    fn present(&mut self, frame: &FrameState) -> Result<(), SequencerError>;
    /// Close the display. Idempotent.
    fn close(&mut self);
}

/// Keyboard seam. `accept` filters which keys count; an empty filter
/// accepts any key.
pub trait KeySource {
    /// Block until an accepted key arrives; `None` once the timeout elapses.
    fn wait_key(&mut self, accept: &[Key], timeout: Option<Duration>) -> Option<Key>;
    /// Non-blocking check of pending key presses.
    fn poll_key(&mut self, accept: &[Key]) -> Option<Key>;
}

/// Outgoing marker stream. The timestamp is wall-clock epoch seconds,
/// sampled immediately before the push.
pub trait MarkerSink {
    fn push_marker(&mut self, marker: Marker, timestamp: f64) -> Result<(), SequencerError>;
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("cannot resolve target {0:?} against the stimulus table")]
    UnresolvedTarget(Target),
    #[error("marker sink failed: {0}")]
    Sink(String),
    #[error("scene failed: {0}")]
    Scene(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Locked,
    Running,
    Paused,
    Finished,
    Aborted,
}

/// How a session ended. Only `Finished` means the completion sentinel should
/// be broadcast; the launcher decides what to do after an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Aborted,
}

/// Drives one stimulation session: target cues, shuffled flash trials with a
/// synchronized marker per flash, pause/abort keys and the word/letter
/// progression.
pub struct FlashSequencer<T, R, S, K, M>
where
    T: Timer,
    R: Rng,
    S: Scene,
    K: KeySource,
    M: MarkerSink,
{
    config: SessionConfig,
    stimuli: Vec<Stimulus>,
    groups: FlashGroups,
    sequence: TargetSequence,
    names: Vec<String>,
    session: SessionState,
    status: String,
    phase: Phase,
    timer: T,
    rng: R,
    scene: S,
    keys: K,
    markers: M,
    gate: Option<Arc<StartGate>>,
}

impl<T, R, S, K, M> FlashSequencer<T, R, S, K, M>
where
    T: Timer,
    R: Rng,
    S: Scene,
    K: KeySource,
    M: MarkerSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SessionConfig,
        stimuli: Vec<Stimulus>,
        groups: FlashGroups,
        sequence: TargetSequence,
        timer: T,
        rng: R,
        scene: S,
        keys: K,
        markers: M,
    ) -> Self {
        let names = stimuli.iter().map(|s| s.label.clone()).collect();
        let session = match config.stimulation {
            StimulationKind::Trainer => {
                SessionState::new(config.image_catalog.iter().map(|e| e.category.clone()))
            }
            StimulationKind::Speller => SessionState::default(),
        };
        let status = session.status_line(config.stimulation);
        Self {
            config,
            stimuli,
            groups,
            sequence,
            names,
            session,
            status,
            phase: Phase::Idle,
            timer,
            rng,
            scene,
            keys,
            markers,
            gate: None,
        }
    }

    /// Gate the session on an external start barrier.
    pub fn with_gate(mut self, gate: Arc<StartGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }

    /// Run the whole session. Blocks until the last word finishes or the
    /// abort key is seen.
    pub fn run(&mut self) -> Result<Outcome, SequencerError> {
        if let Some(gate) = self.gate.clone() {
            self.phase = Phase::Locked;
            log::info!("visual process locked");
            gate.wait();
        }

        self.phase = Phase::Idle;
        self.present_frame(SceneMode::Basic)?;
        log::info!("waiting for a key press to start stimulation");
        self.keys.wait_key(&[], None);
        self.phase = Phase::Running;
        log::info!("visual process started");

        for word_idx in 0..self.sequence.len() {
            let word = self.sequence.words[word_idx].clone();
            self.session.word = word_idx;
            let word_started = self.timer.now();
            self.push(Marker::WordStart)?;

            for (letter_idx, target) in word.iter().enumerate() {
                self.session.letter = letter_idx;
                let index = target
                    .resolve(&self.names)
                    .ok_or_else(|| SequencerError::UnresolvedTarget(target.clone()))?;
                log::info!(
                    "target {} (letter {} of word {})",
                    self.stimuli[index].label,
                    letter_idx,
                    word_idx
                );
                self.show_target(index)?;

                for trial_idx in 0..self.config.trials_per_letter {
                    self.session.trial = trial_idx;
                    self.push(Marker::TrialStart)?;
                    let mut order = self.groups.keys();
                    order.shuffle(&mut self.rng);
                    for key in order {
                        self.flash_group(key)?;
                        if self.keys.poll_key(&[ABORT_KEY]).is_some() {
                            log::info!("stimulation aborted");
                            self.phase = Phase::Aborted;
                            self.scene.close();
                            return Ok(Outcome::Aborted);
                        }
                    }
                    self.push(Marker::TrialEnd)?;

                    if self.keys.poll_key(&[PAUSE_KEY]).is_some() {
                        self.pause()?;
                        // remind the target before flashing resumes
                        self.show_target(index)?;
                    }
                }

                self.choose(index)?;
            }

            self.push(Marker::WordEnd)?;
            log::debug!(
                "word {} took {:.3} s",
                word_idx,
                self.timer.elapsed(word_started).as_secs_f64()
            );

            if word_idx + 1 < self.sequence.len() {
                self.present_frame(SceneMode::Basic)?;
                self.keys.wait_key(&[], None);
            }
        }

        self.phase = Phase::Finished;
        self.scene.close();
        Ok(Outcome::Finished)
    }

    /// Select a stimulus: replay its cue, apply the session-kind effect and
    /// mark the status box for redraw.
    pub fn choose(&mut self, index: usize) -> Result<(), SequencerError> {
        self.show_target(index)?;

        if self.config.stimulation == StimulationKind::Trainer {
            self.stimuli[index].visible = false;
        }
        let stimulus = self.stimuli[index].clone();
        self.session.record_choice(&stimulus, self.config.stimulation);

        self.set_highlight(&[index]);
        self.present_frame(SceneMode::Choose)?;
        self.timer.sleep(self.config.cue_hold());
        self.clear_highlight();
        self.present_frame(SceneMode::Basic)?;
        Ok(())
    }

    /// Cue the target: a held frame, a few highlight cycles, a held frame.
    /// Purely visual; no markers.
    fn show_target(&mut self, index: usize) -> Result<(), SequencerError> {
        self.timer.sleep(self.config.cue_hold());
        for _ in 0..self.config.cue_repeats {
            self.set_highlight(&[index]);
            self.present_frame(SceneMode::Cue)?;
            self.timer.sleep(self.config.cue_flash());
            self.clear_highlight();
            self.present_frame(SceneMode::Basic)?;
            self.timer.sleep(self.config.cue_flash());
        }
        self.timer.sleep(self.config.cue_hold());
        Ok(())
    }

    /// One flash: bright group + photosensor patch, marker at flash onset,
    /// hold, revert, inter-stimulus interval.
    fn flash_group(&mut self, key: i32) -> Result<(), SequencerError> {
        let members: Vec<usize> = self
            .groups
            .members(key)
            .map(|m| m.to_vec())
            .unwrap_or_default();
        self.set_highlight(&members);
        self.present_frame(SceneMode::Flash)?;
        self.push(Marker::Flash(key))?;
        self.timer.sleep(self.config.flash());
        self.clear_highlight();
        self.present_frame(SceneMode::Basic)?;
        self.timer.sleep(self.config.isi());
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SequencerError> {
        self.phase = Phase::Paused;
        log::info!("pause, press space to continue");
        self.push(Marker::PauseStart)?;
        self.present_frame(SceneMode::Pause)?;
        self.keys
            .wait_key(&[RESUME_KEY], Some(self.config.pause_timeout()));
        log::info!("continue stimulation...");
        self.push(Marker::PauseEnd)?;
        self.phase = Phase::Running;
        Ok(())
    }

    fn push(&mut self, marker: Marker) -> Result<(), SequencerError> {
        let timestamp = self.timer.wall_clock_secs();
        self.markers.push_marker(marker, timestamp)
    }

    fn present_frame(&mut self, mode: SceneMode) -> Result<(), SequencerError> {
        if self.session.dirty {
            self.status = self.session.status_line(self.config.stimulation);
            self.session.dirty = false;
        }
        let frame = FrameState {
            stimuli: self.stimuli.clone(),
            mode,
            status: self.status.clone(),
            show_fixation: self.config.layout == LayoutMode::Radial,
        };
        self.scene.present(&frame)
    }

    fn set_highlight(&mut self, members: &[usize]) {
        for stimulus in &mut self.stimuli {
            stimulus.highlight = if members.contains(&stimulus.index) {
                Highlight::Bright
            } else {
                Highlight::Dim
            };
        }
    }

    fn clear_highlight(&mut self) {
        for stimulus in &mut self.stimuli {
            stimulus.highlight = Highlight::Dim;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use flashrig_core::{marker, GridGeometry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct TestTimer {
        clock: Arc<Mutex<f64>>,
    }

    impl Timer for TestTimer {
        type Timestamp = u64;
        fn now(&self) -> u64 {
            (*self.clock.lock().unwrap() * 1e9) as u64
        }
        fn elapsed(&self, ts: u64) -> Duration {
            Duration::from_nanos(self.now().saturating_sub(ts))
        }
        fn sleep(&self, d: Duration) {
            *self.clock.lock().unwrap() += d.as_secs_f64();
        }
        fn wall_clock_secs(&self) -> f64 {
            // every read advances the clock, so timestamps strictly increase
            let mut clock = self.clock.lock().unwrap();
            *clock += 1e-4;
            *clock
        }
    }

    #[derive(Default)]
    struct RecordingScene {
        frames: Arc<Mutex<Vec<SceneMode>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl Scene for RecordingScene {
        fn present(&mut self, frame: &FrameState) -> Result<(), SequencerError> {
            self.frames.lock().unwrap().push(frame.mode);
            Ok(())
        }
        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    /// Feeds one scripted answer per `poll_key` call; `wait_key` always
    /// reports an immediate space press.
    #[derive(Default)]
    struct ScriptedKeys {
        polls: VecDeque<Option<Key>>,
    }

    impl KeySource for ScriptedKeys {
        fn wait_key(&mut self, _accept: &[Key], _timeout: Option<Duration>) -> Option<Key> {
            Some(Key::Space)
        }
        fn poll_key(&mut self, accept: &[Key]) -> Option<Key> {
            match self.polls.pop_front().flatten() {
                Some(key) if accept.is_empty() || accept.contains(&key) => Some(key),
                _ => None,
            }
        }
    }

    #[derive(Clone, Default)]
    struct CollectingSink {
        pushes: Arc<Mutex<Vec<(i32, f64)>>>,
    }

    impl MarkerSink for CollectingSink {
        fn push_marker(&mut self, marker: Marker, timestamp: f64) -> Result<(), SequencerError> {
            self.pushes.lock().unwrap().push((marker.code(), timestamp));
            Ok(())
        }
    }

    fn test_config(trials: usize) -> SessionConfig {
        SessionConfig {
            layout: LayoutMode::Grid,
            grid: GridGeometry {
                rows: 2,
                cols: 2,
                ..GridGeometry::default()
            },
            stimulus_names: ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(),
            trials_per_letter: trials,
            ..SessionConfig::default()
        }
    }

    type TestSequencer =
        FlashSequencer<TestTimer, StdRng, RecordingScene, ScriptedKeys, CollectingSink>;

    #[allow(clippy::type_complexity)]
    fn make_sequencer(
        config: SessionConfig,
        sequence: TargetSequence,
        keys: ScriptedKeys,
    ) -> (
        TestSequencer,
        Arc<Mutex<Vec<(i32, f64)>>>,
        Arc<Mutex<Vec<SceneMode>>>,
        Arc<Mutex<bool>>,
    ) {
        let mut rng = StdRng::seed_from_u64(5);
        let (stimuli, groups) = builder::build(&config, &mut rng).unwrap();
        let scene = RecordingScene::default();
        let frames = Arc::clone(&scene.frames);
        let closed = Arc::clone(&scene.closed);
        let sink = CollectingSink::default();
        let pushes = Arc::clone(&sink.pushes);
        let sequencer = FlashSequencer::new(
            config,
            stimuli,
            groups,
            sequence,
            TestTimer::default(),
            rng,
            scene,
            keys,
            sink,
        );
        (sequencer, pushes, frames, closed)
    }

    #[test]
    fn single_letter_session_emits_the_expected_bracket() {
        let config = test_config(1);
        let sequence = TargetSequence {
            words: vec![vec![Target::Name("a".into())]],
        };
        let (mut sequencer, pushes, frames, closed) =
            make_sequencer(config, sequence, ScriptedKeys::default());

        assert_eq!(sequencer.run().unwrap(), Outcome::Finished);
        assert_eq!(sequencer.phase(), Phase::Finished);
        assert!(*closed.lock().unwrap());

        let pushes = pushes.lock().unwrap();
        let codes: Vec<i32> = pushes.iter().map(|(c, _)| *c).collect();
        // word-start, trial-start, 4 flashes, trial-end, word-end
        assert_eq!(codes.len(), 8);
        assert_eq!(codes[0], marker::WORD_START);
        assert_eq!(codes[1], marker::TRIAL_START);
        let mut flashes = codes[2..6].to_vec();
        flashes.sort();
        assert_eq!(flashes, vec![0, 1, 2, 3]);
        assert_eq!(codes[6], marker::TRIAL_END);
        assert_eq!(codes[7], marker::WORD_END);

        // the cue emits frames but never markers
        let cue_frames = frames
            .lock()
            .unwrap()
            .iter()
            .filter(|m| **m == SceneMode::Cue)
            .count();
        assert_eq!(cue_frames, 10); // 5 cue cycles + 5 more from choose()

        let timestamps: Vec<f64> = pushes.iter().map(|(_, t)| *t).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_trial_flashes_each_group_exactly_once() {
        let config = test_config(4);
        let sequence = TargetSequence {
            words: vec![vec![Target::Index(2)]],
        };
        let (mut sequencer, pushes, _, _) =
            make_sequencer(config, sequence, ScriptedKeys::default());
        sequencer.run().unwrap();

        let pushes = pushes.lock().unwrap();
        let mut trials: Vec<Vec<i32>> = Vec::new();
        let mut current: Option<Vec<i32>> = None;
        for (code, _) in pushes.iter() {
            match *code {
                marker::TRIAL_START => current = Some(Vec::new()),
                marker::TRIAL_END => trials.push(current.take().unwrap()),
                code if code < marker::WORD_START => {
                    if let Some(current) = current.as_mut() {
                        current.push(code);
                    }
                }
                _ => {}
            }
        }

        assert_eq!(trials.len(), 4);
        for trial in &trials {
            let mut sorted = trial.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn abort_key_stops_marker_emission_immediately() {
        let config = test_config(3);
        let sequence = TargetSequence {
            words: vec![vec![Target::Index(0)]],
        };
        let keys = ScriptedKeys {
            polls: VecDeque::from(vec![None, Some(ABORT_KEY)]),
        };
        let (mut sequencer, pushes, _, closed) = make_sequencer(config, sequence, keys);

        assert_eq!(sequencer.run().unwrap(), Outcome::Aborted);
        assert_eq!(sequencer.phase(), Phase::Aborted);
        assert!(*closed.lock().unwrap());

        let codes: Vec<i32> = pushes.lock().unwrap().iter().map(|(c, _)| *c).collect();
        // word-start, trial-start, then exactly the two flashes seen before
        // the abort was detected
        assert_eq!(codes.len(), 4);
        assert_eq!(codes[0], marker::WORD_START);
        assert_eq!(codes[1], marker::TRIAL_START);
        assert!(codes[2] < marker::WORD_START);
        assert!(codes[3] < marker::WORD_START);
    }

    #[test]
    fn pause_key_brackets_a_pause_between_trials() {
        let config = test_config(2);
        let sequence = TargetSequence {
            words: vec![vec![Target::Index(1)]],
        };
        let keys = ScriptedKeys {
            // four abort polls during trial one, then the pause poll
            polls: VecDeque::from(vec![None, None, None, None, Some(PAUSE_KEY)]),
        };
        let (mut sequencer, pushes, _, _) = make_sequencer(config, sequence, keys);

        assert_eq!(sequencer.run().unwrap(), Outcome::Finished);

        let codes: Vec<i32> = pushes.lock().unwrap().iter().map(|(c, _)| *c).collect();
        let first_end = codes
            .iter()
            .position(|&c| c == marker::TRIAL_END)
            .unwrap();
        assert_eq!(codes[first_end + 1], marker::PAUSE_START);
        assert_eq!(codes[first_end + 2], marker::PAUSE_END);
        assert_eq!(codes[first_end + 3], marker::TRIAL_START);
    }

    #[test]
    fn gated_session_waits_for_the_start_gate() {
        let config = test_config(1);
        let sequence = TargetSequence {
            words: vec![vec![Target::Index(0)]],
        };
        let (sequencer, pushes, _, _) =
            make_sequencer(config, sequence, ScriptedKeys::default());
        let gate = Arc::new(StartGate::new());
        let mut sequencer = sequencer.with_gate(Arc::clone(&gate));

        let handle = std::thread::spawn(move || sequencer.run().unwrap());
        std::thread::sleep(Duration::from_millis(30));
        assert!(pushes.lock().unwrap().is_empty());
        gate.open();
        assert_eq!(handle.join().unwrap(), Outcome::Finished);
        assert!(!pushes.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_target_name_is_a_fatal_error() {
        let config = test_config(1);
        let sequence = TargetSequence {
            words: vec![vec![Target::Name("z".into())]],
        };
        let (mut sequencer, _, _, _) = make_sequencer(config, sequence, ScriptedKeys::default());

        assert!(matches!(
            sequencer.run(),
            Err(SequencerError::UnresolvedTarget(_))
        ));
    }

    #[test]
    fn completed_letters_are_spelled_into_the_session() {
        let config = test_config(1);
        let sequence = TargetSequence {
            words: vec![vec![Target::Name("b".into()), Target::Name("a".into())]],
        };
        let (mut sequencer, _, _, _) = make_sequencer(config, sequence, ScriptedKeys::default());
        sequencer.run().unwrap();

        assert_eq!(sequencer.session().spelled, "BA");
        assert_eq!(sequencer.session().chosen, vec![1, 0]);
    }
}
