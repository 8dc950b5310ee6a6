use crate::app::VisualApp;
use crate::bridge::{AppEvent, AutoKeys, ChannelKeys, ChannelScene, HubMarkerSink, LogScene};
use crate::synth;
use anyhow::Result;
use flashrig_core::{FrameState, LayoutMode, SceneMode};
use flashrig_experiment::{
    build, words, FlashSequencer, KeySource, Outcome, Scene, SessionConfig,
};
use flashrig_render::{RenderOptions, SceneRenderer};
use flashrig_stream::{LocalHub, RecorderTask};
use flashrig_sync::{StartGate, StopSignal};
use flashrig_timing::HighPrecisionTimer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use winit::event_loop::EventLoop;

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(1);

pub fn render_options(config: &SessionConfig) -> RenderOptions {
    RenderOptions {
        background: config.background,
        stimulus_color: config.stimulus_color,
        fixation_color: config.fixation_color,
        dim_opacity: config.dim_opacity,
        photosensor_pos: config.photosensor_pos,
        photosensor_size: config.photosensor_size,
        status_pos: config.status_pos,
        fixation_center: config.radial.center,
        ..RenderOptions::default()
    }
}

/// One worker thread per recorded stream. Each signals `ready` once its
/// discovery phase is over, successful or not.
fn spawn_recorders(
    config: &SessionConfig,
    hub: &LocalHub,
    stop: &StopSignal,
    ready: crossbeam_channel::Sender<()>,
) -> Vec<thread::JoinHandle<()>> {
    let streams = [
        (config.eeg_stream.clone(), config.recording_file("eeg")),
        (
            config.photocell_stream.clone(),
            config.recording_file("photocell"),
        ),
        (config.marker_stream.clone(), config.recording_file("marker")),
    ];
    streams
        .into_iter()
        .map(|(stream_name, file_name)| {
            let task = RecorderTask {
                resolver: hub.clone(),
                stream_name,
                dir: config.session_dir(),
                file_name,
                max_retries: config.connect_retries,
                resolve_timeout: RESOLVE_TIMEOUT,
            };
            let stop = stop.clone();
            let ready = ready.clone();
            thread::spawn(move || {
                if let Err(e) = task.run(&stop, Some(&ready)) {
                    log::error!("{} recorder failed: {e}", task.stream_name);
                }
            })
        })
        .collect()
}

/// Open the gate once every recorder has finished discovery.
fn spawn_gate_opener(gate: Arc<StartGate>, ready: crossbeam_channel::Receiver<()>, count: usize) {
    thread::spawn(move || {
        for _ in 0..count {
            let _ = ready.recv();
        }
        log::info!("recorders up, opening the start gate");
        gate.open();
    });
}

fn build_sequencer<S: Scene, K: KeySource>(
    config: SessionConfig,
    scene: S,
    keys: K,
    sink: HubMarkerSink,
    gate: Option<Arc<StartGate>>,
) -> Result<FlashSequencer<HighPrecisionTimer, StdRng, S, K, HubMarkerSink>> {
    let mut rng = StdRng::from_os_rng();
    let (stimuli, groups) = build(&config, &mut rng)?;
    let word_pool = words::load_word_list(config.word_list_path.as_deref())?;
    let sequence =
        words::build_sequence(&word_pool, config.words_per_session, config.sequence_seed);
    words::save_sequence(&sequence, &config.aims_path())?;
    log::info!("target sequence saved to {}", config.aims_path().display());

    let sequencer = FlashSequencer::new(
        config,
        stimuli,
        groups,
        sequence,
        HighPrecisionTimer::new(),
        rng,
        scene,
        keys,
        sink,
    );
    Ok(match gate {
        Some(gate) => sequencer.with_gate(gate),
        None => sequencer,
    })
}

/// Full rig: recorder workers, the sequencer thread and the stimulation
/// window, coordinated by the one-shot gate and stop signal.
pub fn run_windowed(config: SessionConfig, synthetic: bool) -> Result<()> {
    std::fs::create_dir_all(config.session_dir())?;
    let hub = LocalHub::new();
    let stop = StopSignal::new();
    let (ready_tx, ready_rx) = crossbeam_channel::unbounded();

    let mut workers = spawn_recorders(&config, &hub, &stop, ready_tx);
    if synthetic {
        workers.push(synth::spawn_source(
            &hub,
            &config.eeg_stream,
            8,
            250.0,
            stop.clone(),
        ));
        workers.push(synth::spawn_source(
            &hub,
            &config.photocell_stream,
            1,
            60.0,
            stop.clone(),
        ));
    }

    let sink = HubMarkerSink::new(hub.create_outlet(&config.marker_stream));
    let gate = config.gated.then(|| Arc::new(StartGate::new()));
    if let Some(gate) = gate.clone() {
        spawn_gate_opener(gate, ready_rx, 3);
    }

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let proxy = event_loop.create_proxy();
    let (frame_tx, frame_rx) = crossbeam_channel::bounded(4);
    let (key_tx, key_rx) = crossbeam_channel::unbounded();

    let scene = ChannelScene::new(frame_tx, proxy);
    let keys = ChannelKeys::new(key_rx);
    let sequencer_config = config.clone();
    let sequencer_thread = thread::spawn(move || -> Result<Outcome> {
        let mut sequencer = build_sequencer(sequencer_config, scene, keys, sink, gate)?;
        Ok(sequencer.run()?)
    });

    let mut app = VisualApp::new(
        config.font_path.clone(),
        render_options(&config),
        frame_rx,
        key_tx,
    );
    event_loop.run_app(&mut app)?;
    drop(app);

    match sequencer_thread.join() {
        Ok(Ok(Outcome::Finished)) => log::info!("stimulation finished"),
        Ok(Ok(Outcome::Aborted)) => log::info!("stimulation aborted before completion"),
        Ok(Err(e)) => log::error!("stimulation failed: {e}"),
        Err(_) => log::error!("stimulation thread panicked"),
    }
    // release the recorders whatever way the visual side ended
    stop.set();
    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}

/// The same rig without a window: frames are logged and every start/resume
/// key is auto-pressed. Meant for bench checks and timing dry runs.
pub fn run_headless(config: SessionConfig, synthetic: bool) -> Result<()> {
    std::fs::create_dir_all(config.session_dir())?;
    let hub = LocalHub::new();
    let stop = StopSignal::new();
    let (ready_tx, ready_rx) = crossbeam_channel::unbounded();

    let mut workers = spawn_recorders(&config, &hub, &stop, ready_tx);
    if synthetic {
        workers.push(synth::spawn_source(
            &hub,
            &config.eeg_stream,
            8,
            250.0,
            stop.clone(),
        ));
        workers.push(synth::spawn_source(
            &hub,
            &config.photocell_stream,
            1,
            60.0,
            stop.clone(),
        ));
    }

    let sink = HubMarkerSink::new(hub.create_outlet(&config.marker_stream));
    let gate = config.gated.then(|| Arc::new(StartGate::new()));
    if let Some(gate) = gate.clone() {
        spawn_gate_opener(gate, ready_rx, 3);
    }

    let outcome = {
        let mut sequencer = build_sequencer(config, LogScene, AutoKeys, sink, gate)?;
        sequencer.run()?
    };
    log::info!("headless session ended: {outcome:?}");

    stop.set();
    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}

/// Render one basic frame of the configured environment to a PNG.
pub fn take_screenshot(config: &SessionConfig, path: &Path) -> Result<()> {
    let mut rng = StdRng::from_os_rng();
    let (stimuli, _groups) = build(config, &mut rng)?;
    let frame = FrameState {
        stimuli,
        mode: SceneMode::Basic,
        status: String::new(),
        show_fixation: config.layout == LayoutMode::Radial,
    };
    let options = render_options(config);
    let (width, height) = (options.design_size.0 as u32, options.design_size.1 as u32);
    let mut renderer = SceneRenderer::new(width, height, &config.font_path, options)?;
    renderer.screenshot(&frame, path)
}
