use flashrig_core::SampleRecord;
use flashrig_stream::{LocalHub, Outlet};
use flashrig_sync::StopSignal;
use flashrig_timing::{HighPrecisionTimer, Timer};
use rand::Rng;
use std::f64::consts::TAU;
use std::thread;
use std::time::Duration;

/// Publish a sine-plus-noise signal under `name` so the rig records end to
/// end with no hardware attached.
pub fn spawn_source(
    hub: &LocalHub,
    name: &str,
    channels: usize,
    rate_hz: f64,
    stop: StopSignal,
) -> thread::JoinHandle<()> {
    let outlet = hub.create_outlet(name);
    let name = name.to_string();
    thread::spawn(move || {
        let timer = HighPrecisionTimer::new();
        let mut rng = rand::rng();
        let period = Duration::from_secs_f64(1.0 / rate_hz);
        let mut t = 0.0f64;
        log::info!("synthetic {name} source at {rate_hz} Hz");
        while !stop.is_set() {
            let values: Vec<f64> = (0..channels)
                .map(|c| (TAU * 10.0 * t + c as f64).sin() * 20.0 + rng.random_range(-2.0..2.0))
                .collect();
            if outlet
                .push_sample(&SampleRecord::new(timer.wall_clock_secs(), values))
                .is_err()
            {
                break;
            }
            t += period.as_secs_f64();
            thread::sleep(period);
        }
        log::debug!("synthetic {name} source stopped");
    })
}
