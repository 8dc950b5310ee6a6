use crossbeam_channel::{Receiver, Sender};
use flashrig_core::{FrameState, Marker, SampleRecord};
use flashrig_experiment::{Key, KeySource, MarkerSink, Scene, SequencerError};
use flashrig_stream::{LocalOutlet, Outlet};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use winit::event_loop::EventLoopProxy;
use winit::keyboard::KeyCode;

/// Wakeups sent from the sequencer thread into the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// A new frame is waiting on the channel.
    Frame,
    /// The sequencer closed the display.
    Closed,
}

pub fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Space => Key::Space,
        KeyCode::KeyS => Key::Char('s'),
        KeyCode::KeyP => Key::Char('p'),
        _ => Key::Other,
    }
}

/// Scene seam bridging the sequencer thread to the winit event loop.
pub struct ChannelScene {
    frames: Sender<FrameState>,
    proxy: EventLoopProxy<AppEvent>,
    closed: bool,
}

impl ChannelScene {
    pub fn new(frames: Sender<FrameState>, proxy: EventLoopProxy<AppEvent>) -> Self {
        Self {
            frames,
            proxy,
            closed: false,
        }
    }
}

impl Scene for ChannelScene {
    fn present(&mut self, frame: &FrameState) -> Result<(), SequencerError> {
        self.frames
            .send(frame.clone())
            .map_err(|_| SequencerError::Scene("display closed".into()))?;
        let _ = self.proxy.send_event(AppEvent::Frame);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.proxy.send_event(AppEvent::Closed);
        }
    }
}

/// Key seam: buffers presses forwarded by the window so a filtered poll
/// never swallows keys a later check is waiting for.
pub struct ChannelKeys {
    rx: Receiver<Key>,
    pending: VecDeque<Key>,
}

impl ChannelKeys {
    pub fn new(rx: Receiver<Key>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
        }
    }

    fn take_pending(&mut self, accept: &[Key]) -> Option<Key> {
        if accept.is_empty() {
            return self.pending.pop_front();
        }
        let i = self.pending.iter().position(|k| accept.contains(k))?;
        self.pending.remove(i)
    }
}

impl KeySource for ChannelKeys {
    fn wait_key(&mut self, accept: &[Key], timeout: Option<Duration>) -> Option<Key> {
        if let Some(key) = self.poll_key(accept) {
            return Some(key);
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let received = match deadline {
                Some(deadline) => self.rx.recv_deadline(deadline),
                None => self
                    .rx
                    .recv()
                    .map_err(|_| crossbeam_channel::RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(key) => {
                    if accept.is_empty() || accept.contains(&key) {
                        return Some(key);
                    }
                    self.pending.push_back(key);
                }
                Err(_) => return None,
            }
        }
    }

    fn poll_key(&mut self, accept: &[Key]) -> Option<Key> {
        while let Ok(key) = self.rx.try_recv() {
            self.pending.push_back(key);
        }
        self.take_pending(accept)
    }
}

/// Marker seam over a hub outlet: one integer channel, explicit timestamps.
pub struct HubMarkerSink {
    outlet: LocalOutlet,
}

impl HubMarkerSink {
    pub fn new(outlet: LocalOutlet) -> Self {
        Self { outlet }
    }
}

impl MarkerSink for HubMarkerSink {
    fn push_marker(&mut self, marker: Marker, timestamp: f64) -> Result<(), SequencerError> {
        self.outlet
            .push_sample(&SampleRecord::new(timestamp, vec![marker.code() as f64]))
            .map_err(|e| SequencerError::Sink(e.to_string()))
    }
}

/// Headless stand-in: log frames instead of drawing them.
pub struct LogScene;

impl Scene for LogScene {
    fn present(&mut self, frame: &FrameState) -> Result<(), SequencerError> {
        log::debug!(
            "frame {:?}, {} highlighted",
            frame.mode,
            frame.highlighted().len()
        );
        Ok(())
    }

    fn close(&mut self) {
        log::info!("display closed");
    }
}

/// Headless stand-in: every waited key is pressed immediately, nothing is
/// ever pressed spontaneously.
pub struct AutoKeys;

impl KeySource for AutoKeys {
    fn wait_key(&mut self, accept: &[Key], _timeout: Option<Duration>) -> Option<Key> {
        Some(accept.first().copied().unwrap_or(Key::Space))
    }

    fn poll_key(&mut self, _accept: &[Key]) -> Option<Key> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn filtered_poll_keeps_unmatched_keys_pending() {
        let (tx, rx) = unbounded();
        let mut keys = ChannelKeys::new(rx);
        tx.send(Key::Char('p')).unwrap();
        tx.send(Key::Char('s')).unwrap();

        // polling for the abort key must not swallow the pause press
        assert_eq!(keys.poll_key(&[Key::Char('s')]), Some(Key::Char('s')));
        assert_eq!(keys.poll_key(&[Key::Char('p')]), Some(Key::Char('p')));
        assert_eq!(keys.poll_key(&[]), None);
    }

    #[test]
    fn wait_key_times_out_without_input() {
        let (_tx, rx) = unbounded::<Key>();
        let mut keys = ChannelKeys::new(rx);
        assert_eq!(
            keys.wait_key(&[Key::Space], Some(Duration::from_millis(10))),
            None
        );
    }

    #[test]
    fn unfiltered_wait_accepts_any_key() {
        let (tx, rx) = unbounded();
        tx.send(Key::Other).unwrap();
        let mut keys = ChannelKeys::new(rx);
        assert_eq!(keys.wait_key(&[], None), Some(Key::Other));
    }
}
