use crate::{Inlet, Outlet, Resolver, StreamError};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use flashrig_core::SampleRecord;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// In-process stream transport: named outlets fanning out to any number of
/// inlets. Stands in for a lab streaming layer when every component runs in
/// one process.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

#[derive(Debug, Default)]
struct HubInner {
    streams: Mutex<HashMap<String, StreamEntry>>,
    appeared: Condvar,
}

#[derive(Debug, Default)]
struct StreamEntry {
    subscribers: Vec<Sender<SampleRecord>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a stream under a logical name. One outlet per name; a second
    /// call for the same name supersedes the first.
    pub fn create_outlet(&self, name: &str) -> LocalOutlet {
        let mut streams = self.inner.streams.lock().unwrap();
        streams.insert(name.to_string(), StreamEntry::default());
        self.inner.appeared.notify_all();
        log::debug!("stream {name} published");
        LocalOutlet {
            name: name.to_string(),
            hub: Arc::clone(&self.inner),
        }
    }
}

impl Resolver for LocalHub {
    type Inlet = LocalInlet;

    /// Blocks up to `timeout` for the named stream to appear.
    fn resolve(&self, name: &str, timeout: Duration) -> Option<LocalInlet> {
        let deadline = Instant::now() + timeout;
        let mut streams = self.inner.streams.lock().unwrap();
        loop {
            if let Some(entry) = streams.get_mut(name) {
                let (tx, rx) = unbounded();
                entry.subscribers.push(tx);
                return Some(LocalInlet {
                    name: name.to_string(),
                    receiver: rx,
                });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .inner
                .appeared
                .wait_timeout(streams, remaining)
                .unwrap();
            streams = guard;
        }
    }
}

/// Producer handle for one named stream on a [`LocalHub`].
#[derive(Debug)]
pub struct LocalOutlet {
    name: String,
    hub: Arc<HubInner>,
}

impl Outlet for LocalOutlet {
    fn push_sample(&self, sample: &SampleRecord) -> Result<(), StreamError> {
        let mut streams = self.hub.streams.lock().unwrap();
        let entry = streams
            .get_mut(&self.name)
            .ok_or_else(|| StreamError::Closed(self.name.clone()))?;
        entry
            .subscribers
            .retain(|tx| tx.send(sample.clone()).is_ok());
        Ok(())
    }
}

impl Drop for LocalOutlet {
    fn drop(&mut self) {
        // Dropping the entry hangs up every subscriber.
        let mut streams = self.hub.streams.lock().unwrap();
        streams.remove(&self.name);
    }
}

/// Consumer handle returned by [`LocalHub::resolve`].
#[derive(Debug)]
pub struct LocalInlet {
    name: String,
    receiver: Receiver<SampleRecord>,
}

impl Inlet for LocalInlet {
    fn pull_sample(&self, timeout: Duration) -> Result<Option<SampleRecord>, StreamError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(sample) => Ok(Some(sample)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(StreamError::Closed(self.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fan_out_reaches_every_inlet() {
        let hub = LocalHub::new();
        let outlet = hub.create_outlet("eeg");
        let a = hub.resolve("eeg", Duration::from_millis(10)).unwrap();
        let b = hub.resolve("eeg", Duration::from_millis(10)).unwrap();

        outlet
            .push_sample(&SampleRecord::new(1.0, vec![0.5]))
            .unwrap();

        for inlet in [&a, &b] {
            let sample = inlet.pull_sample(Duration::from_millis(100)).unwrap();
            assert_eq!(sample, Some(SampleRecord::new(1.0, vec![0.5])));
        }
    }

    #[test]
    fn resolve_times_out_on_missing_stream() {
        let hub = LocalHub::new();
        assert!(hub.resolve("nope", Duration::from_millis(20)).is_none());
    }

    #[test]
    fn resolve_sees_stream_published_later() {
        let hub = LocalHub::new();
        let publisher = {
            let hub = hub.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                hub.create_outlet("late")
            })
        };
        let inlet = hub.resolve("late", Duration::from_secs(2));
        assert!(inlet.is_some());
        drop(publisher.join().unwrap());
    }

    #[test]
    fn dropped_outlet_closes_inlets() {
        let hub = LocalHub::new();
        let outlet = hub.create_outlet("markers");
        let inlet = hub.resolve("markers", Duration::from_millis(10)).unwrap();
        drop(outlet);
        assert!(matches!(
            inlet.pull_sample(Duration::from_millis(100)),
            Err(StreamError::Closed(_))
        ));
    }

    #[test]
    fn pull_timeout_is_benign() {
        let hub = LocalHub::new();
        let _outlet = hub.create_outlet("quiet");
        let inlet = hub.resolve("quiet", Duration::from_millis(10)).unwrap();
        assert!(matches!(
            inlet.pull_sample(Duration::from_millis(20)),
            Ok(None)
        ));
    }
}
