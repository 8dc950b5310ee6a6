use crate::{Resolver, StreamError};
use std::time::Duration;

/// Bounded-retry stream discovery. `max_retries` counts discovery attempts:
/// 0 fails immediately with `NotFound` without touching the resolver.
pub fn connect<R: Resolver>(
    resolver: &R,
    name: &str,
    max_retries: u32,
    per_try_timeout: Duration,
) -> Result<R::Inlet, StreamError> {
    for attempt in 0..max_retries {
        if let Some(inlet) = resolver.resolve(name, per_try_timeout) {
            log::info!("{name} found");
            return Ok(inlet);
        }
        log::debug!(
            "stream {name} not up yet (attempt {}/{})",
            attempt + 1,
            max_retries
        );
    }
    log::error!("cannot find stream: {name}");
    Err(StreamError::NotFound {
        name: name.to_string(),
        attempts: max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::LocalHub;
    use crate::Inlet;
    use flashrig_core::SampleRecord;
    use std::cell::Cell;

    struct NeverResolver {
        calls: Cell<u32>,
    }

    #[derive(Debug)]
    struct NullInlet;

    impl Inlet for NullInlet {
        fn pull_sample(
            &self,
            _timeout: Duration,
        ) -> Result<Option<SampleRecord>, StreamError> {
            Ok(None)
        }
    }

    impl Resolver for NeverResolver {
        type Inlet = NullInlet;
        fn resolve(&self, _name: &str, _timeout: Duration) -> Option<NullInlet> {
            self.calls.set(self.calls.get() + 1);
            None
        }
    }

    #[test]
    fn zero_retries_fails_without_a_discovery_attempt() {
        let resolver = NeverResolver {
            calls: Cell::new(0),
        };
        let err = connect(&resolver, "eeg", 0, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, StreamError::NotFound { attempts: 0, .. }));
        assert_eq!(resolver.calls.get(), 0);
    }

    #[test]
    fn exhausts_exactly_max_retries_attempts() {
        let resolver = NeverResolver {
            calls: Cell::new(0),
        };
        let err = connect(&resolver, "eeg", 3, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, StreamError::NotFound { attempts: 3, .. }));
        assert_eq!(resolver.calls.get(), 3);
    }

    #[test]
    fn finds_a_published_stream_on_first_attempt() {
        let hub = LocalHub::new();
        let _outlet = hub.create_outlet("photocell");
        assert!(connect(&hub, "photocell", 3, Duration::from_millis(10)).is_ok());
    }
}
