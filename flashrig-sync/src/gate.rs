use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// One-shot start barrier. The visual side blocks in `wait` until the
/// launcher calls `open`; used exactly once, at session start.
#[derive(Debug, Default)]
pub struct StartGate {
    opened: Mutex<bool>,
    cond: Condvar,
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let mut opened = self.opened.lock().unwrap();
        *opened = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut opened = self.opened.lock().unwrap();
        while !*opened {
            opened = self.cond.wait(opened).unwrap();
        }
    }

    /// Returns false if the gate was still closed when the timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut opened = self.opened.lock().unwrap();
        while !*opened {
            let (guard, result) = self.cond.wait_timeout(opened, timeout).unwrap();
            opened = guard;
            if result.timed_out() {
                return *opened;
            }
        }
        true
    }

    pub fn is_open(&self) -> bool {
        *self.opened.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_blocks_until_opened() {
        let gate = Arc::new(StartGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.wait();
                true
            })
        };
        assert!(!gate.is_open());
        gate.open();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn wait_timeout_reports_closed_gate() {
        let gate = StartGate::new();
        assert!(!gate.wait_timeout(Duration::from_millis(10)));
        gate.open();
        assert!(gate.wait_timeout(Duration::from_millis(10)));
    }
}
