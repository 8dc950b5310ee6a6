pub mod connect;
pub mod error;
pub mod hub;
pub mod recorder;

pub use connect::connect;
pub use error::StreamError;
pub use hub::{LocalHub, LocalInlet, LocalOutlet};
pub use recorder::{record, unique_path, RecorderTask, PULL_TIMEOUT};

use flashrig_core::SampleRecord;
use std::time::Duration;

/// Producer side of a named stream.
pub trait Outlet: Send {
    fn push_sample(&self, sample: &SampleRecord) -> Result<(), StreamError>;
}

/// Consumer side of a named stream. `Ok(None)` means the pull timed out
/// with no data available, which is not an error.
pub trait Inlet: Send {
    fn pull_sample(&self, timeout: Duration) -> Result<Option<SampleRecord>, StreamError>;
}

/// Logical-name-based stream discovery with a per-attempt timeout.
pub trait Resolver {
    type Inlet: Inlet;
    fn resolve(&self, name: &str, timeout: Duration) -> Option<Self::Inlet>;
}
