use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Discovery exhausted its retry budget. Fatal to the recorder that
    /// asked for the stream, and to it only.
    #[error("cannot find stream: {name} ({attempts} attempts)")]
    NotFound { name: String, attempts: u32 },

    /// The producer side went away; no further samples will arrive.
    #[error("stream closed: {0}")]
    Closed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
