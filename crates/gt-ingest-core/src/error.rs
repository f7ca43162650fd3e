use std::io;

/// Failure to turn a raw datagram into a frame. Always recoverable: the
/// packet is counted as invalid and the loop moves on.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet too short: {len} < {min} bytes")]
    TooShort { len: usize, min: usize },
    #[error("invalid magic value: {0:#010x}")]
    InvalidMagic(u32),
    #[error("malformed frame: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Read timeout, empty datagram, socket hiccup.
    #[error("transport: {0}")]
    Transport(#[source] io::Error),
    /// Replay source exhausted.
    #[error("source finished")]
    Finished,
    #[error("setup: {0}")]
    Setup(String),
    #[error("config: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IngestError {
    pub fn is_finished(&self) -> bool {
        matches!(self, IngestError::Finished)
    }

    /// Transport and decode failures leave no state behind; the caller keeps reading.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::Decode(_) | IngestError::Transport(_))
    }

    pub fn timed_out() -> Self {
        IngestError::Transport(io::Error::new(io::ErrorKind::TimedOut, "no telemetry before read deadline"))
    }
}
