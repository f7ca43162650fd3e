use bytes::Bytes;
use std::time::Duration;

use crate::IngestError;

/// One datagram or replay token, already deciphered.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPacket {
    pub bytes: Bytes,
    /// Time spent deciphering; zero for sources that store plaintext.
    pub decipher_time: Duration,
}

impl RawPacket {
    pub fn plain(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), decipher_time: Duration::ZERO }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Capability shared by the live and replay packet sources.
///
/// `read` returns recoverable errors (see [`IngestError::is_recoverable`]) for
/// timeouts and undecodable packets, and [`IngestError::Finished`] once a
/// finite source is exhausted.
#[async_trait::async_trait]
pub trait PacketSource: Send {
    async fn read(&mut self) -> Result<RawPacket, IngestError>;
    async fn close(&mut self) -> Result<(), IngestError>;
}

#[async_trait::async_trait]
impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    async fn read(&mut self) -> Result<RawPacket, IngestError> {
        (**self).read().await
    }

    async fn close(&mut self) -> Result<(), IngestError> {
        (**self).close().await
    }
}
