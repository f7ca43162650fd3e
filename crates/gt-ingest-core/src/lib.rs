//! Core telemetry ingestion types and traits shared by the GT packet sources

use bytes::Bytes;
use model::TelemetryFrame;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod logging;
pub mod snapshot;
pub mod source;
pub mod stats;

pub use config::{GtConfig, SourceAddr};
pub use error::{DecodeError, IngestError};
pub use snapshot::Latest;
pub use source::{PacketSource, RawPacket};
pub use stats::StatsTracker;

/// A decoded frame together with the deciphered packet it came from.
#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub frame: Arc<TelemetryFrame>,
    pub packet: Bytes,
}

pub type TelemetryTx = crossbeam_channel::Sender<TelemetrySample>;
pub type TelemetryRx = crossbeam_channel::Receiver<TelemetrySample>;

/// Trait for any ingestion loop feeding samples to consumers
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Runs until the source finishes (`Ok`) or a non-recoverable error occurs.
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError>;
}

pub fn channel() -> (TelemetryTx, TelemetryRx) {
    crossbeam_channel::unbounded()
}
