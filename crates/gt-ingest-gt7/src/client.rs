//! The ingestion loop: source → decoder → statistics → published snapshots.

use bytes::Bytes;
use gt_ingest_core::{
    GtConfig, IngestError, Latest, PacketSource, SourceAddr, StatsTracker, TelemetrySample, TelemetrySource,
    TelemetryTx,
};
use model::{Statistics, TelemetryFrame};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{debug, warn, Span};

use crate::{
    live::{LiveConfig, LiveSession},
    replay::ReplayReader,
    schema::{FrameDecoder, Gt7PacketDecoder},
};

/// Snapshots written by the ingestion task and read from anywhere.
#[derive(Default)]
pub struct ClientState {
    frame: Latest<TelemetryFrame>,
    packet: Latest<Bytes>,
    stats: Latest<Statistics>,
    finished: AtomicBool,
}

impl ClientState {
    pub fn frame(&self) -> Arc<TelemetryFrame> {
        self.frame.load()
    }

    /// Last deciphered packet, as received.
    pub fn packet(&self) -> Arc<Bytes> {
        self.packet.load()
    }

    pub fn statistics(&self) -> Arc<Statistics> {
        self.stats.load()
    }

    /// Set once a replay source is exhausted.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

pub struct GtClient {
    cfg: GtConfig,
    decoder: Arc<dyn FrameDecoder>,
    state: Arc<ClientState>,
    span: Span,
}

impl GtClient {
    pub fn new(cfg: GtConfig, span: Span) -> Self {
        Self { cfg, decoder: Arc::new(Gt7PacketDecoder), state: Arc::default(), span }
    }

    pub fn with_decoder(mut self, decoder: impl FrameDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn config(&self) -> &GtConfig {
        &self.cfg
    }

    /// Shared handle for reader threads.
    pub fn state(&self) -> Arc<ClientState> {
        Arc::clone(&self.state)
    }

    pub fn latest_frame(&self) -> Arc<TelemetryFrame> {
        self.state.frame()
    }

    pub fn latest_packet(&self) -> Arc<Bytes> {
        self.state.packet()
    }

    pub fn statistics(&self) -> Arc<Statistics> {
        self.state.statistics()
    }

    pub fn finished(&self) -> bool {
        self.state.finished()
    }

    /// Build the source named by `cfg.source`.
    pub async fn open_source(&self) -> Result<Box<dyn PacketSource>, IngestError> {
        match self.cfg.source_addr()? {
            SourceAddr::Udp { host, port } => {
                let live = LiveConfig {
                    host,
                    send_port: port,
                    bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.cfg.receive_port)),
                    heartbeat_interval: self.cfg.heartbeat_interval(),
                    read_timeout: self.cfg.read_timeout(),
                };
                Ok(Box::new(LiveSession::start(live, self.span.clone()).await?))
            }
            SourceAddr::File(path) => Ok(Box::new(ReplayReader::open(&path, self.span.clone())?)),
        }
    }

    /// Read until the source finishes or fails for good.
    pub async fn pump<S>(&self, source: &mut S, tx: &TelemetryTx) -> Result<(), IngestError>
    where
        S: PacketSource + ?Sized,
    {
        let mut stats = StatsTracker::new(self.cfg.stats_enabled, self.span.clone());
        loop {
            let raw = match source.read().await {
                Ok(raw) => raw,
                Err(e) if e.is_finished() => {
                    self.state.finished.store(true, Ordering::Release);
                    return Ok(());
                }
                Err(IngestError::Decode(e)) => {
                    debug!(parent: &self.span, error = %e, "invalid packet");
                    self.count_invalid(&mut stats);
                    continue;
                }
                Err(e) if e.is_recoverable() => {
                    warn!(parent: &self.span, error = %e, "transport error");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let started = Instant::now();
            let frame = match self.decoder.decode(&raw.bytes) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(parent: &self.span, error = %e, len = raw.len(), "undecodable frame");
                    self.count_invalid(&mut stats);
                    continue;
                }
            };
            let decode_time = raw.decipher_time + started.elapsed();

            stats.observe(frame.sequence_id, decode_time);
            let frame = Arc::new(frame);
            self.state.frame.publish(Arc::clone(&frame));
            self.state.packet.publish(raw.bytes.clone());
            if stats.enabled() {
                self.state.stats.publish(stats.snapshot());
            }
            // nobody listening is fine; snapshots are still published
            let _ = tx.send(TelemetrySample { frame, packet: raw.bytes });
        }
    }

    fn count_invalid(&self, stats: &mut StatsTracker) {
        if stats.enabled() {
            stats.record_invalid();
            self.state.stats.publish(stats.snapshot());
        }
    }
}

#[async_trait::async_trait]
impl TelemetrySource for GtClient {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError> {
        let mut source = self.open_source().await?;
        let res = self.pump(&mut source, &tx).await;
        source.close().await?;
        res
    }
}
