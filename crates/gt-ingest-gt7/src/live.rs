//! Live console session: heartbeat-gated UDP receive with in-place decipher.

use anyhow::Context;
use bytes::Bytes;
use gt_ingest_core::{config, IngestError, PacketSource, RawPacket};
use parking_lot::Mutex;
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::{
    net::UdpSocket,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn, Span};

use crate::cipher::decipher_in_place;

/// Payload that requests "A" packets.
pub const HEARTBEAT: &[u8] = b"A";
const RECV_BUF_LEN: usize = 4096;

#[derive(Clone, Debug)]
pub struct LiveConfig {
    /// Console address, or a broadcast address when the console IP is unknown
    pub host: String,
    /// Console heartbeat port
    pub send_port: u16,
    /// Local endpoint telemetry arrives on
    pub bind_addr: SocketAddr,
    pub heartbeat_interval: Duration,
    /// Read deadline, re-armed after every heartbeat
    pub read_timeout: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            host: config::DEFAULT_HOST.into(),
            send_port: config::DEFAULT_SEND_PORT,
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, config::DEFAULT_RECEIVE_PORT)),
            heartbeat_interval: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }
}

pub struct LiveSession {
    socket: Arc<UdpSocket>,
    deadline: Arc<Mutex<Instant>>,
    read_timeout: Duration,
    heartbeat: JoinHandle<()>,
    buf: Vec<u8>,
    closed: bool,
    span: Span,
}

fn setup_err(e: anyhow::Error) -> IngestError {
    IngestError::Setup(format!("{e:#}"))
}

impl LiveSession {
    /// Bind, then start heartbeating. The first heartbeat goes out immediately.
    pub async fn start(cfg: LiveConfig, span: Span) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(cfg.bind_addr)
            .await
            .with_context(|| format!("bind {}", cfg.bind_addr))
            .map_err(setup_err)?;
        socket
            .set_broadcast(true)
            .context("enable broadcast")
            .map_err(setup_err)?;
        let target = tokio::net::lookup_host((cfg.host.as_str(), cfg.send_port))
            .await
            .with_context(|| format!("resolve {}:{}", cfg.host, cfg.send_port))
            .map_err(setup_err)?
            .next()
            .ok_or_else(|| IngestError::Setup(format!("no address for {}", cfg.host)))?;

        let socket = Arc::new(socket);
        let deadline = Arc::new(Mutex::new(Instant::now() + cfg.read_timeout));
        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&socket),
            target,
            cfg.heartbeat_interval,
            cfg.read_timeout,
            Arc::clone(&deadline),
            span.clone(),
        ));
        info!(parent: &span, local = ?socket.local_addr().ok(), %target, "live session started");

        Ok(Self {
            socket,
            deadline,
            read_timeout: cfg.read_timeout,
            heartbeat,
            buf: vec![0u8; RECV_BUF_LEN],
            closed: false,
            span,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    // a lapsed deadline is re-armed instead of failing every read instantly
    fn effective_deadline(&self) -> Instant {
        let now = Instant::now();
        let stored = *self.deadline.lock();
        if stored > now {
            stored
        } else {
            now + self.read_timeout
        }
    }
}

async fn heartbeat_loop(
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    interval: Duration,
    read_timeout: Duration,
    deadline: Arc<Mutex<Instant>>,
    span: Span,
) {
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match socket.send_to(HEARTBEAT, target).await {
            Ok(_) => {
                *deadline.lock() = Instant::now() + read_timeout;
                debug!(parent: &span, %target, "heartbeat sent");
            }
            Err(e) => warn!(parent: &span, %target, error = %e, "heartbeat send failed"),
        }
    }
}

#[async_trait::async_trait]
impl PacketSource for LiveSession {
    async fn read(&mut self) -> Result<RawPacket, IngestError> {
        if self.closed {
            return Err(IngestError::Finished);
        }
        let mut deadline = self.effective_deadline();
        let len = loop {
            // a heartbeat may have moved the deadline while we waited
            match time::timeout_at(deadline, self.socket.recv_from(&mut self.buf)).await {
                Err(_) => {
                    let stored = *self.deadline.lock();
                    if stored > deadline {
                        deadline = stored;
                        continue;
                    }
                    return Err(IngestError::timed_out());
                }
                Ok(Err(e)) => return Err(IngestError::Transport(e)),
                Ok(Ok((0, _))) => {
                    return Err(IngestError::Transport(io::Error::new(io::ErrorKind::UnexpectedEof, "empty datagram")))
                }
                Ok(Ok((len, _))) => break len,
            }
        };

        let started = std::time::Instant::now();
        let mut pkt = self.buf[..len].to_vec();
        decipher_in_place(&mut pkt)?;
        Ok(RawPacket { bytes: Bytes::from(pkt), decipher_time: started.elapsed() })
    }

    async fn close(&mut self) -> Result<(), IngestError> {
        if !self.closed {
            self.heartbeat.abort();
            self.closed = true;
            debug!(parent: &self.span, "live session closed");
        }
        Ok(())
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}
