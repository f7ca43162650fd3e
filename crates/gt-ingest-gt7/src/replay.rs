//! Replay of capture containers at the console's ~60 Hz send cadence.

use gt_ingest_core::{IngestError, PacketSource, RawPacket};
use iox::FRAME_MAGIC;
use std::{
    io::{self, Read},
    path::Path,
};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn, Span};

/// Console send cadence.
pub const REPLAY_INTERVAL: Duration = Duration::from_micros(16_667);
const READ_CHUNK: usize = 8192;

/// Splits a byte stream into magic-delimited packets.
///
/// A token is one magic plus everything up to the next magic, or up to end of
/// stream. Bytes ahead of the first magic are dropped, and a token that is
/// only the magic is skipped.
pub struct Framer<R> {
    rdr: R,
    buf: Vec<u8>,
    // next index to search for a magic from
    scan: usize,
    synced: bool,
    eof: bool,
}

fn find_magic(hay: &[u8]) -> Option<usize> {
    hay.windows(FRAME_MAGIC.len()).position(|w| w == FRAME_MAGIC)
}

impl<R: Read> Framer<R> {
    pub fn new(rdr: R) -> Self {
        Self { rdr, buf: Vec::with_capacity(READ_CHUNK), scan: 0, synced: false, eof: false }
    }

    fn fill(&mut self) -> io::Result<()> {
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        let n = loop {
            match self.rdr.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            }
        };
        self.buf.truncate(start + n);
        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> io::Result<Option<Vec<u8>>> {
        let m = FRAME_MAGIC.len();
        loop {
            if !self.synced {
                if let Some(at) = find_magic(&self.buf) {
                    self.buf.drain(..at);
                    self.synced = true;
                    self.scan = m;
                    continue;
                }
                if self.eof {
                    self.buf.clear();
                    return Ok(None);
                }
                // keep a possible partial magic
                let keep = self.buf.len().min(m - 1);
                self.buf.drain(..self.buf.len() - keep);
                self.fill()?;
                continue;
            }

            if let Some(rel) = find_magic(&self.buf[self.scan.min(self.buf.len())..]) {
                let end = self.scan + rel;
                let token: Vec<u8> = self.buf.drain(..end).collect();
                self.scan = m;
                if token.len() == m {
                    continue;
                }
                return Ok(Some(token));
            }
            if self.eof {
                if self.buf.len() <= m {
                    self.buf.clear();
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buf)));
            }
            // a magic may straddle the chunk boundary
            self.scan = self.buf.len().saturating_sub(m - 1).max(m);
            self.fill()?;
        }
    }
}

pub struct ReplayReader {
    framer: Framer<Box<dyn Read + Send>>,
    interval: Duration,
    last_return: Option<Instant>,
    finished: bool,
    tokens: u64,
    span: Span,
}

impl ReplayReader {
    /// Open a `.gtr` or `.gtz` container.
    pub fn open(path: &Path, span: Span) -> Result<Self, IngestError> {
        let rdr = iox::open_reader(path).map_err(|e| IngestError::Setup(format!("{e:#}")))?;
        info!(parent: &span, path = %path.display(), "replay opened");
        Ok(Self::from_reader(rdr, span))
    }

    pub fn from_reader(rdr: impl Read + Send + 'static, span: Span) -> Self {
        let rdr: Box<dyn Read + Send> = Box::new(rdr);
        Self { framer: Framer::new(rdr), interval: REPLAY_INTERVAL, last_return: None, finished: false, tokens: 0, span }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn finish(&mut self) -> IngestError {
        if !self.finished {
            self.finished = true;
            info!(parent: &self.span, packets = self.tokens, "replay finished");
        }
        IngestError::Finished
    }
}

#[async_trait::async_trait]
impl PacketSource for ReplayReader {
    async fn read(&mut self) -> Result<RawPacket, IngestError> {
        if self.finished {
            return Err(IngestError::Finished);
        }
        let token = match self.framer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => return Err(self.finish()),
            // truncated or corrupt gzip stream
            Err(e) if matches!(e.kind(), io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof) => {
                warn!(parent: &self.span, error = %e, "replay stream damaged, stopping");
                return Err(self.finish());
            }
            Err(e) => return Err(IngestError::Other(anyhow::Error::new(e).context("read replay"))),
        };

        if let Some(last) = self.last_return {
            time::sleep_until(last + self.interval).await;
        }
        self.last_return = Some(Instant::now());
        self.tokens += 1;
        Ok(RawPacket::plain(token))
    }

    async fn close(&mut self) -> Result<(), IngestError> {
        debug!(parent: &self.span, packets = self.tokens, "replay closed");
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::{Cursor, Write};

    fn token(payload: &[u8]) -> Vec<u8> {
        [&FRAME_MAGIC[..], payload].concat()
    }

    fn tokens<R: Read>(mut f: Framer<R>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(t) = f.next_token().unwrap() {
            out.push(t);
        }
        out
    }

    /// Yields one byte per read to exercise chunk boundaries.
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(1);
            self.0.read(&mut buf[..n])
        }
    }

    #[test]
    fn two_packets_two_tokens() {
        let stream = [token(b"payload-one"), token(b"payload-two")].concat();
        let got = tokens(Framer::new(Cursor::new(stream)));
        assert_eq!(got, vec![token(b"payload-one"), token(b"payload-two")]);
    }

    #[test]
    fn bare_magic_is_skipped() {
        let stream = [token(b""), token(b"x"), token(b""), token(b"")].concat();
        assert_eq!(tokens(Framer::new(Cursor::new(stream))), vec![token(b"x")]);
    }

    #[test]
    fn leading_bytes_are_dropped() {
        let stream = [b"junk0S".to_vec(), token(b"abc")].concat();
        assert_eq!(tokens(Framer::new(Cursor::new(stream))), vec![token(b"abc")]);
        assert!(tokens(Framer::new(Cursor::new(b"no magic here".to_vec()))).is_empty());
    }

    #[test]
    fn byte_at_a_time_reader() {
        let stream = [token(b"first"), token(b"second packet"), token(b"3")].concat();
        let got = tokens(Framer::new(Trickle(Cursor::new(stream))));
        assert_eq!(got, vec![token(b"first"), token(b"second packet"), token(b"3")]);
    }

    #[tokio::test]
    async fn paced_reads_then_finished() {
        let stream = [token(b"a"), token(b"b"), token(b"c")].concat();
        let mut rdr = ReplayReader::from_reader(Cursor::new(stream), Span::none())
            .with_interval(Duration::from_millis(30));
        let started = std::time::Instant::now();
        for want in [b"a", b"b", b"c"] {
            assert_eq!(rdr.read().await.unwrap().bytes.as_ref(), token(want).as_slice());
        }
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(rdr.read().await.unwrap_err().is_finished());
        assert!(rdr.read().await.unwrap_err().is_finished());
    }

    #[tokio::test]
    async fn truncated_gzip_finishes() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&[token(&[1u8; 300]), token(&[2u8; 300])].concat()).unwrap();
        let mut gz = enc.finish().unwrap();
        gz.truncate(gz.len() - 12);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.gtz");
        std::fs::write(&path, gz).unwrap();

        let mut rdr = ReplayReader::open(&path, Span::none()).unwrap().with_interval(Duration::ZERO);
        let mut n = 0;
        loop {
            match rdr.read().await {
                Ok(_) => n += 1,
                Err(e) => {
                    assert!(e.is_finished());
                    break;
                }
            }
        }
        assert!(n <= 2);
    }

    #[test]
    fn missing_container_is_setup_error() {
        let err = ReplayReader::open(Path::new("/nonexistent/run.gtz"), Span::none()).err().unwrap();
        assert!(matches!(err, IngestError::Setup(_)));
    }
}
