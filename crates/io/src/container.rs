//! Capture containers: back-to-back deciphered packets, each starting with
//! the packet magic. `.gtr` is the raw stream, `.gtz` the same stream gzipped
//! with session metadata in the gzip header.

use anyhow::{bail, Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression, GzBuilder};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// Literal bytes that open every stored packet.
pub const FRAME_MAGIC: [u8; 4] = [0x30, 0x53, 0x37, 0x47];
pub const GZIP_COMMENT: &str = "Gran Turismo 7 Telemetry Replay";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Raw,
    Gzip,
}

impl ContainerKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gtr") => Ok(ContainerKind::Raw),
            Some("gtz") => Ok(ContainerKind::Gzip),
            Some(ext) => bail!("unsupported container extension {ext:?}, use .gtr or .gtz"),
            None => bail!("container {} has no extension, use .gtr or .gtz", path.display()),
        }
    }
}

pub fn open_reader(path: &Path) -> Result<Box<dyn Read + Send>> {
    let kind = ContainerKind::from_path(path)?;
    let fh = File::open(path).with_context(|| format!("open container {}", path.display()))?;
    let rdr = BufReader::new(fh);
    Ok(match kind {
        ContainerKind::Raw => Box::new(rdr),
        ContainerKind::Gzip => Box::new(GzDecoder::new(rdr)),
    })
}

/// Metadata stored in the gzip header of a `.gtz` capture.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionMeta {
    pub session_id: Uuid,
    pub start_time_of_day: Duration,
    pub manufacturer: String,
    pub model: String,
    pub captured_at: OffsetDateTime,
}

impl SessionMeta {
    pub fn extra(&self) -> String {
        format!(
            "Time of day: {:?}, Manufacturer: {}, Model: {}",
            self.start_time_of_day, self.manufacturer, self.model
        )
    }

    pub fn comment(&self) -> String {
        let at = self.captured_at.format(&Rfc3339).unwrap_or_default();
        format!("{GZIP_COMMENT} (session {}, captured {at})", self.session_id.simple())
    }
}

/// Comment and extra field from a `.gtz` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMeta {
    pub comment: Option<String>,
    pub extra: Option<String>,
}

pub fn read_header_meta(path: &Path) -> Result<HeaderMeta> {
    if ContainerKind::from_path(path)? != ContainerKind::Gzip {
        return Ok(HeaderMeta::default());
    }
    let fh = File::open(path).with_context(|| format!("open container {}", path.display()))?;
    let mut dec = GzDecoder::new(BufReader::new(fh));
    // the header is parsed on the first read
    let mut probe = [0u8; 1];
    dec.read(&mut probe).context("read gzip header")?;
    let header = dec.header().context("missing gzip header")?;
    Ok(HeaderMeta {
        comment: header.comment().map(|c| String::from_utf8_lossy(c).into_owned()),
        extra: header.extra().map(|e| String::from_utf8_lossy(e).into_owned()),
    })
}

enum Sink {
    Pending(File),
    Raw(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Closed,
}

/// Writes a capture container. The gzip stream is opened lazily in
/// [`ContainerWriter::begin`] because its header carries the session metadata.
pub struct ContainerWriter {
    path: PathBuf,
    kind: ContainerKind,
    sink: Sink,
    packets: u64,
}

impl ContainerWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let kind = ContainerKind::from_path(path)?;
        let fh = File::create(path).with_context(|| format!("create container {}", path.display()))?;
        Ok(Self { path: path.to_path_buf(), kind, sink: Sink::Pending(fh), packets: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn begin(&mut self, meta: Option<&SessionMeta>) -> io::Result<()> {
        let fh = match std::mem::replace(&mut self.sink, Sink::Closed) {
            Sink::Pending(fh) => fh,
            other => {
                self.sink = other;
                return Err(io::Error::new(io::ErrorKind::Other, "container already started"));
            }
        };
        let out = BufWriter::new(fh);
        self.sink = match self.kind {
            ContainerKind::Raw => Sink::Raw(out),
            ContainerKind::Gzip => {
                let mut builder = GzBuilder::new();
                match meta {
                    Some(meta) => {
                        builder = builder.comment(meta.comment()).extra(meta.extra());
                        let mtime = meta.captured_at.unix_timestamp();
                        if let Ok(mtime) = u32::try_from(mtime) {
                            builder = builder.mtime(mtime);
                        }
                    }
                    None => builder = builder.comment(GZIP_COMMENT),
                }
                Sink::Gzip(builder.write(out, Compression::best()))
            }
        };
        Ok(())
    }

    /// Packets must already start with [`FRAME_MAGIC`].
    pub fn write_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        if matches!(self.sink, Sink::Pending(_)) {
            self.begin(None)?;
        }
        match &mut self.sink {
            Sink::Raw(w) => w.write_all(packet)?,
            Sink::Gzip(w) => w.write_all(packet)?,
            Sink::Pending(_) | Sink::Closed => {
                return Err(io::Error::new(io::ErrorKind::Other, "container closed"))
            }
        }
        self.packets += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Raw(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
            Sink::Pending(_) | Sink::Closed => Ok(()),
        }
    }

    /// Flush and write the gzip trailer.
    pub fn finish(mut self) -> io::Result<u64> {
        match std::mem::replace(&mut self.sink, Sink::Closed) {
            Sink::Raw(mut w) => w.flush()?,
            Sink::Gzip(w) => w.finish()?.flush()?,
            Sink::Pending(_) | Sink::Closed => {}
        }
        Ok(self.packets)
    }
}
