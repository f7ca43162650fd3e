//! Capture a live session to a `.gtr`/`.gtz` container.

use analysis::Transformer;
use anyhow::{Context, Result};
use gt_ingest_core::{TelemetryRx, TelemetrySample};
use iox::{ContainerWriter, SessionMeta, VehicleCatalog};
use model::ReplaySession;
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tracing::{info, Span};

pub mod controller;

pub use controller::{CaptureController, CaptureEvent, DEBOUNCE_FRAMES, PROGRESS_EVERY};

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSummary {
    /// `None` when the stream ended before a session started
    pub session: Option<ReplaySession>,
    pub packets_written: u64,
    /// A restart was seen, as opposed to the stream ending
    pub completed: bool,
}

fn session_meta(session: &ReplaySession, vehicle: &Transformer) -> SessionMeta {
    SessionMeta {
        session_id: session.id,
        start_time_of_day: Duration::from_millis(u64::from(session.start_time_of_day_ms)),
        manufacturer: vehicle.vehicle_manufacturer().to_string(),
        model: vehicle.vehicle_model().to_string(),
        captured_at: OffsetDateTime::now_utc(),
    }
}

/// Consume samples until the session restarts or the channel closes, writing
/// the session's packets to `writer`.
pub fn run_capture(
    rx: &TelemetryRx,
    mut writer: ContainerWriter,
    catalog: Arc<VehicleCatalog>,
    span: Span,
) -> Result<CaptureSummary> {
    let mut controller = CaptureController::new(span.clone());
    let mut transformer = Transformer::new(catalog);
    let mut completed = false;
    info!(parent: &span, path = %writer.path().display(), "waiting for session to start");

    for TelemetrySample { frame, packet } in rx.iter() {
        transformer.update(Arc::clone(&frame));
        match controller.observe(&frame) {
            CaptureEvent::Started(session) => {
                let meta = session_meta(&session, &transformer);
                info!(parent: &span, frame_len = packet.len(), extra = %meta.extra(), "session metadata");
                writer.begin(Some(&meta)).context("start container")?;
                writer.write_packet(&packet).context("write packet")?;
            }
            CaptureEvent::Captured { .. } => writer.write_packet(&packet).context("write packet")?,
            CaptureEvent::Finished(_) => {
                writer.flush().context("flush container")?;
                completed = true;
                break;
            }
            CaptureEvent::Waiting | CaptureEvent::Skipped | CaptureEvent::Duplicate => {}
        }
    }

    let packets_written = writer.finish().context("finish container")?;
    let session = controller.session().cloned();
    info!(parent: &span, packets = packets_written, completed, "capture complete");
    Ok(CaptureSummary { session, packets_written, completed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gt_ingest_core::channel;
    use iox::{read_header_meta, FRAME_MAGIC};
    use model::{TelemetryFrame, Vehicle};
    use std::io::Read;

    fn sample(seq: u32, tod: u32) -> TelemetrySample {
        let frame = TelemetryFrame { sequence_id: seq, time_of_day_ms: tod, vehicle_id: 3285, ..Default::default() };
        let mut packet = FRAME_MAGIC.to_vec();
        packet.extend(seq.to_le_bytes());
        TelemetrySample { frame: Arc::new(frame), packet: Bytes::from(packet) }
    }

    fn catalog() -> Arc<VehicleCatalog> {
        Arc::new(
            std::iter::once(Vehicle { id: 3285, manufacturer: "Mazda".into(), model: "RX-7".into(), ..Default::default() })
                .collect(),
        )
    }

    #[test]
    fn captures_one_session_into_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.gtz");
        let (tx, rx) = channel();

        tx.send(sample(1, 1_000)).unwrap();
        let mut tod = 2_000;
        for seq in 2..=(1 + DEBOUNCE_FRAMES as u32) {
            tx.send(sample(seq, tod)).unwrap();
            tod += 16;
        }
        // replay restarts
        tx.send(sample(500, 2_000)).unwrap();
        tx.send(sample(501, 2_016)).unwrap();
        drop(tx);

        let summary = run_capture(&rx, ContainerWriter::create(&path).unwrap(), catalog(), Span::none()).unwrap();
        assert!(summary.completed);
        assert_eq!(summary.packets_written, DEBOUNCE_FRAMES);
        let session = summary.session.unwrap();
        assert_eq!(session.start_time_of_day_ms, 2_000);
        assert_eq!(session.frames, DEBOUNCE_FRAMES);

        let header = read_header_meta(&path).unwrap();
        let extra = header.extra.unwrap();
        assert!(extra.contains("Manufacturer: Mazda, Model: RX-7"), "{extra}");

        let mut body = Vec::new();
        iox::open_reader(&path).unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(body.len(), DEBOUNCE_FRAMES as usize * 8);
        assert_eq!(&body[4..8], &2u32.to_le_bytes());
    }

    #[test]
    fn stream_ending_early_still_closes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.gtr");
        let (tx, rx) = channel();
        for (seq, tod) in [(1, 100), (2, 100), (3, 116), (5, 148)] {
            tx.send(sample(seq, tod)).unwrap();
        }
        drop(tx);

        let summary = run_capture(&rx, ContainerWriter::create(&path).unwrap(), catalog(), Span::none()).unwrap();
        assert!(!summary.completed);
        assert_eq!(summary.packets_written, 2);
        assert_eq!(summary.session.unwrap().dropped_frames, 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
    }

    #[test]
    fn nothing_captured_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = channel();
        tx.send(sample(1, 100)).unwrap();
        drop(tx);
        let summary =
            run_capture(&rx, ContainerWriter::create(&dir.path().join("idle.gtz")).unwrap(), catalog(), Span::none())
                .unwrap();
        assert_eq!(summary, CaptureSummary { session: None, packets_written: 0, completed: false });
    }
}
