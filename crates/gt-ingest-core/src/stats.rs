use model::Statistics;
use std::time::{Duration, Instant};
use tracing::{debug, warn, Span};

/// Packets between two packet-rate samples.
pub const RATE_SAMPLE_EVERY: u32 = 10;

/// Sequence and throughput tracking over an unreliable transport.
///
/// A disabled tracker ignores every call.
pub struct StatsTracker {
    enabled: bool,
    span: Span,
    stats: Statistics,
    last_sequence: Option<u32>,
    last_rate_sample: Instant,
}

impl StatsTracker {
    pub fn new(enabled: bool, span: Span) -> Self {
        Self::starting_at(enabled, span, Instant::now())
    }

    pub fn starting_at(enabled: bool, span: Span, start: Instant) -> Self {
        Self { enabled, span, stats: Statistics::default(), last_sequence: None, last_rate_sample: start }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn snapshot(&self) -> Statistics {
        self.stats.clone()
    }

    pub fn record_invalid(&mut self) {
        if self.enabled {
            self.stats.packets_invalid += 1;
        }
    }

    pub fn observe(&mut self, sequence: u32, decode_time: Duration) {
        self.observe_at(sequence, decode_time, Instant::now())
    }

    pub fn observe_at(&mut self, sequence: u32, decode_time: Duration, now: Instant) {
        if !self.enabled {
            return;
        }
        self.stats.packets_total += 1;

        let Some(last) = self.last_sequence else {
            self.last_sequence = Some(sequence);
            return;
        };

        // wrapping difference read as signed so a wrapped id is still "next"
        let delta = sequence.wrapping_sub(last) as i32;
        if delta == 0 {
            self.stats.packets_duplicated += 1;
            debug!(parent: &self.span, sequence, "duplicate packet");
            return;
        }

        let span = &self.span;
        let s = &mut self.stats;
        s.decode_time_avg = (s.decode_time_avg + decode_time) / 2;
        if decode_time > s.decode_time_max {
            s.decode_time_max = decode_time;
        }

        if delta > 1 {
            let dropped = (delta - 1) as u64;
            warn!(parent: span, dropped, "dropped packets detected");
            s.packets_dropped += dropped;
        } else if delta < 0 {
            // flagged only; reordering is not counted as loss
            warn!(parent: span, sequence, last, "delayed packet detected");
        }
        self.last_sequence = Some(sequence);

        if sequence % RATE_SAMPLE_EVERY == 0 {
            let elapsed = now.saturating_duration_since(self.last_rate_sample);
            let rate = (f64::from(RATE_SAMPLE_EVERY) / elapsed.as_secs_f64()) as u32;
            s.packet_rate_current = rate;
            s.packet_rate_avg = ((u64::from(s.packet_rate_avg) + u64::from(rate)) / 2) as u32;
            if rate > s.packet_rate_max {
                s.packet_rate_max = rate;
            }
            self.last_rate_sample = now;
        }
    }
}
