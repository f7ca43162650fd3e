//! Plain telemetry data shared by the ingest, analysis and capture crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Gear value reported when no gear information is present, or the box is in neutral.
pub const GEAR_NEUTRAL: u8 = 15;
/// Gear value for reverse.
pub const GEAR_REVERSE: u8 = 0;
/// Slots in the transmission ratio table.
pub const GEAR_SLOTS: usize = 8;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct CornerSet {
    pub front_left: f32,
    pub front_right: f32,
    pub rear_left: f32,
    pub rear_right: f32,
}

impl CornerSet {
    pub const fn new(front_left: f32, front_right: f32, rear_left: f32, rear_right: f32) -> Self {
        Self { front_left, front_right, rear_left, rear_right }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Apply `f` to every corner.
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            front_left: f(self.front_left),
            front_right: f(self.front_right),
            rear_left: f(self.rear_left),
            rear_right: f(self.rear_right),
        }
    }

    /// Combine two sets corner by corner.
    pub fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self {
            front_left: f(self.front_left, other.front_left),
            front_right: f(self.front_right, other.front_right),
            rear_left: f(self.rear_left, other.rear_left),
            rear_right: f(self.rear_right, other.rear_right),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct RotationAxes {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// Gear byte as sent by the console: low nibble is the engaged gear, high nibble the suggestion.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GearInfo {
    pub current: u8,
    pub suggested: u8,
}

impl GearInfo {
    pub fn from_byte(b: u8) -> Self {
        Self { current: b & 0x0F, suggested: b >> 4 }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub live: bool,
    pub game_paused: bool,
    pub loading: bool,
    pub in_gear: bool,
    pub has_turbo: bool,
    pub rev_limiter_alert: bool,
    pub handbrake_active: bool,
    pub headlights_active: bool,
    pub high_beam_active: bool,
    pub low_beam_active: bool,
    pub asm_active: bool,
    pub tcs_active: bool,
    pub flag13: bool,
    pub flag14: bool,
    pub flag15: bool,
    pub flag16: bool,
}

impl Flags {
    pub fn from_bits(bits: u16) -> Self {
        let bit = |n: u16| bits & (1 << n) != 0;
        Self {
            live: bit(0),
            game_paused: bit(1),
            loading: bit(2),
            in_gear: bit(3),
            has_turbo: bit(4),
            rev_limiter_alert: bit(5),
            handbrake_active: bit(6),
            headlights_active: bit(7),
            high_beam_active: bit(8),
            low_beam_active: bit(9),
            asm_active: bit(10),
            tcs_active: bit(11),
            flag13: bit(12),
            flag14: bit(13),
            flag15: bit(14),
            flag16: bit(15),
        }
    }
}

/// One decoded snapshot. Optional sub-structures are `None` when the console
/// omitted that category for the current mode.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct TelemetryFrame {
    pub sequence_id: u32,
    pub time_of_day_ms: u32,
    pub vehicle_id: u32,

    // body
    pub position: Option<Vector>,
    pub velocity: Option<Vector>,
    pub rotation: Option<RotationAxes>,
    pub angular_velocity: Option<Vector>,
    pub heading: f32,
    pub ride_height: f32,
    pub ground_speed: f32, // m/s

    // engine and fluids
    pub engine_rpm: f32,
    pub rev_light_rpm_min: u16,
    pub rev_light_rpm_max: u16,
    pub fuel_level: f32,
    pub fuel_capacity: f32,
    pub manifold_pressure: f32, // bar, absolute
    pub oil_pressure: f32,
    pub oil_temperature: f32,
    pub water_temperature: f32,

    // race
    pub current_lap: u16,
    pub race_laps: u16,
    pub best_laptime_ms: i32,
    pub last_laptime_ms: i32,
    pub starting_position: i16,
    pub race_entrants: i16,

    // driver inputs, raw 0..255
    pub throttle: u8,
    pub brake: u8,
    pub flags: Option<Flags>,
    pub gear: Option<GearInfo>,

    // wheels
    pub tyre_temperature: Option<CornerSet>,
    pub wheel_radians_per_second: Option<CornerSet>,
    pub tyre_radius: Option<CornerSet>,
    pub suspension_height: Option<CornerSet>,

    // drivetrain
    pub clutch_actuation: f32,
    pub clutch_engagement: f32,
    pub clutch_output_rpm: f32,
    pub calculated_max_speed: u16, // km/h
    pub transmission_top_speed_ratio: f32,
    pub gear_ratios: Option<Vec<f32>>,
}

/// Static catalog entry. Keys follow the catalog JSON layout.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vehicle {
    #[serde(rename = "ID")]
    pub id: u32,
    pub model: String,
    pub manufacturer: String,
    pub year: u16,
    pub category: String,
    pub car_type: String,
    pub drivetrain: String,
    pub aspiration: String,
    pub open_cockpit: bool,
}

impl Vehicle {
    pub fn is_front_drive(&self) -> bool {
        self.drivetrain.eq_ignore_ascii_case("FF")
    }

    pub fn expanded_aspiration(&self) -> &str {
        match self.aspiration.as_str() {
            "NA" => "Naturally Aspirated",
            "TC" => "Turbocharged",
            "SC" => "Supercharged",
            "TC+SC" => "Compound Charged",
            other => other,
        }
    }
}

/// Running session counters. Averages are `(old + new) / 2` smoothings, not means.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Statistics {
    pub packets_total: u64,
    pub packets_dropped: u64,
    pub packets_invalid: u64,
    pub packets_duplicated: u64,
    pub packet_rate_current: u32,
    pub packet_rate_avg: u32,
    pub packet_rate_max: u32,
    pub decode_time_avg: Duration,
    pub decode_time_max: Duration,
}

/// One capture or playback run.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ReplaySession {
    #[serde(with = "uuid::serde::simple")]
    pub id: Uuid,
    pub start_time_of_day_ms: u32,
    pub frames: u64,
    pub dropped_frames: u64,
}

impl ReplaySession {
    pub fn start(start_time_of_day_ms: u32) -> Self {
        Self { id: Uuid::new_v4(), start_time_of_day_ms, frames: 0, dropped_frames: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_byte_splits_nibbles() {
        let g = GearInfo::from_byte(0x43);
        assert_eq!(g.current, 3);
        assert_eq!(g.suggested, 4);
        assert_eq!(GearInfo::from_byte(0xF0).current, GEAR_REVERSE);
        assert_eq!(GearInfo::from_byte(0xF0).suggested, GEAR_NEUTRAL);
    }

    #[test]
    fn flags_map_bit_positions() {
        let f = Flags::from_bits((1 << 0) | (1 << 4) | (1 << 11) | (1 << 15));
        assert!(f.live);
        assert!(f.has_turbo);
        assert!(f.tcs_active);
        assert!(f.flag16);
        assert!(!f.game_paused);
        assert!(!f.asm_active);
        assert_eq!(Flags::from_bits(0), Flags::default());
    }

    #[test]
    fn vehicle_reads_catalog_keys() {
        let v: Vehicle = serde_json::from_str(
            r#"{"ID":12,"Model":"Civic","Manufacturer":"Honda","Year":1999,"Drivetrain":"FF","Aspiration":"NA"}"#,
        )
        .unwrap();
        assert_eq!(v.id, 12);
        assert!(v.is_front_drive());
        assert_eq!(v.expanded_aspiration(), "Naturally Aspirated");
        assert!(!v.open_cockpit);
    }

    #[test]
    fn corner_set_zip() {
        let a = CornerSet::new(1.0, 2.0, 3.0, 4.0);
        let b = CornerSet::splat(2.0);
        assert_eq!(a.zip_with(b, |x, y| x * y), CornerSet::new(2.0, 4.0, 6.0, 8.0));
    }
}
