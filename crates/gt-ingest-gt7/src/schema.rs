//! Byte layout of the deciphered "A" packet.
//!
//! Everything up to the driver inputs (`0x94`) is required. Wheel, drivetrain
//! and vehicle id blocks are optional and decoded only when present.

use byteorder::{LittleEndian, ReadBytesExt};
use gt_ingest_core::DecodeError;
use model::{CornerSet, Flags, GearInfo, RotationAxes, TelemetryFrame, Vector, GEAR_SLOTS};
use std::io::{self, Cursor};

use crate::cipher::MAGIC;

/// Full size of an "A" packet.
pub const PACKET_LEN: usize = 0x128;
/// Shortest buffer that still carries every required field.
pub const MIN_FRAME_LEN: usize = 0x94;

const OFF_POSITION: u64 = 0x04;
const OFF_ENGINE_RPM: u64 = 0x3C;
const OFF_FUEL_LEVEL: u64 = 0x44;
const OFF_TYRE_TEMP: u64 = 0x60;
const OFF_SEQUENCE: u64 = 0x70;
const OFF_WHEEL_RPS: usize = 0xA4;
const OFF_TYRE_RADIUS: usize = 0xB4;
const OFF_SUSPENSION: usize = 0xC4;
const OFF_CLUTCH: usize = 0xF4;
const OFF_GEAR_RATIOS: usize = 0x104;
const OFF_VEHICLE_ID: usize = 0x124;

/// Turns a deciphered packet into named fields.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, packet: &[u8]) -> Result<TelemetryFrame, DecodeError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Gt7PacketDecoder;

impl FrameDecoder for Gt7PacketDecoder {
    fn decode(&self, packet: &[u8]) -> Result<TelemetryFrame, DecodeError> {
        if packet.len() < MIN_FRAME_LEN {
            return Err(DecodeError::Malformed(format!(
                "frame of {} bytes, need at least {MIN_FRAME_LEN}",
                packet.len()
            )));
        }
        let magic = u32::from_le_bytes([packet[0], packet[1], packet[2], packet[3]]);
        if magic != MAGIC {
            return Err(DecodeError::InvalidMagic(magic));
        }
        decode_frame(packet).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

fn read_vector(c: &mut Cursor<&[u8]>) -> io::Result<Vector> {
    Ok(Vector {
        x: c.read_f32::<LittleEndian>()?,
        y: c.read_f32::<LittleEndian>()?,
        z: c.read_f32::<LittleEndian>()?,
    })
}

fn read_corners(c: &mut Cursor<&[u8]>) -> io::Result<CornerSet> {
    Ok(CornerSet {
        front_left: c.read_f32::<LittleEndian>()?,
        front_right: c.read_f32::<LittleEndian>()?,
        rear_left: c.read_f32::<LittleEndian>()?,
        rear_right: c.read_f32::<LittleEndian>()?,
    })
}

fn optional<T>(
    buf: &[u8],
    offset: usize,
    len: usize,
    read: impl FnOnce(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> io::Result<Option<T>> {
    if buf.len() < offset + len {
        return Ok(None);
    }
    let mut c = Cursor::new(&buf[offset..offset + len]);
    read(&mut c).map(Some)
}

fn decode_frame(buf: &[u8]) -> io::Result<TelemetryFrame> {
    let mut f = TelemetryFrame::default();
    let mut c = Cursor::new(buf);

    c.set_position(OFF_POSITION);
    f.position = Some(read_vector(&mut c)?);
    f.velocity = Some(read_vector(&mut c)?);
    f.rotation = Some(RotationAxes {
        pitch: c.read_f32::<LittleEndian>()?,
        yaw: c.read_f32::<LittleEndian>()?,
        roll: c.read_f32::<LittleEndian>()?,
    });
    f.heading = c.read_f32::<LittleEndian>()?;
    f.angular_velocity = Some(read_vector(&mut c)?);
    f.ride_height = c.read_f32::<LittleEndian>()?;

    c.set_position(OFF_ENGINE_RPM);
    f.engine_rpm = c.read_f32::<LittleEndian>()?;

    // 0x40 holds the nonce seed
    c.set_position(OFF_FUEL_LEVEL);
    f.fuel_level = c.read_f32::<LittleEndian>()?;
    f.fuel_capacity = c.read_f32::<LittleEndian>()?;
    f.ground_speed = c.read_f32::<LittleEndian>()?;
    f.manifold_pressure = c.read_f32::<LittleEndian>()?;
    f.oil_pressure = c.read_f32::<LittleEndian>()?;
    f.water_temperature = c.read_f32::<LittleEndian>()?;
    f.oil_temperature = c.read_f32::<LittleEndian>()?;

    c.set_position(OFF_TYRE_TEMP);
    f.tyre_temperature = Some(read_corners(&mut c)?);

    c.set_position(OFF_SEQUENCE);
    f.sequence_id = c.read_u32::<LittleEndian>()?;
    f.current_lap = c.read_u16::<LittleEndian>()?;
    f.race_laps = c.read_u16::<LittleEndian>()?;
    f.best_laptime_ms = c.read_i32::<LittleEndian>()?;
    f.last_laptime_ms = c.read_i32::<LittleEndian>()?;
    f.time_of_day_ms = c.read_u32::<LittleEndian>()?;
    f.starting_position = c.read_i16::<LittleEndian>()?;
    f.race_entrants = c.read_i16::<LittleEndian>()?;
    f.rev_light_rpm_min = c.read_u16::<LittleEndian>()?;
    f.rev_light_rpm_max = c.read_u16::<LittleEndian>()?;
    f.calculated_max_speed = c.read_u16::<LittleEndian>()?;
    f.flags = Some(Flags::from_bits(c.read_u16::<LittleEndian>()?));
    f.gear = Some(GearInfo::from_byte(c.read_u8()?));
    f.throttle = c.read_u8()?;
    f.brake = c.read_u8()?;

    f.wheel_radians_per_second = optional(buf, OFF_WHEEL_RPS, 16, read_corners)?;
    f.tyre_radius = optional(buf, OFF_TYRE_RADIUS, 16, read_corners)?;
    f.suspension_height = optional(buf, OFF_SUSPENSION, 16, read_corners)?;

    if let Some((actuation, engagement, output_rpm, top_speed_ratio)) = optional(buf, OFF_CLUTCH, 16, |c| {
        Ok((
            c.read_f32::<LittleEndian>()?,
            c.read_f32::<LittleEndian>()?,
            c.read_f32::<LittleEndian>()?,
            c.read_f32::<LittleEndian>()?,
        ))
    })? {
        f.clutch_actuation = actuation;
        f.clutch_engagement = engagement;
        f.clutch_output_rpm = output_rpm;
        f.transmission_top_speed_ratio = top_speed_ratio;
    }

    f.gear_ratios = optional(buf, OFF_GEAR_RATIOS, 4 * GEAR_SLOTS, |c| {
        (0..GEAR_SLOTS).map(|_| c.read_f32::<LittleEndian>()).collect()
    })?;
    f.vehicle_id = optional(buf, OFF_VEHICLE_ID, 4, |c| c.read_u32::<LittleEndian>())?.unwrap_or(0);

    Ok(f)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use proptest::prelude::*;

    fn full_packet() -> Vec<u8> {
        let mut p = packet(4242, 36_000_000);
        put_f32(&mut p, 0x04, 10.5);
        put_f32(&mut p, 0x0C, -3.0);
        put_f32(&mut p, 0x10, 42.1);
        put_f32(&mut p, 0x1C, 0.01);
        put_f32(&mut p, 0x24, -0.02);
        put_f32(&mut p, 0x28, 1.57);
        put_f32(&mut p, 0x38, 0.09);
        put_f32(&mut p, 0x3C, 7250.0);
        put_f32(&mut p, 0x44, 64.0);
        put_f32(&mut p, 0x48, 100.0);
        put_f32(&mut p, 0x4C, 55.5);
        put_f32(&mut p, 0x50, 1.8);
        put_f32(&mut p, 0x58, 88.0);
        put_f32(&mut p, 0x60, 71.0);
        put_f32(&mut p, 0x6C, 74.0);
        p[0x74..0x76].copy_from_slice(&3u16.to_le_bytes());
        p[0x76..0x78].copy_from_slice(&12u16.to_le_bytes());
        p[0x78..0x7C].copy_from_slice(&95_123i32.to_le_bytes());
        p[0x7C..0x80].copy_from_slice(&(-1i32).to_le_bytes());
        p[0x84..0x86].copy_from_slice(&4i16.to_le_bytes());
        p[0x86..0x88].copy_from_slice(&16i16.to_le_bytes());
        p[0x88..0x8A].copy_from_slice(&6500u16.to_le_bytes());
        p[0x8A..0x8C].copy_from_slice(&7800u16.to_le_bytes());
        p[0x8C..0x8E].copy_from_slice(&322u16.to_le_bytes());
        p[0x8E..0x90].copy_from_slice(&((1u16 << 0) | (1 << 4)).to_le_bytes());
        p[0x90] = 0x54;
        p[0x91] = 203;
        p[0x92] = 143;
        put_f32(&mut p, 0xA4, -132.5);
        put_f32(&mut p, 0xB4, 0.317);
        put_f32(&mut p, 0xC0, 0.320);
        put_f32(&mut p, 0xC4, 0.101);
        put_f32(&mut p, 0xF4, 0.62);
        put_f32(&mut p, 0xFC, 2305.0);
        put_f32(&mut p, 0x100, 2.49);
        for (i, r) in [3.5f32, 2.4, 1.8, 1.4, 1.1, 0.9].iter().enumerate() {
            put_f32(&mut p, 0x104 + i * 4, *r);
        }
        p[0x124..0x128].copy_from_slice(&1245u32.to_le_bytes());
        p
    }

    #[test]
    fn decodes_full_packet() {
        let f = Gt7PacketDecoder.decode(&full_packet()).unwrap();
        assert_eq!(f.sequence_id, 4242);
        assert_eq!(f.time_of_day_ms, 36_000_000);
        assert_eq!(f.position, Some(Vector { x: 10.5, y: 0.0, z: -3.0 }));
        assert_eq!(f.velocity.unwrap().x, 42.1);
        assert_eq!(f.rotation.unwrap().pitch, 0.01);
        assert_eq!(f.rotation.unwrap().roll, -0.02);
        assert_eq!(f.heading, 1.57);
        assert_eq!(f.ride_height, 0.09);
        assert_eq!(f.engine_rpm, 7250.0);
        assert_eq!(f.fuel_level, 64.0);
        assert_eq!(f.fuel_capacity, 100.0);
        assert_eq!(f.ground_speed, 55.5);
        assert_eq!(f.manifold_pressure, 1.8);
        assert_eq!(f.water_temperature, 88.0);
        assert_eq!(f.tyre_temperature, Some(CornerSet::new(71.0, 0.0, 0.0, 74.0)));
        assert_eq!((f.current_lap, f.race_laps), (3, 12));
        assert_eq!((f.best_laptime_ms, f.last_laptime_ms), (95_123, -1));
        assert_eq!((f.starting_position, f.race_entrants), (4, 16));
        assert_eq!((f.rev_light_rpm_min, f.rev_light_rpm_max), (6500, 7800));
        assert_eq!(f.calculated_max_speed, 322);
        let flags = f.flags.unwrap();
        assert!(flags.live && flags.has_turbo && !flags.game_paused);
        assert_eq!(f.gear, Some(GearInfo { current: 4, suggested: 5 }));
        assert_eq!((f.throttle, f.brake), (203, 143));
        assert_eq!(f.wheel_radians_per_second.unwrap().front_left, -132.5);
        assert_eq!(f.tyre_radius.unwrap().front_left, 0.317);
        assert_eq!(f.tyre_radius.unwrap().rear_right, 0.320);
        assert_eq!(f.suspension_height.unwrap().front_left, 0.101);
        assert_eq!(f.clutch_actuation, 0.62);
        assert_eq!(f.clutch_output_rpm, 2305.0);
        assert_eq!(f.transmission_top_speed_ratio, 2.49);
        assert_eq!(f.gear_ratios.as_ref().unwrap().len(), GEAR_SLOTS);
        assert_eq!(f.gear_ratios.as_ref().unwrap()[5], 0.9);
        assert_eq!(f.gear_ratios.as_ref().unwrap()[6], 0.0);
        assert_eq!(f.vehicle_id, 1245);
    }

    #[test]
    fn truncated_packet_drops_optional_blocks() {
        let p = full_packet();
        let f = Gt7PacketDecoder.decode(&p[..MIN_FRAME_LEN]).unwrap();
        assert_eq!(f.sequence_id, 4242);
        assert!(f.gear.is_some());
        assert!(f.wheel_radians_per_second.is_none());
        assert!(f.tyre_radius.is_none());
        assert!(f.gear_ratios.is_none());
        assert_eq!(f.vehicle_id, 0);

        let f = Gt7PacketDecoder.decode(&p[..OFF_SUSPENSION]).unwrap();
        assert!(f.tyre_radius.is_some());
        assert!(f.suspension_height.is_none());
    }

    #[test]
    fn rejects_short_and_unmagical_frames() {
        assert!(matches!(Gt7PacketDecoder.decode(&[0u8; 0x20]), Err(DecodeError::Malformed(_))));
        let mut p = full_packet();
        p[0] = 0;
        assert!(matches!(Gt7PacketDecoder.decode(&p), Err(DecodeError::InvalidMagic(_))));
    }

    proptest! {
        #[test]
        fn never_panics_on_magic_prefixed_noise(tail in proptest::collection::vec(any::<u8>(), 0..0x140)) {
            let mut p = MAGIC.to_le_bytes().to_vec();
            p.extend(tail);
            let _ = Gt7PacketDecoder.decode(&p);
        }
    }
}
