use iox::VehicleCatalog;
use model::{CornerSet, Flags, GearInfo, RotationAxes, TelemetryFrame, Vector, Vehicle, GEAR_NEUTRAL, GEAR_SLOTS};
use serde::Serialize;
use std::{f32::consts::PI, sync::Arc, time::Duration};

use crate::units::mps_to_kph;

/// Top speed and the engine speed it is reached at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Vmax {
    /// km/h
    pub speed: u16,
    pub rpm: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transmission {
    /// Strictly positive ratios in the table
    pub gears: usize,
    pub gear_ratios: Vec<f32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevLight {
    pub min: u16,
    pub max: u16,
    pub active: bool,
}

/// Derived metrics over the most recent frame.
///
/// Every accessor is total: missing sub-structures read as zero, and the
/// ratio calculations return `-1` when the gear table cannot support them.
pub struct Transformer {
    catalog: Arc<VehicleCatalog>,
    frame: Arc<TelemetryFrame>,
    vehicle: Vehicle,
    vehicle_key: Option<u32>,
}

impl Transformer {
    pub fn new(catalog: Arc<VehicleCatalog>) -> Self {
        Self { catalog, frame: Arc::default(), vehicle: Vehicle::default(), vehicle_key: None }
    }

    /// Swap in a new frame; the catalog is consulted only when the vehicle id changes.
    pub fn update(&mut self, frame: Arc<TelemetryFrame>) {
        if self.vehicle_key != Some(frame.vehicle_id) {
            self.vehicle = self.catalog.lookup(frame.vehicle_id);
            self.vehicle_key = Some(frame.vehicle_id);
        }
        self.frame = frame;
    }

    pub fn frame(&self) -> &TelemetryFrame {
        &self.frame
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    // body

    pub fn position(&self) -> Vector {
        self.frame.position.unwrap_or_default()
    }

    pub fn velocity(&self) -> Vector {
        self.frame.velocity.unwrap_or_default()
    }

    pub fn angular_velocity(&self) -> Vector {
        self.frame.angular_velocity.unwrap_or_default()
    }

    pub fn rotation(&self) -> RotationAxes {
        self.frame.rotation.unwrap_or_default()
    }

    pub fn heading(&self) -> f32 {
        self.frame.heading
    }

    pub fn ride_height_meters(&self) -> f32 {
        self.frame.ride_height
    }

    pub fn ground_speed_mps(&self) -> f32 {
        self.frame.ground_speed
    }

    pub fn flags(&self) -> Flags {
        self.frame.flags.unwrap_or_default()
    }

    // session

    pub fn sequence_id(&self) -> u32 {
        self.frame.sequence_id
    }

    pub fn time_of_day(&self) -> Duration {
        Duration::from_millis(u64::from(self.frame.time_of_day_ms))
    }

    /// `None` until a lap has been set.
    pub fn best_laptime(&self) -> Option<Duration> {
        laptime(self.frame.best_laptime_ms)
    }

    pub fn last_laptime(&self) -> Option<Duration> {
        laptime(self.frame.last_laptime_ms)
    }

    pub fn current_lap(&self) -> u16 {
        self.frame.current_lap
    }

    pub fn race_laps(&self) -> u16 {
        self.frame.race_laps
    }

    pub fn race_entrants(&self) -> i16 {
        self.frame.race_entrants
    }

    pub fn starting_position(&self) -> i16 {
        self.frame.starting_position
    }

    // driver inputs

    pub fn throttle_percent(&self) -> f32 {
        f32::from(self.frame.throttle) / 2.55
    }

    pub fn brake_percent(&self) -> f32 {
        f32::from(self.frame.brake) / 2.55
    }

    pub fn clutch_actuation_percent(&self) -> f32 {
        self.frame.clutch_actuation * 100.0
    }

    pub fn clutch_engagement_percent(&self) -> f32 {
        self.frame.clutch_engagement * 100.0
    }

    pub fn clutch_output_rpm(&self) -> f32 {
        self.frame.clutch_output_rpm
    }

    // engine and fluids

    pub fn engine_rpm(&self) -> f32 {
        self.frame.engine_rpm
    }

    pub fn engine_rpm_light(&self) -> RevLight {
        let min = self.frame.rev_light_rpm_min;
        RevLight { min, max: self.frame.rev_light_rpm_max, active: self.frame.engine_rpm as u16 > min }
    }

    pub fn fuel_level(&self) -> f32 {
        self.frame.fuel_level
    }

    pub fn fuel_capacity(&self) -> f32 {
        self.frame.fuel_capacity
    }

    pub fn oil_pressure(&self) -> f32 {
        self.frame.oil_pressure
    }

    pub fn oil_temperature_celsius(&self) -> f32 {
        self.frame.oil_temperature
    }

    pub fn water_temperature_celsius(&self) -> f32 {
        self.frame.water_temperature
    }

    /// Gauge pressure; meaningless unless `flags().has_turbo`.
    pub fn turbo_boost_bar(&self) -> f32 {
        self.frame.manifold_pressure - 1.0
    }

    // transmission

    fn gear(&self) -> GearInfo {
        self.frame.gear.unwrap_or(GearInfo { current: GEAR_NEUTRAL, suggested: GEAR_NEUTRAL })
    }

    /// 15 is neutral (or no gear data), 0 is reverse.
    pub fn current_gear(&self) -> u8 {
        self.gear().current
    }

    pub fn suggested_gear(&self) -> u8 {
        self.gear().suggested
    }

    pub fn transmission(&self) -> Transmission {
        match &self.frame.gear_ratios {
            Some(ratios) => Transmission {
                gears: ratios.iter().filter(|r| **r > 0.0).count(),
                gear_ratios: ratios.clone(),
            },
            None => Transmission { gears: 0, gear_ratios: vec![0.0; GEAR_SLOTS] },
        }
    }

    /// Ratio of the engaged gear, `-1` for reverse, neutral or a gear past the table.
    pub fn current_gear_ratio(&self) -> f32 {
        let gear = usize::from(self.current_gear());
        let t = self.transmission();
        if gear == 0 || gear > t.gears {
            return -1.0;
        }
        t.gear_ratios.get(gear - 1).copied().unwrap_or(-1.0)
    }

    pub fn transmission_top_speed_ratio(&self) -> f32 {
        self.frame.transmission_top_speed_ratio
    }

    pub fn calculated_vmax(&self) -> Vmax {
        let speed = self.frame.calculated_max_speed;
        let circumference = self.tyre_diameter_meters().rear_left * PI;
        if circumference <= 0.0 {
            return Vmax { speed, rpm: 0 };
        }
        let meters_per_minute = f32::from(speed) * 1000.0 / 60.0;
        let rpm = (meters_per_minute / circumference) * self.transmission_top_speed_ratio();
        Vmax { speed, rpm: rpm as u16 }
    }

    /// Final drive ratio implied by top speed, top gear and the driven wheel size.
    pub fn differential_ratio(&self) -> f32 {
        let t = self.transmission();
        if t.gears == 0 {
            return -1.0;
        }
        let highest = t.gear_ratios[t.gears - 1];
        let vmax = self.calculated_vmax();

        let diameters = self.tyre_diameter_meters();
        let rolling_diameter =
            if self.vehicle.is_front_drive() { diameters.front_left } else { diameters.rear_left };
        let meters_per_minute = f32::from(vmax.speed) * 1000.0 / 60.0;
        let wheel_rpm = meters_per_minute / (rolling_diameter * PI);
        if highest <= 0.0 || wheel_rpm <= 0.0 || !wheel_rpm.is_finite() {
            return -1.0;
        }
        (f32::from(vmax.rpm) / highest) / wheel_rpm
    }

    // wheels

    pub fn tyre_radius_meters(&self) -> CornerSet {
        self.frame.tyre_radius.unwrap_or_default()
    }

    pub fn tyre_diameter_meters(&self) -> CornerSet {
        self.tyre_radius_meters().map(|r| r * 2.0)
    }

    pub fn tyre_temperature_celsius(&self) -> CornerSet {
        self.frame.tyre_temperature.unwrap_or_default()
    }

    pub fn suspension_height_meters(&self) -> CornerSet {
        self.frame.suspension_height.unwrap_or_default()
    }

    /// Magnitude only; the sign is the direction of rotation.
    pub fn wheel_speed_radians_per_second(&self) -> CornerSet {
        self.frame.wheel_radians_per_second.unwrap_or_default().map(f32::abs)
    }

    pub fn wheel_speed_mps(&self) -> CornerSet {
        self.wheel_speed_radians_per_second().zip_with(self.tyre_radius_meters(), |rps, r| rps * r)
    }

    /// Wheel over ground speed per corner, 1.0 everywhere while stationary.
    pub fn tyre_slip_ratio(&self) -> CornerSet {
        let ground = mps_to_kph(self.ground_speed_mps());
        if ground == 0.0 {
            return CornerSet::splat(1.0);
        }
        self.wheel_speed_mps().map(|mps| mps_to_kph(mps) / ground)
    }

    // vehicle

    pub fn vehicle_id(&self) -> u32 {
        self.frame.vehicle_id
    }

    pub fn vehicle_manufacturer(&self) -> &str {
        &self.vehicle.manufacturer
    }

    pub fn vehicle_model(&self) -> &str {
        &self.vehicle.model
    }

    pub fn vehicle_year(&self) -> u16 {
        self.vehicle.year
    }

    pub fn vehicle_category(&self) -> &str {
        &self.vehicle.category
    }

    pub fn vehicle_type(&self) -> &str {
        &self.vehicle.car_type
    }

    pub fn vehicle_drivetrain(&self) -> &str {
        &self.vehicle.drivetrain
    }

    pub fn vehicle_aspiration(&self) -> &str {
        &self.vehicle.aspiration
    }

    pub fn vehicle_aspiration_expanded(&self) -> &str {
        self.vehicle.expanded_aspiration()
    }

    pub fn vehicle_has_open_cockpit(&self) -> bool {
        self.vehicle.open_cockpit
    }
}

fn laptime(ms: i32) -> Option<Duration> {
    u64::try_from(ms).ok().map(Duration::from_millis)
}
