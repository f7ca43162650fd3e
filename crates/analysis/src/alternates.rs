//! Imperial and alternate-unit views of the transformer's SI accessors.

use model::CornerSet;

use crate::{units::*, Transformer};

impl Transformer {
    /// `R`, `N` or the gear number.
    pub fn current_gear_string(&self) -> String {
        match self.current_gear() {
            0 => "R".into(),
            15 => "N".into(),
            g => g.to_string(),
        }
    }

    pub fn ground_speed_kph(&self) -> f32 {
        mps_to_kph(self.ground_speed_mps())
    }

    pub fn ground_speed_mph(&self) -> f32 {
        mps_to_mph(self.ground_speed_mps())
    }

    pub fn oil_temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.oil_temperature_celsius())
    }

    pub fn water_temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.water_temperature_celsius())
    }

    pub fn tyre_temperature_fahrenheit(&self) -> CornerSet {
        self.tyre_temperature_celsius().map(celsius_to_fahrenheit)
    }

    pub fn ride_height_millimeters(&self) -> f32 {
        meters_to_millimeters(self.ride_height_meters())
    }

    pub fn suspension_height_feet(&self) -> CornerSet {
        self.suspension_height_meters().map(meters_to_feet)
    }

    pub fn suspension_height_inches(&self) -> CornerSet {
        self.suspension_height_meters().map(meters_to_inches)
    }

    pub fn suspension_height_millimeters(&self) -> CornerSet {
        self.suspension_height_meters().map(meters_to_millimeters)
    }

    pub fn turbo_boost_psi(&self) -> f32 {
        bar_to_psi(self.turbo_boost_bar())
    }

    pub fn turbo_boost_inhg(&self) -> f32 {
        bar_to_inhg(self.turbo_boost_bar())
    }

    pub fn turbo_boost_kpa(&self) -> f32 {
        bar_to_kpa(self.turbo_boost_bar())
    }

    pub fn tyre_diameter_feet(&self) -> CornerSet {
        self.tyre_diameter_meters().map(meters_to_feet)
    }

    pub fn tyre_diameter_inches(&self) -> CornerSet {
        self.tyre_diameter_meters().map(meters_to_inches)
    }

    pub fn tyre_diameter_millimeters(&self) -> CornerSet {
        self.tyre_diameter_meters().map(meters_to_millimeters)
    }

    pub fn tyre_radius_feet(&self) -> CornerSet {
        self.tyre_radius_meters().map(meters_to_feet)
    }

    pub fn tyre_radius_inches(&self) -> CornerSet {
        self.tyre_radius_meters().map(meters_to_inches)
    }

    pub fn tyre_radius_millimeters(&self) -> CornerSet {
        self.tyre_radius_meters().map(meters_to_millimeters)
    }

    pub fn wheel_speed_kph(&self) -> CornerSet {
        self.wheel_speed_mps().map(mps_to_kph)
    }

    pub fn wheel_speed_mph(&self) -> CornerSet {
        self.wheel_speed_mps().map(mps_to_mph)
    }

    pub fn wheel_speed_rpm(&self) -> CornerSet {
        self.wheel_speed_radians_per_second().map(rad_per_sec_to_rpm)
    }
}
