//! Unit conversions. All inputs are SI or bar.

use std::f32::consts::PI;

pub fn bar_to_psi(bar: f32) -> f32 {
    bar * 14.50377
}

pub fn bar_to_inhg(bar: f32) -> f32 {
    bar * 29.52998
}

pub fn bar_to_kpa(bar: f32) -> f32 {
    bar * 100.0
}

pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 1.8 + 32.0
}

pub fn meters_to_feet(m: f32) -> f32 {
    m * 3.28084
}

pub fn meters_to_inches(m: f32) -> f32 {
    m * 39.3701
}

pub fn meters_to_millimeters(m: f32) -> f32 {
    m * 1000.0
}

pub fn mps_to_kph(mps: f32) -> f32 {
    mps * 3.6
}

pub fn mps_to_mph(mps: f32) -> f32 {
    mps / 0.44704
}

pub fn rad_per_sec_to_rpm(rps: f32) -> f32 {
    rps * (60.0 / (2.0 * PI))
}
