//! JSON view of the derived metrics for dashboards and log lines.

use serde_json::{json, Value};

use crate::Transformer;

pub fn dashboard(t: &Transformer) -> Value {
    let vmax = t.calculated_vmax();
    let flags = t.flags();
    json!({
        "sequence": t.sequence_id(),
        "time_of_day_ms": t.time_of_day().as_millis() as u64,
        "vehicle": {
            "id": t.vehicle_id(),
            "manufacturer": t.vehicle_manufacturer(),
            "model": t.vehicle_model(),
            "drivetrain": t.vehicle_drivetrain(),
            "aspiration": t.vehicle_aspiration_expanded(),
        },
        "lap": { "current": t.current_lap(), "total": t.race_laps() },
        "speed_kph": t.ground_speed_kph(),
        "rpm": t.engine_rpm(),
        "rev_light": t.engine_rpm_light(),
        "gear": t.current_gear_string(),
        "suggested_gear": t.suggested_gear(),
        "gear_ratio": t.current_gear_ratio(),
        "throttle_pct": t.throttle_percent(),
        "brake_pct": t.brake_percent(),
        "boost_bar": if flags.has_turbo { t.turbo_boost_bar() } else { 0.0 },
        "vmax": vmax,
        "differential_ratio": t.differential_ratio(),
        "slip_ratio": t.tyre_slip_ratio(),
        "tyre_temp_c": t.tyre_temperature_celsius(),
        "flags": flags,
    })
}
