//! Numeric helpers shared by the target mappings

/// Round to three decimal places
pub fn round(value: f32) -> f32 {
    round_to(value, 3)
}

/// Round to `precision` decimal places
pub fn round_to(value: f32, precision: i32) -> f32 {
    let factor = 10f64.powi(precision);
    ((value as f64 * factor).round() / factor) as f32
}

/// Clamp into `[min, max]`
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Linearly re-map `value` from `[from_min, from_max]` onto `[to_min, to_max]`
///
/// The result is rounded to three decimals. Inverted target ranges are
/// allowed (`adjust(10.0, 0.0, 100.0, 100.0, 0.0) == 90.0`); a zero-width
/// source range yields `to_min`.
pub fn adjust(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let from_range = from_max - from_min;
    if from_range == 0.0 {
        return round(to_min);
    }
    round(to_min + (to_max - to_min) * (value - from_min) / from_range)
}
