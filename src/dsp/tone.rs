//! Tone mapping — the pure function from kinematic state to pitch and gain.
//!
//! Both playback paths share one frequency law. The gain laws differ on
//! purpose: the live path plays voices on independent outputs, while the
//! offline path sums them into a single signal and uses a lower curve to stay
//! clear of the hard clamp.

use crate::tuning::ToneControl;

pub const MIN_FREQUENCY_HZ: f64 = 20.0;
pub const MAX_FREQUENCY_HZ: f64 = 2000.0;

/// Live-path gain curve.
const LIVE_GAIN_FLOOR: f64 = 0.05;
const LIVE_GAIN_CEILING: f64 = 0.45;
const LIVE_VELOCITY_COEFF: f64 = 0.12;

/// Offline-path gain curve, tuned for additive mixing.
const OFFLINE_GAIN_FLOOR: f64 = 0.04;
const OFFLINE_GAIN_CEILING: f64 = 0.35;
const OFFLINE_VELOCITY_COEFF: f64 = 0.08;

/// Clamp that is total over all of f64: NaN pins to the lower bound instead
/// of propagating.
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.min(max).max(min)
    }
}

/// Playback frequency for an angle under the given tuning.
pub fn frequency_hz(angle: f64, control: &ToneControl) -> f64 {
    clamp(
        control.base_hz + angle * control.scale_hz_per_rad,
        MIN_FREQUENCY_HZ,
        MAX_FREQUENCY_HZ,
    )
}

/// Gain for the live, per-voice path.
pub fn live_gain(angular_velocity: f64, control: &ToneControl) -> f64 {
    clamp(
        LIVE_GAIN_FLOOR + angular_velocity.abs() * control.velocity_gain * LIVE_VELOCITY_COEFF,
        0.0,
        LIVE_GAIN_CEILING,
    )
}

/// Gain for the offline, additively mixed path.
pub fn offline_gain(angular_velocity: f64, control: &ToneControl) -> f64 {
    clamp(
        OFFLINE_GAIN_FLOOR
            + angular_velocity.abs() * control.velocity_gain * OFFLINE_VELOCITY_COEFF,
        0.0,
        OFFLINE_GAIN_CEILING,
    )
}

/// Frequency and gain for one live trigger.
pub fn live_tone(angle: f64, angular_velocity: f64, control: &ToneControl) -> (f64, f64) {
    (frequency_hz(angle, control), live_gain(angular_velocity, control))
}

/// Frequency and gain for one offline sample contribution.
pub fn offline_tone(angle: f64, angular_velocity: f64, control: &ToneControl) -> (f64, f64) {
    (
        frequency_hz(angle, control),
        offline_gain(angular_velocity, control),
    )
}
