//! Amplitude envelope for triggered tones.
//!
//! A triggered note holds full level for the first 60% of its duration, then
//! decays exponentially (40 ms time constant) and fades linearly to exact
//! zero over its last 5 ms, so a snippet never ends on a click.

/// Fraction of the note duration played at full level before decay begins.
const DECAY_START_FRACTION: f64 = 0.6;
/// Exponential decay time constant, seconds.
const DECAY_TIME_CONSTANT: f64 = 0.04;
/// Length of the terminal fade to exact zero, seconds.
const TERMINAL_FADE: f64 = 0.005;

/// Decay envelope over a fixed note duration.
#[derive(Debug, Clone, Copy)]
pub struct DecayEnvelope {
    duration: f64,
}

impl DecayEnvelope {
    pub fn new(duration: f64) -> Self {
        DecayEnvelope {
            duration: duration.max(0.0),
        }
    }

    /// Envelope level in [0, 1] at `t` seconds after the trigger.
    pub fn level_at(&self, t: f64) -> f64 {
        if t < 0.0 || t >= self.duration || self.duration == 0.0 {
            return 0.0;
        }
        let decay_start = self.duration * DECAY_START_FRACTION;
        let decayed = if t < decay_start {
            1.0
        } else {
            (-(t - decay_start) / DECAY_TIME_CONSTANT).exp()
        };
        let fade_start = self.duration - TERMINAL_FADE.min(self.duration);
        if t >= fade_start && self.duration > fade_start {
            decayed * (self.duration - t) / (self.duration - fade_start)
        } else {
            decayed
        }
    }
}
