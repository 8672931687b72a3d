//! Fallback tone synthesis — one oscillator per trigger, no samples needed.

use crate::dsp::envelope::DecayEnvelope;
use crate::dsp::oscillator::{Oscillator, Waveform};

/// Render a single enveloped tone as a mono snippet at `sample_rate`.
pub fn render_tone(
    waveform: Waveform,
    frequency_hz: f64,
    gain: f64,
    duration: f64,
    sample_rate: u32,
) -> Vec<f32> {
    let mut oscillator = Oscillator::new(waveform, frequency_hz, sample_rate as f64);
    let envelope = DecayEnvelope::new(duration);
    let count = (duration * sample_rate as f64).floor().max(0.0) as usize;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let t = i as f64 / sample_rate as f64;
        out.push((oscillator.next_sample() * envelope.level_at(t) * gain) as f32);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_expected_length_and_level() {
        let snippet = render_tone(Waveform::Sine, 440.0, 0.08, 0.15, 44100);
        assert_eq!(snippet.len(), (0.15 * 44100.0) as usize);

        let peak = snippet.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.05, "tone should be audible, peak={peak}");
        assert!(peak <= 0.08 + 1e-3, "gain bounds the peak, peak={peak}");
    }

    #[test]
    fn tone_decays_toward_the_end() {
        let snippet = render_tone(Waveform::Triangle, 220.0, 0.1, 0.15, 44100);
        let hold_peak = snippet[..3000]
            .iter()
            .fold(0.0_f32, |m, &s| m.max(s.abs()));
        let tail_peak = snippet[snippet.len() - 50..]
            .iter()
            .fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(tail_peak < hold_peak * 0.2, "tail {tail_peak} vs hold {hold_peak}");
    }

    #[test]
    fn zero_duration_renders_nothing() {
        assert!(render_tone(Waveform::Square, 440.0, 0.1, 0.0, 44100).is_empty());
    }
}
