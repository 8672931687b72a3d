//! Sample-based note playback.
//!
//! An instrument is a set of per-note sample zones. Triggering picks the
//! zone rooted nearest the requested pitch and resamples it with linear
//! interpolation, so one recording covers the pitches around it.

use crate::dsp::envelope::DecayEnvelope;

/// A mono sample buffer at its native rate.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data = pcm.iter().map(|&s| s as f32 / 32768.0).collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Read with linear interpolation at a fractional position; positions
    /// outside the buffer read as silence.
    pub fn read_interpolated(&self, position: f64) -> f32 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }
        let idx = position as usize;
        if idx + 1 >= self.data.len() {
            return if idx < self.data.len() {
                self.data[idx]
            } else {
                0.0
            };
        }
        let frac = (position - idx as f64) as f32;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

/// One recorded note: the MIDI key it was recorded at plus its audio.
#[derive(Debug, Clone)]
pub struct NoteZone {
    pub midi: u8,
    pub buffer: SampleBuffer,
}

/// A loaded instrument: its soundfont program name and note zones.
#[derive(Debug, Clone)]
pub struct InstrumentSamples {
    program: String,
    zones: Vec<NoteZone>,
}

/// MIDI note number for a frequency (A4 = 69 = 440 Hz), fractional.
pub fn frequency_to_midi(frequency_hz: f64) -> f64 {
    69.0 + 12.0 * (frequency_hz / 440.0).log2()
}

/// Frequency for a (possibly fractional) MIDI note number.
pub fn midi_to_frequency(midi: f64) -> f64 {
    440.0 * (2.0_f64).powf((midi - 69.0) / 12.0)
}

impl InstrumentSamples {
    pub fn new(program: impl Into<String>, mut zones: Vec<NoteZone>) -> Self {
        zones.sort_by_key(|z| z.midi);
        InstrumentSamples {
            program: program.into(),
            zones,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Zone whose root note is closest to the requested (fractional) key.
    pub fn nearest_zone(&self, midi: f64) -> Option<&NoteZone> {
        self.zones.iter().min_by(|a, b| {
            let da = (a.midi as f64 - midi).abs();
            let db = (b.midi as f64 - midi).abs();
            da.total_cmp(&db)
        })
    }

    /// Render one triggered note as a mono snippet at `sample_rate`.
    ///
    /// The zone is resampled so its root pitch lands on `frequency_hz`, then
    /// shaped by the shared decay envelope so the snippet ends at zero.
    pub fn render_note(
        &self,
        frequency_hz: f64,
        gain: f64,
        duration: f64,
        sample_rate: u32,
    ) -> Vec<f32> {
        let Some(zone) = self.nearest_zone(frequency_to_midi(frequency_hz)) else {
            return Vec::new();
        };
        let root_hz = midi_to_frequency(zone.midi as f64);
        let step = (frequency_hz / root_hz)
            * (zone.buffer.sample_rate() as f64 / sample_rate as f64);

        let envelope = DecayEnvelope::new(duration);
        let count = (duration * sample_rate as f64).floor().max(0.0) as usize;
        let mut out = Vec::with_capacity(count);
        let mut position = 0.0;
        for i in 0..count {
            let t = i as f64 / sample_rate as f64;
            let level = (gain * envelope.level_at(t)) as f32;
            out.push(zone.buffer.read_interpolated(position) * level);
            position += step;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(frequency: f64, seconds: f64, sample_rate: u32) -> SampleBuffer {
        let count = (seconds * sample_rate as f64) as usize;
        let data = (0..count)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
            })
            .collect();
        SampleBuffer::new(data, sample_rate)
    }

    fn test_instrument() -> InstrumentSamples {
        InstrumentSamples::new(
            "acoustic_grand_piano",
            vec![
                NoteZone { midi: 60, buffer: sine_buffer(261.63, 0.5, 44100) },
                NoteZone { midi: 69, buffer: sine_buffer(440.0, 0.5, 44100) },
                NoteZone { midi: 81, buffer: sine_buffer(880.0, 0.5, 44100) },
            ],
        )
    }

    #[test]
    fn midi_conversions_round_trip() {
        assert!((frequency_to_midi(440.0) - 69.0).abs() < 1e-9);
        assert!((midi_to_frequency(69.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(frequency_to_midi(523.25)) - 523.25).abs() < 1e-6);
    }

    #[test]
    fn nearest_zone_picks_closest_root() {
        let instrument = test_instrument();
        assert_eq!(instrument.nearest_zone(60.4).unwrap().midi, 60);
        assert_eq!(instrument.nearest_zone(67.0).unwrap().midi, 69);
        assert_eq!(instrument.nearest_zone(120.0).unwrap().midi, 81);
    }

    #[test]
    fn interpolated_read_is_linear_between_samples() {
        let buffer = SampleBuffer::new(vec![0.0, 1.0], 44100);
        assert!((buffer.read_interpolated(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(buffer.read_interpolated(5.0), 0.0);
        assert_eq!(buffer.read_interpolated(-1.0), 0.0);
    }

    #[test]
    fn rendered_note_respects_gain_and_length() {
        let instrument = test_instrument();
        let snippet = instrument.render_note(440.0, 0.2, 0.15, 44100);
        assert_eq!(snippet.len(), (0.15 * 44100.0) as usize);

        let peak = snippet.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.05, "sampled note should be audible, peak={peak}");
        assert!(peak <= 0.2 + 1e-3, "gain bounds the output, peak={peak}");
        let tail = snippet.last().unwrap().abs();
        assert!(tail < 0.01, "snippet should end near silence, got {tail}");
    }

    #[test]
    fn render_with_no_zones_is_silent() {
        let instrument = InstrumentSamples::new("flute", Vec::new());
        assert!(instrument.render_note(440.0, 0.1, 0.15, 44100).is_empty());
    }
}
