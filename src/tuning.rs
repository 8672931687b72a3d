//! Per-voice tuning state shared between the configuration surface and the
//! engine.
//!
//! `ToneControl` is owned and edited by the host UI; the engine only ever
//! reads it, once per trigger, so edits are audible on the very next note.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::trajectory::SystemKind;

/// The fixed instrument set voices can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Guitar,
    Flute,
    Organ,
    Strings,
}

impl Instrument {
    /// Oscillator shape used when sample playback is unavailable.
    pub fn waveform(self) -> Waveform {
        match self {
            Instrument::Guitar => Waveform::Triangle,
            Instrument::Organ => Waveform::Square,
            Instrument::Strings => Waveform::Sawtooth,
            Instrument::Piano | Instrument::Flute => Waveform::Sine,
        }
    }

    /// General MIDI program name in the soundfont library.
    pub fn soundfont_name(self) -> &'static str {
        match self {
            Instrument::Piano => "acoustic_grand_piano",
            Instrument::Guitar => "acoustic_guitar_nylon",
            Instrument::Flute => "flute",
            Instrument::Organ => "drawbar_organ",
            Instrument::Strings => "string_ensemble_1",
        }
    }
}

/// Tuning for one voice: how a segment's angle and angular velocity become
/// pitch and loudness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneControl {
    /// Frequency at angle zero, Hz.
    #[serde(rename = "base")]
    pub base_hz: f64,
    /// Frequency slope, Hz per radian.
    #[serde(rename = "scale")]
    pub scale_hz_per_rad: f64,
    pub instrument: Instrument,
    /// Multiplier on the angular-velocity contribution to gain.
    #[serde(rename = "vel")]
    pub velocity_gain: f64,
}

impl ToneControl {
    pub fn new(base_hz: f64, scale_hz_per_rad: f64, instrument: Instrument) -> Self {
        ToneControl {
            base_hz,
            scale_hz_per_rad,
            instrument,
            velocity_gain: 1.0,
        }
    }
}

/// Initial per-voice tuning, one entry per segment.
pub fn default_controls(system: SystemKind) -> Vec<ToneControl> {
    let mut controls = vec![
        ToneControl::new(240.0, 90.0, Instrument::Piano),
        ToneControl::new(360.0, 110.0, Instrument::Flute),
    ];
    if system == SystemKind::TriplePendulum {
        controls.push(ToneControl::new(480.0, 120.0, Instrument::Organ));
    }
    controls
}
