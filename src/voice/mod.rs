//! Voice backends — "play a pitched note now" behind two interchangeable
//! implementations.
//!
//! A voice resolves once per playback session to either a loaded instrument
//! (sample playback) or the synthesizer fallback. Resolution is asynchronous
//! and cached; ticks never wait on it. Each voice carries a last-trigger
//! watermark for rate limiting.

pub mod sampler;
pub mod synth;

#[cfg(feature = "instruments")]
pub mod loader;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::Serialize;

use crate::dsp::oscillator::Waveform;
use crate::tuning::Instrument;
use self::sampler::InstrumentSamples;

/// Minimum gap between two audible triggers on one voice, seconds.
pub const MIN_RETRIGGER_GAP: f64 = 0.08;
/// Length of a triggered note, seconds.
pub const NOTE_DURATION: f64 = 0.15;
/// Gain used when a trigger does not specify one.
pub const DEFAULT_TRIGGER_GAIN: f64 = 0.08;
/// Output rate for live note snippets.
pub const LIVE_SAMPLE_RATE: u32 = 44100;

/// Per-trigger playback options.
#[derive(Debug, Clone, Copy)]
pub struct TriggerOpts {
    pub gain: f64,
    pub duration: f64,
}

impl Default for TriggerOpts {
    fn default() -> Self {
        TriggerOpts {
            gain: DEFAULT_TRIGGER_GAIN,
            duration: NOTE_DURATION,
        }
    }
}

/// A rendered note handed to the host for playback at `when` seconds.
#[derive(Debug, Clone, Serialize)]
pub struct NoteSnippet {
    pub when: f64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Observed state of an instrument's single-assignment load slot.
#[derive(Debug, Clone)]
pub enum SlotState {
    /// Load in flight; the voice stays silent rather than waiting.
    Pending,
    Loaded(Arc<InstrumentSamples>),
    /// Load failed or no sample service configured; synth fallback.
    Unavailable,
}

/// Single-assignment handle to an instrument load, shared between the loader
/// and any number of voices. Checked non-blockingly on every trigger.
#[derive(Debug, Clone, Default)]
pub struct InstrumentSlot(Arc<OnceLock<Option<Arc<InstrumentSamples>>>>);

impl InstrumentSlot {
    pub fn pending() -> Self {
        InstrumentSlot::default()
    }

    pub fn state(&self) -> SlotState {
        match self.0.get() {
            None => SlotState::Pending,
            Some(Some(samples)) => SlotState::Loaded(Arc::clone(samples)),
            Some(None) => SlotState::Unavailable,
        }
    }

    /// Assign the loaded samples. Returns false if the slot was already set.
    pub fn fulfill(&self, samples: InstrumentSamples) -> bool {
        self.0.set(Some(Arc::new(samples))).is_ok()
    }

    /// Mark the load as failed. Returns false if the slot was already set.
    pub fn reject(&self) -> bool {
        self.0.set(None).is_ok()
    }

    /// True when both handles observe the same underlying slot.
    pub fn shares_with(&self, other: &InstrumentSlot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Append-only instrument cache shared across voices and sessions.
///
/// Entries are never evicted or mutated once created: resolving the same
/// instrument twice always yields the same slot. One failed load marks the
/// sample service unreachable, and later instruments skip straight to the
/// fallback — availability does not change mid-session.
#[derive(Debug, Default)]
pub struct InstrumentBank {
    slots: Mutex<HashMap<Instrument, InstrumentSlot>>,
    service_down: AtomicBool,
}

impl InstrumentBank {
    pub fn new() -> Self {
        InstrumentBank::default()
    }

    pub fn mark_unreachable(&self) {
        self.service_down.store(true, Ordering::Relaxed);
    }

    pub fn is_unreachable(&self) -> bool {
        self.service_down.load(Ordering::Relaxed)
    }

    /// Cached slot for an instrument, creating a rejected one on first use.
    ///
    /// This is the path for hosts without a sample service (and for anything
    /// after the service has been marked unreachable): new slots resolve
    /// immediately to the synth fallback. The `instruments` feature adds
    /// `resolve_remote`, which creates pending slots and fills them
    /// asynchronously.
    pub fn resolve(&self, instrument: Instrument) -> InstrumentSlot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots
            .entry(instrument)
            .or_insert_with(|| {
                let slot = InstrumentSlot::pending();
                slot.reject();
                slot
            })
            .clone()
    }

    /// Insert a preloaded instrument (hosts that fetch samples themselves).
    /// A no-op if the instrument was already resolved.
    pub fn preload(&self, instrument: Instrument, samples: InstrumentSamples) -> InstrumentSlot {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = slots.entry(instrument).or_default().clone();
        slot.fulfill(samples);
        slot
    }

    /// Existing slot for an instrument, if any (does not create).
    pub fn get(&self, instrument: Instrument) -> Option<InstrumentSlot> {
        let slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.get(&instrument).cloned()
    }
}

/// One playable voice: the resolved backend plus its rate-limit watermark.
#[derive(Debug, Clone)]
pub struct Voice {
    instrument: Instrument,
    slot: InstrumentSlot,
    fallback: Waveform,
    sample_rate: u32,
    last_trigger: Option<f64>,
}

impl Voice {
    pub fn new(instrument: Instrument, slot: InstrumentSlot, sample_rate: u32) -> Self {
        Voice {
            instrument,
            slot,
            fallback: instrument.waveform(),
            sample_rate,
            last_trigger: None,
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn last_trigger(&self) -> Option<f64> {
        self.last_trigger
    }

    /// Play a note at `when` seconds of session time.
    ///
    /// Returns `None` when the trigger is dropped: retriggered within the
    /// minimum gap (dropped, never queued), or the instrument load is still
    /// pending. Only an audible trigger advances the watermark.
    pub fn trigger(&mut self, frequency_hz: f64, when: f64, opts: TriggerOpts) -> Option<NoteSnippet> {
        if let Some(last) = self.last_trigger {
            if when - last < MIN_RETRIGGER_GAP {
                return None;
            }
        }

        let samples = match self.slot.state() {
            SlotState::Pending => return None,
            SlotState::Loaded(instrument) => {
                instrument.render_note(frequency_hz, opts.gain, opts.duration, self.sample_rate)
            }
            SlotState::Unavailable => synth::render_tone(
                self.fallback,
                frequency_hz,
                opts.gain,
                opts.duration,
                self.sample_rate,
            ),
        };

        self.last_trigger = Some(when);
        Some(NoteSnippet {
            when,
            sample_rate: self.sample_rate,
            samples,
        })
    }
}
