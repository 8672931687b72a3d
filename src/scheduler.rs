//! Playback scheduling — the live, frame-synchronized loop.
//!
//! The host's animation callback drives `tick`; each tick draws one frame
//! (pose + trail) and, when running, articulates every voice for that same
//! frame. Sessions loop until cancelled. There is no internal timer and
//! nothing in a tick blocks: instrument loading races the loop through
//! single-assignment slots that ticks check non-blockingly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::dsp::{renderer, tone};
use crate::error::ExportError;
use crate::pose::{chain_positions, Point};
use crate::trail::TrailBuffer;
use crate::trajectory::{SystemKind, Trajectory};
use crate::tuning::ToneControl;
use crate::voice::{
    InstrumentBank, NoteSnippet, TriggerOpts, Voice, LIVE_SAMPLE_RATE, NOTE_DURATION,
};

/// Session lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Cancelled,
}

/// Everything the host needs from one tick: the frame drawn and the notes
/// triggered for it. Draw data is computed before any trigger, so the audio
/// always matches the frame on screen.
#[derive(Debug, Clone, Serialize)]
pub struct TickFrame {
    pub frame_index: usize,
    pub pose: Vec<Point>,
    pub trail: Vec<Point>,
    pub notes: Vec<NoteSnippet>,
}

/// Shared cancellation flag; cloning hands out another handle to the same
/// session.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One run of the live playback loop for one system.
#[derive(Debug)]
pub struct PlaybackSession {
    trajectory: Trajectory,
    system: SystemKind,
    state: SessionState,
    frame: u64,
    trail: TrailBuffer,
    voices: Vec<Voice>,
    cancel: CancelHandle,
}

impl PlaybackSession {
    /// Create a session, resolving each voice's backend once up front.
    pub fn new(trajectory: Trajectory, controls: &[ToneControl], bank: &InstrumentBank) -> Self {
        let system = trajectory.system_kind();
        let voices = controls
            .iter()
            .take(trajectory.segment_count())
            .map(|control| {
                Voice::new(
                    control.instrument,
                    bank.resolve(control.instrument),
                    LIVE_SAMPLE_RATE,
                )
            })
            .collect();
        PlaybackSession {
            trajectory,
            system,
            state: SessionState::Idle,
            frame: 0,
            trail: TrailBuffer::new(system.trail_capacity()),
            voices,
            cancel: CancelHandle::default(),
        }
    }

    pub fn system(&self) -> SystemKind {
        self.system
    }

    pub fn state(&self) -> SessionState {
        if self.cancel.is_cancelled() {
            SessionState::Cancelled
        } else {
            self.state
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Effective frame index for the next tick.
    pub fn frame_index(&self) -> usize {
        (self.frame % self.trajectory.frame_count() as u64) as usize
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    pub fn pause(&mut self) {
        if self.state == SessionState::Running || self.state == SessionState::Idle {
            self.state = SessionState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.state = SessionState::Running;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Handle for cancelling this session from outside the tick loop.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel cooperatively: the next tick will not execute.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.state = SessionState::Cancelled;
    }

    /// Advance one animation frame at `now` seconds of session time.
    ///
    /// Returns `None` once cancelled. While paused the current frame is
    /// still drawn (so the visual stays live), but the frame index does not
    /// advance and no voice triggers fire.
    pub fn tick(&mut self, now: f64, controls: &[ToneControl]) -> Option<TickFrame> {
        if self.cancel.is_cancelled() {
            self.state = SessionState::Cancelled;
            return None;
        }
        if self.state == SessionState::Idle {
            self.state = SessionState::Running;
        }

        let index = self.frame_index();
        let segments = self.trajectory.segment_count();

        // Draw first: collect this frame's kinematic state, substituting a
        // resting segment for malformed samples instead of stopping the loop.
        let mut draw_angles = Vec::with_capacity(segments);
        let mut frame_samples = Vec::with_capacity(segments);
        for segment in 0..segments {
            match self.trajectory.sample(segment, index) {
                Some((angle, velocity)) => {
                    draw_angles.push(angle);
                    frame_samples.push(Some((angle, velocity)));
                }
                None => {
                    log::warn!(
                        "{}: bad sample at frame {index} segment {segment}, drawing at rest",
                        self.system.key()
                    );
                    draw_angles.push(0.0);
                    frame_samples.push(None);
                }
            }
        }

        let pose = chain_positions(&draw_angles, self.trajectory.lengths());
        if let Some(&end_effector) = pose.last() {
            self.trail.push(end_effector);
        }

        let mut notes = Vec::new();
        if self.state == SessionState::Running {
            for (segment, voice) in self.voices.iter_mut().enumerate() {
                let Some(control) = controls.get(segment) else {
                    continue;
                };
                // A malformed frame suppresses this voice for this tick only.
                let Some((angle, velocity)) = frame_samples[segment] else {
                    continue;
                };
                let (frequency, gain) = tone::live_tone(angle, velocity, control);
                let opts = TriggerOpts {
                    gain,
                    duration: NOTE_DURATION,
                };
                if let Some(snippet) = voice.trigger(frequency, now, opts) {
                    notes.push(snippet);
                }
            }
            self.frame += 1;
        }

        Some(TickFrame {
            frame_index: index,
            pose,
            trail: self.trail.to_vec(),
            notes,
        })
    }

    /// Swap a voice's backend when its configured instrument changed.
    ///
    /// Reads the latest controls, so UI edits are picked up without
    /// buffering; the replacement voice resolves through the same bank (a
    /// cache hit when the instrument was seen before).
    pub fn sync_instruments(&mut self, controls: &[ToneControl], bank: &InstrumentBank) {
        for (segment, voice) in self.voices.iter_mut().enumerate() {
            let Some(control) = controls.get(segment) else {
                continue;
            };
            if voice.instrument() != control.instrument {
                *voice = Voice::new(
                    control.instrument,
                    bank.resolve(control.instrument),
                    LIVE_SAMPLE_RATE,
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn voices(&self) -> &[Voice] {
        &self.voices
    }
}

/// Owner of the live sessions, one per visualized system, plus the shared
/// instrument cache. Starting a trajectory for a system always cancels the
/// session already running for it.
#[derive(Debug, Default)]
pub struct Playback {
    bank: Arc<InstrumentBank>,
    sessions: HashMap<SystemKind, PlaybackSession>,
    #[cfg(feature = "instruments")]
    loader: Option<Arc<crate::voice::loader::SoundfontLoader>>,
}

impl Playback {
    pub fn new() -> Self {
        Playback::default()
    }

    pub fn with_bank(bank: Arc<InstrumentBank>) -> Self {
        Playback {
            bank,
            ..Playback::default()
        }
    }

    /// Resolve voices through a soundfont service; loads start when a session
    /// first needs an instrument. Must be driven from a tokio runtime.
    #[cfg(feature = "instruments")]
    pub fn with_soundfont_loader(loader: crate::voice::loader::SoundfontLoader) -> Self {
        Playback {
            loader: Some(Arc::new(loader)),
            ..Playback::default()
        }
    }

    pub fn bank(&self) -> &Arc<InstrumentBank> {
        &self.bank
    }

    /// Begin resolution for an instrument so later cache hits find it.
    /// Without a configured loader this settles the slot to the fallback.
    fn warm(&self, instrument: crate::tuning::Instrument) {
        #[cfg(feature = "instruments")]
        if let Some(loader) = &self.loader {
            self.bank.resolve_remote(instrument, loader);
            return;
        }
        let _ = self.bank.resolve(instrument);
    }

    /// Start playing a trajectory, cancelling any prior session for the same
    /// system so exactly one tick loop stays active per canvas.
    pub fn start(&mut self, trajectory: Trajectory, controls: &[ToneControl]) -> SystemKind {
        let system = trajectory.system_kind();
        for control in controls.iter().take(trajectory.segment_count()) {
            self.warm(control.instrument);
        }
        if let Some(previous) = self.sessions.get_mut(&system) {
            previous.cancel();
        }
        let session = PlaybackSession::new(trajectory, controls, &self.bank);
        self.sessions.insert(system, session);
        system
    }

    pub fn session(&self, system: SystemKind) -> Option<&PlaybackSession> {
        self.sessions.get(&system)
    }

    pub fn session_mut(&mut self, system: SystemKind) -> Option<&mut PlaybackSession> {
        self.sessions.get_mut(&system)
    }

    /// Tick the session for a system, keeping voice backends in sync with
    /// the latest controls first.
    pub fn tick(
        &mut self,
        system: SystemKind,
        now: f64,
        controls: &[ToneControl],
    ) -> Option<TickFrame> {
        let bank = Arc::clone(&self.bank);
        if self.sessions.get(&system).is_some_and(|s| !s.is_paused()) {
            for control in controls {
                self.warm(control.instrument);
            }
        }
        let session = self.sessions.get_mut(&system)?;
        if !session.is_paused() {
            session.sync_instruments(controls, &bank);
        }
        session.tick(now, controls)
    }

    pub fn cancel(&mut self, system: SystemKind) {
        if let Some(mut session) = self.sessions.remove(&system) {
            session.cancel();
        }
    }

    /// Render the live trajectory for a system to WAV bytes.
    ///
    /// Fails descriptively when there is nothing to export: no session at
    /// all, or only a session for a different system.
    pub fn export_wav(
        &self,
        system: SystemKind,
        controls: &[ToneControl],
    ) -> Result<Vec<u8>, ExportError> {
        match self.sessions.get(&system) {
            Some(session) => Ok(renderer::render_wav(session.trajectory(), controls)),
            None => match self.sessions.keys().next() {
                Some(loaded) => Err(ExportError::SystemMismatch {
                    requested: system.key().to_string(),
                    loaded: loaded.key().to_string(),
                }),
                None => Err(ExportError::NoTrajectory),
            },
        }
    }
}
