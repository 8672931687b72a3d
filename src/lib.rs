pub mod dsp;
pub mod error;
pub mod pose;
pub mod scheduler;
pub mod trail;
pub mod trajectory;
pub mod tuning;
pub mod voice;

use wasm_bindgen::prelude::*;

use crate::error::MotionToneError;
use crate::scheduler::PlaybackSession;
use crate::trajectory::{SystemKind, TrajectoryPayload};
use crate::tuning::{default_controls, ToneControl};
use crate::voice::InstrumentBank;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the motiontone-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Validate a provider payload and render it to WAV bytes.
pub fn render_payload_wav(
    payload: TrajectoryPayload,
    controls: &[ToneControl],
) -> Result<Vec<u8>, MotionToneError> {
    let trajectory = payload.into_trajectory()?;
    Ok(dsp::renderer::render_wav(&trajectory, controls))
}

/// WASM-exposed: render a trajectory payload + tone controls to a WAV byte
/// array, independent of any live session.
#[wasm_bindgen]
pub fn render_trajectory_wav(payload: JsValue, controls: JsValue) -> Result<Vec<u8>, JsValue> {
    let payload: TrajectoryPayload =
        serde_wasm_bindgen::from_value(payload).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let controls: Vec<ToneControl> =
        serde_wasm_bindgen::from_value(controls).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    render_payload_wav(payload, &controls).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: deterministic download name for a system's exported audio.
#[wasm_bindgen]
pub fn export_file_name(system_key: &str) -> Result<String, JsValue> {
    SystemKind::from_key(system_key)
        .map(SystemKind::export_file_name)
        .ok_or_else(|| JsValue::from_str(&format!("unknown system '{system_key}'")))
}

/// WASM-exposed: initial per-voice tone controls for a system.
#[wasm_bindgen]
pub fn default_tone_controls(system_key: &str) -> Result<JsValue, JsValue> {
    let system = SystemKind::from_key(system_key)
        .ok_or_else(|| JsValue::from_str(&format!("unknown system '{system_key}'")))?;
    serde_wasm_bindgen::to_value(&default_controls(system))
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed live playback session for one system.
///
/// The host drives `tick` from its animation callback, passing the latest
/// tone controls each time so edits are heard on the next trigger. Each tick
/// returns the frame to draw plus any rendered note snippets to play, or
/// `null` once the session is cancelled.
#[wasm_bindgen]
pub struct LiveSession {
    session: PlaybackSession,
    bank: std::sync::Arc<InstrumentBank>,
}

#[wasm_bindgen]
impl LiveSession {
    /// Build a session from a provider payload. Instrument samples are not
    /// fetched on this path, so voices articulate through synthesis.
    #[wasm_bindgen(constructor)]
    pub fn new(payload: JsValue) -> Result<LiveSession, JsValue> {
        let payload: TrajectoryPayload = serde_wasm_bindgen::from_value(payload)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        let trajectory = payload
            .into_trajectory()
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        let controls = default_controls(trajectory.system_kind());
        let bank = std::sync::Arc::new(InstrumentBank::new());
        let session = PlaybackSession::new(trajectory, &controls, &bank);
        Ok(LiveSession { session, bank })
    }

    pub fn system_key(&self) -> String {
        self.session.system().key().to_string()
    }

    /// Advance one frame at `now` seconds (the host's audio clock).
    pub fn tick(&mut self, now: f64, controls: JsValue) -> Result<JsValue, JsValue> {
        let controls: Vec<ToneControl> = serde_wasm_bindgen::from_value(controls)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        if !self.session.is_paused() {
            self.session.sync_instruments(&controls, &self.bank);
        }
        match self.session.tick(now, &controls) {
            Some(frame) => serde_wasm_bindgen::to_value(&frame)
                .map_err(|e| JsValue::from_str(&format!("{e}"))),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn resume(&mut self) {
        self.session.resume();
    }

    pub fn toggle_pause(&mut self) {
        self.session.toggle_pause();
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    /// Render this session's trajectory to WAV bytes with the given controls.
    pub fn export_wav(&self, controls: JsValue) -> Result<Vec<u8>, JsValue> {
        let controls: Vec<ToneControl> = serde_wasm_bindgen::from_value(controls)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        Ok(dsp::renderer::render_wav(self.session.trajectory(), &controls))
    }

    pub fn export_file_name(&self) -> String {
        self.session.system().export_file_name()
    }
}
