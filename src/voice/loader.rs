//! Asynchronous soundfont loading for sample-based voices.
//!
//! Instruments come from a MIDI.js-style soundfont host: one document per
//! General MIDI program mapping note names ("A0".."C8") to base64 data URLs
//! of short recordings. Loading runs on its own task and settles the
//! instrument's single-assignment slot; the tick loop never waits on it, and
//! a failure is a silent degrade to synthesis, never an error to the caller.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::sampler::{InstrumentSamples, NoteZone, SampleBuffer};
use super::{InstrumentBank, InstrumentSlot};
use crate::tuning::Instrument;

/// Default soundfont host (MIDI.js FluidR3_GM mirror).
pub const DEFAULT_SOUNDFONT_URL: &str =
    "https://gleitz.github.io/midi-js-soundfonts/FluidR3_GM";

/// Internal load failures. These are logged and converted into a fallback,
/// never surfaced to the playback caller.
#[derive(Debug)]
pub enum LoadError {
    Http(reqwest::Error),
    Malformed(String),
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Http(e) => write!(f, "soundfont request failed: {e}"),
            LoadError::Malformed(msg) => write!(f, "soundfont document malformed: {msg}"),
            LoadError::Decode(msg) => write!(f, "sample decode failed: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Http(e)
    }
}

/// Fetches and decodes soundfont documents.
#[derive(Debug)]
pub struct SoundfontLoader {
    base_url: String,
    client: reqwest::Client,
}

impl SoundfontLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        SoundfontLoader {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_default_host() -> Self {
        SoundfontLoader::new(DEFAULT_SOUNDFONT_URL)
    }

    /// Fetch one instrument's soundfont and decode every usable note.
    pub async fn fetch(&self, instrument: Instrument) -> Result<InstrumentSamples, LoadError> {
        let program = instrument.soundfont_name();
        let url = format!("{}/{}-mp3.js", self.base_url.trim_end_matches('/'), program);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let notes = parse_soundfont_document(&body)?;
        let mut zones = Vec::with_capacity(notes.len());
        for (name, data_url) in notes {
            let Some(midi) = note_name_to_midi(&name) else {
                continue;
            };
            match decode_data_url(&data_url) {
                Ok(buffer) => zones.push(NoteZone { midi, buffer }),
                Err(err) => {
                    // One bad note does not sink the instrument.
                    log::warn!("skipping {program} note {name}: {err}");
                }
            }
        }
        if zones.is_empty() {
            return Err(LoadError::Malformed(format!(
                "{program}: no decodable notes"
            )));
        }
        Ok(InstrumentSamples::new(program, zones))
    }
}

impl InstrumentBank {
    /// Cached slot for an instrument, starting an asynchronous load on first
    /// use. Must be called within a tokio runtime.
    ///
    /// Once any load fails the service is treated as unreachable and new
    /// instruments resolve straight to the fallback; slots already loaded
    /// stay loaded (the cache is append-only).
    pub fn resolve_remote(
        self: &Arc<Self>,
        instrument: Instrument,
        loader: &Arc<SoundfontLoader>,
    ) -> InstrumentSlot {
        if self.is_unreachable() {
            return self.resolve(instrument);
        }

        let (slot, started) = {
            let mut slots = match self.slots.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match slots.entry(instrument) {
                std::collections::hash_map::Entry::Occupied(entry) => {
                    (entry.get().clone(), false)
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    (entry.insert(InstrumentSlot::pending()).clone(), true)
                }
            }
        };

        if started {
            let bank = Arc::clone(self);
            let loader = Arc::clone(loader);
            let pending = slot.clone();
            tokio::spawn(async move {
                match loader.fetch(instrument).await {
                    Ok(samples) => {
                        pending.fulfill(samples);
                    }
                    Err(err) => {
                        log::warn!(
                            "instrument {} unavailable, using synthesis fallback: {err}",
                            instrument.soundfont_name()
                        );
                        bank.mark_unreachable();
                        pending.reject();
                    }
                }
            });
        }
        slot
    }
}

/// Extract the note map from a soundfont document.
///
/// MIDI.js documents are a JS assignment (`MIDI.Soundfont.<name> = {...};`)
/// around a JSON object; plain JSON bodies are accepted as-is.
fn parse_soundfont_document(body: &str) -> Result<HashMap<String, String>, LoadError> {
    let trimmed = body.trim_start();
    let json = if trimmed.starts_with('{') {
        trimmed
    } else {
        let anchor = body
            .find("Soundfont")
            .ok_or_else(|| LoadError::Malformed("no Soundfont assignment".into()))?;
        let open = body[anchor..]
            .find('{')
            .map(|i| anchor + i)
            .ok_or_else(|| LoadError::Malformed("no object literal".into()))?;
        let close = body
            .rfind('}')
            .ok_or_else(|| LoadError::Malformed("unterminated object literal".into()))?;
        &body[open..=close]
    };
    serde_json::from_str(json).map_err(|e| LoadError::Malformed(e.to_string()))
}

/// Parse a note name ("A0", "Bb3", "C#5") into a MIDI note number.
fn note_name_to_midi(note: &str) -> Option<u8> {
    let bytes = note.as_bytes();
    let base_semitone: i32 = match *bytes.first()? as char {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut idx = 1;
    let mut semitone = base_semitone;
    match bytes.get(idx).map(|&b| b as char) {
        Some('#') => {
            semitone += 1;
            idx += 1;
        }
        Some('b') => {
            semitone -= 1;
            idx += 1;
        }
        _ => {}
    }

    let octave: i32 = note[idx..].parse().ok()?;
    let midi = (octave + 1) * 12 + semitone;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

/// Decode a `data:audio/...;base64,` URL into a mono sample buffer.
fn decode_data_url(data_url: &str) -> Result<SampleBuffer, LoadError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::Decode("not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::Decode("data URL missing payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(LoadError::Decode("data URL is not base64".into()));
    }
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let mime = header.trim_end_matches(";base64");
    match mime {
        "audio/mp3" | "audio/mpeg" => decode_mp3(&bytes),
        "audio/wav" | "audio/x-wav" | "audio/wave" => decode_wav(&bytes),
        other => Err(LoadError::Decode(format!("unsupported media type {other}"))),
    }
}

fn decode_mp3(bytes: &[u8]) -> Result<SampleBuffer, LoadError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes.to_vec()));
    let mut data: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(minimp3::Frame {
                data: frame,
                sample_rate: rate,
                channels,
                ..
            }) => {
                sample_rate = rate as u32;
                let channels = channels.max(1);
                for chunk in frame.chunks(channels) {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    data.push(sum as f32 / (channels as f32 * 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(LoadError::Decode(format!("{e:?}"))),
        }
    }

    if data.is_empty() || sample_rate == 0 {
        return Err(LoadError::Decode("empty mp3 stream".into()));
    }
    Ok(SampleBuffer::new(data, sample_rate))
}

fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, LoadError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| LoadError::Decode(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(LoadError::Decode(format!(
            "unsupported wav format: {:?} {} bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    let channels = spec.channels.max(1) as usize;
    let samples: Result<Vec<i16>, _> = reader.into_samples::<i16>().collect();
    let samples = samples.map_err(|e| LoadError::Decode(e.to_string()))?;

    let data: Vec<f32> = samples
        .chunks(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            sum as f32 / (channels as f32 * 32768.0)
        })
        .collect();
    if data.is_empty() {
        return Err(LoadError::Decode("empty wav stream".into()));
    }
    Ok(SampleBuffer::new(data, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_names_parse_like_midi() {
        assert_eq!(note_name_to_midi("A4"), Some(69));
        assert_eq!(note_name_to_midi("C4"), Some(60));
        assert_eq!(note_name_to_midi("Bb0"), Some(22));
        assert_eq!(note_name_to_midi("F#3"), Some(54));
        assert_eq!(note_name_to_midi("H2"), None);
        assert_eq!(note_name_to_midi(""), None);
    }

    #[test]
    fn parses_js_wrapped_documents() {
        let body = r#"
            if (typeof(MIDI) === 'undefined') var MIDI = {};
            if (typeof(MIDI.Soundfont) === 'undefined') MIDI.Soundfont = {};
            MIDI.Soundfont.acoustic_grand_piano = {"A0":"data:audio/mp3;base64,AAAA","Bb0":"data:audio/mp3;base64,BBBB"}
        "#;
        let notes = parse_soundfont_document(body).unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes["A0"].starts_with("data:audio/mp3"));
    }

    #[test]
    fn parses_plain_json_documents() {
        let notes =
            parse_soundfont_document(r#"{"C4":"data:audio/wav;base64,AAAA"}"#).unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn rejects_documents_without_object() {
        assert!(parse_soundfont_document("console.log('nope')").is_err());
    }

    #[test]
    fn decodes_wav_data_urls() {
        // Build a tiny valid mono wav via hound, then wrap it as a data URL.
        let mut bytes = Cursor::new(Vec::new());
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 44100,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::new(&mut bytes, spec).unwrap();
            for i in 0..100i32 {
                writer.write_sample((i * 300) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        let url = format!(
            "data:audio/wav;base64,{}",
            BASE64.encode(bytes.into_inner())
        );
        let buffer = decode_data_url(&url).unwrap();
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.sample_rate(), 44100);
    }

    #[test]
    fn rejects_non_base64_payloads() {
        assert!(decode_data_url("data:audio/mp3,notbase64").is_err());
        assert!(decode_data_url("http://example.com/x.mp3").is_err());
    }
}
