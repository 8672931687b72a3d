//! WAV renderer — deterministic offline re-synthesis of a trajectory.
//!
//! Always uses additive sine synthesis with the offline gain curve; sample
//! playback never participates, so the output depends only on the trajectory
//! and the tuning passed in.

use super::tone;
use crate::trajectory::Trajectory;
use crate::tuning::ToneControl;

/// Fixed output rate for exported audio.
pub const SAMPLE_RATE: u32 = 44100;

/// Hard limit applied to the summed signal before quantization.
const MIX_CLAMP: f64 = 0.9;

/// Render a trajectory to a WAV file as bytes (16-bit mono PCM).
pub fn render_wav(trajectory: &Trajectory, controls: &[ToneControl]) -> Vec<u8> {
    let pcm = render_pcm_i16(trajectory, controls);
    encode_wav(&pcm, SAMPLE_RATE, 1)
}

/// Render the quantized sample stream.
///
/// Each output sample reads the nearest past trajectory frame (no
/// interpolation) and sums one sine per voice. A degenerate duration still
/// produces a single sample so the container stays valid.
pub fn render_pcm_i16(trajectory: &Trajectory, controls: &[ToneControl]) -> Vec<i16> {
    let dt = trajectory.dt();
    let frame_count = trajectory.frame_count();
    let samples = ((trajectory.duration() * SAMPLE_RATE as f64).floor() as i64).max(1) as usize;
    let voices: Vec<&ToneControl> = controls.iter().take(trajectory.segment_count()).collect();

    let mut pcm = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f64 / SAMPLE_RATE as f64;
        let index = ((t / dt).floor() as i64).clamp(0, frame_count as i64 - 1) as usize;

        let mut mixed = 0.0;
        for (segment, control) in voices.iter().enumerate() {
            // Non-finite frames silence this voice for this sample.
            let Some((angle, velocity)) = trajectory.sample(segment, index) else {
                continue;
            };
            let (frequency, gain) = tone::offline_tone(angle, velocity, control);
            mixed += gain * (2.0 * std::f64::consts::PI * frequency * t).sin();
        }

        let clamped = mixed.clamp(-MIX_CLAMP, MIX_CLAMP);
        pcm.push((clamped * 0x7fff as f64) as i16);
    }
    pcm
}

/// Encode i16 PCM samples to a WAV byte buffer with a 44-byte header.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::SystemKind;
    use crate::tuning::default_controls;

    fn swinging_trajectory(frames: usize, total_time: Option<f64>) -> Trajectory {
        let angles: Vec<f64> = (0..frames).map(|i| (i as f64 * 0.05).sin()).collect();
        let velocities: Vec<f64> = (0..frames).map(|i| (i as f64 * 0.05).cos()).collect();
        Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![angles.clone(), angles],
            vec![velocities.clone(), velocities],
            total_time,
        )
        .unwrap()
    }

    #[test]
    fn wav_header_fields_exact() {
        let trajectory = swinging_trajectory(50, None);
        let controls = default_controls(SystemKind::DoublePendulum);
        let wav = render_wav(&trajectory, &controls);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        // PCM, mono, 16 bits at 44100 Hz
        assert_eq!(u16::from_le_bytes([wav[20], wav[21]]), 1);
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 44100);
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 88200);
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 2);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
    }

    #[test]
    fn byte_length_is_header_plus_samples() {
        let trajectory = swinging_trajectory(50, None);
        let controls = default_controls(SystemKind::DoublePendulum);
        let wav = render_wav(&trajectory, &controls);

        // 50 frames * 0.02 s = 1 s = 44100 samples
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 88200);
        assert_eq!(wav.len(), 44 + 88200);
    }

    #[test]
    fn ten_second_export_is_882044_bytes() {
        let trajectory = swinging_trajectory(500, None);
        let controls = default_controls(SystemKind::DoublePendulum);
        let wav = render_wav(&trajectory, &controls);
        assert_eq!(wav.len(), 882044);
    }

    #[test]
    fn degenerate_duration_still_renders_one_sample() {
        let trajectory = swinging_trajectory(10, Some(0.0));
        let controls = default_controls(SystemKind::DoublePendulum);
        let wav = render_wav(&trajectory, &controls);
        assert_eq!(wav.len(), 44 + 2);
    }

    #[test]
    fn output_is_not_silent_and_bounded() {
        let trajectory = swinging_trajectory(100, None);
        let controls = default_controls(SystemKind::DoublePendulum);
        let pcm = render_pcm_i16(&trajectory, &controls);

        let limit = (MIX_CLAMP * 0x7fff as f64) as i16;
        let mut peak = 0i16;
        for &s in &pcm {
            assert!(s.abs() <= limit, "sample {s} above mix clamp");
            peak = peak.max(s.abs());
        }
        assert!(peak > 100, "rendered audio should be non-silent, peak={peak}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let trajectory = swinging_trajectory(200, None);
        let controls = default_controls(SystemKind::DoublePendulum);
        assert_eq!(
            render_wav(&trajectory, &controls),
            render_wav(&trajectory, &controls)
        );
    }

    #[test]
    fn non_finite_frames_silence_only_that_stretch() {
        let mut angles = vec![0.5; 50];
        for a in angles.iter_mut().take(25) {
            *a = f64::NAN;
        }
        let velocities = vec![1.0; 50];
        let trajectory = Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![angles, vec![f64::NAN; 50]],
            vec![velocities.clone(), velocities],
            None,
        )
        .unwrap();
        let controls = default_controls(SystemKind::DoublePendulum);
        let pcm = render_pcm_i16(&trajectory, &controls);

        // First half: both voices silent. Second half: voice 1 plays.
        let first_half_peak = pcm[..22050].iter().map(|s| s.abs()).max().unwrap();
        let second_half_peak = pcm[22050..].iter().map(|s| s.abs()).max().unwrap();
        assert_eq!(first_half_peak, 0);
        assert!(second_half_peak > 100);
    }
}
