//! Trajectory data model — the precomputed time series handed over by the
//! simulation provider.
//!
//! A trajectory is immutable after creation: per-segment angle and angular
//! velocity series sampled at a fixed `dt`, plus static segment lengths. The
//! engine never integrates anything itself.

use serde::Deserialize;

use crate::error::TrajectoryError;

/// The visualized systems the engine knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKind {
    DoublePendulum,
    TriplePendulum,
}

impl SystemKind {
    /// Stable identifier used by hosts (tab keys, export names).
    pub fn key(self) -> &'static str {
        match self {
            SystemKind::DoublePendulum => "double-pendulum",
            SystemKind::TriplePendulum => "triple-pendulum",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "double-pendulum" => Some(SystemKind::DoublePendulum),
            "triple-pendulum" => Some(SystemKind::TriplePendulum),
            _ => None,
        }
    }

    pub fn segment_count(self) -> usize {
        match self {
            SystemKind::DoublePendulum => 2,
            SystemKind::TriplePendulum => 3,
        }
    }

    /// Capacity of the motion trail kept for rendering.
    pub fn trail_capacity(self) -> usize {
        match self {
            SystemKind::DoublePendulum => 240,
            SystemKind::TriplePendulum => 360,
        }
    }

    /// Deterministic name for an exported recording.
    pub fn export_file_name(self) -> String {
        format!("{}-audio.wav", self.key())
    }

    pub fn from_segment_count(count: usize) -> Result<Self, TrajectoryError> {
        match count {
            2 => Ok(SystemKind::DoublePendulum),
            3 => Ok(SystemKind::TriplePendulum),
            _ => Err(TrajectoryError::UnsupportedSegmentCount { count }),
        }
    }
}

/// A validated, immutable trajectory: parallel angle/velocity series per
/// segment, all of equal length, sampled every `dt` seconds.
#[derive(Debug, Clone)]
pub struct Trajectory {
    dt: f64,
    lengths: Vec<f64>,
    angles: Vec<Vec<f64>>,
    velocities: Vec<Vec<f64>>,
    /// Declared total time; falls back to `frame_count * dt` when absent.
    total_time: Option<f64>,
}

impl Trajectory {
    pub fn new(
        dt: f64,
        lengths: Vec<f64>,
        angles: Vec<Vec<f64>>,
        velocities: Vec<Vec<f64>>,
        total_time: Option<f64>,
    ) -> Result<Self, TrajectoryError> {
        if !(dt > 0.0) {
            return Err(TrajectoryError::NonPositiveDt { dt });
        }
        let segments = angles.len();
        SystemKind::from_segment_count(segments)?;
        if lengths.len() != segments || velocities.len() != segments {
            return Err(TrajectoryError::MismatchedSeries {
                expected: segments,
                found: lengths.len().min(velocities.len()),
            });
        }
        let frames = angles[0].len();
        if frames == 0 {
            return Err(TrajectoryError::EmptySeries);
        }
        for series in angles.iter().chain(velocities.iter()) {
            if series.len() != frames {
                return Err(TrajectoryError::MismatchedSeries {
                    expected: frames,
                    found: series.len(),
                });
            }
        }
        Ok(Trajectory {
            dt,
            lengths,
            angles,
            velocities,
            total_time,
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn segment_count(&self) -> usize {
        self.angles.len()
    }

    pub fn frame_count(&self) -> usize {
        self.angles[0].len()
    }

    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    pub fn system_kind(&self) -> SystemKind {
        // Segment count was validated at construction.
        match self.segment_count() {
            2 => SystemKind::DoublePendulum,
            _ => SystemKind::TriplePendulum,
        }
    }

    /// Total playback time in seconds.
    pub fn duration(&self) -> f64 {
        self.total_time
            .unwrap_or(self.frame_count() as f64 * self.dt)
    }

    /// Angle and angular velocity for one segment at one frame.
    ///
    /// Returns `None` for out-of-range indices or non-finite samples, so
    /// callers can substitute a resting pose and skip triggering instead of
    /// propagating garbage.
    pub fn sample(&self, segment: usize, frame: usize) -> Option<(f64, f64)> {
        let angle = *self.angles.get(segment)?.get(frame)?;
        let velocity = *self.velocities.get(segment)?.get(frame)?;
        if angle.is_finite() && velocity.is_finite() {
            Some((angle, velocity))
        } else {
            None
        }
    }
}

/// Wire shape of the simulation provider's response, merged with the segment
/// lengths the host submitted. Field names follow the provider exactly.
#[derive(Debug, Clone, Deserialize)]
pub struct TrajectoryPayload {
    pub theta1: Vec<f64>,
    pub theta2: Vec<f64>,
    #[serde(default)]
    pub theta3: Option<Vec<f64>>,
    #[serde(default)]
    pub theta1d: Vec<f64>,
    #[serde(default)]
    pub theta2d: Vec<f64>,
    #[serde(default)]
    pub theta3d: Option<Vec<f64>>,
    #[serde(rename = "L1")]
    pub l1: f64,
    #[serde(rename = "L2")]
    pub l2: f64,
    #[serde(default, rename = "L3")]
    pub l3: Option<f64>,
    #[serde(default)]
    pub meta: Option<PayloadMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadMeta {
    pub dt: f64,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub t_max: Option<f64>,
}

/// Default sample spacing when the provider omits metadata.
pub const DEFAULT_DT: f64 = 0.02;

impl TrajectoryPayload {
    /// Number of segments carried by this payload.
    pub fn segment_count(&self) -> usize {
        if self.theta3.is_some() { 3 } else { 2 }
    }

    /// Validate and convert into an engine trajectory.
    ///
    /// Velocity series the provider omitted are padded with zeros; the
    /// matching triggers will then articulate at the base gain, which is what
    /// the original player did for missing samples.
    pub fn into_trajectory(self) -> Result<Trajectory, TrajectoryError> {
        let frames = self.theta1.len();
        let pad = |series: Vec<f64>| -> Vec<f64> {
            if series.is_empty() {
                vec![0.0; frames]
            } else {
                series
            }
        };

        let mut angles = vec![self.theta1, self.theta2];
        let mut velocities = vec![pad(self.theta1d), pad(self.theta2d)];
        let mut lengths = vec![self.l1, self.l2];
        if let Some(theta3) = self.theta3 {
            angles.push(theta3);
            velocities.push(pad(self.theta3d.unwrap_or_default()));
            lengths.push(self.l3.unwrap_or(1.0));
        }

        let (dt, t_max) = match &self.meta {
            Some(meta) => (meta.dt, meta.t_max),
            None => (DEFAULT_DT, None),
        };
        Trajectory::new(dt, lengths, angles, velocities, t_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segment(frames: usize) -> Trajectory {
        let series = vec![0.5; frames];
        Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![series.clone(), series.clone()],
            vec![series.clone(), series],
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_series() {
        let err = Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![vec![], vec![]],
            vec![vec![], vec![]],
            None,
        )
        .unwrap_err();
        assert_eq!(err, TrajectoryError::EmptySeries);
    }

    #[test]
    fn rejects_mismatched_series() {
        let err = Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![vec![0.0; 10], vec![0.0; 9]],
            vec![vec![0.0; 10], vec![0.0; 10]],
            None,
        )
        .unwrap_err();
        assert_eq!(err, TrajectoryError::MismatchedSeries { expected: 10, found: 9 });
    }

    #[test]
    fn rejects_bad_dt_and_segment_count() {
        let err = Trajectory::new(0.0, vec![1.0], vec![vec![0.0]], vec![vec![0.0]], None)
            .unwrap_err();
        assert_eq!(err, TrajectoryError::NonPositiveDt { dt: 0.0 });

        let err = Trajectory::new(0.02, vec![1.0], vec![vec![0.0]], vec![vec![0.0]], None)
            .unwrap_err();
        assert_eq!(err, TrajectoryError::UnsupportedSegmentCount { count: 1 });
    }

    #[test]
    fn duration_prefers_declared_total() {
        let t = two_segment(500);
        assert!((t.duration() - 10.0).abs() < 1e-12);

        let declared = Trajectory::new(
            0.02,
            vec![1.0, 1.0],
            vec![vec![0.0; 500], vec![0.0; 500]],
            vec![vec![0.0; 500], vec![0.0; 500]],
            Some(12.0),
        )
        .unwrap();
        assert!((declared.duration() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn sample_filters_bad_values() {
        let angles = vec![vec![0.1, 0.2], vec![0.3, f64::NAN]];
        let velocities = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let t = Trajectory::new(0.02, vec![1.0, 1.0], angles, velocities, None).unwrap();

        assert_eq!(t.sample(0, 0), Some((0.1, 0.0)));
        assert_eq!(t.sample(1, 1), None, "non-finite angle is rejected");
        assert_eq!(t.sample(0, 2), None, "out of range frame");
        assert_eq!(t.sample(5, 0), None, "out of range segment");
    }

    #[test]
    fn payload_round_trip() {
        let json = r#"{
            "t": [0.0, 0.02, 0.04],
            "theta1": [1.2, 1.19, 1.18],
            "theta2": [-0.4, -0.41, -0.42],
            "theta1d": [0.0, -0.5, -1.0],
            "theta2d": [0.0, -0.3, -0.6],
            "L1": 1.0,
            "L2": 1.5,
            "meta": {"t_max": 12.0, "dt": 0.02, "count": 3}
        }"#;
        let payload: TrajectoryPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.segment_count(), 2);
        let trajectory = payload.into_trajectory().unwrap();
        assert_eq!(trajectory.frame_count(), 3);
        assert_eq!(trajectory.system_kind(), SystemKind::DoublePendulum);
        assert_eq!(trajectory.lengths(), &[1.0, 1.5]);
        assert!((trajectory.duration() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn payload_pads_missing_velocities() {
        let json = r#"{
            "theta1": [1.0, 0.9],
            "theta2": [0.5, 0.4],
            "theta3": [0.1, 0.0],
            "L1": 1.0,
            "L2": 1.0,
            "L3": 1.0
        }"#;
        let payload: TrajectoryPayload = serde_json::from_str(json).unwrap();
        let trajectory = payload.into_trajectory().unwrap();
        assert_eq!(trajectory.system_kind(), SystemKind::TriplePendulum);
        assert_eq!(trajectory.sample(2, 1), Some((0.0, 0.0)));
        assert!((trajectory.dt() - DEFAULT_DT).abs() < 1e-12);
    }

    #[test]
    fn export_names_follow_system_key() {
        assert_eq!(
            SystemKind::DoublePendulum.export_file_name(),
            "double-pendulum-audio.wav"
        );
        assert_eq!(
            SystemKind::TriplePendulum.export_file_name(),
            "triple-pendulum-audio.wav"
        );
    }
}
