use std::fmt;

#[derive(Debug)]
pub enum MotionToneError {
    Trajectory(TrajectoryError),
    Export(ExportError),
}

/// Rejections raised while validating an incoming trajectory.
#[derive(Debug, PartialEq)]
pub enum TrajectoryError {
    EmptySeries,
    MismatchedSeries { expected: usize, found: usize },
    NonPositiveDt { dt: f64 },
    UnsupportedSegmentCount { count: usize },
}

/// Rejections raised by an export request against the live state.
#[derive(Debug, PartialEq)]
pub enum ExportError {
    NoTrajectory,
    SystemMismatch { requested: String, loaded: String },
}

impl fmt::Display for MotionToneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionToneError::Trajectory(e) => write!(f, "Trajectory error: {e}"),
            MotionToneError::Export(e) => write!(f, "Export error: {e}"),
        }
    }
}

impl std::error::Error for MotionToneError {}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::EmptySeries => write!(f, "Trajectory has no frames"),
            TrajectoryError::MismatchedSeries { expected, found } => {
                write!(f, "Series length mismatch: expected {expected}, found {found}")
            }
            TrajectoryError::NonPositiveDt { dt } => {
                write!(f, "Sample spacing must be positive, got {dt}")
            }
            TrajectoryError::UnsupportedSegmentCount { count } => {
                write!(f, "Only 2- or 3-segment systems are supported, got {count}")
            }
        }
    }
}

impl std::error::Error for TrajectoryError {}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NoTrajectory => write!(f, "No simulation to export yet."),
            ExportError::SystemMismatch { requested, loaded } => {
                write!(f, "Live simulation is for {loaded}, not {requested}")
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl From<TrajectoryError> for MotionToneError {
    fn from(e: TrajectoryError) -> Self {
        MotionToneError::Trajectory(e)
    }
}

impl From<ExportError> for MotionToneError {
    fn from(e: ExportError) -> Self {
        MotionToneError::Export(e)
    }
}
