//! Forward kinematics and canvas projection for pendulum poses.

use serde::{Deserialize, Serialize};

use crate::trajectory::SystemKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };
}

/// Chain joint positions from a fixed origin, y growing downward.
///
/// `x_k = x_{k-1} + L_k sin(theta_k)`, `y_k = y_{k-1} + L_k cos(theta_k)`.
/// The returned vector includes the origin, so it has `angles.len() + 1`
/// entries and the last one is the end effector. Non-finite angles draw as a
/// resting segment (angle zero) rather than poisoning the chain.
pub fn chain_positions(angles: &[f64], lengths: &[f64]) -> Vec<Point> {
    let mut points = Vec::with_capacity(angles.len() + 1);
    let mut current = Point::ORIGIN;
    points.push(current);
    for (&angle, &length) in angles.iter().zip(lengths.iter()) {
        let angle = if angle.is_finite() { angle } else { 0.0 };
        let length = if length.is_finite() { length } else { 0.0 };
        current = Point {
            x: current.x + length * angle.sin(),
            y: current.y + length * angle.cos(),
        };
        points.push(current);
    }
    points
}

/// Mapping from physical pose space to a host canvas.
///
/// Matches the lab's layout: pivot centered horizontally, 40 px down, with
/// the chain scaled to fit the shorter canvas dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanvasViewport {
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale: f64,
}

impl CanvasViewport {
    pub fn for_system(system: SystemKind, width: f64, height: f64, total_length: f64) -> Self {
        let fill = match system {
            SystemKind::DoublePendulum => 0.45,
            SystemKind::TriplePendulum => 0.42,
        };
        let reach = if total_length > 0.0 { total_length } else { 1.0 };
        CanvasViewport {
            origin_x: width / 2.0,
            origin_y: 40.0,
            scale: width.min(height) * fill / reach,
        }
    }

    pub fn project(&self, point: Point) -> Point {
        Point {
            x: self.origin_x + point.x * self.scale,
            y: self.origin_y + point.y * self.scale,
        }
    }
}
