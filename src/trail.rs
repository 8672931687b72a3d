//! Motion trail — a fixed-capacity ring buffer of recent end-effector
//! positions, used only for rendering.

use crate::pose::Point;

/// Ring buffer with eviction-on-push. Capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    points: Vec<Point>,
    head: usize,
    capacity: usize,
}

impl TrailBuffer {
    pub fn new(capacity: usize) -> Self {
        TrailBuffer {
            points: Vec::with_capacity(capacity),
            head: 0,
            capacity: capacity.max(1),
        }
    }

    /// Append a point, evicting the oldest when at capacity.
    pub fn push(&mut self, point: Point) {
        if self.points.len() < self.capacity {
            self.points.push(point);
        } else {
            self.points[self.head] = point;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all points (a new trajectory starts with a clean trail).
    pub fn clear(&mut self) {
        self.points.clear();
        self.head = 0;
    }

    /// Points in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        let (newer, older) = self.points.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Snapshot in insertion order, for handing across the wasm boundary.
    pub fn to_vec(&self) -> Vec<Point> {
        self.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64) -> Point {
        Point { x, y: 0.0 }
    }

    #[test]
    fn fills_up_to_capacity() {
        let mut trail = TrailBuffer::new(3);
        trail.push(p(1.0));
        trail.push(p(2.0));
        assert_eq!(trail.len(), 2);
        let xs: Vec<f64> = trail.iter().map(|pt| pt.x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut trail = TrailBuffer::new(3);
        for i in 0..5 {
            trail.push(p(i as f64));
        }
        assert_eq!(trail.len(), 3);
        let xs: Vec<f64> = trail.iter().map(|pt| pt.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn clear_resets_order() {
        let mut trail = TrailBuffer::new(2);
        trail.push(p(1.0));
        trail.push(p(2.0));
        trail.push(p(3.0));
        trail.clear();
        assert!(trail.is_empty());
        trail.push(p(9.0));
        let xs: Vec<f64> = trail.iter().map(|pt| pt.x).collect();
        assert_eq!(xs, vec![9.0]);
    }

    #[test]
    fn capacity_never_exceeded_under_load() {
        let mut trail = TrailBuffer::new(240);
        for i in 0..10_000 {
            trail.push(p(i as f64));
        }
        assert_eq!(trail.len(), 240);
        assert_eq!(trail.iter().next().unwrap().x, 9760.0);
    }
}
