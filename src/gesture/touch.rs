use std::fmt;
use tracing::warn;

/// Platform identifier of one finger, stable for the lifetime of the touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub u64);

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One changed touch as delivered by the input surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub id: TouchId,
    pub x: f32,
    pub y: f32,
    pub force: Option<f32>,
}

impl TouchSample {
    pub fn new(id: u64, x: f32, y: f32) -> Self {
        Self {
            id: TouchId(id),
            x,
            y,
            force: None,
        }
    }

    pub fn with_force(mut self, force: f32) -> Self {
        self.force = Some(force);
        self
    }
}

/// Last known state of an active touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: TouchId,
    pub x: f32,
    pub y: f32,
    pub force: f32,
}

impl TouchPoint {
    pub fn from_sample(sample: &TouchSample) -> Self {
        Self {
            id: sample.id,
            x: sample.x,
            y: sample.y,
            force: sample.force.and_then(sanitize_force).unwrap_or(0.0),
        }
    }

    /// Distance travelled from the stored position to the sample
    pub fn delta_to(&self, sample: &TouchSample) -> (f32, f32) {
        (sample.x - self.x, sample.y - self.y)
    }

    pub fn update_position(&mut self, sample: &TouchSample) {
        self.x = sample.x;
        self.y = sample.y;
    }
}

/// Arithmetic mean of all positions, `(0, 0)` for an empty set
pub fn centroid<'a>(points: impl IntoIterator<Item = &'a TouchPoint>) -> (f32, f32) {
    let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
    for point in points {
        sum_x += point.x;
        sum_y += point.y;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    (sum_x / count as f32, sum_y / count as f32)
}

/// Rejects NaN and clamps everything else into `[0, 1]`
pub fn sanitize_force(force: f32) -> Option<f32> {
    if force.is_nan() {
        warn!("Discarding NaN force reading");
        return None;
    }
    Some(force.clamp(0.0, 1.0))
}
