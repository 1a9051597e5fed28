//! Hand landmarks and the single pose the whiteboard understands:
//! index finger extended, the other three curled.
//!
//! Landmarks use the MediaPipe hand convention (21 points, normalised 0..1,
//! y grows downward).

use crate::types::Point;

/// Landmark indices used by the classifier.
pub mod landmarks {
    pub const COUNT: usize = 21;

    pub const WRIST: usize = 0;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// Plausible range of a normalised coordinate.
const COORD_MIN: f32 = -1.0;
const COORD_MAX: f32 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub landmarks: [Landmark; landmarks::COUNT],
    pub score: f32,
    pub handedness: String,
}

impl HandLandmarks {
    pub fn new(landmarks: [Landmark; landmarks::COUNT]) -> Self {
        Self { landmarks, score: 1.0, handedness: String::new() }
    }

    /// Every landmark is finite and within a frame's width of the image.
    /// Anything else is a detector glitch.
    pub fn is_plausible(&self) -> bool {
        let ok = |v: f32| (COORD_MIN..=COORD_MAX).contains(&v);
        self.landmarks.iter().all(|lm| ok(lm.x) && ok(lm.y))
    }

    /// Index fingertip scaled to frame pixels. Off-frame tips stay within one
    /// frame of the border.
    pub fn fingertip(&self, width: usize, height: usize) -> Point {
        let tip = &self.landmarks[landmarks::INDEX_TIP];
        let scale = |v: f32, size: usize| (v.clamp(COORD_MIN, COORD_MAX) * size as f32) as i32;
        Point::new(scale(tip.x, width), scale(tip.y, height))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    IndexOnly,
    Other,
}

/// Stateless per-frame classification.
pub fn classify(hand: &HandLandmarks) -> HandPose {
    use landmarks::*;
    let lm = &hand.landmarks;

    let index_up = lm[INDEX_TIP].y < lm[INDEX_PIP].y;
    let others_down = [(MIDDLE_TIP, MIDDLE_PIP), (RING_TIP, RING_PIP), (PINKY_TIP, PINKY_PIP)]
        .iter()
        .all(|&(tip, pip)| lm[tip].y > lm[pip].y);

    if index_up && others_down { HandPose::IndexOnly } else { HandPose::Other }
}

/// Holds back pose changes until they have been seen for `stable_frames`
/// consecutive frames. With `stable_frames == 1` every frame's pose passes
/// straight through.
#[derive(Debug)]
pub struct PoseFilter {
    stable_frames: u32,
    reported: Option<HandPose>,
    candidate: Option<HandPose>,
    streak: u32,
}

impl PoseFilter {
    pub fn new(stable_frames: u32) -> Self {
        Self { stable_frames: stable_frames.max(1), reported: None, candidate: None, streak: 0 }
    }

    /// Feed this frame's raw pose (None = no hand). Returns the pose to act on.
    pub fn update(&mut self, raw: Option<HandPose>) -> Option<HandPose> {
        let Some(pose) = raw else {
            self.reset();
            return None;
        };

        if self.candidate == Some(pose) {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.candidate = Some(pose);
            self.streak = 1;
        }

        if self.streak >= self.stable_frames {
            self.reported = Some(pose);
        }
        // A freshly reappeared hand is not trusted to be drawing until it settles.
        Some(self.reported.unwrap_or(HandPose::Other))
    }

    pub fn reset(&mut self) {
        self.reported = None;
        self.candidate = None;
        self.streak = 0;
    }
}
