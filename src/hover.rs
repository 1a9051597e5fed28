//! Dwell-to-press: turns a noisy per-frame fingertip position into discrete,
//! debounced key presses.
//!
//! A key fires once the point has stayed on it for `threshold`. After firing,
//! the same key cannot fire again until the point leaves the keyboard (or
//! another key fires), so holding still on a key types it exactly once.

use crate::keyboard::{KeyBox, KeyId, KeyboardLayout};
use crate::types::{Point, Rect};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result of one frame's update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoverUpdate {
    /// Key under the point and where it is drawn.
    pub hovered: Option<KeyBox>,
    /// 0.0..=1.0 fill for the hovered key's progress bar.
    pub progress: f32,
    /// Set on the single frame a key fires.
    pub activated: Option<KeyId>,
}

impl HoverUpdate {
    /// Nothing hovered, nothing fired.
    pub fn idle() -> Self {
        Self { hovered: None, progress: 0.0, activated: None }
    }
}

#[derive(Debug)]
pub struct HoverEngine {
    threshold: Duration,
    dwell_start: HashMap<KeyId, Instant>,
    hovered: Option<KeyId>,
    last_activated: Option<KeyId>,
}

impl HoverEngine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            dwell_start: HashMap::new(),
            hovered: None,
            last_activated: None,
        }
    }

    /// Advance the state machine. `point == None` means no hand this frame.
    pub fn update(
        &mut self,
        point: Option<Point>,
        layout: &KeyboardLayout,
        panel: Rect,
        now: Instant,
    ) -> HoverUpdate {
        let Some(hit) = point.and_then(|p| layout.hit_test(p, panel)) else {
            self.reset();
            return HoverUpdate::idle();
        };
        let key = hit.key;

        // Only the key under the point may hold a timer.
        self.dwell_start.retain(|k, _| *k == key);
        self.hovered = Some(key);

        let start = *self.dwell_start.entry(key).or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        let progress = (elapsed.as_secs_f32() / self.threshold.as_secs_f32()).min(1.0);

        let mut activated = None;
        if elapsed >= self.threshold && self.last_activated != Some(key) {
            log::debug!("Key {key} activated after {:.2}s dwell", elapsed.as_secs_f32());
            self.dwell_start.clear();
            self.last_activated = Some(key);
            activated = Some(key);
        }

        HoverUpdate { hovered: Some(hit), progress, activated }
    }

    /// Forget every timer and the debounce marker.
    pub fn reset(&mut self) {
        self.dwell_start.clear();
        self.hovered = None;
        self.last_activated = None;
    }

    pub fn hovered(&self) -> Option<KeyId> {
        self.hovered
    }

    pub fn has_dwell_state(&self) -> bool {
        !self.dwell_start.is_empty() || self.last_activated.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyId::Char as C;

    const THRESHOLD: Duration = Duration::from_secs(1);

    struct Rig {
        engine: HoverEngine,
        layout: KeyboardLayout,
        panel: Rect,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                engine: HoverEngine::new(THRESHOLD),
                layout: KeyboardLayout::new(60, 60, 10, 140),
                panel: Rect::new(20, 90, 819, 350),
                t0: Instant::now(),
            }
        }

        fn center_of(&self, key: KeyId) -> Point {
            self.layout
                .key_boxes(self.panel)
                .into_iter()
                .find(|kb| kb.key == key)
                .map(|kb| kb.rect.center())
                .unwrap()
        }

        fn at(&mut self, p: Option<Point>, ms: u64) -> HoverUpdate {
            let now = self.t0 + Duration::from_millis(ms);
            self.engine.update(p, &self.layout, self.panel, now)
        }

        fn on(&mut self, key: KeyId, ms: u64) -> HoverUpdate {
            let p = self.center_of(key);
            self.at(Some(p), ms)
        }
    }

    #[test]
    fn fires_once_at_threshold() {
        let mut rig = Rig::new();
        let mut fired = Vec::new();
        for ms in (0..=1000).step_by(50) {
            if let Some(k) = rig.on(C('A'), ms).activated {
                fired.push((k, ms));
            }
        }
        assert_eq!(fired, vec![(C('A'), 1000)]);
    }

    #[test]
    fn holding_past_threshold_does_not_repeat() {
        let mut rig = Rig::new();
        let mut count = 0;
        for ms in (0..=3000).step_by(10) {
            if rig.on(C('A'), ms).activated.is_some() {
                count += 1;
            }
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn progress_grows_and_caps() {
        let mut rig = Rig::new();
        assert_eq!(rig.on(C('A'), 0).progress, 0.0);
        let half = rig.on(C('A'), 500).progress;
        assert!((half - 0.5).abs() < 1e-3, "{half}");
        assert_eq!(rig.on(C('A'), 1000).progress, 1.0);
    }

    #[test]
    fn switching_keys_restarts_dwell() {
        let mut rig = Rig::new();
        rig.on(C('A'), 0);
        assert!(rig.on(C('A'), 700).progress > 0.6);
        // straight onto a neighbour, never crossing empty space
        assert_eq!(rig.on(C('S'), 750).progress, 0.0);
        let back = rig.on(C('A'), 800);
        assert_eq!(back.progress, 0.0);
        assert_eq!(back.activated, None);
        // needs a full threshold from the return
        assert_eq!(rig.on(C('A'), 1500).activated, None);
        assert_eq!(rig.on(C('A'), 1800).activated, Some(C('A')));
    }

    #[test]
    fn empty_space_clears_everything() {
        let mut rig = Rig::new();
        rig.on(C('A'), 0);
        rig.on(C('A'), 1000);
        assert!(rig.engine.has_dwell_state());

        let miss = rig.at(Some(Point::new(5, 5)), 1100);
        assert_eq!(miss, HoverUpdate { hovered: None, progress: 0.0, activated: None });
        assert!(!rig.engine.has_dwell_state());
        assert_eq!(rig.engine.hovered(), None);

        // A can fire again after leaving
        rig.on(C('A'), 1200);
        assert_eq!(rig.on(C('A'), 2200).activated, Some(C('A')));
    }

    #[test]
    fn lost_hand_clears_everything() {
        let mut rig = Rig::new();
        rig.on(C('A'), 0);
        rig.on(C('A'), 500);
        rig.at(None, 600);
        assert!(!rig.engine.has_dwell_state());
        assert_eq!(rig.on(C('A'), 700).progress, 0.0);
    }

    #[test]
    fn jitter_inside_one_key_keeps_the_timer() {
        let mut rig = Rig::new();
        let c = rig.center_of(C('A'));
        rig.at(Some(c), 0);
        rig.at(Some(Point::new(c.x + 10, c.y - 8)), 400);
        rig.at(Some(Point::new(c.x - 12, c.y + 5)), 800);
        assert_eq!(rig.at(Some(c), 1000).activated, Some(C('A')));
    }

    #[test]
    fn another_key_can_fire_right_after() {
        let mut rig = Rig::new();
        rig.on(C('A'), 0);
        assert_eq!(rig.on(C('A'), 1000).activated, Some(C('A')));
        rig.on(C('S'), 1050);
        assert_eq!(rig.on(C('S'), 2050).activated, Some(C('S')));
    }
}
