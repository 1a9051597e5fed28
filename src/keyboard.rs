//! On-screen keyboard: static key rows, the layout math shared by rendering
//! and hit-testing, and the typed-text buffer the keys edit.

use crate::config::KeyboardConfig;
use crate::types::{Point, Rect};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyId {
    Char(char),
    Delete,
    Space,
    Clear,
    Send,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidthClass {
    Normal,
    Double,
    Triple,
}

impl WidthClass {
    pub fn multiplier(self) -> i32 {
        match self {
            WidthClass::Normal => 1,
            WidthClass::Double => 2,
            WidthClass::Triple => 3,
        }
    }
}

impl KeyId {
    pub fn width_class(self) -> WidthClass {
        match self {
            KeyId::Space => WidthClass::Triple,
            KeyId::Clear | KeyId::Send => WidthClass::Double,
            KeyId::Char(_) | KeyId::Delete => WidthClass::Normal,
        }
    }

    /// Control keys get a different look from letters.
    pub fn is_special(self) -> bool {
        !matches!(self, KeyId::Char(_))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Char(c) => write!(f, "{c}"),
            KeyId::Delete => f.write_str("<-"),
            KeyId::Space => f.write_str("SPACE"),
            KeyId::Clear => f.write_str("CLEAR"),
            KeyId::Send => f.write_str("SEND"),
        }
    }
}

use KeyId::Char as C;

pub const ROWS: [&[KeyId]; 4] = [
    &[C('Q'), C('W'), C('E'), C('R'), C('T'), C('Y'), C('U'), C('I'), C('O'), C('P')],
    &[C('A'), C('S'), C('D'), C('F'), C('G'), C('H'), C('J'), C('K'), C('L')],
    &[C('Z'), C('X'), C('C'), C('V'), C('B'), C('N'), C('M'), KeyId::Delete],
    &[KeyId::Space, KeyId::Clear, KeyId::Send],
];

/// One key placed on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBox {
    pub key: KeyId,
    pub row: usize,
    pub rect: Rect,
}

#[derive(Clone, Debug)]
pub struct KeyboardLayout {
    pub key_w: i32,
    pub key_h: i32,
    pub margin: i32,
    /// y of the first row
    pub top: i32,
}

impl KeyboardLayout {
    pub fn new(key_w: i32, key_h: i32, margin: i32, top: i32) -> Self {
        Self { key_w, key_h, margin, top }
    }

    pub fn from_config(cfg: &KeyboardConfig) -> Self {
        Self::new(cfg.key_width as i32, cfg.key_height as i32, cfg.key_margin as i32, cfg.top)
    }

    /// The panel the keys are centered in, for a frame of `frame_w` pixels.
    pub fn panel_for(&self, frame_w: usize, width_ratio: f32) -> Rect {
        Rect::new(
            20,
            self.top - 50,
            (frame_w as f32 * width_ratio) as i32,
            ROWS.len() as i32 * (self.key_h + self.margin) + 70,
        )
    }

    pub fn key_width(&self, key: KeyId) -> i32 {
        self.key_w * key.width_class().multiplier()
    }

    /// Keys plus the gaps between them (no trailing margin).
    pub fn row_width(&self, row: &[KeyId]) -> i32 {
        row.iter().map(|&k| self.key_width(k) + self.margin).sum::<i32>() - self.margin
    }

    /// Every key's box, rows top to bottom, keys left to right.
    /// Rendering and hit-testing both go through here.
    pub fn key_boxes(&self, panel: Rect) -> Vec<KeyBox> {
        let mut out = Vec::with_capacity(ROWS.iter().map(|r| r.len()).sum());
        for (row_idx, row) in ROWS.iter().enumerate() {
            let mut x = panel.x + (panel.w - self.row_width(row)).div_euclid(2);
            let y = self.top + row_idx as i32 * (self.key_h + self.margin);
            for &key in row.iter() {
                let w = self.key_width(key);
                out.push(KeyBox { key, row: row_idx, rect: Rect::new(x, y, w, self.key_h) });
                x += w + self.margin;
            }
        }
        out
    }

    /// First key whose box strictly contains `p`.
    pub fn hit_test(&self, p: Point, panel: Rect) -> Option<KeyBox> {
        self.key_boxes(panel).into_iter().find(|kb| kb.rect.contains_strict(p))
    }
}

/// What the caller must do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    Send,
}

/// Text typed so far on the virtual keyboard.
#[derive(Debug, Default)]
pub struct TypedBuffer {
    text: String,
}

impl TypedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one key press. `Send` leaves the text alone; the caller reads
    /// and then clears it.
    pub fn activate(&mut self, key: KeyId) -> Option<ControlSignal> {
        match key {
            KeyId::Char(c) => self.text.push(c),
            KeyId::Space => self.text.push(' '),
            KeyId::Delete => {
                self.text.pop();
            }
            KeyId::Clear => self.text.clear(),
            KeyId::Send => return Some(ControlSignal::Send),
        }
        None
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> KeyboardLayout {
        KeyboardLayout::new(60, 60, 10, 140)
    }

    #[test]
    fn width_classes() {
        let l = layout();
        assert_eq!(l.key_width(KeyId::Space), 180);
        assert_eq!(l.key_width(KeyId::Send), 120);
        assert_eq!(l.key_width(KeyId::Clear), 120);
        assert_eq!(l.key_width(KeyId::Delete), 60);
        assert_eq!(l.key_width(C('Q')), 60);
        // SPACE + CLEAR + SEND + two gaps
        assert_eq!(l.row_width(ROWS[3]), 180 + 120 + 120 + 20);
    }

    #[test]
    fn rows_are_centered_and_stacked() {
        let l = layout();
        let panel = Rect::new(20, 90, 819, 350);
        let boxes = l.key_boxes(panel);
        let q = boxes.iter().find(|b| b.key == C('Q')).unwrap();
        // 10 keys * 60 + 9 * 10 = 690; (819 - 690) / 2 = 64
        assert_eq!(q.rect, Rect::new(20 + 64, 140, 60, 60));
        let a = boxes.iter().find(|b| b.key == C('A')).unwrap();
        assert_eq!(a.rect.y, 140 + 70);
        assert_eq!(a.row, 1);
        let space = boxes.iter().find(|b| b.key == KeyId::Space).unwrap();
        assert_eq!(space.rect.y, 140 + 3 * 70);
    }

    #[test]
    fn every_key_center_hits_itself() {
        // smallest accepted keys, packed with no margin
        for l in [layout(), KeyboardLayout::new(2, 2, 0, 140)] {
            for panel in [Rect::new(20, 90, 819, 350), Rect::new(0, 0, 300, 100), Rect::new(-40, 0, 1500, 10)] {
                for kb in l.key_boxes(panel) {
                    let hit = l.hit_test(kb.rect.center(), panel).unwrap();
                    assert_eq!(hit.key, kb.key);
                    assert_eq!(hit.rect, kb.rect);
                }
            }
        }
    }

    #[test]
    fn gaps_and_borders_hit_nothing() {
        let l = layout();
        let panel = Rect::new(20, 90, 819, 350);
        let q = l.hit_test(Point::new(114, 170), panel).unwrap();
        assert_eq!(q.key, C('Q'));
        // left border of Q, gap between Q and W, above the first row
        assert!(l.hit_test(Point::new(q.rect.x, 170), panel).is_none());
        assert!(l.hit_test(Point::new(q.rect.right() + 5, 170), panel).is_none());
        assert!(l.hit_test(Point::new(114, 100), panel).is_none());
    }

    #[test]
    fn panel_geometry() {
        let l = layout();
        assert_eq!(l.panel_for(1280, 0.64), Rect::new(20, 90, 819, 4 * 70 + 70));
    }

    #[test]
    fn typed_buffer_edits() {
        let mut b = TypedBuffer::new();
        b.activate(KeyId::Delete); // no-op on empty
        for k in [C('H'), C('I'), KeyId::Space, C('X')] {
            assert_eq!(b.activate(k), None);
        }
        assert_eq!(b.text(), "HI X");
        b.activate(KeyId::Delete);
        assert_eq!(b.text(), "HI ");
        b.activate(KeyId::Clear);
        assert_eq!(b.text(), "");
    }

    #[test]
    fn send_signals_without_clearing() {
        let mut b = TypedBuffer::new();
        for c in "HELLO".chars() {
            b.activate(C(c));
        }
        assert_eq!(b.activate(KeyId::Send), Some(ControlSignal::Send));
        assert_eq!(b.text(), "HELLO");
        let sent = b.text().to_string();
        b.clear();
        assert_eq!(sent, "HELLO");
        assert_eq!(b.text(), "");
    }

    #[test]
    fn labels() {
        assert_eq!(KeyId::Delete.to_string(), "<-");
        assert_eq!(C('K').to_string(), "K");
        assert!(KeyId::Send.is_special());
        assert!(!C('K').is_special());
    }
}
