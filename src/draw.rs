// Window + software drawing utilities.
// Visual: the camera feed in a plain window, with panels, keys, text and
// thumbnails painted straight into the pixel buffer.
// Everything here is clipped: drawing partly or fully off-screen is fine and
// simply touches fewer pixels.

use crate::error::Error;
use crate::types::{FrameBuffer, Rect, pack_rgb, unpack_rgb};
use image::RgbImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

/// Single-key commands to the application (not the virtual keyboard).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppCommand {
    ToggleMode,
    SaveSketch,
    Clear,
    ResetResponse,
    ToggleHelp,
    Quit,
}

const COMMAND_KEYS: [(Key, AppCommand); 7] = [
    (Key::M, AppCommand::ToggleMode),
    (Key::S, AppCommand::SaveSketch),
    (Key::C, AppCommand::Clear),
    (Key::R, AppCommand::ResetResponse),
    (Key::H, AppCommand::ToggleHelp),
    (Key::Q, AppCommand::Quit),
    (Key::Escape, AppCommand::Quit),
];

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Create a window sized to the camera feed.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: the window immediately shows the composed frame.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Returns false when the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Commands whose key went down since the last frame, in table order.
    /// Holding a key fires it once, not every frame.
    pub fn poll_commands(&self) -> Vec<AppCommand> {
        COMMAND_KEYS
            .iter()
            .filter(|(key, _)| self.window.is_key_pressed(*key, KeyRepeat::No))
            .map(|(_, cmd)| *cmd)
            .collect()
    }

    /// Mouse position in window pixels, None when outside the window.
    /// Visual: with no detector, the fingertip marker follows this point.
    pub fn mouse_pos(&self) -> Option<(f32, f32)> {
        self.window.get_mouse_pos(MouseMode::Discard)
    }

    /// Visual: while held, the simulated hand points and ink follows the mouse.
    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }
}

/* ---------- Software drawing: pixels, shapes, blits ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
/// Visual: the exact pixel at (x,y) changes color.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Mix `color` into the pixel at (x,y) with weight `alpha` (0..=1).
#[inline]
fn blend_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32, alpha: f32) {
    if x < 0 || y < 0 || x as usize >= fb.width || y as usize >= fb.height {
        return;
    }
    let idx = y as usize * fb.width + x as usize;
    fb.pixels[idx] = mix(fb.pixels[idx], color, alpha);
}

/// a·(1−t) + b·t per channel
pub fn mix(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let (ar, ag, ab) = unpack_rgb(a);
    let (br, bg, bb) = unpack_rgb(b);
    let ch = |x: u8, y: u8| (x as f32 * (1.0 - t) + y as f32 * t).round() as u8;
    pack_rgb(ch(ar, br), ch(ag, bg), ch(ab, bb))
}

/// Clip `r` to the frame; None when nothing is left.
fn clip(fb: &FrameBuffer, r: Rect) -> Option<(usize, usize, usize, usize)> {
    let x0 = r.x.max(0) as usize;
    let y0 = r.y.max(0) as usize;
    let x1 = (r.right().max(0) as usize).min(fb.width);
    let y1 = (r.bottom().max(0) as usize).min(fb.height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

pub fn fill_rect(fb: &mut FrameBuffer, r: Rect, color: u32) {
    let Some((x0, y0, x1, y1)) = clip(fb, r) else { return };
    for y in y0..y1 {
        fb.pixels[y * fb.width + x0..y * fb.width + x1].fill(color);
    }
}

/// Translucent panel: blends `color` over whatever is already there.
/// Visual: a dark glass box; the video stays faintly visible through it.
pub fn fill_rect_blend(fb: &mut FrameBuffer, r: Rect, color: u32, alpha: f32) {
    let Some((x0, y0, x1, y1)) = clip(fb, r) else { return };
    for y in y0..y1 {
        for px in &mut fb.pixels[y * fb.width + x0..y * fb.width + x1] {
            *px = mix(*px, color, alpha);
        }
    }
}

/// Outline with the border growing inward by `thickness` pixels.
pub fn stroke_rect(fb: &mut FrameBuffer, r: Rect, color: u32, thickness: i32) {
    let t = thickness.max(1).min(r.w / 2).min(r.h / 2).max(1);
    fill_rect(fb, Rect::new(r.x, r.y, r.w, t), color);
    fill_rect(fb, Rect::new(r.x, r.bottom() - t, r.w, t), color);
    fill_rect(fb, Rect::new(r.x, r.y, t, r.h), color);
    fill_rect(fb, Rect::new(r.right() - t, r.y, t, r.h), color);
}

/// Vertical gradient from `top` to `bottom` color.
/// Visual: the typed-text bar fades from light at the top to dark below.
pub fn fill_rect_gradient(fb: &mut FrameBuffer, r: Rect, top: u32, bottom: u32) {
    for i in 0..r.h.max(0) {
        let t = if r.h > 1 { i as f32 / (r.h - 1) as f32 } else { 0.0 };
        fill_rect(fb, Rect::new(r.x, r.y + i, r.w, 1), mix(top, bottom, t));
    }
}

pub fn fill_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32) {
    let r2 = radius * radius;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= r2 {
                put_pixel(fb, cx + x, cy + y, color);
            }
        }
    }
}

/// Ring between `radius - thickness` and `radius`.
/// Visual: the outline around the fingertip dot.
pub fn stroke_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, thickness: i32, color: u32) {
    let outer = radius * radius;
    let inner = (radius - thickness).max(0).pow(2);
    for y in -radius..=radius {
        for x in -radius..=radius {
            let d = x * x + y * y;
            if d <= outer && d >= inner {
                put_pixel(fb, cx + x, cy + y, color);
            }
        }
    }
}

/// Copy an RGB image onto the frame with its top-left at (x,y).
/// Unlike the shape helpers this refuses partial placement.
pub fn blit_rgb(fb: &mut FrameBuffer, img: &RgbImage, x: i32, y: i32) -> Result<(), Error> {
    let (w, h) = (img.width() as i32, img.height() as i32);
    if x < 0 || y < 0 || x + w > fb.width as i32 || y + h > fb.height as i32 {
        return Err(Error::WindowUpdate(format!(
            "blit {w}x{h} at ({x},{y}) outside {}x{} frame",
            fb.width, fb.height
        )));
    }
    for (ix, iy, p) in img.enumerate_pixels() {
        put_pixel(fb, x + ix as i32, y + iy as i32, pack_rgb(p[0], p[1], p[2]));
    }
    Ok(())
}

/* ---------- 5x7 bitmap font ---------- */

pub const GLYPH_W: i32 = 5;
pub const GLYPH_H: i32 = 7;

/// Return a 5x7 glyph bitmap. Lowercase letters render as uppercase.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b10001,0b01010,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        ';' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00100,0b01000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00100,0b00100,0b01000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '?' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b00000,0b00100),
        '\'' => g!(0b00100,0b00100,0b01000,0b00000,0b00000,0b00000,0b00000),
        '"' => g!(0b01010,0b01010,0b00000,0b00000,0b00000,0b00000,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),
        '*' => g!(0b00000,0b10101,0b01110,0b11111,0b01110,0b10101,0b00000),
        '/' => g!(0b00001,0b00001,0b00010,0b00100,0b01000,0b10000,0b10000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '<' => g!(0b00010,0b00100,0b01000,0b10000,0b01000,0b00100,0b00010),
        '>' => g!(0b01000,0b00100,0b00010,0b00001,0b00010,0b00100,0b01000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        '%' => g!(0b11001,0b11001,0b00010,0b00100,0b01000,0b10011,0b10011),
        '&' => g!(0b01100,0b10010,0b10100,0b01000,0b10101,0b10010,0b01101),
        '@' => g!(0b01110,0b10001,0b10111,0b10101,0b10111,0b10000,0b01110),

        _ => None,
    }
}

/// Width in pixels of `text` at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * (GLYPH_W + 1) * scale
}

/// Draw one glyph, each font pixel becoming a `scale`×`scale` block.
/// A one-block black shadow keeps text readable over video.
/// Visual: a blocky glyph with a dark drop shadow down and to the right.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (pass_color, off) in [(0x00000000, scale), (color, 0)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..GLYPH_W {
                if rowbits & (1 << (4 - rx)) != 0 {
                    let r = Rect::new(x + rx * scale + off, y + ry as i32 * scale + off, scale, scale);
                    fill_rect(fb, r, pass_color);
                }
            }
        }
    }
}

/// Draw a text string; each glyph advances 6 font pixels.
/// Visual: a compact HUD string; scale 2 or 3 for headings and key labels.
pub fn draw_text(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    let scale = scale.max(1);
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += (GLYPH_W + 1) * scale;
    }
}

/// Soft glow dot used for the fingertip marker edge.
pub fn blend_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32, alpha: f32) {
    let r2 = radius * radius;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= r2 {
                blend_pixel(fb, cx + x, cy + y, color, alpha);
            }
        }
    }
}
