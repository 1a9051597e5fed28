// Overlays drawn on top of the composited video: the keyboard panel, the AI
// response panels, the sketch gallery, the help box and the mode badge.
// Nothing here can fail a frame; problems are logged and the element skipped.

use crate::draw::{
    GLYPH_H, blend_circle, blit_rgb, draw_text, fill_circle, fill_rect, fill_rect_blend,
    fill_rect_gradient, stroke_circle, stroke_rect, text_width,
};
use crate::hover::HoverUpdate;
use crate::keyboard::KeyboardLayout;
use crate::sketches::SketchGallery;
use crate::types::{FrameBuffer, Point, Rect, pack_rgb};

const WHITE: u32 = 0x00FF_FFFF;
const BLACK: u32 = 0x0000_0000;

const KEY_COLOR: u32 = 0x00F0_C864;
const SPECIAL_KEY_COLOR: u32 = 0x00FF_50A0;
const KEY_SHADOW: u32 = 0x001E_1E1E;
const PANEL_COLOR: u32 = 0x0040_2020;
const TEXT_BAR_COLOR: u32 = 0x00F0_AA34;
const PROGRESS_COLOR: u32 = 0x0000_FF00;

const HELP_LINES: [&str; 6] = [
    "'M' - Switch Mode",
    "'S' - Save Sketch",
    "'C' - Clear Canvas",
    "'R' - Reset AI",
    "'H' - Toggle Help",
    "'Q' - Quit",
];

/// Greedy word wrap. Paragraphs split on '\n'; blank paragraphs are dropped.
/// Stops once `max_lines` lines are produced.
pub fn wrap_text(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for para in text.split('\n') {
        let mut current = String::new();
        for word in para.split_whitespace() {
            let candidate_len = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if candidate_len <= max_chars || current.is_empty() {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                if lines.len() >= max_lines {
                    return lines;
                }
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
            if lines.len() >= max_lines {
                return lines;
            }
        }
    }
    lines
}

/// Mode label top-left, plus a busy hint while a query is running.
pub fn draw_status(fb: &mut FrameBuffer, mode_label: &str, drawing: bool, busy: bool) {
    fill_rect(fb, Rect::new(10, 10, 190, 40), BLACK);
    let color = if drawing { pack_rgb(0, 255, 0) } else { pack_rgb(0, 165, 255) };
    draw_text(fb, 20, 20, &format!("Mode: {mode_label}"), color, 2);
    if busy {
        draw_text(fb, 10, 60, "AI Processing...", pack_rgb(255, 255, 0), 2);
    }
}

/// Command cheat sheet, bottom-right.
pub fn draw_help(fb: &mut FrameBuffer) {
    let (w, h) = (fb.width as i32, fb.height as i32);
    let panel = Rect::new(w - 330, h - 150, 320, 140);
    fill_rect_blend(fb, panel, BLACK, 0.5);
    let mut y = panel.y + 12;
    for line in HELP_LINES {
        draw_text(fb, panel.x + 10, y, line, WHITE, 2);
        y += 21;
    }
}

/// Keyboard panel, keys, hover progress bar and the typed-text bar.
pub fn draw_keyboard(
    fb: &mut FrameBuffer,
    layout: &KeyboardLayout,
    panel: Rect,
    hover: &HoverUpdate,
    typed: &str,
) {
    fill_rect_blend(fb, panel, PANEL_COLOR, 0.4);

    for kb in layout.key_boxes(panel) {
        let r = kb.rect;
        let (fill, text_color) = if kb.key.is_special() {
            (SPECIAL_KEY_COLOR, BLACK)
        } else {
            (KEY_COLOR, WHITE)
        };
        fill_rect(fb, Rect::new(r.x + 4, r.y + 4, r.w, r.h), KEY_SHADOW);
        fill_rect(fb, r, fill);
        stroke_rect(fb, r, WHITE, 3);

        let label = kb.key.to_string();
        let scale = if label.chars().count() > 1 { 2 } else { 3 };
        let tx = r.x + (r.w - text_width(&label, scale)) / 2;
        let ty = r.y + (r.h - GLYPH_H * scale) / 2;
        draw_text(fb, tx, ty, &label, text_color, scale);
    }

    if let Some(kb) = hover.hovered {
        let r = kb.rect;
        let bar_w = (r.w as f32 * hover.progress) as i32;
        fill_rect(fb, Rect::new(r.x, r.bottom() - 10, bar_w, 10), PROGRESS_COLOR);
    }

    let bar = Rect::new(panel.x, layout.top - 80, panel.w, 28);
    fill_rect_blend(fb, bar, TEXT_BAR_COLOR, 0.3);
    draw_text(fb, bar.x + 28, bar.y + 4, typed, WHITE, 3);
}

/// Floating response box used in draw mode. Nothing is drawn without a response.
pub fn draw_response_overlay(fb: &mut FrameBuffer, response: &str, below_help: bool, max_lines: usize) {
    if response.is_empty() {
        return;
    }
    const MARGIN: i32 = 40;
    const HEADER_H: i32 = 40;
    const PADDING: i32 = 25;
    const LINE_H: i32 = 22;
    const SCALE: i32 = 2;

    let top = MARGIN + if below_help { 270 } else { 50 };
    let width = (fb.width as f32 * 0.4) as i32;
    let max_chars = ((width - 2 * PADDING) / text_width("M", SCALE)).max(1) as usize;
    let lines = wrap_text(response, max_chars, max_lines);

    let box_h = HEADER_H + lines.len() as i32 * LINE_H + 3 * PADDING;
    fill_rect_blend(fb, Rect::new(MARGIN, top, width, box_h), pack_rgb(40, 20, 20), 0.8);
    fill_rect_gradient(fb, Rect::new(MARGIN, top, width, HEADER_H), pack_rgb(150, 80, 30), pack_rgb(100, 40, 10));
    draw_text(fb, MARGIN + 15, top + 12, "AI Response", WHITE, 2);

    let mut y = top + HEADER_H + PADDING;
    for line in &lines {
        draw_text(fb, MARGIN + PADDING, y, line, WHITE, SCALE);
        y += LINE_H;
    }
}

/// Side panel next to the keyboard.
pub fn draw_response_panel(fb: &mut FrameBuffer, rect: Rect, response: &str) {
    const HEADER_H: i32 = 40;
    const PADDING: i32 = 15;
    const LINE_H: i32 = 14;

    fill_rect_blend(fb, rect, PANEL_COLOR, 0.15);
    fill_rect_gradient(
        fb,
        Rect::new(rect.x, rect.y, rect.w, HEADER_H),
        pack_rgb(240, 170, 52),
        pack_rgb(255, 190, 70),
    );
    draw_text(fb, rect.x + 18, rect.y + 13, "AI Response", WHITE, 2);

    let content_x = rect.x + PADDING;
    if response.is_empty() {
        draw_text(fb, content_x, rect.y + HEADER_H + 30, "(Waiting for your question...)", pack_rgb(220, 200, 200), 1);
        return;
    }

    let available = rect.h - HEADER_H - 2 * PADDING;
    let max_lines = (available / LINE_H).max(0) as usize;
    let max_chars = ((rect.w - 2 * PADDING) / text_width("M", 1)).max(1) as usize;

    let mut y = rect.y + HEADER_H + PADDING;
    for line in wrap_text(response, max_chars, max_lines) {
        draw_text(fb, content_x, y, &line, pack_rgb(250, 230, 230), 1);
        y += LINE_H;
    }
}

/// Most recent thumbnails in a strip along the bottom edge. Returns how many
/// were shown; a frame too small for a thumbnail just shows fewer.
pub fn draw_gallery(fb: &mut FrameBuffer, gallery: &SketchGallery) -> usize {
    const SPACING: i32 = 12;
    let (tw, th) = gallery.thumb_size();
    let (tw, th) = (tw as i32, th as i32);

    let max_display = ((fb.width as i32 - 20) / (tw + SPACING)).max(1) as usize;
    let x0 = 10;
    let y0 = fb.height as i32 - th - 12;

    fill_rect(fb, Rect::new(x0 - 10, y0 - 30, 130, 25), pack_rgb(50, 50, 50));
    draw_text(fb, x0, y0 - 24, &format!("Saved ({})", gallery.len()), WHITE, 2);

    let records = gallery.records();
    let recent = &records[records.len().saturating_sub(max_display)..];
    let mut shown = 0;
    for (i, record) in recent.iter().enumerate() {
        let x = x0 + i as i32 * (tw + SPACING);
        if y0 < 0 || x + tw > fb.width as i32 {
            break;
        }
        // checked above, so this only fails on a mis-sized thumbnail
        match blit_rgb(fb, &record.thumbnail, x, y0) {
            Ok(()) => {
                stroke_rect(fb, Rect::new(x, y0, tw, th), WHITE, 2);
                shown += 1;
            }
            Err(e) => log::debug!("Thumbnail {} not shown: {e}", record.filename),
        }
    }
    shown
}

/// Fingertip marker: filled dot with a white ring.
pub fn draw_fingertip(fb: &mut FrameBuffer, p: Point) {
    blend_circle(fb, p.x, p.y, 18, pack_rgb(255, 0, 255), 0.25);
    fill_circle(fb, p.x, p.y, 12, pack_rgb(255, 0, 255));
    stroke_circle(fb, p.x, p.y, 15, 2, WHITE);
}
