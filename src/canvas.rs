// The drawing surface: a persistent ink layer laid over the live camera.
// Visual expectation: strokes you draw stay put while the video underneath
// keeps moving; clearing makes the raw video come back untouched.

use crate::error::Error;
use crate::types::{FrameBuffer, Point, pack_rgb, unpack_rgb};
use image::{Rgb, RgbImage};

/// Precomputed round brush tip we dab along a segment.
/// Hard-edged: every offset inside the disc gets full coverage.
struct Stamp {
    offsets: Vec<(i32, i32)>,
}

impl Stamp {
    fn disc(diameter: u32) -> Self {
        let r = (diameter / 2) as i32;
        let r2 = if diameter % 2 == 0 { r * r } else { r * r + r };
        let mut offsets = Vec::new();
        for y in -r..=r {
            for x in -r..=r {
                if x * x + y * y <= r2 {
                    offsets.push((x, y));
                }
            }
        }
        Self { offsets }
    }
}

pub struct StrokeCanvas {
    width: usize,
    height: usize,
    color: Vec<u32>,    // 0x00RRGGBB of the ink at each pixel
    coverage: Vec<u8>,  // 0 = no ink, 255 = fully inked
    has_ink: bool,      // if false, compositing is a plain copy
    prev: Option<Point>,
    ink_color: u32,
    brush_size: u32,
    stamp: Stamp,
}

impl StrokeCanvas {
    pub fn new(width: usize, height: usize, ink: [u8; 3], brush_size: u32) -> Self {
        let brush_size = brush_size.max(1);
        Self {
            width,
            height,
            color: vec![0; width * height],
            coverage: vec![0; width * height],
            has_ink: false,
            prev: None,
            ink_color: pack_rgb(ink[0], ink[1], ink[2]),
            brush_size,
            stamp: Stamp::disc(brush_size),
        }
    }

    /// Extend the current stroke to `p`. The first point of a stroke only
    /// records the position; a segment needs two endpoints.
    pub fn append_line(&mut self, p: Point) {
        if let Some(from) = self.prev {
            self.draw_segment(from, p);
        }
        self.prev = Some(p);
    }

    /// Lift the pen: the next `append_line` starts a new stroke.
    pub fn reset_position(&mut self) {
        self.prev = None;
    }

    pub fn clear(&mut self) {
        self.color.fill(0);
        self.coverage.fill(0);
        self.has_ink = false;
        self.reset_position();
    }

    /// Drop all ink and re-allocate for a new frame size.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.color = vec![0; width * height];
        self.coverage = vec![0; width * height];
        self.has_ink = false;
        self.reset_position();
    }

    pub fn set_color(&mut self, ink: [u8; 3]) {
        self.ink_color = pack_rgb(ink[0], ink[1], ink[2]);
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.max(1);
        self.stamp = Stamp::disc(self.brush_size);
    }

    pub fn is_empty(&self) -> bool {
        !self.has_ink
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Ink coverage at (x,y); 0 outside the canvas.
    pub fn coverage_at(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.coverage[y as usize * self.width + x as usize]
    }

    /// Blend the ink over `frame` into a new frame:
    /// out = frame·(1−a) + ink·a per channel. The canvas is not touched.
    pub fn composite(&self, frame: &FrameBuffer) -> Result<FrameBuffer, Error> {
        if frame.width != self.width || frame.height != self.height {
            return Err(Error::CameraFrame(format!(
                "composite: frame {}x{} vs canvas {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        let mut out = frame.clone();
        if !self.has_ink {
            return Ok(out);
        }

        for (i, px) in out.pixels.iter_mut().enumerate() {
            let a = self.coverage[i] as u32;
            if a == 0 { continue; }                 // keep raw live
            if a == 255 {                           // fully inked
                *px = self.color[i];
                continue;
            }
            let (fr, fg, fb) = unpack_rgb(*px);
            let (cr, cg, cb) = unpack_rgb(self.color[i]);
            let mix = |f: u8, c: u8| ((f as u32 * (255 - a) + c as u32 * a + 127) / 255) as u8;
            *px = pack_rgb(mix(fr, cr), mix(fg, cg), mix(fb, cb));
        }
        Ok(out)
    }

    /// The ink colors as an RGB image (coverage dropped, blank = black).
    pub fn export(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let (r, g, b) = unpack_rgb(self.color[y as usize * self.width + x as usize]);
            Rgb([r, g, b])
        })
    }

    /// Bresenham walk from `a` to `b`, dabbing the brush at every step.
    /// Only the part that can leave ink (canvas plus brush radius) is walked.
    fn draw_segment(&mut self, a: Point, b: Point) {
        let r = (self.brush_size / 2) as i32;
        let min = Point::new(-r, -r);
        let max = Point::new(self.width as i32 - 1 + r, self.height as i32 - 1 + r);
        let Some((a, b)) = clip_segment(a, b, min, max) else { return };

        let (mut x0, mut y0) = (a.x, a.y);
        let dx = (b.x - x0).abs();
        let sx = if x0 < b.x { 1 } else { -1 };
        let dy = -(b.y - y0).abs();
        let sy = if y0 < b.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.dab(x0, y0);
            if x0 == b.x && y0 == b.y { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x0 += sx; }
            if e2 <= dx { err += dx; y0 += sy; }
        }
    }

    fn dab(&mut self, cx: i32, cy: i32) {
        let (w, h) = (self.width as i32, self.height as i32);
        for &(ox, oy) in &self.stamp.offsets {
            let (x, y) = (cx + ox, cy + oy);
            if x < 0 || y < 0 || x >= w || y >= h { continue; }
            let idx = y as usize * self.width + x as usize;
            self.color[idx] = self.ink_color;
            self.coverage[idx] = 255;
            self.has_ink = true;
        }
    }
}

/// Liang-Barsky clip of `a`-`b` to the box `min..=max`; None if it misses.
fn clip_segment(a: Point, b: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    let (x0, y0) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - x0, b.y as f64 - y0);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let edges = [
        (-dx, x0 - min.x as f64),
        (dx, max.x as f64 - x0),
        (-dy, y0 - min.y as f64),
        (dy, max.y as f64 - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 { return None; }   // parallel and outside
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 { return None; }
            t0 = t0.max(t);
        } else {
            if t < t0 { return None; }
            t1 = t1.min(t);
        }
    }
    let at = |t: f64| Point::new((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
    Some((at(t0), at(t1)))
}
