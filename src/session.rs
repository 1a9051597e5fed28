// Per-frame orchestration: read hands → classify → route to the canvas or the
// dwell keyboard → composite → overlays. `run` owns the camera/window loop;
// `Session` holds all state and is driven one frame at a time.

use crate::assistant::{QueryDispatcher, QueryOutcome};
use crate::camera::CameraCapture;
use crate::canvas::StrokeCanvas;
use crate::config::{Config, DetectorConfig};
use crate::draw::{AppCommand, Drawer};
use crate::error::Error;
use crate::gesture::{HandLandmarks, HandPose, PoseFilter, classify};
use crate::hover::{HoverEngine, HoverUpdate};
use crate::hud;
use crate::keyboard::{ControlSignal, KeyId, KeyboardLayout, TypedBuffer};
use crate::landmarks::{LandmarkSource, MouseSimulator, ProcessDetector};
use crate::sketches::SketchGallery;
use crate::types::{FrameBuffer, Point, Rect};
use std::time::{Duration, Instant};

const WINDOW_TITLE: &str = "AirBoard - Touchless Whiteboard";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Draw,
    Keyboard,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Draw => "DRAW",
            Mode::Keyboard => "KEYBOARD",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Mode::Draw => Mode::Keyboard,
            Mode::Keyboard => Mode::Draw,
        }
    }
}

pub struct Session {
    width: usize,
    height: usize,
    mode: Mode,
    show_help: bool,
    canvas: StrokeCanvas,
    layout: KeyboardLayout,
    panel_ratio: f32,
    hover: HoverEngine,
    last_hover: HoverUpdate,
    typed: TypedBuffer,
    pose: PoseFilter,
    dispatcher: QueryDispatcher,
    response: Option<QueryOutcome>,
    max_response_lines: usize,
    gallery: SketchGallery,
    fingertips: Vec<Point>,
}

impl Session {
    pub fn new(
        cfg: &Config,
        width: usize,
        height: usize,
        dispatcher: QueryDispatcher,
        gallery: SketchGallery,
    ) -> Self {
        Self {
            width,
            height,
            mode: Mode::Draw,
            show_help: true,
            canvas: StrokeCanvas::new(width, height, cfg.brush.color, cfg.brush.size),
            layout: KeyboardLayout::from_config(&cfg.keyboard),
            panel_ratio: cfg.keyboard.panel_width_ratio,
            hover: HoverEngine::new(cfg.keyboard.hover_threshold()),
            last_hover: HoverUpdate::idle(),
            typed: TypedBuffer::new(),
            pose: PoseFilter::new(cfg.detector.stable_frames),
            dispatcher,
            response: None,
            max_response_lines: cfg.ai.max_response_lines,
            gallery,
            fingertips: Vec::new(),
        }
    }

    /// Keyboard panel rectangle for the current frame size.
    pub fn keyboard_panel(&self) -> Rect {
        self.layout.panel_for(self.width, self.panel_ratio)
    }

    /// Follow a camera resolution change (drops the drawing).
    pub fn ensure_size(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            log::warn!("Frame size changed to {width}x{height}; canvas reset");
            self.width = width;
            self.height = height;
            self.canvas.resize(width, height);
        }
    }

    /// Apply one frame of tracking. Only the first hand drives input;
    /// every hand gets a fingertip marker.
    pub fn process_hands(&mut self, hands: &[HandLandmarks], now: Instant) {
        self.fingertips = hands.iter().map(|h| h.fingertip(self.width, self.height)).collect();

        let primary = hands.first();
        let pose = self.pose.update(primary.map(classify));

        let (Some(hand), Some(pose)) = (primary, pose) else {
            self.canvas.reset_position();
            self.hover.reset();
            self.last_hover = HoverUpdate::idle();
            return;
        };
        let tip = hand.fingertip(self.width, self.height);

        match self.mode {
            Mode::Draw => {
                if pose == HandPose::IndexOnly {
                    self.canvas.append_line(tip);
                } else {
                    self.canvas.reset_position();
                }
            }
            Mode::Keyboard => {
                let panel = self.keyboard_panel();
                let update = self.hover.update(Some(tip), &self.layout, panel, now);
                if let Some(key) = update.activated {
                    self.on_key(key);
                }
                self.last_hover = update;
            }
        }
    }

    fn on_key(&mut self, key: KeyId) {
        log::info!("Key pressed: {key}");
        if self.typed.activate(key) == Some(ControlSignal::Send) {
            let prompt = self.typed.text().trim().to_string();
            if prompt.is_empty() {
                return;
            }
            self.dispatcher.submit(&prompt);
            self.typed.clear();
        }
    }

    /// Pick up a finished query, if any.
    pub fn poll_responses(&mut self) {
        if let Some(outcome) = self.dispatcher.poll() {
            self.response = Some(outcome);
        }
    }

    /// Returns false when the app should quit.
    pub fn handle_command(&mut self, cmd: AppCommand) -> bool {
        match cmd {
            AppCommand::Quit => return false,
            AppCommand::ToggleMode => {
                self.mode = self.mode.toggled();
                self.canvas.reset_position();
                self.hover.reset();
                self.last_hover = HoverUpdate::idle();
                log::info!("Mode: {}", self.mode.label());
            }
            AppCommand::SaveSketch => {
                if self.mode == Mode::Draw {
                    if let Err(e) = self.gallery.save(&self.canvas.export()) {
                        log::error!("{e}");
                    }
                }
            }
            AppCommand::Clear => {
                self.canvas.clear();
                self.typed.clear();
            }
            AppCommand::ResetResponse => self.response = None,
            AppCommand::ToggleHelp => self.show_help = !self.show_help,
        }
        true
    }

    /// Build the frame to show: composite, then overlays.
    pub fn render(&self, live: &FrameBuffer) -> FrameBuffer {
        let response = self.response.as_ref().map(QueryOutcome::display_text).unwrap_or_default();

        let mut out = match self.mode {
            Mode::Draw => self.canvas.composite(live).unwrap_or_else(|e| {
                log::warn!("{e}");
                live.clone()
            }),
            Mode::Keyboard => live.clone(),
        };

        match self.mode {
            Mode::Draw => {
                hud::draw_gallery(&mut out, &self.gallery);
                hud::draw_response_overlay(&mut out, &response, self.show_help, self.max_response_lines);
            }
            Mode::Keyboard => {
                let panel = self.keyboard_panel();
                hud::draw_keyboard(&mut out, &self.layout, panel, &self.last_hover, self.typed.text());
                let side = Rect::new(
                    panel.right() + 10,
                    panel.y,
                    self.width as i32 - panel.right() - 30,
                    panel.h,
                );
                hud::draw_response_panel(&mut out, side, &response);
            }
        }

        for &tip in &self.fingertips {
            hud::draw_fingertip(&mut out, tip);
        }
        hud::draw_status(&mut out, self.mode.label(), self.mode == Mode::Draw, self.dispatcher.is_busy());
        if self.show_help {
            hud::draw_help(&mut out);
        }
        out
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn typed_text(&self) -> &str {
        self.typed.text()
    }

    pub fn canvas(&self) -> &StrokeCanvas {
        &self.canvas
    }

    pub fn gallery(&self) -> &SketchGallery {
        &self.gallery
    }

    pub fn response(&self) -> Option<&QueryOutcome> {
        self.response.as_ref()
    }
}

/// Landmark input: the external detector, or the mouse when none is configured
/// (or the detector dies).
enum HandSource {
    Process(ProcessDetector),
    Mouse(MouseSimulator),
}

impl HandSource {
    fn from_config(cfg: &DetectorConfig) -> Self {
        if cfg.command.is_empty() {
            log::info!("No detector command configured; hold the left mouse button to draw");
            return HandSource::Mouse(MouseSimulator::new());
        }
        match ProcessDetector::spawn(cfg) {
            Ok(det) => HandSource::Process(det),
            Err(e) => {
                log::error!("{e}; falling back to mouse input");
                HandSource::Mouse(MouseSimulator::new())
            }
        }
    }

    fn detect(&mut self, frame: &FrameBuffer, drawer: &Drawer) -> Vec<HandLandmarks> {
        let result = match self {
            HandSource::Process(det) => det.detect(frame),
            HandSource::Mouse(sim) => {
                sim.set_pointer(drawer.mouse_pos(), drawer.left_mouse_down());
                sim.detect(frame)
            }
        };
        match result {
            Ok(hands) => hands,
            Err(e) => {
                log::error!("{e}; falling back to mouse input");
                *self = HandSource::Mouse(MouseSimulator::new());
                Vec::new()
            }
        }
    }
}

/// Open the camera and window and run until quit.
/// Camera failures up to the first frame are fatal.
pub fn run(cfg: &Config) -> Result<(), Error> {
    let mut cam = CameraCapture::open(&cfg.camera)?;
    let first = cam.next_frame()?;
    let (width, height) = (first.width, first.height);
    log::info!("First frame {width}x{height}; camera reports {:?}", cam.resolution());

    let mut drawer = Drawer::new(WINDOW_TITLE, width, height)?;
    let mut source = HandSource::from_config(&cfg.detector);
    let gallery = SketchGallery::open(&cfg.sketches.dir, (cfg.sketches.thumbnail_width, cfg.sketches.thumbnail_height))?;
    let dispatcher = QueryDispatcher::from_config(&cfg.ai);
    let mut session = Session::new(cfg, width, height, dispatcher, gallery);

    let mut pending = Some(first);
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;

    log::info!("AirBoard started");
    while drawer.is_open() {
        let live = match pending.take() {
            Some(frame) => frame,
            None => match cam.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("{e}; stopping");
                    break;
                }
            },
        };
        session.ensure_size(live.width, live.height);

        let mut quit = false;
        for cmd in drawer.poll_commands() {
            quit |= !session.handle_command(cmd);
        }
        if quit {
            break;
        }

        let hands = source.detect(&live, &drawer);
        session.process_hands(&hands, Instant::now());
        session.poll_responses();

        let screen = session.render(&live);
        drawer.present(&screen)?;

        frames_this_second += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            log::debug!("FPS: {:.1}", frames_this_second as f32 / secs);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    log::info!("AirBoard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::MISSING_KEY_WARNING;
    use crate::gesture::landmarks;
    use crate::gesture::tests::hand;
    use crate::gesture::Landmark;
    use tempfile::{TempDir, tempdir};

    const W: usize = 1280;
    const H: usize = 720;

    fn session() -> (Session, TempDir) {
        let dir = tempdir().unwrap();
        let cfg = Config::default();
        let gallery = SketchGallery::open(dir.path(), (100, 75)).unwrap();
        (Session::new(&cfg, W, H, QueryDispatcher::new(None), gallery), dir)
    }

    fn hand_at(p: Point, pointing: bool) -> HandLandmarks {
        let mut h = if pointing { hand(true, false, false, false) } else { hand(true, true, true, true) };
        let tip = h.landmarks[landmarks::INDEX_TIP];
        let (nx, ny) = ((p.x as f32 + 0.5) / W as f32, (p.y as f32 + 0.5) / H as f32);
        // keep the classifier's geometry: shift the whole hand
        let (dx, dy) = (nx - tip.x, ny - tip.y);
        for lm in h.landmarks.iter_mut() {
            *lm = Landmark { x: lm.x + dx, y: lm.y + dy, z: lm.z };
        }
        h
    }

    fn key_center(s: &Session, key: KeyId) -> Point {
        s.layout.key_boxes(s.keyboard_panel()).into_iter().find(|kb| kb.key == key).unwrap().rect.center()
    }

    /// Dwell on `key` long enough to fire it once, then leave the keyboard.
    fn type_key(s: &mut Session, key: KeyId, t: &mut Instant) {
        let p = key_center(s, key);
        s.process_hands(&[hand_at(p, false)], *t);
        *t += Duration::from_millis(1100);
        s.process_hands(&[hand_at(p, false)], *t);
        *t += Duration::from_millis(50);
        s.process_hands(&[], *t);
    }

    #[test]
    fn pointing_draws_and_open_hand_lifts_the_pen() {
        let (mut s, _dir) = session();
        let t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 300), true)], t);
        s.process_hands(&[hand_at(Point::new(200, 300), true)], t);
        assert_eq!(s.canvas().coverage_at(150, 300), 255);

        s.process_hands(&[hand_at(Point::new(300, 300), false)], t);
        s.process_hands(&[hand_at(Point::new(400, 300), true)], t);
        assert_eq!(s.canvas().coverage_at(250, 300), 0);
        assert_eq!(s.canvas().coverage_at(350, 300), 0);
    }

    #[test]
    fn glitched_far_tip_is_bounded() {
        let (mut s, _dir) = session();
        let t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 300), true)], t);
        let mut glitch = hand_at(Point::new(100, 300), true);
        glitch.landmarks[landmarks::INDEX_TIP].x = 1.0e7;
        s.process_hands(&[glitch], t);

        // the stroke runs off the right edge instead of overflowing
        assert_eq!(s.canvas().coverage_at(W as i32 - 1, 300), 255);
        let out = s.render(&FrameBuffer::filled(W, H, 0));
        assert_eq!((out.width, out.height), (W, H));
    }

    #[test]
    fn losing_the_hand_lifts_the_pen() {
        let (mut s, _dir) = session();
        let t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 300), true)], t);
        s.process_hands(&[], t);
        s.process_hands(&[hand_at(Point::new(300, 300), true)], t);
        assert!(s.canvas().is_empty());
    }

    #[test]
    fn typing_then_send_dispatches_and_clears() {
        let (mut s, _dir) = session();
        s.handle_command(AppCommand::ToggleMode);
        assert_eq!(s.mode(), Mode::Keyboard);

        let mut t = Instant::now();
        for c in "HELLO".chars() {
            type_key(&mut s, KeyId::Char(c), &mut t);
        }
        assert_eq!(s.typed_text(), "HELLO");

        type_key(&mut s, KeyId::Send, &mut t);
        assert_eq!(s.typed_text(), "");
        s.poll_responses();
        assert_eq!(s.response(), Some(&QueryOutcome::Disabled(MISSING_KEY_WARNING.into())));

        s.handle_command(AppCommand::ResetResponse);
        assert_eq!(s.response(), None);
    }

    #[test]
    fn send_with_blank_buffer_does_nothing() {
        let (mut s, _dir) = session();
        s.handle_command(AppCommand::ToggleMode);
        let mut t = Instant::now();
        type_key(&mut s, KeyId::Space, &mut t);
        type_key(&mut s, KeyId::Send, &mut t);
        assert_eq!(s.typed_text(), " ");
        s.poll_responses();
        assert_eq!(s.response(), None);
    }

    #[test]
    fn keyboard_mode_does_not_draw() {
        let (mut s, _dir) = session();
        s.handle_command(AppCommand::ToggleMode);
        let t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 600), true)], t);
        s.process_hands(&[hand_at(Point::new(200, 600), true)], t);
        assert!(s.canvas().is_empty());
    }

    #[test]
    fn save_only_in_draw_mode() {
        let (mut s, _dir) = session();
        s.handle_command(AppCommand::SaveSketch);
        assert_eq!(s.gallery().len(), 1);
        assert_eq!(s.gallery().records()[0].thumbnail.dimensions(), (100, 75));

        s.handle_command(AppCommand::ToggleMode);
        s.handle_command(AppCommand::SaveSketch);
        assert_eq!(s.gallery().len(), 1);
    }

    #[test]
    fn clear_wipes_canvas_and_text() {
        let (mut s, _dir) = session();
        let mut t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 300), true)], t);
        s.process_hands(&[hand_at(Point::new(200, 300), true)], t);
        s.handle_command(AppCommand::ToggleMode);
        type_key(&mut s, KeyId::Char('Q'), &mut t);
        assert_eq!(s.typed_text(), "Q");

        s.handle_command(AppCommand::Clear);
        assert!(s.canvas().is_empty());
        assert_eq!(s.typed_text(), "");
    }

    #[test]
    fn quit_and_toggles() {
        let (mut s, _dir) = session();
        assert!(s.handle_command(AppCommand::ToggleHelp));
        assert!(!s.show_help);
        assert!(!s.handle_command(AppCommand::Quit));
    }

    #[test]
    fn render_keeps_frame_size_in_both_modes() {
        let (mut s, _dir) = session();
        let live = FrameBuffer::filled(W, H, 0x00102030);
        assert_eq!(s.render(&live).pixels.len(), W * H);
        s.handle_command(AppCommand::ToggleMode);
        assert_eq!(s.render(&live).pixels.len(), W * H);
    }

    #[test]
    fn resolution_change_resets_canvas() {
        let (mut s, _dir) = session();
        let t = Instant::now();
        s.process_hands(&[hand_at(Point::new(100, 300), true)], t);
        s.process_hands(&[hand_at(Point::new(200, 300), true)], t);
        s.ensure_size(640, 480);
        assert!(s.canvas().is_empty());
        assert_eq!(s.canvas().dimensions(), (640, 480));
    }
}
