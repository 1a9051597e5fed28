//! Where hand landmarks come from.
//!
//! The detection model is not part of this crate. `ProcessDetector` runs it as
//! a child process and talks a tiny protocol over stdin/stdout; when no
//! detector is configured, `MouseSimulator` fakes a hand from the mouse so the
//! whiteboard can still be used (hold the left button to "point").

use crate::config::DetectorConfig;
use crate::error::Error;
use crate::gesture::{HandLandmarks, Landmark, landmarks};
use crate::types::FrameBuffer;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub trait LandmarkSource {
    /// Hands found in this frame, best first. Empty = no hand.
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error>;
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    #[serde(default = "full_score")]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

fn full_score() -> f32 {
    1.0
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one detector reply, keeping at most `max_hands` confident, complete hands.
fn parse_detection(line: &str, min_score: f32, max_hands: usize) -> Result<Vec<HandLandmarks>, Error> {
    let result: DetectionJson = serde_json::from_str(line)
        .map_err(|e| Error::Detector(format!("Bad reply {:?}: {e}", line.trim())))?;

    if let Some(error) = result.error {
        log::warn!("Detector reported: {error}");
        return Ok(Vec::new());
    }

    let mut hands = Vec::new();
    for hand in result.hands {
        if hand.score < min_score {
            continue;
        }
        if hand.landmarks.len() != landmarks::COUNT {
            log::warn!("Expected {} landmarks, got {}", landmarks::COUNT, hand.landmarks.len());
            continue;
        }
        let mut lm = [Landmark::default(); landmarks::COUNT];
        for (slot, src) in lm.iter_mut().zip(&hand.landmarks) {
            *slot = Landmark { x: src.x, y: src.y, z: src.z };
        }
        let hand = HandLandmarks { landmarks: lm, score: hand.score, handedness: hand.handedness };
        if !hand.is_plausible() {
            log::warn!("Dropping hand with out-of-range landmarks");
            continue;
        }
        hands.push(hand);
        if hands.len() == max_hands {
            break;
        }
    }
    Ok(hands)
}

/// External landmark model running as a child process.
///
/// Protocol: the child prints `READY` once, then for every frame reads a
/// header of three little-endian u32 (width, height, channels = 3) followed
/// by the RGB bytes, and answers with one JSON line
/// `{"hands":[{"handedness":"Right","score":0.9,"landmarks":[{"x":..,"y":..,"z":..}, ...]}]}`.
pub struct ProcessDetector {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    min_score: f32,
    max_hands: usize,
}

impl ProcessDetector {
    pub fn spawn(cfg: &DetectorConfig) -> Result<Self, Error> {
        let (program, args) = cfg
            .command
            .split_first()
            .ok_or_else(|| Error::Detector("empty detector command".into()))?;

        log::info!("Starting landmark detector: {}", cfg.command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .env("AIRBOARD_MIN_DETECTION_CONFIDENCE", cfg.min_detection_confidence.to_string())
            .env("AIRBOARD_MIN_TRACKING_CONFIDENCE", cfg.min_tracking_confidence.to_string())
            .env("AIRBOARD_MAX_NUM_HANDS", cfg.max_num_hands.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Detector(format!("Spawn {program}: {e}")))?;

        match wait_ready(&mut child, cfg.ready_timeout()) {
            Ok((stdin, stdout)) => {
                log::info!("Landmark detector ready");
                Ok(Self {
                    child,
                    stdin,
                    stdout,
                    min_score: cfg.min_detection_confidence,
                    max_hands: cfg.max_num_hands,
                })
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }
}

/// Take the pipes and wait for the child's `READY` line. The read happens on a
/// helper thread so a silent child cannot stall startup past `timeout`.
fn wait_ready(child: &mut Child, timeout: Duration) -> Result<(ChildStdin, BufReader<ChildStdout>), Error> {
    let stdin = child.stdin.take().ok_or_else(|| Error::Detector("no stdin".into()))?;
    let stdout = child.stdout.take().ok_or_else(|| Error::Detector("no stdout".into()))?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdout = BufReader::new(stdout);
        let mut ready = String::new();
        let result = stdout.read_line(&mut ready).map(|_| ready);
        let _ = tx.send((stdout, result));
    });

    let (stdout, ready) = match rx.recv_timeout(timeout) {
        Ok(reply) => reply,
        Err(_) => return Err(Error::Detector(format!("no READY within {timeout:?}"))),
    };
    let ready = ready.map_err(|e| Error::Detector(format!("Wait for READY: {e}")))?;
    if ready.trim() != "READY" {
        return Err(Error::Detector(format!("expected READY, got {:?}", ready.trim())));
    }
    Ok((stdin, stdout))
}

impl LandmarkSource for ProcessDetector {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error> {
        let io = |e: std::io::Error| Error::Detector(format!("Pipe: {e}"));

        for v in [frame.width as u32, frame.height as u32, 3] {
            self.stdin.write_all(&v.to_le_bytes()).map_err(io)?;
        }
        self.stdin.write_all(&frame.to_rgb_bytes()).map_err(io)?;
        self.stdin.flush().map_err(io)?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line).map_err(io)? == 0 {
            return Err(Error::Detector("detector exited".into()));
        }
        parse_detection(&line, self.min_score, self.max_hands)
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Fake single hand that follows the mouse.
#[derive(Debug, Default)]
pub struct MouseSimulator {
    pointer: Option<(f32, f32)>,
    pressed: bool,
}

impl MouseSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest mouse state in window pixels (None = outside the window).
    pub fn set_pointer(&mut self, pos: Option<(f32, f32)>, pressed: bool) {
        self.pointer = pos;
        self.pressed = pressed;
    }
}

impl LandmarkSource for MouseSimulator {
    fn detect(&mut self, frame: &FrameBuffer) -> Result<Vec<HandLandmarks>, Error> {
        let Some((px, py)) = self.pointer else {
            return Ok(Vec::new());
        };
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }
        let (nx, ny) = (px / frame.width as f32, py / frame.height as f32);
        Ok(vec![synthetic_hand(nx, ny, self.pressed)])
    }
}

/// A hand whose index tip is at (x,y). `pointing` curls the other fingers,
/// otherwise the hand is open.
fn synthetic_hand(x: f32, y: f32, pointing: bool) -> HandLandmarks {
    use landmarks::*;
    const JOINT_DROP: f32 = 0.05;

    let mut lm = [Landmark::new(x, y + 0.2); COUNT];
    lm[WRIST] = Landmark::new(x, y + 0.25);
    lm[INDEX_TIP] = Landmark::new(x, y);
    lm[INDEX_PIP] = Landmark::new(x, y + JOINT_DROP);
    for (tip, pip) in [(MIDDLE_TIP, MIDDLE_PIP), (RING_TIP, RING_PIP), (PINKY_TIP, PINKY_PIP)] {
        let pip_y = y + JOINT_DROP;
        lm[pip] = Landmark::new(x, pip_y);
        let tip_y = if pointing { pip_y + JOINT_DROP } else { pip_y - JOINT_DROP };
        lm[tip] = Landmark::new(x, tip_y);
    }
    HandLandmarks { landmarks: lm, score: 1.0, handedness: "Mouse".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{HandPose, classify};
    use crate::types::Point;

    fn reply(hands: &[(f32, usize)]) -> String {
        let hands: Vec<String> = hands
            .iter()
            .map(|(score, n)| {
                let lms = vec![r#"{"x":0.5,"y":0.5,"z":0.0}"#; *n].join(",");
                format!(r#"{{"handedness":"Right","score":{score},"landmarks":[{lms}]}}"#)
            })
            .collect();
        format!(r#"{{"hands":[{}]}}"#, hands.join(","))
    }

    #[test]
    fn keeps_confident_complete_hands() {
        let line = reply(&[(0.9, 21), (0.3, 21), (0.95, 20), (0.8, 21)]);
        let hands = parse_detection(&line, 0.7, 5).unwrap();
        assert_eq!(hands.len(), 2);
        assert_eq!(hands[0].score, 0.9);
        assert_eq!(hands[1].score, 0.8);
        assert_eq!(hands[0].handedness, "Right");
    }

    #[test]
    fn caps_hand_count() {
        let line = reply(&[(0.9, 21), (0.8, 21)]);
        assert_eq!(parse_detection(&line, 0.5, 1).unwrap().len(), 1);
    }

    #[test]
    fn error_reply_is_no_hands() {
        let hands = parse_detection(r#"{"hands":[],"error":"model crashed"}"#, 0.5, 1).unwrap();
        assert!(hands.is_empty());
    }

    #[test]
    fn garbage_is_a_detector_error() {
        assert!(matches!(parse_detection("READY", 0.5, 1), Err(Error::Detector(_))));
    }

    #[test]
    fn drops_hands_with_wild_coordinates() {
        let wild = vec![r#"{"x":10000000.0,"y":0.5}"#; 21].join(",");
        let sane = vec![r#"{"x":0.5,"y":0.5}"#; 21].join(",");
        let line = format!(r#"{{"hands":[{{"score":0.9,"landmarks":[{wild}]}},{{"score":0.8,"landmarks":[{sane}]}}]}}"#);
        let hands = parse_detection(&line, 0.5, 2).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].score, 0.8);
    }

    #[cfg(unix)]
    fn shell_detector(script: &str, timeout_secs: f32) -> DetectorConfig {
        DetectorConfig {
            command: vec!["sh".into(), "-c".into(), script.into()],
            ready_timeout_secs: timeout_secs,
            ..DetectorConfig::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn silent_detector_times_out() {
        let start = std::time::Instant::now();
        let err = ProcessDetector::spawn(&shell_detector("exec sleep 10", 0.2)).err().unwrap();
        assert!(matches!(&err, Error::Detector(msg) if msg.contains("READY")), "{err}");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn wrong_greeting_is_rejected() {
        let err = ProcessDetector::spawn(&shell_detector("echo hello", 5.0)).err().unwrap();
        assert!(matches!(&err, Error::Detector(msg) if msg.contains("hello")), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn frame_goes_out_and_reply_comes_back() {
        // 2x1 frame: 12 header bytes + 6 RGB bytes
        let script = r#"echo READY; head -c 18 >/dev/null; echo '{"hands":[]}'; exec sleep 10"#;
        let mut det = ProcessDetector::spawn(&shell_detector(script, 5.0)).unwrap();
        let frame = FrameBuffer::filled(2, 1, 0);
        assert!(det.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn empty_command_fails_to_spawn() {
        let cfg = DetectorConfig::default();
        assert!(matches!(ProcessDetector::spawn(&cfg), Err(Error::Detector(_))));
    }

    #[test]
    fn mouse_simulator_poses() {
        let frame = FrameBuffer::filled(200, 100, 0);
        let mut sim = MouseSimulator::new();
        assert!(sim.detect(&frame).unwrap().is_empty());

        sim.set_pointer(Some((50.0, 25.0)), true);
        let hands = sim.detect(&frame).unwrap();
        assert_eq!(classify(&hands[0]), HandPose::IndexOnly);
        assert_eq!(hands[0].fingertip(200, 100), Point::new(50, 25));

        sim.set_pointer(Some((50.0, 25.0)), false);
        assert_eq!(classify(&sim.detect(&frame).unwrap()[0]), HandPose::Other);
    }
}
