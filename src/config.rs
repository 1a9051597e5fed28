// Runtime settings. Every field has a default, so an empty or missing
// config file still gives a working whiteboard.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "airboard.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Flip frames horizontally so the preview behaves like a mirror.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0, width: 1280, height: 720, mirror: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Program + args of the landmark detector process. Empty = mouse simulator.
    pub command: Vec<String>,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub max_num_hands: usize,
    /// Consecutive frames a pose must hold before it is reported.
    pub stable_frames: u32,
    /// How long to wait for the detector's READY line (model loading).
    pub ready_timeout_secs: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
            max_num_hands: 1,
            stable_frames: 1,
            ready_timeout_secs: 30.0,
        }
    }
}

impl DetectorConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.ready_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub size: u32,
    /// RGB
    pub color: [u8; 3],
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self { size: 5, color: [255, 165, 0] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub key_width: u32,
    pub key_height: u32,
    pub key_margin: u32,
    /// y of the first key row
    pub top: i32,
    pub hover_threshold_secs: f32,
    /// Share of the frame width given to the key panel.
    pub panel_width_ratio: f32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            key_width: 60,
            key_height: 60,
            key_margin: 10,
            top: 140,
            hover_threshold_secs: 1.0,
            panel_width_ratio: 0.64,
        }
    }
}

impl KeyboardConfig {
    pub fn hover_threshold(&self) -> Duration {
        Duration::from_secs_f32(self.hover_threshold_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub dir: PathBuf,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("sketches"), thumbnail_width: 100, thumbnail_height: 75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub max_response_lines: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            api_key: None,
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            max_response_lines: 15,
        }
    }
}

impl AiConfig {
    /// The credential, with blank strings treated as missing.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub brush: BrushConfig,
    pub keyboard: KeyboardConfig,
    pub sketches: SketchConfig,
    pub ai: AiConfig,
    pub debug: bool,
}

impl Config {
    /// Read the JSON file (if any), apply environment overrides, validate.
    /// `None` falls back to `airboard.json` in the working directory when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                p.exists().then_some(p)
            }
        };

        let mut cfg = match path {
            Some(p) => {
                let contents = fs::read_to_string(&p)
                    .map_err(|e| Error::Config(format!("Read {}: {e}", p.display())))?;
                Self::from_json(&contents)?
            }
            None => Self::default(),
        };

        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(contents: &str) -> Result<Self, Error> {
        serde_json::from_str(contents).map_err(|e| Error::Config(format!("Parse config: {e}")))
    }

    /// Overrides from `GEMINI_API_KEY`, `AI_MODEL` and `SKETCH_DIR`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = lookup("AI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.ai.model = model;
        }
        if let Some(dir) = lookup("SKETCH_DIR").filter(|d| !d.trim().is_empty()) {
            self.sketches.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let bad = |msg: &str| Err(Error::Config(msg.to_string()));

        if self.camera.width == 0 || self.camera.height == 0 {
            return bad("camera width/height must be non-zero");
        }
        if !(self.keyboard.hover_threshold_secs > 0.0) {
            return bad("keyboard.hover_threshold_secs must be positive");
        }
        // a 1px key has no interior point under strict containment
        if self.keyboard.key_width < 2 || self.keyboard.key_height < 2 {
            return bad("keyboard key size must be at least 2");
        }
        if self.brush.size == 0 {
            return bad("brush.size must be at least 1");
        }
        if self.sketches.thumbnail_width == 0 || self.sketches.thumbnail_height == 0 {
            return bad("thumbnail size must be non-zero");
        }
        if self.detector.max_num_hands == 0 {
            return bad("detector.max_num_hands must be at least 1");
        }
        if self.detector.stable_frames == 0 {
            return bad("detector.stable_frames must be at least 1");
        }
        if !(self.detector.ready_timeout_secs > 0.0) {
            return bad("detector.ready_timeout_secs must be positive");
        }
        Ok(())
    }
}
