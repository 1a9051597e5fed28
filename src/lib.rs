//! AirBoard: a camera whiteboard driven by one pointing finger.
//!
//! Point with your index finger to draw over the live video, or switch to the
//! on-screen keyboard and type by holding your fingertip on a key; typed
//! questions go to a text-generation service and the answer is overlaid.

pub mod assistant;
pub mod camera;
pub mod canvas;
pub mod config;
pub mod draw;
pub mod error;
pub mod gesture;
pub mod hover;
pub mod hud;
pub mod keyboard;
pub mod landmarks;
pub mod logging;
pub mod session;
pub mod sketches;
pub mod types;
