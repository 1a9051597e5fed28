// What you SEE:
// • Live camera with a mirrored preview.
// • DRAW mode: point with only your index finger to draw; any other pose lifts the pen.
// • KEYBOARD mode: hold your fingertip on a key until its bar fills to type it; SEND asks the AI.
// • M switches mode, S saves the sketch, C clears, R hides the AI answer, H toggles help, Q/ESC quits.
//
// Usage: airboard [config.json]

use airboard::config::Config;
use airboard::{logging, session};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let cfg = match Config::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            logging::init(false);
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(cfg.debug);
    log::info!(
        "Camera {} at {}x{}, sketches in {}, model {}",
        cfg.camera.index,
        cfg.camera.width,
        cfg.camera.height,
        cfg.sketches.dir.display(),
        cfg.ai.model
    );

    match session::run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
