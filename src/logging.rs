// Logging backend. Modules only talk to the `log` facade.

use env_logger::Env;

/// Default level is `info` (`debug` when the config asks for it);
/// `RUST_LOG` still overrides either.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level)).try_init();
}
