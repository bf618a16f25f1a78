use crate::config;

/// Load settings, falling back to defaults when they are missing or invalid.
///
/// Runs before logging is set up, so problems go straight to stderr.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("tracksync: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent a scan.
            eprintln!("tracksync: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
