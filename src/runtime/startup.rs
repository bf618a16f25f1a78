use std::str::FromStr;

use log::LevelFilter;

use crate::config::LoggingSettings;

pub fn init_logging(settings: &LoggingSettings) {
    let level = LevelFilter::from_str(&settings.level).unwrap_or(LevelFilter::Info);

    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}
