//! log4rs wiring: a console appender always, plus an optional file
//! appender when `--log-file` is given. Both share one pattern and a
//! threshold filter set from `--log-level`.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

pub fn init(log_file: Option<&str>, level: LevelFilter) -> Result<(), String> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build("console", Box::new(console)),
    );

    let mut root_appenders = vec!["console"];

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .map_err(|e| format!("failed to open log file '{path}': {e}"))?;
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("file", Box::new(file)),
        );
        root_appenders.push("file");
    }

    let config = builder
        .build(Root::builder().appenders(root_appenders).build(level))
        .map_err(|e| format!("invalid logging configuration: {e}"))?;

    log4rs::init_config(config).map_err(|e| format!("failed to initialize logging: {e}"))?;
    Ok(())
}
