use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub use writer::*;

use crate::configs::LoggingConfig;

fn filter_directive(logging: Option<&LoggingConfig>) -> String {
    let level = logging
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");
    let filters = logging.and_then(|l| l.filters.as_deref()).unwrap_or("");

    if filters.is_empty() {
        format!("{},tower_http=warn", level)
    } else {
        format!("{},tower_http=warn,{}", level, filters)
    }
}

/// Installs the global subscriber: coloured stdout plus an optional line-capped log file.
///
/// `RUST_LOG` wins over the configured level.
pub fn init(logging: Option<&LoggingConfig>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(logging)));

    let stdout_layer = fmt::layer()
        .event_format(LineFormatter::new(true))
        .with_ansi(true);

    let file_layer = logging.and_then(|l| l.file.as_ref()).map(|file| {
        if let Some(parent) = Path::new(&file.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        fmt::layer()
            .with_writer(CappedFileWriter::new(file.path.clone(), file.max_lines))
            .event_format(LineFormatter::new(false))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive() {
        assert_eq!(filter_directive(None), "info,tower_http=warn");
    }

    #[test]
    fn configured_directive() {
        let logging = LoggingConfig {
            level: Some("debug".into()),
            filters: Some("caramella::voice=trace".into()),
            file: None,
        };
        assert_eq!(
            filter_directive(Some(&logging)),
            "debug,tower_http=warn,caramella::voice=trace"
        );
    }
}
