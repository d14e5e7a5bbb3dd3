use tracing::{Dispatch, Level};

use crate::config::LoggingSettings;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// This installs the global subscriber and is meant for the binary only; the
/// library sends its events to the `Dispatch` handed to the bridge.
pub fn init(default_level: &str) {
    // Use try_init so tests and libraries can call this multiple times without panicking
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(default_level))
        .with_target(false)
        .try_init();
}

/// Build a logging sink for a bridge without touching the global subscriber.
///
/// Disabled logging yields `Dispatch::none()`, which drops every event.
pub fn dispatch(settings: &LoggingSettings) -> Dispatch {
    if !settings.enabled {
        return Dispatch::none();
    }

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(parse_level(&settings.level))
        .with_target(false)
        .finish();
    Dispatch::new(subscriber)
}
