//! Logging bootstrap for hosts embedding the completion source

/// Install a stderr fmt subscriber.
///
/// `debug_enabled` raises the level to DEBUG and adds source locations and
/// thread ids. Returns `false` when a global subscriber is already set, which
/// leaves the existing one in place.
pub fn init_logging(debug_enabled: bool) -> bool {
    use tracing_subscriber::fmt;

    let level = if debug_enabled {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    fmt()
        .with_max_level(level)
        .with_target(debug_enabled)
        .with_thread_ids(debug_enabled)
        .with_file(debug_enabled)
        .with_line_number(debug_enabled)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
