use log::LevelFilter;

/// Set up env_logger for the CLI: `Info` by default, `Debug` when asked, and
/// `RUST_LOG` overrides both.
pub fn init_logger(debug_enabled: bool) {
    let level = if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, level)
        .format_timestamp(None)
        .format_target(false);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // Tests may initialize more than once.
    let _ = builder.try_init();
}
