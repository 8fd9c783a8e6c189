use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    let default = format!("warn,rsc={level}");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}
