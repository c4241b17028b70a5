use tracing_subscriber::{fmt, EnvFilter};

/// Stderr subscriber. `RUST_LOG` filters (default `info`), `ADZAN_LOG_JSON=1`
/// switches to JSON lines for hosts that ship logs elsewhere.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("ADZAN_LOG_JSON")
        .map(|value| value == "1")
        .unwrap_or(false);

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if use_json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}
