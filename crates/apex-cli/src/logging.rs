use tracing_subscriber::EnvFilter;

/// Variable holding the log filter directive, e.g. `APEX_LOG=apex_core=debug`.
pub const LOG_ENV: &str = "APEX_LOG";

/// Installs the process-wide subscriber. Logs go to stderr so stdout stays
/// a single JSON document.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(error) = installed {
        eprintln!("warning: logging already initialized: {error}");
    }
}
