use serde_derive::Deserialize;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

#[derive(Deserialize)]
pub struct Log {
    pub level: String,
    #[serde(default)]
    pub structured: bool,
}

/// setup log from an optional environment filter and the config file
///
/// if the environment filter is present, then the configured level is not used
pub fn setup(
    env_filter: Result<EnvFilter, tracing_subscriber::filter::FromEnvError>,
    config: Option<&Log>,
) {
    let env_filter = env_filter.unwrap_or_else(|_| {
        EnvFilter::new(config.map(|c| c.level.as_str()).unwrap_or(DEFAULT_LEVEL))
    });
    let sbuilder = Subscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc3339())
        .with_level(true)
        .with_env_filter(env_filter);

    let res = if config.map(|c| c.structured).unwrap_or(false) {
        tracing::subscriber::set_global_default(sbuilder.json().finish())
    } else {
        tracing::subscriber::set_global_default(sbuilder.with_ansi(true).finish())
    };
    if let Err(err) = res {
        eprintln!("setting tracing default subscriber failed: {}", err);
    }
}
