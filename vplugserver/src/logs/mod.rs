// logs.rs
use tracing::Level;
use tracing_subscriber::{
    Registry,
    filter::LevelFilter,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Niveau minimum ("ERROR", "WARN", "INFO", "DEBUG", "TRACE")
    pub min_level: String,
    /// Activer la sortie console
    pub enable_console: bool,
    /// Sortie console au format JSON
    pub json: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            min_level: "INFO".to_string(),
            enable_console: true,
            json: false,
        }
    }
}

/// Initialise le système de logging
///
/// Le filtre de niveau est appliqué avant la couche console.
/// Un niveau inconnu retombe sur `INFO`.
///
/// # Errors
///
/// Échoue si un subscriber global est déjà installé.
pub fn init_logging(options: LoggingOptions) -> Result<(), TryInitError> {
    let log_level = string_to_level(&options.min_level)
        .map(level_to_levelfilter)
        .unwrap_or(LevelFilter::INFO);

    let subscriber = Registry::default().with(log_level);

    match (options.enable_console, options.json) {
        (true, true) => subscriber
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?,
        (true, false) => subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()?,
        (false, _) => subscriber.try_init()?,
    }

    Ok(())
}

pub fn string_to_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

fn level_to_levelfilter(level: Level) -> LevelFilter {
    match level {
        Level::ERROR => LevelFilter::ERROR,
        Level::WARN => LevelFilter::WARN,
        Level::INFO => LevelFilter::INFO,
        Level::DEBUG => LevelFilter::DEBUG,
        Level::TRACE => LevelFilter::TRACE,
    }
}
