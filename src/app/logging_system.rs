use super::config::LogLevel;
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid directive '{input}', expected target=level")]
    InvalidDirective { input: String },
    #[error("Invalid log level '{input}'")]
    InvalidLevel { input: String },
    #[error("Logging initialization failed: {details}")]
    InitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel {
                input: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, LoggingError> {
        let Some((target, level)) = directive.split_once('=') else {
            return Err(LoggingError::InvalidDirective {
                input: directive.to_string(),
            });
        };

        let target = target.trim();
        if target.is_empty() || level.contains('=') {
            return Err(LoggingError::InvalidDirective {
                input: directive.to_string(),
            });
        }

        Ok(LogDirective::new(target, level.parse()?))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// Builds the `EnvFilter` for the crate's own diagnostics.
///
/// Malformed directives are skipped; a directive with an unknown level falls back
/// to the default level for its target.
#[derive(Debug)]
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
    fallback_level: LogLevel,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            fallback_level: LogLevel::Info,
        }
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), LoggingError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                self.directives.write().push(directive);
                Ok(())
            }
            Err(LoggingError::InvalidLevel { .. }) => {
                eprintln!("Warning: invalid level in '{directive_str}', using default level");
                let target = directive_str.split('=').next().unwrap_or_default().trim();
                self.directives
                    .write()
                    .push(LogDirective::new(target, self.fallback_level));
                Ok(())
            }
            Err(e @ LoggingError::InvalidDirective { .. }) => {
                eprintln!("Warning: {e}, skipping directive");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Quiets the HTTP stack below the requested level.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "reqwest", "h2"] {
            directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            LoggingError::InitFailed {
                details: "Failed to set global tracing subscriber".to_string(),
                source: Box::new(e),
            }
        })
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global subscriber once per process; later calls report the first outcome.
pub fn setup_logging(level: LogLevel) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        if let Ok(extra) = std::env::var("RUST_LOG") {
            for directive in extra.split(',').filter(|d| !d.trim().is_empty()) {
                logging_system
                    .add_directive(directive)
                    .map_err(|e| e.to_string())?;
            }
        }
        logging_system
            .initialize_tracing(level)
            .map_err(|e| e.to_string())
    });

    outcome.clone().map_err(|details| LoggingError::InitFailed {
        details,
        source: Box::new(std::io::Error::other("logging already failed to initialize")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_directive_parsing() {
        assert_eq!(
            LogDirective::parse("hyper=warn").unwrap(),
            LogDirective::new("hyper", LogLevel::Warn)
        );
        assert!(matches!(
            LogDirective::parse("=warn"),
            Err(LoggingError::InvalidDirective { .. })
        ));
        assert!(matches!(
            LogDirective::parse("a=b=c"),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_fallback_strategies() {
        let logging_system = LoggingSystem::new();

        let test_cases = [
            ("hyper=warn", 1),
            ("invalid_format", 1),
            ("target=invalid_level", 2),
            ("=empty", 2),
            ("", 2),
        ];

        for (directive, expected_count) in test_cases {
            assert!(logging_system.add_directive(directive).is_ok());
            assert_eq!(
                logging_system.directive_count(),
                expected_count,
                "Directive: {}",
                directive
            );
        }
    }

    #[test]
    fn test_build_filter_string() {
        let logging_system = LoggingSystem::new();
        assert_eq!(logging_system.build_filter_string(LogLevel::Info), "info");

        logging_system.add_default_directives();
        assert_eq!(
            logging_system.build_filter_string(LogLevel::Debug),
            "debug,hyper=warn,reqwest=warn,h2=warn"
        );
    }

    #[test]
    fn test_concurrent_directive_modification() {
        let logging_system = Arc::new(LoggingSystem::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let logging_system = logging_system.clone();
                thread::spawn(move || {
                    logging_system.add_directive(&format!("target{i}=info")).unwrap();
                    logging_system.build_filter_string(LogLevel::Info)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(logging_system.directive_count(), 32);
    }
}
