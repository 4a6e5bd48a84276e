use super::{ConfigError, LoggerConfig};
use url::Url;

impl LoggerConfig {
    /// Checks the configuration before registration.
    ///
    /// Only the collector address can make registration fail outright; zero
    /// intervals are accepted and replaced by their defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }

        let url = Url::parse(&self.server_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid server URL '{}': {}", self.server_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Unsupported scheme '{}' in server URL '{}'",
                url.scheme(),
                self.server_url
            )));
        }

        if self.max_spill_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "Spill capacity must be greater than 0".to_string(),
            ));
        }

        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Storage path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
