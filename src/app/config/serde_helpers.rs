use super::ConfigError;
use std::path::PathBuf;

/// Durations stored as whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Loads and parses an environment variable; a missing variable keeps the default.
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

pub fn load_env_secs(name: &str, target: &mut std::time::Duration) -> Result<(), ConfigError> {
    let mut secs = target.as_secs();
    load_env_var(name, &mut secs)?;
    *target = std::time::Duration::from_secs(secs);
    Ok(())
}

pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

pub fn load_env_path(name: &str, target: &mut PathBuf) {
    if let Ok(value) = std::env::var(name) {
        *target = PathBuf::from(value);
    }
}
