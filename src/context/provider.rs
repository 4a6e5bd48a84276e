use super::environment::{EnvironmentProvider, Orientation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub version: String,
    pub manufacturer: String,
    pub model: String,
    pub os: String,
    pub lang: String,
    pub screen: String,
    pub orientation: Orientation,
    pub timezone: String,
}

#[derive(Debug, Clone)]
struct Identity {
    version: String,
    manufacturer: String,
    model: String,
}

/// Resolves the [`Context`] for each batch.
///
/// Version, manufacturer and model are read once and cached for the process
/// lifetime. Locale, screen, orientation and timezone are read on every call.
pub struct ContextProvider {
    environment: Arc<dyn EnvironmentProvider>,
    identity: OnceLock<Identity>,
}

impl ContextProvider {
    pub fn new(environment: Arc<dyn EnvironmentProvider>) -> Self {
        Self {
            environment,
            identity: OnceLock::new(),
        }
    }

    pub fn context(&self) -> Context {
        let identity = self.identity.get_or_init(|| self.resolve_identity());
        let (width, height) = self.environment.screen_size();

        Context {
            version: identity.version.clone(),
            manufacturer: identity.manufacturer.clone(),
            model: identity.model.clone(),
            os: self.environment.os_label(),
            lang: self.environment.locale(),
            screen: format!("{width}x{height}"),
            orientation: self.environment.orientation(),
            timezone: format_timezone(self.environment.timezone_offset_minutes()),
        }
    }

    fn resolve_identity(&self) -> Identity {
        let version = self.environment.app_version();
        let (manufacturer, model) = match self.environment.device_info() {
            Ok(device) => (device.manufacturer, device.model),
            Err(e) => {
                debug!("Falling back to unknown device: {}", e);
                (UNKNOWN.to_string(), UNKNOWN.to_string())
            }
        };

        Identity {
            version,
            manufacturer,
            model,
        }
    }
}

impl std::fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextProvider")
            .field("identity", &self.identity.get())
            .finish_non_exhaustive()
    }
}

/// UTC offset in hours, without a trailing `.0` (`"9"`, `"5.5"`, `"-3"`).
pub fn format_timezone(offset_minutes: i32) -> String {
    let hours = f64::from(offset_minutes) / 60.0;
    format!("{hours}")
}
