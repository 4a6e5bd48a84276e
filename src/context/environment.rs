use chrono::{Local, Offset};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Landscape,
    Portrait,
    LandscapeFlipped,
    PortraitFlipped,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
}

#[derive(Error, Debug, Clone)]
#[error("Device information unavailable: {0}")]
pub struct DeviceInfoError(pub String);

/// Host-supplied source of device and display metadata.
///
/// How the values are detected is up to the host; the pipeline only reads them.
#[cfg_attr(test, automock)]
pub trait EnvironmentProvider: Send + Sync {
    fn app_version(&self) -> String;
    fn device_info(&self) -> Result<DeviceInfo, DeviceInfoError>;
    fn os_label(&self) -> String;
    fn locale(&self) -> String;
    fn screen_size(&self) -> (u32, u32);
    fn orientation(&self) -> Orientation;
    /// Offset of local time from UTC, in minutes east of Greenwich.
    fn timezone_offset_minutes(&self) -> i32;
}

/// Environment provider backed by values the host sets explicitly.
///
/// Display values sit behind a lock so the host can update them on rotation or
/// resize while the logger is running. The timezone is read from the system clock.
#[derive(Debug)]
pub struct StaticEnvironment {
    app_version: String,
    device: Option<DeviceInfo>,
    os_label: String,
    locale: RwLock<String>,
    display: RwLock<((u32, u32), Orientation)>,
}

impl StaticEnvironment {
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            device: None,
            os_label: std::env::consts::OS.to_string(),
            locale: RwLock::new(locale_from_env()),
            display: RwLock::new(((0, 0), Orientation::Unknown)),
        }
    }

    pub fn with_device(mut self, manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        self.device = Some(DeviceInfo {
            manufacturer: manufacturer.into(),
            model: model.into(),
        });
        self
    }

    pub fn with_os_label(mut self, os_label: impl Into<String>) -> Self {
        self.os_label = os_label.into();
        self
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.write() = locale.into();
    }

    pub fn set_display(&self, width: u32, height: u32, orientation: Orientation) {
        *self.display.write() = ((width, height), orientation);
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn app_version(&self) -> String {
        self.app_version.clone()
    }

    fn device_info(&self) -> Result<DeviceInfo, DeviceInfoError> {
        self.device
            .clone()
            .ok_or_else(|| DeviceInfoError("no device information configured".to_string()))
    }

    fn os_label(&self) -> String {
        self.os_label.clone()
    }

    fn locale(&self) -> String {
        self.locale.read().clone()
    }

    fn screen_size(&self) -> (u32, u32) {
        self.display.read().0
    }

    fn orientation(&self) -> Orientation {
        self.display.read().1
    }

    fn timezone_offset_minutes(&self) -> i32 {
        Local::now().offset().fix().local_minus_utc() / 60
    }
}

// LANG looks like `en_US.UTF-8`; the wire format wants `en-US`.
fn locale_from_env() -> String {
    std::env::var("LANG")
        .ok()
        .and_then(|lang| {
            let tag = lang.split('.').next().unwrap_or_default().replace('_', "-");
            (!tag.is_empty() && tag != "C" && tag != "POSIX").then_some(tag)
        })
        .unwrap_or_else(|| "en-US".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_environment_without_device() {
        let env = StaticEnvironment::new("1.0.0.0");
        assert!(env.device_info().is_err());
        assert_eq!(env.os_label(), std::env::consts::OS);
        assert_eq!(env.orientation(), Orientation::Unknown);
    }

    #[test]
    fn test_static_environment_display_updates() {
        let env = StaticEnvironment::new("1.0.0.0").with_device("Contoso", "Tablet");
        env.set_display(1366, 768, Orientation::Landscape);
        assert_eq!(env.screen_size(), (1366, 768));

        env.set_display(768, 1366, Orientation::PortraitFlipped);
        assert_eq!(env.orientation(), Orientation::PortraitFlipped);
        assert_eq!(env.device_info().unwrap().model, "Tablet");
    }

    #[test]
    fn test_orientation_serialization() {
        assert_eq!(
            serde_json::to_string(&Orientation::LandscapeFlipped).unwrap(),
            "\"landscapeFlipped\""
        );
        assert_eq!(
            serde_json::to_string(&Orientation::Unknown).unwrap(),
            "\"unknown\""
        );
    }
}
