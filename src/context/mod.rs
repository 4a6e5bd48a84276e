//! Environment metadata attached to every delivered batch.

pub mod environment;
pub mod provider;

pub use environment::{DeviceInfo, DeviceInfoError, EnvironmentProvider, Orientation, StaticEnvironment};
pub use provider::{Context, ContextProvider, format_timezone};
