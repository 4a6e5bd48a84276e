pub mod client;
pub mod transmission;

pub use client::{ClientConfig, ClientError, ConnectionStats, HttpClient};
pub use transmission::{BatchTransmitter, TransmissionError, TransmissionResult, Transport};
