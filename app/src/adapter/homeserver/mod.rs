mod client;

pub use client::HomeServerClient;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct HomeServer {
    pub url: String,
}

/// Metric names exposed per datasource by the home server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum MetricKind {
    #[display("co2")]
    Co2,
    #[display("temperature")]
    Temperature,
    #[display("humidity")]
    Humidity,
    #[display("moisture")]
    Moisture,
    #[display("display_status")]
    DisplayStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum DisplayCommand {
    #[display("command_co2_display_on")]
    On,
    #[display("command_co2_display_off")]
    Off,
}

impl DisplayCommand {
    pub fn from_state(on: bool) -> Self {
        if on { DisplayCommand::On } else { DisplayCommand::Off }
    }
}
