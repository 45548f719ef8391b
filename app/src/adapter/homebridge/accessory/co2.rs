use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::{
    adapter::homebridge::{
        BridgeTarget,
        hap::{self, HomekitCharacteristic, HomekitService},
        platform::AccessoryContext,
    },
    adapter::homeserver::{DisplayCommand, HomeServerClient, MetricKind},
    home::AirQuality,
};

/// CO2 sensor accessory: air quality, temperature and humidity sensors plus
/// a switch for the device's display. Every read fetches live from the home
/// server; only the display state is remembered between requests.
pub struct Co2Accessory {
    client: HomeServerClient,
    context: AccessoryContext,
    display_on: AtomicBool,
}

impl Co2Accessory {
    pub fn new(client: HomeServerClient, context: &AccessoryContext) -> Self {
        tracing::debug!(
            "Registering co2 accessory for datasource {} at {}",
            context.datasource_id,
            context.server_url
        );

        Self {
            client,
            context: context.clone(),
            display_on: AtomicBool::new(false),
        }
    }

    pub fn targets(&self) -> Vec<BridgeTarget> {
        vec![
            BridgeTarget {
                service: HomekitService::AirQualitySensor,
                service_name: self.context.air_display_name.to_owned(),
                characteristic: HomekitCharacteristic::AirQuality,
            },
            BridgeTarget {
                service: HomekitService::TemperatureSensor,
                service_name: self.context.temperature_display_name.to_owned(),
                characteristic: HomekitCharacteristic::CurrentTemperature,
            },
            BridgeTarget {
                service: HomekitService::HumiditySensor,
                service_name: self.context.humidity_display_name.to_owned(),
                characteristic: HomekitCharacteristic::CurrentRelativeHumidity,
            },
            BridgeTarget {
                service: HomekitService::Switch,
                service_name: self.context.display_switch_name.to_owned(),
                characteristic: HomekitCharacteristic::On,
            },
        ]
    }

    pub async fn read(&self, characteristic: &HomekitCharacteristic) -> Option<Value> {
        match characteristic {
            HomekitCharacteristic::AirQuality => {
                Some(Value::from(hap::air_quality_value(self.air_quality().await)))
            }
            HomekitCharacteristic::CurrentTemperature => Some(Value::from(self.temperature().await)),
            HomekitCharacteristic::CurrentRelativeHumidity => Some(Value::from(self.humidity().await)),
            HomekitCharacteristic::On => Some(Value::from(self.display_status().await)),
        }
    }

    pub async fn write(&self, characteristic: &HomekitCharacteristic, value: &Value) {
        match characteristic {
            HomekitCharacteristic::On => {
                let on = value
                    .as_bool()
                    .or_else(|| value.as_i64().map(|v| v != 0))
                    .unwrap_or(false);
                self.set_display(on).await;
            }
            other => {
                tracing::warn!("Ignoring write to read-only characteristic {:?}", other);
            }
        }
    }

    async fn air_quality(&self) -> AirQuality {
        let ppm = self.metric_or(MetricKind::Co2, 0.0).await;
        let quality = AirQuality::from_co2_ppm(ppm);
        tracing::debug!("Get Airquality -> {:?}", quality);
        quality
    }

    async fn temperature(&self) -> f64 {
        let temperature = self.metric_or(MetricKind::Temperature, 0.0).await;
        tracing::debug!("Get Temperature -> {}", temperature);
        temperature
    }

    async fn humidity(&self) -> f64 {
        let humidity = self.metric_or(MetricKind::Humidity, 0.0).await;
        tracing::debug!("Get Humidity -> {}", humidity);
        humidity
    }

    async fn display_status(&self) -> bool {
        let on = self.metric_or(MetricKind::DisplayStatus, 0.0).await != 0.0;
        self.display_on.store(on, Ordering::Relaxed);
        tracing::debug!("Get DisplayStatus -> {}", on);
        on
    }

    async fn set_display(&self, on: bool) {
        self.display_on.store(on, Ordering::Relaxed);

        let command = DisplayCommand::from_state(on);
        match self
            .client
            .send_display_command(self.context.datasource_id, command)
            .await
        {
            Ok(()) => tracing::info!(
                "Sent display command {} for datasource {}",
                command,
                self.context.datasource_id
            ),
            Err(e) => tracing::error!(
                "Error sending display command {} for datasource {}: {:#}",
                command,
                self.context.datasource_id,
                e
            ),
        }
    }

    async fn metric_or(&self, metric: MetricKind, default: f64) -> f64 {
        //An absent reading falls back to a fixed default, conflating "no
        //data" with a real reading. Kept for compatibility with the server's
        //existing consumers.
        self.client
            .metric(self.context.datasource_id, metric)
            .await
            .map(|metric| metric.value)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::home::DatasourceId;
    use mockito::Server;

    fn accessory_for(server_url: &str) -> Co2Accessory {
        let client = HomeServerClient::new(server_url).unwrap();
        let context = AccessoryContext::new(server_url, DatasourceId(7));
        Co2Accessory::new(client, &context)
    }

    #[tokio::test]
    async fn temperature_defaults_to_zero_when_absent() {
        let server = Server::new_async().await;
        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::CurrentTemperature).await;

        assert_eq!(value, Some(serde_json::json!(0.0)));
    }

    #[tokio::test]
    async fn humidity_defaults_to_zero_when_absent() {
        let server = Server::new_async().await;
        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::CurrentRelativeHumidity).await;

        assert_eq!(value, Some(serde_json::json!(0.0)));
    }

    #[tokio::test]
    async fn air_quality_is_classified_from_live_reading() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources/7/co2")
            .with_body(r#"{"Value":1250.0,"Timestamp":"2024-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::AirQuality).await;

        assert_eq!(value, Some(serde_json::json!(4)));
    }

    #[tokio::test]
    async fn absent_co2_reading_reports_unknown_air_quality() {
        let server = Server::new_async().await;
        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::AirQuality).await;

        assert_eq!(value, Some(serde_json::json!(0)));
    }

    #[tokio::test]
    async fn display_status_read_caches_last_known_state() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources/7/display_status")
            .with_body(r#"{"Value":1,"Timestamp":"2024-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::On).await;

        assert_eq!(value, Some(serde_json::json!(true)));
        assert!(accessory.display_on.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn display_write_sends_matching_command() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/bridge/datasources/7/cmd/command_co2_display_on")
            .with_body("OK")
            .create_async()
            .await;

        let accessory = accessory_for(&server.url());
        accessory.write(&HomekitCharacteristic::On, &serde_json::json!(true)).await;

        mock.assert_async().await;
        assert!(accessory.display_on.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn display_write_off_sends_off_command() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/bridge/datasources/7/cmd/command_co2_display_off")
            .with_body("OK")
            .create_async()
            .await;

        let accessory = accessory_for(&server.url());
        accessory.write(&HomekitCharacteristic::On, &serde_json::json!(false)).await;

        mock.assert_async().await;
        assert!(!accessory.display_on.load(Ordering::Relaxed));
    }
}
