use serde_json::Value;

use crate::{
    adapter::homebridge::{
        BridgeTarget,
        hap::{HomekitCharacteristic, HomekitService},
        platform::AccessoryContext,
    },
    adapter::homeserver::{HomeServerClient, MetricKind},
};

/// Plant moisture accessory, exposed as a humidity sensor.
pub struct IrrigationAccessory {
    client: HomeServerClient,
    context: AccessoryContext,
}

impl IrrigationAccessory {
    pub fn new(client: HomeServerClient, context: &AccessoryContext) -> Self {
        tracing::debug!(
            "Registering irrigation accessory for datasource {} at {}",
            context.datasource_id,
            context.server_url
        );

        Self {
            client,
            context: context.clone(),
        }
    }

    pub fn targets(&self) -> Vec<BridgeTarget> {
        vec![BridgeTarget {
            service: HomekitService::HumiditySensor,
            service_name: self.context.moisture_display_name.to_owned(),
            characteristic: HomekitCharacteristic::CurrentRelativeHumidity,
        }]
    }

    pub async fn read(&self, characteristic: &HomekitCharacteristic) -> Option<Value> {
        match characteristic {
            HomekitCharacteristic::CurrentRelativeHumidity => Some(Value::from(self.moisture().await)),
            other => {
                tracing::debug!("No read handler for characteristic {:?}", other);
                None
            }
        }
    }

    pub async fn write(&self, characteristic: &HomekitCharacteristic, _value: &Value) {
        tracing::warn!("Ignoring write to read-only characteristic {:?}", characteristic);
    }

    async fn moisture(&self) -> f64 {
        //The raw sensor scale is hundredths of a percent; an absent reading
        //falls back to the mid-scale raw value 5000.
        let raw = self
            .client
            .metric(self.context.datasource_id, MetricKind::Moisture)
            .await
            .map(|metric| metric.value)
            .unwrap_or(5000.0);

        let moisture = raw / 100.0;
        tracing::debug!("Get Moisture -> {}", moisture);
        moisture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::home::DatasourceId;
    use mockito::Server;

    fn accessory_for(server_url: &str) -> IrrigationAccessory {
        let client = HomeServerClient::new(server_url).unwrap();
        let context = AccessoryContext::new(server_url, DatasourceId(9));
        IrrigationAccessory::new(client, &context)
    }

    #[tokio::test]
    async fn moisture_is_scaled_to_percent() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources/9/moisture")
            .with_body(r#"{"Value":1234,"Timestamp":"2024-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::CurrentRelativeHumidity).await;

        assert_eq!(value, Some(serde_json::json!(12.34)));
    }

    #[tokio::test]
    async fn absent_reading_reports_mid_scale_percentage() {
        let server = Server::new_async().await;
        let accessory = accessory_for(&server.url());

        let value = accessory.read(&HomekitCharacteristic::CurrentRelativeHumidity).await;

        assert_eq!(value, Some(serde_json::json!(50.0)));
    }

    #[tokio::test]
    async fn other_characteristics_are_not_answered() {
        let server = Server::new_async().await;
        let accessory = accessory_for(&server.url());

        assert_eq!(accessory.read(&HomekitCharacteristic::On).await, None);
    }
}
