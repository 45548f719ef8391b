use std::collections::HashMap;

use infrastructure::{MqttInMessage, MqttSender, MqttSubscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::homebridge::{
    BridgePlatform, BridgeTarget,
    hap::{HomekitCharacteristic, HomekitService},
    platform::PlatformAccessory,
};

/// Drives the platform against a Homebridge host running the MQTT bridge
/// plugin: asks the host for its cached accessories, registers new ones and
/// answers the host's get/set requests.
pub struct BridgeRunner {
    platform: BridgePlatform,
    mqtt_sender: MqttSender,
    mqtt_receiver: MqttSubscription,
    base_topic: String,
}

impl BridgeRunner {
    pub(super) fn new(
        platform: BridgePlatform,
        mqtt_sender: MqttSender,
        mqtt_receiver: MqttSubscription,
        base_topic: String,
    ) -> Self {
        Self {
            platform,
            mqtt_sender,
            mqtt_receiver,
            base_topic,
        }
    }

    pub async fn run(mut self) {
        self.restore_cached_accessories().await;
        self.register_new_accessories().await;

        loop {
            match self.mqtt_receiver.recv().await {
                Some(msg) => self.handle_host_message(msg),
                None => {
                    tracing::error!("MQTT subscription closed, stopping Homebridge runner");
                    return;
                }
            }
        }
    }

    /// Ask the host which accessories it restored from its persisted cache,
    /// and feed every reported name to the platform before discovery runs.
    async fn restore_cached_accessories(&mut self) {
        let topic = format!("{}/to/get", self.base_topic);
        let payload = serde_json::json!({ "name": "*" }).to_string();

        if let Err(e) = self.mqtt_sender.send_transient(topic, payload).await {
            tracing::error!("Error requesting cached accessories from Homebridge: {:#}", e);
            return;
        }

        let response_topic = format!("{}/from/response", self.base_topic);

        loop {
            let msg = match self.mqtt_receiver.recv().await {
                Some(msg) => msg,
                None => return,
            };

            if msg.topic != response_topic {
                tracing::debug!(
                    "Ignoring MQTT message on {} while waiting for cached accessories",
                    msg.topic
                );
                continue;
            }

            match serde_json::from_str::<HashMap<String, Value>>(&msg.payload) {
                Ok(cached) => {
                    for name in cached.keys() {
                        self.platform.configure_accessory(name);
                    }
                }
                Err(e) => {
                    tracing::error!("Error parsing cached accessory response: {:?} -- {:?}", msg.payload, e);
                }
            }

            return;
        }
    }

    async fn register_new_accessories(&mut self) {
        let new_accessories = self.platform.discover_devices().await;

        for accessory in new_accessories {
            self.register_accessory(&accessory).await;
        }
    }

    async fn register_accessory(&self, accessory: &PlatformAccessory) {
        tracing::info!("Registering accessory with Homebridge: {}", accessory.display_name);

        let mut first_service = true;

        for ((service, service_name), characteristics) in grouped_targets(accessory.handler.targets()) {
            //make sure accessory is created before service is added
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;

            let topic = if first_service {
                first_service = false;
                format!("{}/to/add", self.base_topic)
            } else {
                format!("{}/to/add/service", self.base_topic)
            };

            let payload = Self::service_registration_payload(
                &accessory.id.to_string(),
                service,
                &service_name,
                &characteristics,
            );

            if let Err(e) = self.mqtt_sender.send_transient(topic.clone(), payload.to_string()).await {
                tracing::error!("Error sending MQTT message to Homebridge: {} -- {:#}", topic, e);
            }
        }
    }

    fn service_registration_payload(
        name: &str,
        service: HomekitService,
        service_name: &str,
        characteristics: &[HomekitCharacteristic],
    ) -> serde_json::Value {
        #[derive(Serialize)]
        struct Payload<'a> {
            name: &'a str,
            service_name: &'a str,
            service: HomekitService,
            #[serde(flatten)]
            config: HashMap<HomekitCharacteristic, serde_json::Value>,
        }

        let mut config = HashMap::new();
        for characteristic in characteristics {
            config.insert(*characteristic, serde_json::Value::String("default".to_string()));
        }

        let payload = Payload {
            name,
            service_name,
            service,
            config,
        };

        serde_json::to_value(payload).expect("Error serializing Homebridge service registration payload")
    }

    fn handle_host_message(&self, msg: MqttInMessage) {
        if msg.topic == format!("{}/from/get", self.base_topic) {
            self.handle_get(&msg.payload);
        } else if msg.topic == format!("{}/from/set", self.base_topic) {
            self.handle_set(&msg.payload);
        } else {
            tracing::debug!("Ignoring MQTT message on topic {}", msg.topic);
        }
    }

    fn handle_get(&self, payload: &str) {
        #[derive(Deserialize, Debug)]
        struct GetRequest {
            name: String,
            service_name: Option<String>,
            characteristic: HomekitCharacteristic,
        }

        let request: GetRequest = match serde_json::from_str(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Error parsing incoming Homebridge get request: {:?} -- {:?}", payload, e);
                return;
            }
        };

        tracing::debug!("Processing Homebridge get request: {:?}", request);

        let accessory = match self.platform.accessory(&request.name) {
            Some(accessory) => accessory,
            None => {
                tracing::debug!("Get request for unknown accessory: {}", request.name);
                return;
            }
        };

        let sender = self.mqtt_sender.clone();
        let topic = format!("{}/to/set", self.base_topic);

        //a slow home server read must only stall this one characteristic
        tokio::spawn(async move {
            let value = match accessory.handler.read(&request.characteristic).await {
                Some(value) => value,
                None => return,
            };

            let service_name = request.service_name.or_else(|| {
                accessory
                    .handler
                    .targets()
                    .into_iter()
                    .find(|target| target.characteristic == request.characteristic)
                    .map(|target| target.service_name)
            });

            let service_name = match service_name {
                Some(service_name) => service_name,
                None => {
                    tracing::debug!(
                        "No service for characteristic {:?} on accessory {}",
                        request.characteristic,
                        accessory.id
                    );
                    return;
                }
            };

            let response = OutgoingValue {
                name: accessory.id.to_string(),
                service_name,
                characteristic: request.characteristic,
                value,
            };

            let payload = match serde_json::to_string(&response) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Error serializing Homebridge value message: {:?} -- {:?}", response, e);
                    return;
                }
            };

            if let Err(e) = sender.send_transient(topic, payload).await {
                tracing::error!("Error sending MQTT message to Homebridge: {:#}", e);
            }
        });
    }

    fn handle_set(&self, payload: &str) {
        #[derive(Deserialize, Debug)]
        struct SetRequest {
            name: String,
            characteristic: HomekitCharacteristic,
            value: Value,
        }

        let request: SetRequest = match serde_json::from_str(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Error parsing incoming Homebridge set request: {:?} -- {:?}", payload, e);
                return;
            }
        };

        tracing::debug!("Processing Homebridge set event: {:?}", request);

        let accessory = match self.platform.accessory(&request.name) {
            Some(accessory) => accessory,
            None => {
                tracing::debug!("Set request for unknown accessory: {}", request.name);
                return;
            }
        };

        tokio::spawn(async move {
            accessory.handler.write(&request.characteristic, &request.value).await;
        });
    }
}

#[derive(Debug, Serialize)]
struct OutgoingValue {
    name: String,
    service_name: String,
    characteristic: HomekitCharacteristic,
    value: Value,
}

fn grouped_targets(targets: Vec<BridgeTarget>) -> Vec<((HomekitService, String), Vec<HomekitCharacteristic>)> {
    let mut groups: Vec<((HomekitService, String), Vec<HomekitCharacteristic>)> = vec![];

    for target in targets {
        let key = (target.service, target.service_name);
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, characteristics)) => characteristics.push(target.characteristic),
            None => groups.push((key, vec![target.characteristic])),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;

    use super::*;
    use crate::{
        adapter::homebridge::{
            accessory::{AccessoryHandler, Co2Accessory},
            platform::AccessoryContext,
        },
        adapter::homeserver::HomeServerClient,
        home::DatasourceId,
    };

    #[test]
    fn test_service_registration_payload() {
        let payload = BridgeRunner::service_registration_payload(
            "8ed4b179-6dbd-5a1e-b0e2-3e2d1a30f1c2",
            HomekitService::TemperatureSensor,
            "Temperature",
            &[HomekitCharacteristic::CurrentTemperature],
        );

        assert_json_eq!(
            payload,
            serde_json::json!({
                "name": "8ed4b179-6dbd-5a1e-b0e2-3e2d1a30f1c2",
                "service_name": "Temperature",
                "service": "TemperatureSensor",
                "CurrentTemperature": "default"
            })
        );
    }

    #[test]
    fn co2_accessory_registers_four_services() {
        let client = HomeServerClient::new("http://localhost:9").unwrap();
        let context = AccessoryContext::new("http://localhost:9", DatasourceId(1));
        let handler = AccessoryHandler::Co2(Co2Accessory::new(client, &context));

        let groups = grouped_targets(handler.targets());

        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].0, (HomekitService::AirQualitySensor, "Air quality".to_string()));
        assert_eq!(groups[3].0, (HomekitService::Switch, "CO2 Display".to_string()));
    }
}
