pub(crate) mod accessory;
pub(crate) mod hap;
pub(crate) mod platform;
pub(crate) mod runtime;

pub use platform::BridgePlatform;

use infrastructure::Mqtt;
use serde::Deserialize;

use crate::adapter::homebridge::{
    hap::{HomekitCharacteristic, HomekitService},
    runtime::BridgeRunner,
};

/// One characteristic surface an accessory exposes on the Homebridge MQTT
/// contract, addressed by service and service display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BridgeTarget {
    pub(crate) service: HomekitService,
    pub(crate) service_name: String,
    pub(crate) characteristic: HomekitCharacteristic,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Homebridge {
    pub base_topic: String,
}

impl Homebridge {
    pub async fn new_runner(&self, mqtt: &mut Mqtt, platform: BridgePlatform) -> anyhow::Result<BridgeRunner> {
        let receiver = mqtt.subscribe(format!("{}/from/#", self.base_topic)).await?;

        Ok(BridgeRunner::new(
            platform,
            mqtt.new_publisher(),
            receiver,
            self.base_topic.clone(),
        ))
    }
}
