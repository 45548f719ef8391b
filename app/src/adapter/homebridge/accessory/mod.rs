mod co2;
mod irrigation;

pub use co2::Co2Accessory;
pub use irrigation::IrrigationAccessory;

use serde_json::Value;

use crate::adapter::homebridge::{BridgeTarget, hap::HomekitCharacteristic};

/// Handler logic attached to one accessory, dispatched by datasource type.
pub enum AccessoryHandler {
    Co2(Co2Accessory),
    Irrigation(IrrigationAccessory),
}

impl AccessoryHandler {
    pub fn targets(&self) -> Vec<BridgeTarget> {
        match self {
            AccessoryHandler::Co2(accessory) => accessory.targets(),
            AccessoryHandler::Irrigation(accessory) => accessory.targets(),
        }
    }

    /// Answer an on-demand characteristic read from the host.
    pub async fn read(&self, characteristic: &HomekitCharacteristic) -> Option<Value> {
        match self {
            AccessoryHandler::Co2(accessory) => accessory.read(characteristic).await,
            AccessoryHandler::Irrigation(accessory) => accessory.read(characteristic).await,
        }
    }

    pub async fn write(&self, characteristic: &HomekitCharacteristic, value: &Value) {
        match self {
            AccessoryHandler::Co2(accessory) => accessory.write(characteristic, value).await,
            AccessoryHandler::Irrigation(accessory) => accessory.write(characteristic, value).await,
        }
    }
}
