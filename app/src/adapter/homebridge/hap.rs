use serde::{Deserialize, Serialize};

use crate::home::AirQuality;

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/ServiceDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomekitService {
    AirQualitySensor,
    HumiditySensor,
    Switch,
    TemperatureSensor,
}

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/CharacteristicDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomekitCharacteristic {
    AirQuality,
    CurrentRelativeHumidity,
    CurrentTemperature,
    On,
}

/// Value of the HomeKit AirQuality characteristic, UNKNOWN through POOR.
pub fn air_quality_value(quality: AirQuality) -> u8 {
    match quality {
        AirQuality::Unknown => 0,
        AirQuality::Excellent => 1,
        AirQuality::Good => 2,
        AirQuality::Fair => 3,
        AirQuality::Inferior => 4,
        AirQuality::Poor => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_map_to_homekit_values_in_order() {
        assert_eq!(air_quality_value(AirQuality::Unknown), 0);
        assert_eq!(air_quality_value(AirQuality::Excellent), 1);
        assert_eq!(air_quality_value(AirQuality::Poor), 5);
    }
}
