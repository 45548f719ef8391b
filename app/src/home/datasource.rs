use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Numeric identifier assigned to a datasource by the home server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, derive_more::Display)]
pub struct DatasourceId(pub u64);

/// One sensor/actuator tracked by the home server, as reported by the
/// datasource listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Datasource {
    #[serde(rename = "Id")]
    pub id: DatasourceId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Status")]
    pub status: DatasourceStatus,
    #[serde(rename = "Type")]
    pub kind: DatasourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasourceStatus {
    Connected,
    Disconnected,
}

//Type tags the server may grow are not allowed to fail the whole listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DatasourceType {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "IRRIGATION")]
    Irrigation,
    #[serde(other)]
    Unknown,
}

/// A single timestamped reading for one (datasource, metric) pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metric {
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasource_list_parses_wire_format() {
        let raw = r#"[
            {"Id":7,"Name":"Living room CO2","Status":"CONNECTED","Type":"CO2"},
            {"Id":9,"Name":"Ficus","Status":"DISCONNECTED","Type":"IRRIGATION"}
        ]"#;

        let datasources: Vec<Datasource> = serde_json::from_str(raw).unwrap();

        assert_eq!(datasources.len(), 2);
        assert_eq!(datasources[0].id, DatasourceId(7));
        assert_eq!(datasources[0].status, DatasourceStatus::Connected);
        assert_eq!(datasources[0].kind, DatasourceType::Co2);
        assert_eq!(datasources[1].kind, DatasourceType::Irrigation);
    }

    #[test]
    fn unknown_type_tag_does_not_fail_parsing() {
        let raw = r#"{"Id":3,"Name":"Weather","Status":"CONNECTED","Type":"WEATHER"}"#;

        let datasource: Datasource = serde_json::from_str(raw).unwrap();

        assert_eq!(datasource.kind, DatasourceType::Unknown);
    }
}
