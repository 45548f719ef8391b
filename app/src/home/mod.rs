mod air_quality;
mod datasource;

pub use air_quality::AirQuality;
pub use datasource::{Datasource, DatasourceId, DatasourceStatus, DatasourceType, Metric};
