use anyhow::Context;
use reqwest_middleware::ClientWithMiddleware;

use crate::home::{Datasource, DatasourceId, Metric};

use super::{DisplayCommand, MetricKind};

#[derive(Debug, Clone)]
pub struct HomeServerClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HomeServerClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = infrastructure::new_tracing_client()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
        })
    }

    /// Fetch the full datasource listing. Callers treat a failure as fatal
    /// for the current discovery pass.
    pub async fn datasources(&self) -> anyhow::Result<Vec<Datasource>> {
        let response = self
            .client
            .get(format!("{}/api/bridge/datasources", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Unexpected status {} fetching datasources", response.status());
        }

        response
            .json::<Vec<Datasource>>()
            .await
            .context("Error parsing datasource listing")
    }

    /// Fetch the current reading for one metric. Absent means the reading
    /// could not be fetched, not that it was zero.
    pub async fn metric(&self, id: DatasourceId, metric: MetricKind) -> Option<Metric> {
        match self.try_metric(id, metric).await {
            Ok(metric) => Some(metric),
            Err(e) => {
                tracing::error!("Error fetching metric {} for datasource {}: {:#}", metric, id, e);
                None
            }
        }
    }

    async fn try_metric(&self, id: DatasourceId, metric: MetricKind) -> anyhow::Result<Metric> {
        let response = self
            .client
            .get(format!("{}/api/bridge/datasources/{}/{}", self.base_url, id, metric))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Unexpected status {}", response.status());
        }

        response.json::<Metric>().await.context("Error parsing metric reading")
    }

    #[tracing::instrument(skip(self))]
    pub async fn send_display_command(&self, id: DatasourceId, command: DisplayCommand) -> anyhow::Result<()> {
        let url = format!("{}/api/bridge/datasources/{}/cmd/{}", self.base_url, id, command);

        let response = self.client.get(url).send().await?;
        tracing::info!("Response: {} - {}", response.status(), response.text().await?);

        Ok(())
    }
}
