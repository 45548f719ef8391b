use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    adapter::homebridge::accessory::{AccessoryHandler, Co2Accessory, IrrigationAccessory},
    adapter::homeserver::HomeServerClient,
    home::{Datasource, DatasourceId, DatasourceType},
};

/// Stable accessory identity, derived from the datasource id alone so that
/// the same datasource maps to the same accessory across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub struct AccessoryId(Uuid);

impl AccessoryId {
    pub fn from_datasource(id: DatasourceId) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.to_string().as_bytes()))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

/// Per-accessory record captured at creation time. Immutable for the
/// lifetime of the accessory object.
#[derive(Debug, Clone)]
pub struct AccessoryContext {
    pub server_url: String,
    pub datasource_id: DatasourceId,
    pub air_display_name: &'static str,
    pub temperature_display_name: &'static str,
    pub humidity_display_name: &'static str,
    pub display_switch_name: &'static str,
    pub moisture_display_name: &'static str,
}

impl AccessoryContext {
    pub(crate) fn new(server_url: &str, datasource_id: DatasourceId) -> Self {
        Self {
            server_url: server_url.to_owned(),
            datasource_id,
            air_display_name: "Air quality",
            temperature_display_name: "Temperature",
            humidity_display_name: "Humidity",
            display_switch_name: "CO2 Display",
            moisture_display_name: "Plant Moisture Sensor",
        }
    }
}

pub struct PlatformAccessory {
    pub id: AccessoryId,
    pub display_name: String,
    pub context: AccessoryContext,
    pub handler: AccessoryHandler,
}

/// Matches freshly fetched datasources against accessories the host already
/// restored from its cache, and owns the resulting accessory registry.
pub struct BridgePlatform {
    client: HomeServerClient,
    server_url: String,
    restored: HashSet<AccessoryId>,
    accessories: HashMap<AccessoryId, Arc<PlatformAccessory>>,
}

impl BridgePlatform {
    pub fn new(client: HomeServerClient, server_url: &str) -> Self {
        Self {
            client,
            server_url: server_url.to_owned(),
            restored: HashSet::new(),
            accessories: HashMap::new(),
        }
    }

    /// Restore callback: the host reports one accessory it recovered from
    /// its persisted cache.
    pub fn configure_accessory(&mut self, name: &str) {
        match AccessoryId::parse(name) {
            Some(id) => {
                tracing::info!("Loading accessory from cache: {}", name);
                self.restored.insert(id);
            }
            None => {
                tracing::debug!("Ignoring cached accessory not owned by this platform: {}", name);
            }
        }
    }

    pub fn accessory(&self, name: &str) -> Option<Arc<PlatformAccessory>> {
        let id = AccessoryId::parse(name)?;
        self.accessories.get(&id).cloned()
    }

    /// One discovery pass over the home server's datasource listing.
    /// Returns the accessories the host does not know yet and that still
    /// need registration. A failed listing fetch aborts the whole pass;
    /// there is no scheduled retry.
    pub async fn discover_devices(&mut self) -> Vec<Arc<PlatformAccessory>> {
        let datasources = match self.client.datasources().await {
            Ok(datasources) => datasources,
            Err(e) => {
                tracing::error!("Error fetching datasources from remote: {:#}", e);
                return vec![];
            }
        };

        tracing::info!("Fetched {} datasources from remote", datasources.len());

        let mut new_accessories = vec![];

        for datasource in datasources {
            tracing::debug!(
                "Discovered datasource {} ({:?}, {:?})",
                datasource.name,
                datasource.kind,
                datasource.status
            );

            let id = AccessoryId::from_datasource(datasource.id);
            let context = AccessoryContext::new(&self.server_url, datasource.id);

            let handler = match self.new_handler(&datasource, &context) {
                Some(handler) => handler,
                None => {
                    tracing::error!(
                        "Unable to create accessory handler for unknown type {:?}",
                        datasource.kind
                    );
                    continue;
                }
            };

            let already_known = self.restored.contains(&id) || self.accessories.contains_key(&id);

            let accessory = Arc::new(PlatformAccessory {
                id,
                display_name: datasource.name.clone(),
                context,
                handler,
            });

            if already_known {
                tracing::info!("Restoring existing accessory from cache: {}", datasource.name);
                self.accessories.insert(id, accessory);
            } else {
                tracing::info!("Adding new accessory: {}", datasource.name);
                self.accessories.insert(id, accessory.clone());
                new_accessories.push(accessory);
            }
        }

        new_accessories
    }

    fn new_handler(&self, datasource: &Datasource, context: &AccessoryContext) -> Option<AccessoryHandler> {
        match datasource.kind {
            DatasourceType::Co2 => Some(AccessoryHandler::Co2(Co2Accessory::new(
                self.client.clone(),
                context,
            ))),
            DatasourceType::Irrigation => Some(AccessoryHandler::Irrigation(IrrigationAccessory::new(
                self.client.clone(),
                context,
            ))),
            DatasourceType::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn platform_for(server: &mockito::ServerGuard) -> BridgePlatform {
        let client = HomeServerClient::new(&server.url()).unwrap();
        BridgePlatform::new(client, &server.url())
    }

    fn identity_of(id: u64) -> String {
        AccessoryId::from_datasource(DatasourceId(id)).to_string()
    }

    #[test]
    fn identity_is_stable_and_distinct() {
        assert_eq!(
            AccessoryId::from_datasource(DatasourceId(7)),
            AccessoryId::from_datasource(DatasourceId(7))
        );
        assert_ne!(
            AccessoryId::from_datasource(DatasourceId(7)),
            AccessoryId::from_datasource(DatasourceId(9))
        );
    }

    #[tokio::test]
    async fn restored_accessory_is_reused_and_new_one_registered() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources")
            .with_body(
                r#"[
                    {"Id":7,"Name":"Living room CO2","Status":"CONNECTED","Type":"CO2"},
                    {"Id":9,"Name":"Ficus","Status":"CONNECTED","Type":"IRRIGATION"}
                ]"#,
            )
            .create_async()
            .await;

        let mut platform = platform_for(&server);
        platform.configure_accessory(&identity_of(7));

        let new_accessories = platform.discover_devices().await;

        assert_eq!(new_accessories.len(), 1);
        assert_eq!(new_accessories[0].context.datasource_id, DatasourceId(9));

        //the restored accessory answers reads without having been re-registered
        assert!(platform.accessory(&identity_of(7)).is_some());
    }

    #[tokio::test]
    async fn unknown_type_is_skipped_without_breaking_the_pass() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources")
            .with_body(
                r#"[
                    {"Id":7,"Name":"Living room CO2","Status":"CONNECTED","Type":"CO2"},
                    {"Id":9,"Name":"Weather","Status":"CONNECTED","Type":"WEATHER"}
                ]"#,
            )
            .create_async()
            .await;

        let mut platform = platform_for(&server);

        let new_accessories = platform.discover_devices().await;

        assert_eq!(new_accessories.len(), 1);
        assert_eq!(new_accessories[0].context.datasource_id, DatasourceId(7));
        assert!(platform.accessory(&identity_of(9)).is_none());
    }

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources")
            .with_body(r#"[{"Id":7,"Name":"Living room CO2","Status":"CONNECTED","Type":"CO2"}]"#)
            .create_async()
            .await;

        let mut platform = platform_for(&server);

        assert_eq!(platform.discover_devices().await.len(), 1);
        assert_eq!(platform.discover_devices().await.len(), 0);
    }

    #[tokio::test]
    async fn failed_listing_fetch_aborts_the_pass() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/bridge/datasources")
            .with_status(500)
            .create_async()
            .await;

        let mut platform = platform_for(&server);

        assert!(platform.discover_devices().await.is_empty());
        assert!(platform.accessory(&identity_of(7)).is_none());
    }

    #[tokio::test]
    async fn cached_names_from_other_plugins_are_ignored() {
        let server = Server::new_async().await;
        let mut platform = platform_for(&server);

        platform.configure_accessory("flex_lamp");

        assert!(platform.restored.is_empty());
    }
}
