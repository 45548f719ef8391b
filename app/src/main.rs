use settings::Settings;

use crate::adapter::homebridge::BridgePlatform;
use crate::adapter::homeserver::HomeServerClient;

mod adapter;
mod home;
mod settings;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings.monitoring.init().expect("Error initializing monitoring");

    tracing::debug!("Finished initializing platform: {}", settings.name);

    let mut mqtt_client = settings.mqtt.new_client();

    let client = HomeServerClient::new(&settings.homeserver.url).expect("Error initializing home server client");
    let platform = BridgePlatform::new(client, &settings.homeserver.url);

    let runner = settings
        .homebridge
        .new_runner(&mut mqtt_client, platform)
        .await
        .expect("Error initializing Homebridge runner");

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = mqtt_client.run() => {},
        _ = runner.run() => {},
    );
}
