use std::sync::Arc;

use rumqttc::v5::{
    AsyncClient, Event, EventLoop, MqttOptions,
    mqttbytes::{
        QoS,
        v5::{ConnectProperties, Packet, Publish, SubscribeProperties},
    },
};
use tokio::sync::mpsc;

use super::MqttInMessage;

pub struct Mqtt {
    client: Arc<AsyncClient>,
    event_loop: EventLoop,
    subscriptions: Vec<Subscription>,
}

struct Subscription {
    topic: String,
    tx: mpsc::Sender<MqttInMessage>,
}

impl Mqtt {
    pub(super) fn connect(host: &str, port: u16, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(std::time::Duration::from_secs(5));
        options.set_clean_start(false);

        let mut connect_props = ConnectProperties::new();
        connect_props.session_expiry_interval = 60.into();
        connect_props.max_packet_size = Some(1024 * 1024);
        options.set_connect_properties(connect_props);

        let (client, event_loop) = AsyncClient::new(options, 10);

        Self {
            client: Arc::new(client),
            event_loop,
            subscriptions: vec![],
        }
    }

    pub async fn subscribe(&mut self, topic: impl Into<String>) -> anyhow::Result<MqttSubscription> {
        let topic = topic.into();
        let (tx, rx) = mpsc::channel::<MqttInMessage>(32);

        tracing::info!("Creating new subscription for topic: {:?}", topic);

        self.subscriptions.push(Subscription {
            topic: topic.clone(),
            tx,
        });

        self.client
            .subscribe_with_properties(
                topic,
                QoS::AtLeastOnce,
                SubscribeProperties {
                    id: Some(self.subscriptions.len()), //must be > 0
                    user_properties: vec![],
                },
            )
            .await?;

        Ok(MqttSubscription { rx })
    }

    pub fn new_publisher(&self) -> MqttSender {
        MqttSender {
            client: self.client.clone(),
        }
    }

    pub async fn run(mut self) {
        //Receive and forward MQTT messages
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.dispatch(publish).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                }
            }
        }
    }

    async fn dispatch(&self, publish: Publish) {
        let message: MqttInMessage = match (&publish).try_into() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Error parsing MQTT message: {}", e);
                return;
            }
        };

        tracing::trace!("Received MQTT message on topic {}", message.topic);

        let subscription_ids = match publish.properties {
            Some(p) => p.subscription_identifiers,
            None => {
                tracing::error!("No subscription identifiers in MQTT message");
                return;
            }
        };

        for id in subscription_ids {
            match self.subscriptions.get(id - 1) {
                Some(subscription) => {
                    if let Err(e) = subscription.tx.send(message.clone()).await {
                        tracing::error!(
                            "Failed to forward MQTT message to subscriber {}: {}",
                            subscription.topic,
                            e
                        );
                    }
                }
                None => {
                    tracing::error!("No subscription for id: {}", id);
                }
            }
        }
    }
}

pub struct MqttSubscription {
    rx: mpsc::Receiver<MqttInMessage>,
}

impl MqttSubscription {
    pub async fn recv(&mut self) -> Option<MqttInMessage> {
        self.rx.recv().await
    }
}

#[derive(Clone)]
pub struct MqttSender {
    client: Arc<AsyncClient>,
}

impl MqttSender {
    pub async fn send_transient(&self, topic: impl Into<String>, payload: impl Into<String>) -> anyhow::Result<()> {
        self.send(topic.into(), payload.into(), false).await
    }

    #[tracing::instrument(skip_all, fields(topic = %topic))]
    async fn send(&self, topic: String, payload: String, retain: bool) -> anyhow::Result<()> {
        tracing::debug!("Publishing MQTT message to {} (retain={}): {:?}", topic, retain, payload);

        self.client
            .publish(topic.clone(), QoS::ExactlyOnce, retain, payload)
            .await
            .map_err(|e| {
                tracing::error!("Error publishing MQTT message to {}: {}", topic, e);
                e.into()
            })
    }
}
