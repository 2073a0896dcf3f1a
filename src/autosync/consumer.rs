use std::time::Duration;

use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Connection, ConnectionProperties, ExchangeKind,
};
use tokio_util::sync::CancellationToken;

use super::models::Message;
use super::services::{aggregate::Aggregate, SyncService};

const EXCHANGE: &str = "events.watched";
const QUEUE: &str = "autosync";
/// Dispatch is all I/O, keep a healthy number of deliveries in flight.
const PREFETCH: u16 = 20;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consumes watch-status events and fans them out to the sync services.
pub struct AutosyncConsumer {
    url: String,
    services: Aggregate,
}

impl AutosyncConsumer {
    pub fn new(url: &str, services: Aggregate) -> Self {
        Self {
            url: url.to_string(),
            services,
        }
    }

    pub async fn run(&'static self, token: CancellationToken) {
        while !token.is_cancelled() {
            match self.listen(&token).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::error!("Autosync consumer lost its broker connection: {e}");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
        tracing::info!("Autosync consumer stopped");
    }

    async fn listen(&'static self, token: &CancellationToken) -> anyhow::Result<()> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_declare(QUEUE, QueueDeclareOptions::default(), FieldTable::default())
            .await?;
        channel
            .queue_bind(
                QUEUE,
                EXCHANGE,
                "#",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel.basic_qos(PREFETCH, BasicQosOptions::default()).await?;
        let mut consumer = channel
            .basic_consume(
                QUEUE,
                "autosync",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        tracing::info!("Listening for autosync");

        loop {
            let delivery = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                delivery = consumer.next() => delivery,
            };
            let Some(delivery) = delivery else {
                anyhow::bail!("consumer stream closed");
            };
            let delivery = delivery?;
            // The qos window bounds how many of these run at once.
            tokio::spawn(async move {
                self.handle(delivery).await;
            });
        }
    }

    /// Ack only after every service handled the message, reject without
    /// requeue otherwise.
    async fn handle(&self, delivery: Delivery) {
        let outcome = match serde_json::from_slice::<Message>(&delivery.data) {
            Ok(message) => {
                self.services
                    .update(
                        &message.value.user,
                        &message.value.resource,
                        &message.value.status,
                    )
                    .await
            }
            Err(e) => Err(anyhow::anyhow!("undecodable message: {e}")),
        };
        match outcome {
            Ok(()) => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::error!("Couldn't ack message: {e}");
                }
            }
            Err(e) => {
                tracing::error!("Couldn't dispatch watch status: {e}");
                if let Err(e) = delivery
                    .reject(BasicRejectOptions { requeue: false })
                    .await
                {
                    tracing::error!("Couldn't reject message: {e}");
                }
            }
        }
    }
}
