use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use lapin::{
	BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
	message::Delivery,
	options::{
		BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
		ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
	},
	types::{AMQPValue, FieldTable},
};
use tokio::{sync::watch, time as tokio_time};

use crate::{
	CommandHandler, Result,
	policy::{self, AckAction},
};

const CONSUMER_TAG: &str = "scout-worker";
const ATTEMPTS_HEADER: &str = "x-attempts";
const LAST_ERROR_HEADER: &str = "x-last-error";

/// Connection lifecycle of the command consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
	Disconnected,
	Connecting,
	TopologyDeclared,
	Consuming,
	Stopped,
}

enum SessionEnd {
	/// The consumer stream or connection ended on its own; reconnect.
	StreamClosed,
	/// A shutdown signal arrived; terminal.
	Shutdown,
}

/// Owns the long-lived bus connection. One logical consumer, one message in
/// flight at a time; processing happens inline before the acknowledgment
/// decision so commands on a connection are handled strictly in delivery
/// order.
pub struct Supervisor {
	cfg: scout_config::Bus,
	handler: Arc<dyn CommandHandler>,
	state: SupervisorState,
}

impl Supervisor {
	pub fn new(cfg: scout_config::Bus, handler: Arc<dyn CommandHandler>) -> Self {
		Self { cfg, handler, state: SupervisorState::Disconnected }
	}

	pub fn state(&self) -> SupervisorState {
		self.state
	}

	/// Runs until `shutdown` flips to `true`. Connection and channel failures
	/// are absorbed: the supervisor drops back to `Disconnected`, waits out
	/// the configured backoff, and reconnects. Unacked in-flight deliveries
	/// are requeued by the broker when the connection drops.
	pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
		loop {
			if *shutdown.borrow() {
				self.transition(SupervisorState::Stopped);

				return Ok(());
			}

			self.transition(SupervisorState::Connecting);

			match self.session(&mut shutdown).await {
				Ok(SessionEnd::Shutdown) => {
					self.transition(SupervisorState::Stopped);

					return Ok(());
				},
				Ok(SessionEnd::StreamClosed) => {
					tracing::warn!("Consumer stream closed by the broker.");
				},
				Err(err) => {
					tracing::error!(error = %err, "Bus session failed.");
				},
			}

			self.transition(SupervisorState::Disconnected);

			let delay = Duration::from_millis(self.cfg.reconnect_delay_ms);

			tokio::select! {
				_ = tokio_time::sleep(delay) => {},
				_ = shutdown.changed() => {},
			}
		}
	}

	async fn session(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<SessionEnd> {
		let connection =
			Connection::connect(&self.cfg.url, ConnectionProperties::default()).await?;
		let channel = connection.create_channel().await?;

		self.declare_topology(&channel).await?;
		self.transition(SupervisorState::TopologyDeclared);

		let mut consumer = channel
			.basic_consume(
				&self.cfg.command_queue,
				CONSUMER_TAG,
				BasicConsumeOptions::default(),
				FieldTable::default(),
			)
			.await?;

		self.transition(SupervisorState::Consuming);

		loop {
			tokio::select! {
				delivery = consumer.next() => {
					let Some(delivery) = delivery else {
						return Ok(SessionEnd::StreamClosed);
					};
					let delivery = delivery?;

					self.handle_delivery(&channel, delivery).await?;
				},
				_ = shutdown.changed() => {
					tracing::info!("Shutdown signal received. Closing bus connection.");

					if let Err(err) = connection.close(200, "shutdown").await {
						tracing::warn!(error = %err, "Bus connection close failed.");
					}

					return Ok(SessionEnd::Shutdown);
				},
			}
		}
	}

	async fn declare_topology(&self, channel: &Channel) -> Result<()> {
		channel.basic_qos(self.cfg.prefetch, BasicQosOptions::default()).await?;
		channel
			.exchange_declare(
				&self.cfg.exchange,
				exchange_kind(&self.cfg.exchange_type),
				ExchangeDeclareOptions { durable: true, ..Default::default() },
				FieldTable::default(),
			)
			.await?;
		channel
			.queue_declare(
				&self.cfg.command_queue,
				QueueDeclareOptions { durable: true, ..Default::default() },
				FieldTable::default(),
			)
			.await?;
		channel
			.queue_bind(
				&self.cfg.command_queue,
				&self.cfg.exchange,
				&self.cfg.command_queue,
				QueueBindOptions::default(),
				FieldTable::default(),
			)
			.await?;
		channel
			.queue_declare(
				&self.cfg.dead_letter_queue,
				QueueDeclareOptions { durable: true, ..Default::default() },
				FieldTable::default(),
			)
			.await?;

		Ok(())
	}

	async fn handle_delivery(&self, channel: &Channel, delivery: Delivery) -> Result<()> {
		let attempts = delivery_attempts(&delivery);
		let outcome = self.handler.handle(&delivery.data).await;
		let action = policy::decide(&outcome, attempts, self.cfg.max_delivery_attempts);

		match &action {
			AckAction::Ack => {},
			AckAction::Republish { next_attempts } => {
				tracing::warn!(
					attempts = next_attempts,
					max_attempts = self.cfg.max_delivery_attempts,
					"Command failed transiently. Republishing for another attempt."
				);
				publish(channel, &self.cfg.command_queue, &delivery.data, *next_attempts, None)
					.await?;
			},
			AckAction::DeadLetter { reason } => {
				tracing::error!(
					attempts,
					reason = %reason,
					queue = %self.cfg.dead_letter_queue,
					"Command exhausted its attempts. Dead-lettering."
				);
				publish(
					channel,
					&self.cfg.dead_letter_queue,
					&delivery.data,
					attempts,
					Some(reason.as_str()),
				)
				.await?;
			},
		}

		delivery.ack(BasicAckOptions::default()).await?;

		Ok(())
	}

	fn transition(&mut self, next: SupervisorState) {
		if self.state == next {
			return;
		}

		tracing::info!(from = ?self.state, to = ?next, "Supervisor state changed.");

		self.state = next;
	}
}

/// Publishes to the default exchange so the routing key addresses the queue
/// directly, the way the command producers do.
async fn publish(
	channel: &Channel,
	queue: &str,
	payload: &[u8],
	attempts: u32,
	last_error: Option<&str>,
) -> Result<()> {
	let mut headers = FieldTable::default();

	headers.insert(ATTEMPTS_HEADER.into(), AMQPValue::LongInt(attempts as i32));

	if let Some(reason) = last_error {
		headers.insert(LAST_ERROR_HEADER.into(), AMQPValue::LongString(reason.into()));
	}

	let properties = BasicProperties::default()
		.with_delivery_mode(2)
		.with_content_type("application/json".into())
		.with_headers(headers);

	channel
		.basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
		.await?
		.await?;

	Ok(())
}

fn delivery_attempts(delivery: &Delivery) -> u32 {
	let Some(headers) = delivery.properties.headers() else {
		return 0;
	};

	headers
		.inner()
		.iter()
		.find(|(key, _)| key.as_str() == ATTEMPTS_HEADER)
		.map(|(_, value)| match value {
			AMQPValue::LongInt(n) => (*n).max(0) as u32,
			AMQPValue::LongLongInt(n) => (*n).clamp(0, i64::from(u32::MAX)) as u32,
			AMQPValue::LongUInt(n) => *n,
			AMQPValue::ShortInt(n) => (*n).max(0) as u32,
			AMQPValue::ShortShortInt(n) => (*n).max(0) as u32,
			_ => 0,
		})
		.unwrap_or(0)
}

fn exchange_kind(raw: &str) -> ExchangeKind {
	match raw {
		"fanout" => ExchangeKind::Fanout,
		"topic" => ExchangeKind::Topic,
		// Config validation restricts the value; direct is the default.
		_ => ExchangeKind::Direct,
	}
}
