// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message bus client.

mod amqp;

pub use amqp::AmqpBus;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBus;

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the message bus client.
#[derive(Debug, Error)]
pub enum MessageBusError {
    #[error("failed to connect to message bus: {0}")]
    Connection(String),
    #[error("broker refused publish confirm: {0}")]
    PublishNack(String),
    #[error("consume failed: {0}")]
    Consume(String),
    #[error("ack/nack failed for delivery {delivery_tag}: {source}")]
    Acknowledge { delivery_tag: u64, source: String },
}

impl MessageBusError {
    /// True for failures that indicate the underlying connection is gone
    /// (as opposed to a broker-level rejection like a publish nack), and
    /// so should trigger `AmqpBus`'s reconnect-with-backoff path rather
    /// than propagate straight to the caller.
    pub fn is_connection_layer(&self) -> bool {
        matches!(self, MessageBusError::Connection(_))
    }
}

/// One undelivered-acknowledged message pulled off a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
}

/// Queue declaration flags.
#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
}

/// Blocking facade over an AMQP-like broker connection, used one-per-worker
/// — each worker owns its own channel. `consume_one` blocks for up to
/// `timeout` waiting for the next delivery with manual acknowledgement and
/// prefetch=1; `None` means the wait elapsed with nothing delivered, not
/// an error.
pub trait MessageBus: Send {
    fn declare_queue(&mut self, name: &str, options: QueueOptions) -> Result<(), MessageBusError>;

    fn publish(&mut self, queue: &str, body: &[u8], confirm: bool) -> Result<(), MessageBusError>;

    fn consume_one(
        &mut self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<Delivery>, MessageBusError>;

    fn ack(&mut self, delivery_tag: u64) -> Result<(), MessageBusError>;

    fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<(), MessageBusError>;
}
