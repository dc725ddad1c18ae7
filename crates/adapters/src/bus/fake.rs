// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process `MessageBus` fake for engine/broker tests.

use super::{Delivery, MessageBus, MessageBusError, QueueOptions};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub queue: String,
    pub body: Vec<u8>,
}

/// Records every publish and lets tests seed queues with pending
/// deliveries; `ack`/`nack` are recorded rather than discarded so tests can
/// assert that a delivery receives exactly one disposition.
#[derive(Default)]
pub struct FakeBus {
    next_tag: u64,
    queues: HashMap<String, VecDeque<Delivery>>,
    pub published: Vec<PublishedMessage>,
    pub acked: Vec<u64>,
    pub nacked: Vec<(u64, bool)>,
    pub declared: Vec<(String, QueueOptions)>,
    /// When set, the next `consume_one` for any queue fails with this error.
    pub fail_next_consume: Option<String>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a delivery as if it had arrived over the wire.
    pub fn push(&mut self, queue: &str, body: impl Into<Vec<u8>>) -> u64 {
        self.next_tag += 1;
        let tag = self.next_tag;
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_back(Delivery { delivery_tag: tag, body: body.into() });
        tag
    }
}

impl MessageBus for FakeBus {
    fn declare_queue(&mut self, name: &str, options: QueueOptions) -> Result<(), MessageBusError> {
        self.declared.push((name.to_string(), options));
        self.queues.entry(name.to_string()).or_default();
        Ok(())
    }

    fn publish(&mut self, queue: &str, body: &[u8], _confirm: bool) -> Result<(), MessageBusError> {
        self.published.push(PublishedMessage { queue: queue.to_string(), body: body.to_vec() });
        Ok(())
    }

    fn consume_one(
        &mut self,
        queue: &str,
        _timeout: Duration,
    ) -> Result<Option<Delivery>, MessageBusError> {
        if let Some(reason) = self.fail_next_consume.take() {
            return Err(MessageBusError::Consume(reason));
        }
        Ok(self.queues.entry(queue.to_string()).or_default().pop_front())
    }

    fn ack(&mut self, delivery_tag: u64) -> Result<(), MessageBusError> {
        self.acked.push(delivery_tag);
        Ok(())
    }

    fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<(), MessageBusError> {
        self.nacked.push((delivery_tag, requeue));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
