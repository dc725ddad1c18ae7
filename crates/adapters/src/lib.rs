// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! operandi-adapters: narrow interfaces over the two external
//! collaborators the broker talks to directly — the message bus and the
//! HPC cluster. The document store lives in `operandi-store`.

pub mod bus;
pub mod hpc;

pub use bus::{AmqpBus, Delivery, MessageBus, MessageBusError, QueueOptions};
pub use hpc::{HpcError, HpcGateway, ProxyJumpConfig, SshHpcGateway};

#[cfg(any(test, feature = "test-support"))]
pub use bus::FakeBus;
#[cfg(any(test, feature = "test-support"))]
pub use hpc::FakeHpcGateway;
