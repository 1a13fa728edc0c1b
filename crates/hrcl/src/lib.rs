// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HRCL - client library core for publish/subscribe robotics middleware
//!
//! Processes ("nodes") exchange typed messages over named topics, issue
//! request/response calls over named services and drive periodic callbacks
//! via timers, on top of a pluggable messaging transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hrcl::{Node, QoS, SingleThreadedExecutor};
//!
//! fn main() -> hrcl::Result<()> {
//!     hrcl::init()?;
//!
//!     let node = Node::builder("listener").build()?;
//!     let _subscription = node.create_subscription(
//!         "chatter",
//!         QoS::default(),
//!         |message: String| println!("I heard: {}", message),
//!     )?;
//!
//!     let executor = SingleThreadedExecutor::new(node.context());
//!     executor.add_node(&node, true);
//!     executor.spin()
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Application Layer                           |
//! |    Node -> Publisher/Subscription/Service/Client/Timer             |
//! +--------------------------------------------------------------------+
//! |                        Dispatch Layer                              |
//! |    Executor | CallbackGroup policy | MemoryStrategy | WaitSet      |
//! +--------------------------------------------------------------------+
//! |                        Routing Layer                               |
//! |    IntraProcessManager (same-process, zero-serialization)          |
//! +--------------------------------------------------------------------+
//! |                        Transport Layer (rmw)                       |
//! |    Pluggable middleware | bundled in-process loopback              |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Node`] | Named participant, factory for all entities |
//! | [`SingleThreadedExecutor`] | Default spin driver |
//! | [`MultiThreadedExecutor`] | Worker-pool spin driver |
//! | [`CallbackGroup`] | Execution discipline for a set of callbacks |
//! | [`QoS`] | History/reliability profile |
//! | [`Message`] | Encode/decode contract for payload types |
//!
//! ## Concurrency model
//!
//! Callbacks in a mutually-exclusive group are serialized; callbacks in a
//! reentrant group may run concurrently up to the executor's worker-pool
//! size. Only the wait for readiness blocks; user callbacks run
//! synchronously on the dispatching thread.

/// Callback groups: execution disciplines for sets of entities.
pub mod callback_group;
/// Typed service clients.
pub mod client;
/// Process lifecycle (init/shutdown/ok/sleep) and the shared context.
pub mod context;
/// Environment-variable runtime configuration.
pub mod env_config;
/// Crate-wide error type.
pub mod error;
/// Executors: wait-set construction, selection, dispatch.
pub mod executor;
/// Same-process zero-serialization message routing.
pub mod intra_process;
/// The message encode/decode contract and built-in impls.
pub mod msg;
/// Nodes: entity factories.
pub mod node;
/// Node parameters and their service exposure.
pub mod parameter;
/// Typed publishers.
pub mod publisher;
/// Quality of Service profiles.
pub mod qos;
/// Transport abstraction and the bundled loopback implementation.
pub mod rmw;
/// Typed service servers.
pub mod service;
/// Typed subscriptions.
pub mod subscription;
/// Steady-clock periodic timers.
pub mod timer;

pub use callback_group::{CallbackGroup, CallbackGroupKind};
pub use client::Client;
pub use context::{init, init_with_env, ok, shutdown, sigint_guard_condition, sleep_for, Context};
pub use env_config::EnvConfig;
pub use error::{Error, Result};
pub use executor::{
    AnyExecutable, DefaultMemoryStrategy, Executor, MemoryStrategy, MultiThreadedExecutor,
    SingleThreadedExecutor,
};
pub use intra_process::IntraProcessManager;
pub use msg::Message;
pub use node::{Node, NodeBuilder, SubscriptionOptions};
pub use parameter::{Parameter, ParameterService, ParameterType, ParameterValue};
pub use publisher::Publisher;
pub use qos::{History, QoS, Reliability};
pub use rmw::{GuardCondition, LoopbackTransport};
pub use service::Service;
pub use subscription::Subscription;
pub use timer::Timer;

use std::sync::Arc;

/// Convenience driver: spin `node` on a fresh single-threaded executor
/// until shutdown.
pub fn spin(node: &Arc<Node>) -> Result<()> {
    let executor = SingleThreadedExecutor::new(node.context());
    executor.add_node(node, false);
    executor.spin()
}

/// Convenience driver: dispatch everything currently ready on `node`, then
/// return.
pub fn spin_some(node: &Arc<Node>) -> Result<()> {
    let executor = SingleThreadedExecutor::new(node.context());
    executor.add_node(node, false);
    executor.spin_some()
}
