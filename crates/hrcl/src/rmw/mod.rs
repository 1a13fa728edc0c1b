// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction consumed by the dispatch core.
//!
//! The core is transport-agnostic: it only requires handles that can report
//! readiness, hand over received payloads, and carry requests/responses. Any
//! middleware implementing these traits can sit underneath; the bundled
//! [`loopback::LoopbackTransport`] is the in-process reference
//! implementation and the default transport.
//!
//! Readiness is event-driven rather than polled: each handle accepts wait
//! signals (see [`wait`]) and fires them when data arrives, so a blocked
//! wait-set wakes immediately.

pub mod loopback;
pub mod wait;

pub use loopback::LoopbackTransport;
pub use wait::{GuardCondition, WaitSignal, Waitable};

use std::sync::Arc;

use crate::error::Result;
use crate::qos::QoS;

/// Storage size of a publisher's globally unique identifier.
pub const GID_STORAGE_SIZE: usize = 24;

/// Opaque globally unique identifier of a publisher endpoint.
///
/// Compared byte-wise; the transport chooses the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gid(pub [u8; GID_STORAGE_SIZE]);

impl Gid {
    /// All-zero gid, never assigned to a live endpoint.
    #[must_use]
    pub fn zero() -> Self {
        Self([0u8; GID_STORAGE_SIZE])
    }
}

/// One received topic sample: payload plus the sending publisher's gid.
#[derive(Debug, Clone)]
pub struct RmwSample {
    pub payload: Vec<u8>,
    pub sender_gid: Gid,
}

/// Correlation identity of an in-flight service request.
///
/// Combines the requesting client's gid with a client-assigned sequence
/// number, which together are process-unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId {
    pub client_gid: Gid,
    pub sequence: i64,
}

/// Transport entry point: a factory for per-node handle factories.
pub trait RmwTransport: Send + Sync {
    /// Create the transport-side representation of a node.
    fn create_node(&self, name: &str) -> Result<Arc<dyn RmwNode>>;
}

/// Per-node factory for communication handles.
///
/// Mirrors the underlying middleware convention of scoping every entity to
/// the node handle it was created from.
pub trait RmwNode: Send + Sync {
    fn create_publisher(
        &self,
        topic: &str,
        type_name: &str,
        qos: &QoS,
    ) -> Result<Arc<dyn RmwPublisher>>;

    /// `ignore_local_publications` suppresses delivery of samples published
    /// by this same node.
    fn create_subscription(
        &self,
        topic: &str,
        type_name: &str,
        qos: &QoS,
        ignore_local_publications: bool,
    ) -> Result<Arc<dyn RmwSubscription>>;

    fn create_service(&self, service_name: &str, qos: &QoS) -> Result<Arc<dyn RmwService>>;

    fn create_client(&self, service_name: &str, qos: &QoS) -> Result<Arc<dyn RmwClient>>;
}

/// Sending side of a topic.
pub trait RmwPublisher: Send + Sync {
    fn topic(&self) -> &str;

    /// Globally unique identifier of this publisher endpoint.
    fn gid(&self) -> Gid;

    /// Hand an encoded payload to the transport.
    fn publish(&self, payload: &[u8]) -> Result<()>;
}

/// Receiving side of a topic.
pub trait RmwSubscription: Waitable {
    fn topic(&self) -> &str;

    /// Take the oldest pending sample, if any.
    fn take(&self) -> Result<Option<RmwSample>>;
}

/// Server side of a service.
pub trait RmwService: Waitable {
    fn service_name(&self) -> &str;

    /// Take the oldest pending request, if any.
    fn take_request(&self) -> Result<Option<(RequestId, Vec<u8>)>>;

    /// Send a response for a previously taken request.
    fn send_response(&self, request_id: RequestId, payload: &[u8]) -> Result<()>;
}

/// Client side of a service.
pub trait RmwClient: Waitable {
    fn service_name(&self) -> &str;

    /// Send a request, returning the client-assigned sequence number.
    fn send_request(&self, payload: &[u8]) -> Result<i64>;

    /// Take the oldest pending response, if any.
    fn take_response(&self) -> Result<Option<(i64, Vec<u8>)>>;
}
