// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process reference transport.
//!
//! Routes samples, requests and responses between handles of the same
//! process through bounded lock-free queues. Queue overflow follows the
//! keep-last history policy: the oldest entry is displaced. Handles are
//! tracked weakly, so dropping an entity unregisters it lazily.
//!
//! This transport is the default for contexts created by `init()` and the
//! vehicle for the crate's own tests; a networked middleware can replace it
//! by implementing the `rmw` traits.

use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::wait::{WaitHookSet, WaitSignal, Waitable};
use super::{Gid, RequestId, RmwClient, RmwNode, RmwPublisher, RmwSample, RmwService,
            RmwSubscription, RmwTransport, GID_STORAGE_SIZE};
use crate::error::{Error, Result};
use crate::qos::QoS;

/// In-process transport: all matching happens inside one address space.
pub struct LoopbackTransport {
    inner: Arc<LoopbackInner>,
}

struct LoopbackInner {
    topics: DashMap<String, TopicEntry>,
    services: DashMap<String, ServiceEntry>,
    next_node_id: AtomicU64,
    next_gid: AtomicU64,
}

#[derive(Default)]
struct TopicEntry {
    subscribers: Vec<Weak<LoopbackSubscription>>,
}

#[derive(Default)]
struct ServiceEntry {
    servers: Vec<Weak<LoopbackService>>,
    clients: Vec<Weak<LoopbackClient>>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoopbackInner {
                topics: DashMap::new(),
                services: DashMap::new(),
                next_node_id: AtomicU64::new(1),
                next_gid: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RmwTransport for LoopbackTransport {
    fn create_node(&self, name: &str) -> Result<Arc<dyn RmwNode>> {
        if name.is_empty() {
            return Err(Error::TransportCreationFailed(
                "node name must not be empty".into(),
            ));
        }
        let node_id = self.inner.next_node_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("[loopback] node '{}' registered (id={})", name, node_id);
        Ok(Arc::new(LoopbackNode {
            inner: Arc::clone(&self.inner),
            node_id,
        }))
    }
}

impl LoopbackInner {
    fn alloc_gid(&self) -> Gid {
        let n = self.next_gid.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; GID_STORAGE_SIZE];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Gid(bytes)
    }
}

struct LoopbackNode {
    inner: Arc<LoopbackInner>,
    node_id: u64,
}

impl RmwNode for LoopbackNode {
    fn create_publisher(
        &self,
        topic: &str,
        type_name: &str,
        _qos: &QoS,
    ) -> Result<Arc<dyn RmwPublisher>> {
        if topic.is_empty() {
            return Err(Error::TransportCreationFailed(
                "topic name must not be empty".into(),
            ));
        }
        Ok(Arc::new(LoopbackPublisher {
            inner: Arc::clone(&self.inner),
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            gid: self.inner.alloc_gid(),
            node_id: self.node_id,
        }))
    }

    fn create_subscription(
        &self,
        topic: &str,
        type_name: &str,
        qos: &QoS,
        ignore_local_publications: bool,
    ) -> Result<Arc<dyn RmwSubscription>> {
        if topic.is_empty() {
            return Err(Error::TransportCreationFailed(
                "topic name must not be empty".into(),
            ));
        }
        let subscription = Arc::new(LoopbackSubscription {
            topic: topic.to_string(),
            type_name: type_name.to_string(),
            node_id: self.node_id,
            ignore_local: ignore_local_publications,
            queue: ArrayQueue::new(qos.depth()),
            hooks: WaitHookSet::new(),
        });
        self.inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .subscribers
            .push(Arc::downgrade(&subscription));
        Ok(subscription)
    }

    fn create_service(&self, service_name: &str, qos: &QoS) -> Result<Arc<dyn RmwService>> {
        if service_name.is_empty() {
            return Err(Error::TransportCreationFailed(
                "service name must not be empty".into(),
            ));
        }
        let service = Arc::new(LoopbackService {
            inner: Arc::clone(&self.inner),
            service_name: service_name.to_string(),
            requests: ArrayQueue::new(qos.depth()),
            hooks: WaitHookSet::new(),
        });
        self.inner
            .services
            .entry(service_name.to_string())
            .or_default()
            .servers
            .push(Arc::downgrade(&service));
        Ok(service)
    }

    fn create_client(&self, service_name: &str, qos: &QoS) -> Result<Arc<dyn RmwClient>> {
        if service_name.is_empty() {
            return Err(Error::TransportCreationFailed(
                "service name must not be empty".into(),
            ));
        }
        let client = Arc::new(LoopbackClient {
            inner: Arc::clone(&self.inner),
            service_name: service_name.to_string(),
            gid: self.inner.alloc_gid(),
            next_sequence: AtomicI64::new(0),
            responses: ArrayQueue::new(qos.depth()),
            hooks: WaitHookSet::new(),
        });
        self.inner
            .services
            .entry(service_name.to_string())
            .or_default()
            .clients
            .push(Arc::downgrade(&client));
        Ok(client)
    }
}

struct LoopbackPublisher {
    inner: Arc<LoopbackInner>,
    topic: String,
    type_name: String,
    gid: Gid,
    node_id: u64,
}

impl RmwPublisher for LoopbackPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn gid(&self) -> Gid {
        self.gid
    }

    fn publish(&self, payload: &[u8]) -> Result<()> {
        let Some(mut entry) = self.inner.topics.get_mut(&self.topic) else {
            return Ok(());
        };
        entry.subscribers.retain(|weak| {
            let Some(subscription) = weak.upgrade() else {
                return false;
            };
            if subscription.type_name != self.type_name {
                log::debug!(
                    "[loopback] type mismatch on '{}': publisher '{}' vs subscription '{}'",
                    self.topic,
                    self.type_name,
                    subscription.type_name
                );
                return true;
            }
            if subscription.ignore_local && subscription.node_id == self.node_id {
                return true;
            }
            subscription.push(RmwSample {
                payload: payload.to_vec(),
                sender_gid: self.gid,
            });
            true
        });
        Ok(())
    }
}

struct LoopbackSubscription {
    topic: String,
    type_name: String,
    node_id: u64,
    ignore_local: bool,
    queue: ArrayQueue<RmwSample>,
    hooks: WaitHookSet,
}

impl LoopbackSubscription {
    fn push(&self, sample: RmwSample) {
        if self.queue.force_push(sample).is_some() {
            log::debug!("[loopback] history full on '{}', oldest sample evicted", self.topic);
        }
        self.hooks.notify();
    }
}

impl RmwSubscription for LoopbackSubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn take(&self) -> Result<Option<RmwSample>> {
        Ok(self.queue.pop())
    }
}

impl Waitable for LoopbackSubscription {
    fn is_ready(&self) -> bool {
        !self.queue.is_empty()
    }

    fn attach_wait_signal(&self, signal: &Arc<WaitSignal>) {
        self.hooks.attach(signal);
        if self.is_ready() {
            signal.signal();
        }
    }

    fn detach_wait_signal(&self, signal_id: u64) {
        self.hooks.detach(signal_id);
    }
}

struct LoopbackService {
    inner: Arc<LoopbackInner>,
    service_name: String,
    requests: ArrayQueue<(RequestId, Vec<u8>)>,
    hooks: WaitHookSet,
}

impl LoopbackService {
    fn push_request(&self, request: (RequestId, Vec<u8>)) {
        if self.requests.force_push(request).is_some() {
            log::debug!(
                "[loopback] request queue full on '{}', oldest request evicted",
                self.service_name
            );
        }
        self.hooks.notify();
    }
}

impl RmwService for LoopbackService {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn take_request(&self) -> Result<Option<(RequestId, Vec<u8>)>> {
        Ok(self.requests.pop())
    }

    fn send_response(&self, request_id: RequestId, payload: &[u8]) -> Result<()> {
        let Some(mut entry) = self.inner.services.get_mut(&self.service_name) else {
            return Ok(());
        };
        let mut delivered = false;
        entry.clients.retain(|weak| {
            let Some(client) = weak.upgrade() else {
                return false;
            };
            if !delivered && client.gid == request_id.client_gid {
                client.push_response((request_id.sequence, payload.to_vec()));
                delivered = true;
            }
            true
        });
        if !delivered {
            log::debug!(
                "[loopback] client for response on '{}' is gone, dropping",
                self.service_name
            );
        }
        Ok(())
    }
}

impl Waitable for LoopbackService {
    fn is_ready(&self) -> bool {
        !self.requests.is_empty()
    }

    fn attach_wait_signal(&self, signal: &Arc<WaitSignal>) {
        self.hooks.attach(signal);
        if self.is_ready() {
            signal.signal();
        }
    }

    fn detach_wait_signal(&self, signal_id: u64) {
        self.hooks.detach(signal_id);
    }
}

struct LoopbackClient {
    inner: Arc<LoopbackInner>,
    service_name: String,
    gid: Gid,
    next_sequence: AtomicI64,
    responses: ArrayQueue<(i64, Vec<u8>)>,
    hooks: WaitHookSet,
}

impl LoopbackClient {
    fn push_response(&self, response: (i64, Vec<u8>)) {
        if self.responses.force_push(response).is_some() {
            log::debug!(
                "[loopback] response queue full on '{}', oldest response evicted",
                self.service_name
            );
        }
        self.hooks.notify();
    }
}

impl RmwClient for LoopbackClient {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn send_request(&self, payload: &[u8]) -> Result<i64> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let request_id = RequestId {
            client_gid: self.gid,
            sequence,
        };

        let Some(mut entry) = self.inner.services.get_mut(&self.service_name) else {
            log::debug!("[loopback] no server on '{}', request dropped", self.service_name);
            return Ok(sequence);
        };
        let mut delivered = false;
        entry.servers.retain(|weak| {
            let Some(server) = weak.upgrade() else {
                return false;
            };
            if !delivered {
                server.push_request((request_id, payload.to_vec()));
                delivered = true;
            }
            true
        });
        if !delivered {
            log::debug!("[loopback] no server on '{}', request dropped", self.service_name);
        }
        Ok(sequence)
    }

    fn take_response(&self) -> Result<Option<(i64, Vec<u8>)>> {
        Ok(self.responses.pop())
    }
}

impl Waitable for LoopbackClient {
    fn is_ready(&self) -> bool {
        !self.responses.is_empty()
    }

    fn attach_wait_signal(&self, signal: &Arc<WaitSignal>) {
        self.hooks.attach(signal);
        if self.is_ready() {
            signal.signal();
        }
    }

    fn detach_wait_signal(&self, signal_id: u64) {
        self.hooks.detach(signal_id);
    }
}
