// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide registry routing in-process publishes to matching
//! subscribers without leaving the address space.
//!
//! Publishers store owned messages in per-publisher bounded rings sized by
//! their QoS depth; subscribers exchange the `{publisher_id, sequence}`
//! record received on the `__intra` companion topic for the owned message.
//!
//! Delivery policy is first-taker-wins: the metadata record is broadcast to
//! every matching subscription, the first one to call take receives
//! ownership, and later takers observe the missed-sample indication
//! (`Ok(None)`). Eviction by a newer publish produces the same indication,
//! which the keep-last QoS contract already allows.
//!
//! Entities hold the manager weakly and upgrade on every operation; an
//! upgrade failure is the normal teardown-race signal and surfaces as
//! [`Error::IntraProcessUnavailable`].

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::rmw::Gid;

/// Owned message plus the runtime type name it was stored with.
pub struct StoredMessage {
    pub message: Box<dyn Any + Send>,
    pub type_name: &'static str,
}

struct RingEntry {
    sequence: u64,
    message: Option<StoredMessage>,
}

struct PublisherRecord {
    topic: String,
    gid: Gid,
    depth: usize,
    type_name: &'static str,
    next_sequence: u64,
    ring: VecDeque<RingEntry>,
    /// Subscription ids on the same topic, eligible to take.
    interested: HashSet<u64>,
}

struct SubscriptionRecord {
    topic: String,
}

#[derive(Default)]
struct IpmState {
    publishers: HashMap<u64, PublisherRecord>,
    subscriptions: HashMap<u64, SubscriptionRecord>,
    gid_to_publisher: HashMap<Gid, u64>,
}

/// Process-wide intra-process routing registry.
///
/// Lives in the shared [`Context`](crate::context::Context); entities
/// reference it weakly.
pub struct IntraProcessManager {
    next_id: AtomicU64,
    state: Mutex<IpmState>,
}

impl IntraProcessManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(IpmState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IpmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a publisher, returning its process-wide unique id (non-zero).
    pub fn add_publisher(
        &self,
        topic: &str,
        gid: Gid,
        depth: usize,
        type_name: &'static str,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();

        let interested = state
            .subscriptions
            .iter()
            .filter(|(_, record)| record.topic == topic)
            .map(|(&sub_id, _)| sub_id)
            .collect();

        state.gid_to_publisher.insert(gid, id);
        state.publishers.insert(
            id,
            PublisherRecord {
                topic: topic.to_string(),
                gid,
                depth: depth.max(1),
                type_name,
                next_sequence: 0,
                ring: VecDeque::new(),
                interested,
            },
        );
        log::debug!("[intra] publisher {} registered on '{}'", id, topic);
        id
    }

    /// Register a subscription, returning its process-wide unique id
    /// (non-zero).
    pub fn add_subscription(&self, topic: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();

        for record in state.publishers.values_mut() {
            if record.topic == topic {
                record.interested.insert(id);
            }
        }
        state.subscriptions.insert(
            id,
            SubscriptionRecord {
                topic: topic.to_string(),
            },
        );
        log::debug!("[intra] subscription {} registered on '{}'", id, topic);
        id
    }

    /// Unregister a publisher, destroying any still-buffered messages.
    pub fn remove_publisher(&self, publisher_id: u64) {
        let mut state = self.lock();
        if let Some(record) = state.publishers.remove(&publisher_id) {
            state.gid_to_publisher.remove(&record.gid);
        }
    }

    /// Unregister a subscription.
    pub fn remove_subscription(&self, subscription_id: u64) {
        let mut state = self.lock();
        state.subscriptions.remove(&subscription_id);
        for record in state.publishers.values_mut() {
            record.interested.remove(&subscription_id);
        }
    }

    /// Accept exclusive ownership of `message` and place it in the
    /// publisher's ring, evicting the oldest entry when full. Returns the
    /// ring sequence the companion record must carry.
    ///
    /// # Errors
    ///
    /// `IntraProcessUnavailable` if the publisher is no longer registered,
    /// `TypeMismatch` if `type_name` differs from the publisher's declared
    /// type.
    pub fn store_intra_process_message(
        &self,
        publisher_id: u64,
        message: Box<dyn Any + Send>,
        type_name: &'static str,
    ) -> Result<u64> {
        let mut state = self.lock();
        let Some(record) = state.publishers.get_mut(&publisher_id) else {
            return Err(Error::IntraProcessUnavailable);
        };
        if record.type_name != type_name {
            return Err(Error::TypeMismatch {
                expected: record.type_name,
                actual: type_name,
            });
        }

        record.next_sequence += 1;
        let sequence = record.next_sequence;
        record.ring.push_back(RingEntry {
            sequence,
            message: Some(StoredMessage { message, type_name }),
        });
        if record.ring.len() > record.depth {
            if let Some(evicted) = record.ring.pop_front() {
                log::debug!(
                    "[intra] publisher {} ring full, sequence {} evicted",
                    publisher_id,
                    evicted.sequence
                );
            }
        }
        Ok(sequence)
    }

    /// Transfer ownership of the identified message to the caller.
    ///
    /// Returns `Ok(None)` when the message was evicted, already taken, the
    /// publisher is gone, or the subscription is not eligible for this
    /// publisher. All of those are the missed-sample indication the QoS
    /// contract allows.
    pub fn take_intra_process_message(
        &self,
        publisher_id: u64,
        sequence: u64,
        subscription_id: u64,
    ) -> Result<Option<StoredMessage>> {
        let mut state = self.lock();
        let Some(record) = state.publishers.get_mut(&publisher_id) else {
            log::debug!(
                "[intra] take for unknown publisher {}, sample missed",
                publisher_id
            );
            return Ok(None);
        };
        if !record.interested.contains(&subscription_id) {
            log::debug!(
                "[intra] subscription {} not matched to publisher {}, sample ignored",
                subscription_id,
                publisher_id
            );
            return Ok(None);
        }
        let Some(entry) = record.ring.iter_mut().find(|e| e.sequence == sequence) else {
            return Ok(None);
        };
        Ok(entry.message.take())
    }

    /// Whether `gid` identifies a publisher registered with this manager.
    ///
    /// Subscriptions use this to drop topic samples that originated in the
    /// same process, whose payload arrives through the intra path instead.
    #[must_use]
    pub fn matches_any_publishers(&self, gid: &Gid) -> bool {
        self.lock().gid_to_publisher.contains_key(gid)
    }
}

impl Default for IntraProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gid(n: u8) -> Gid {
        let mut bytes = [0u8; crate::rmw::GID_STORAGE_SIZE];
        bytes[0] = n;
        Gid(bytes)
    }

    fn stored(value: i64) -> (Box<dyn Any + Send>, &'static str) {
        (Box::new(value), "i64")
    }

    #[test]
    fn test_ids_are_unique_and_non_zero() {
        let manager = IntraProcessManager::new();
        let a = manager.add_publisher("t", test_gid(1), 10, "i64");
        let b = manager.add_subscription("t");
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_store_take_round_trip() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");
        let subscription = manager.add_subscription("t");

        let (message, type_name) = stored(42);
        let sequence = manager
            .store_intra_process_message(publisher, message, type_name)
            .expect("store should succeed");

        let taken = manager
            .take_intra_process_message(publisher, sequence, subscription)
            .expect("take should succeed")
            .expect("message should be present");
        let value = taken
            .message
            .downcast::<i64>()
            .expect("stored type should be i64");
        assert_eq!(*value, 42);
    }

    #[test]
    fn test_first_taker_wins() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");
        let sub_a = manager.add_subscription("t");
        let sub_b = manager.add_subscription("t");

        let (message, type_name) = stored(7);
        let sequence = manager
            .store_intra_process_message(publisher, message, type_name)
            .expect("store should succeed");

        assert!(manager
            .take_intra_process_message(publisher, sequence, sub_a)
            .expect("take should succeed")
            .is_some());
        assert!(manager
            .take_intra_process_message(publisher, sequence, sub_b)
            .expect("take should succeed")
            .is_none());
    }

    #[test]
    fn test_eviction_keeps_last_depth_messages() {
        let manager = IntraProcessManager::new();
        let depth = 3;
        let extra = 2;
        let publisher = manager.add_publisher("t", test_gid(1), depth, "i64");
        let subscription = manager.add_subscription("t");

        let mut sequences = Vec::new();
        for n in 0..(depth + extra) as i64 {
            let (message, type_name) = stored(n);
            sequences.push(
                manager
                    .store_intra_process_message(publisher, message, type_name)
                    .expect("store should succeed"),
            );
        }

        for (index, &sequence) in sequences.iter().enumerate() {
            let taken = manager
                .take_intra_process_message(publisher, sequence, subscription)
                .expect("take should succeed");
            if index < extra {
                assert!(taken.is_none(), "evicted sequence {} still present", sequence);
            } else {
                assert!(taken.is_some(), "retained sequence {} missing", sequence);
            }
        }
    }

    #[test]
    fn test_unmatched_subscription_cannot_take() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");
        let other_topic_sub = manager.add_subscription("other");

        let (message, type_name) = stored(1);
        let sequence = manager
            .store_intra_process_message(publisher, message, type_name)
            .expect("store should succeed");

        assert!(manager
            .take_intra_process_message(publisher, sequence, other_topic_sub)
            .expect("take should succeed")
            .is_none());
    }

    #[test]
    fn test_type_mismatch_rejected_at_store() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");

        let result =
            manager.store_intra_process_message(publisher, Box::new(1.5_f64), "f64");
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_store_after_remove_fails() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");
        manager.remove_publisher(publisher);

        let (message, type_name) = stored(1);
        assert!(matches!(
            manager.store_intra_process_message(publisher, message, type_name),
            Err(Error::IntraProcessUnavailable)
        ));
    }

    #[test]
    fn test_matches_any_publishers() {
        let manager = IntraProcessManager::new();
        let gid = test_gid(9);
        let publisher = manager.add_publisher("t", gid, 10, "i64");

        assert!(manager.matches_any_publishers(&gid));
        assert!(!manager.matches_any_publishers(&test_gid(8)));

        manager.remove_publisher(publisher);
        assert!(!manager.matches_any_publishers(&gid));
    }

    #[test]
    fn test_late_subscription_matched_to_existing_publisher() {
        let manager = IntraProcessManager::new();
        let publisher = manager.add_publisher("t", test_gid(1), 10, "i64");
        let late_sub = manager.add_subscription("t");

        let (message, type_name) = stored(11);
        let sequence = manager
            .store_intra_process_message(publisher, message, type_name)
            .expect("store should succeed");
        assert!(manager
            .take_intra_process_message(publisher, sequence, late_sub)
            .expect("take should succeed")
            .is_some());
    }
}
