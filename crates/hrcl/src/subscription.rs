// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed subscription over a transport handle.
//!
//! With intra-process routing enabled a subscription waits on two handles:
//! the main topic (payloads from other processes) and the `__intra`
//! companion (metadata records from same-process publishers). Samples on
//! the main topic whose sender gid belongs to a local publisher are
//! dropped; their payload arrives through the intra path instead.

use std::sync::{Arc, OnceLock, Weak};

use crate::error::{Error, Result};
use crate::intra_process::{IntraProcessManager, StoredMessage};
use crate::msg::{IntraProcessMessage, Message};
use crate::rmw::{Gid, RmwSubscription};

/// Erased taker handed to the subscription at intra-process setup.
///
/// Arguments: publisher id, message sequence, subscription id.
pub(crate) type IntraTakeFn =
    Box<dyn Fn(u64, u64, u64) -> Result<Option<StoredMessage>> + Send + Sync>;

/// Predicate deciding whether a sender gid belongs to a local publisher.
pub(crate) type MatchesFn = Box<dyn Fn(&Gid) -> Result<bool> + Send + Sync>;

pub(crate) struct IntraSubscriptionState {
    pub id: u64,
    pub handle: Arc<dyn RmwSubscription>,
    pub take: IntraTakeFn,
    pub matches_any_publishers: MatchesFn,
    pub manager: Weak<IntraProcessManager>,
}

/// Object-safe view of a subscription used by callback groups and the
/// executor.
pub trait SubscriptionBase: Send + Sync {
    fn topic_name(&self) -> &str;

    /// Main topic handle.
    fn handle(&self) -> Arc<dyn RmwSubscription>;

    /// Companion topic handle, present when intra-process routing is on.
    fn intra_handle(&self) -> Option<Arc<dyn RmwSubscription>>;

    /// Take one sample from the main handle and run the callback.
    fn execute(&self) -> Result<()>;

    /// Take one companion record, exchange it at the intra-process manager
    /// and run the callback.
    fn execute_intra_process(&self) -> Result<()>;
}

/// Typed receiving side of a topic.
pub struct Subscription<M: Message> {
    topic: String,
    handle: Arc<dyn RmwSubscription>,
    callback: Box<dyn Fn(M) + Send + Sync>,
    intra: OnceLock<IntraSubscriptionState>,
}

impl<M: Message> Subscription<M> {
    pub(crate) fn new(
        topic: String,
        handle: Arc<dyn RmwSubscription>,
        callback: Box<dyn Fn(M) + Send + Sync>,
    ) -> Self {
        Self {
            topic,
            handle,
            callback,
            intra: OnceLock::new(),
        }
    }

    /// Intra-process id assigned by the manager; `None` when intra-process
    /// routing is disabled. Non-zero and stable once assigned.
    #[must_use]
    pub fn intra_process_id(&self) -> Option<u64> {
        self.intra.get().map(|state| state.id)
    }

    pub(crate) fn setup_intra_process(
        &self,
        id: u64,
        handle: Arc<dyn RmwSubscription>,
        take: IntraTakeFn,
        matches_any_publishers: MatchesFn,
        manager: Weak<IntraProcessManager>,
    ) {
        let state = IntraSubscriptionState {
            id,
            handle,
            take,
            matches_any_publishers,
            manager,
        };
        if self.intra.set(state).is_err() {
            log::warn!(
                "[node] intra-process setup repeated for subscription on '{}', ignored",
                self.topic
            );
        }
    }
}

impl<M: Message> SubscriptionBase for Subscription<M> {
    fn topic_name(&self) -> &str {
        &self.topic
    }

    fn handle(&self) -> Arc<dyn RmwSubscription> {
        Arc::clone(&self.handle)
    }

    fn intra_handle(&self) -> Option<Arc<dyn RmwSubscription>> {
        self.intra.get().map(|state| Arc::clone(&state.handle))
    }

    fn execute(&self) -> Result<()> {
        let Some(sample) = self.handle.take()? else {
            return Ok(());
        };

        if let Some(intra) = self.intra.get() {
            if (intra.matches_any_publishers)(&sample.sender_gid)? {
                // Local publisher: the payload arrives through the intra
                // path, delivering this sample too would duplicate it.
                return Ok(());
            }
        }

        let message = M::decode(&sample.payload)?;
        (self.callback)(message);
        Ok(())
    }

    fn execute_intra_process(&self) -> Result<()> {
        let Some(intra) = self.intra.get() else {
            return Err(Error::IntraProcessUnavailable);
        };
        let Some(sample) = intra.handle.take()? else {
            return Ok(());
        };

        let record = IntraProcessMessage::decode(&sample.payload)?;
        let taken = (intra.take)(record.publisher_id, record.message_sequence, intra.id)?;
        let Some(stored) = taken else {
            // Evicted or already taken: the missed-sample case the QoS
            // contract allows.
            return Ok(());
        };

        match stored.message.downcast::<M>() {
            Ok(message) => {
                (self.callback)(*message);
                Ok(())
            }
            Err(_) => Err(Error::TypeMismatch {
                expected: M::type_name(),
                actual: stored.type_name,
            }),
        }
    }
}

impl<M: Message> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(intra) = self.intra.get() {
            if let Some(manager) = intra.manager.upgrade() {
                manager.remove_subscription(intra.id);
            }
        }
    }
}
