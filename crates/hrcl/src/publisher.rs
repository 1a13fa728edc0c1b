// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed publisher over a transport handle.
//!
//! With intra-process routing enabled a publisher carries a second handle on
//! the `__intra` companion topic. A publish then does two things: the
//! encoded payload goes out through the main handle for observers in other
//! processes, and the owned message itself is stored with the intra-process
//! manager, announced to same-process subscribers by the 16-byte companion
//! record. Same-process subscribers drop the main-topic sample by sender
//! gid, so each message is delivered once.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};

use crate::error::{Error, Result};
use crate::intra_process::IntraProcessManager;
use crate::msg::{IntraProcessMessage, Message};
use crate::rmw::{Gid, RmwPublisher};

/// Erased store operation handed to the publisher at intra-process setup.
///
/// Arguments: publisher id, owned message (absent is an error), runtime type
/// name. Returns the ring sequence.
pub(crate) type StoreFn =
    Box<dyn Fn(u64, Option<Box<dyn Any + Send>>, &'static str) -> Result<u64> + Send + Sync>;

pub(crate) struct IntraPublisherState {
    pub id: u64,
    pub handle: Arc<dyn RmwPublisher>,
    pub store: StoreFn,
    pub manager: Weak<IntraProcessManager>,
}

/// Typed sending side of a topic.
pub struct Publisher<M: Message> {
    topic: String,
    handle: Arc<dyn RmwPublisher>,
    intra: OnceLock<IntraPublisherState>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message> Publisher<M> {
    pub(crate) fn new(topic: String, handle: Arc<dyn RmwPublisher>) -> Self {
        Self {
            topic,
            handle,
            intra: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Globally unique identifier of the main (inter-process) endpoint.
    #[must_use]
    pub fn gid(&self) -> Gid {
        self.handle.gid()
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
        store: StoreFn,
        handle: Arc<dyn RmwPublisher>,
        manager: Weak<IntraProcessManager>,
    ) {
        let state = IntraPublisherState {
            id,
            handle,
            store,
            manager,
        };
        if self.intra.set(state).is_err() {
            log::warn!(
                "[node] intra-process setup repeated for publisher on '{}', ignored",
                self.topic
            );
        }
    }

    /// Publish a message.
    ///
    /// The encoded payload always goes through the main transport handle;
    /// with intra-process routing enabled the message itself additionally
    /// moves, unserialized, into the intra-process ring.
    pub fn publish(&self, message: M) -> Result<()> {
        let payload = message.encode()?;
        self.handle.publish(&payload)?;

        if let Some(intra) = self.intra.get() {
            let sequence = (intra.store)(intra.id, Some(Box::new(message)), M::type_name())?;
            let record = IntraProcessMessage {
                publisher_id: intra.id,
                message_sequence: sequence,
            };
            intra.handle.publish(&record.encode()?)?;
        }
        Ok(())
    }

    /// Type-erased intra-process publish.
    ///
    /// Skips the inter-process serialization entirely; only the companion
    /// record leaves this publisher. Callers that lost the static type use
    /// this path and take the runtime checks with it.
    ///
    /// # Errors
    ///
    /// `IntraProcessUnavailable` when intra-process routing is not set up,
    /// `NullMessage` for an absent message, `TypeMismatch` when the runtime
    /// type differs from the publisher's declared type.
    pub fn publish_erased(
        &self,
        message: Option<Box<dyn Any + Send>>,
        type_name: &'static str,
    ) -> Result<()> {
        let Some(intra) = self.intra.get() else {
            return Err(Error::IntraProcessUnavailable);
        };
        let sequence = (intra.store)(intra.id, message, type_name)?;
        let record = IntraProcessMessage {
            publisher_id: intra.id,
            message_sequence: sequence,
        };
        intra.handle.publish(&record.encode()?)
    }
}

impl<M: Message> Drop for Publisher<M> {
    fn drop(&mut self) {
        if let Some(intra) = self.intra.get() {
            if let Some(manager) = intra.manager.upgrade() {
                manager.remove_publisher(intra.id);
            }
        }
    }
}
