// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback groups: sets of entities sharing an execution discipline.
//!
//! A mutually-exclusive group serializes its callbacks through the atomic
//! `can_be_taken_from` token: the executor takes an executable from the
//! group only while the token is set, clears it before dispatch and restores
//! it afterwards. A reentrant group ignores the token on read, so its
//! callbacks may run concurrently up to the worker-pool size. The token
//! makes per-group serialization work in a multi-threaded executor without
//! holding any mutex across user code.
//!
//! Subscriptions and timers are held weakly (the user's node object owns
//! them); services and clients are held strongly (they have no independent
//! lifetime manager). An entity belongs to exactly one group in exactly one
//! node.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, Weak};

use crate::client::ClientBase;
use crate::service::ServiceBase;
use crate::subscription::SubscriptionBase;
use crate::timer::Timer;

/// Execution discipline of a callback group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackGroupKind {
    /// At most one callback from the group runs at any instant.
    MutuallyExclusive,
    /// Callbacks from the group may run concurrently.
    Reentrant,
}

/// Collection of entities whose callbacks share an execution discipline.
pub struct CallbackGroup {
    kind: CallbackGroupKind,
    subscriptions: Mutex<Vec<Weak<dyn SubscriptionBase>>>,
    timers: Mutex<Vec<Weak<Timer>>>,
    services: Mutex<Vec<Arc<dyn ServiceBase>>>,
    clients: Mutex<Vec<Arc<dyn ClientBase>>>,
    can_be_taken_from: AtomicBool,
}

impl CallbackGroup {
    #[must_use]
    pub fn new(kind: CallbackGroupKind) -> Self {
        Self {
            kind,
            subscriptions: Mutex::new(Vec::new()),
            timers: Mutex::new(Vec::new()),
            services: Mutex::new(Vec::new()),
            clients: Mutex::new(Vec::new()),
            can_be_taken_from: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CallbackGroupKind {
        self.kind
    }

    /// The group's execution token.
    ///
    /// Meaningful for mutually-exclusive groups only; reentrant groups
    /// ignore it on read.
    #[must_use]
    pub fn can_be_taken_from(&self) -> &AtomicBool {
        &self.can_be_taken_from
    }

    pub(crate) fn add_subscription(&self, subscription: &Arc<dyn SubscriptionBase>) {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(subscription));
    }

    pub(crate) fn add_timer(&self, timer: &Arc<Timer>) {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(timer));
    }

    pub(crate) fn add_service(&self, service: Arc<dyn ServiceBase>) {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(service);
    }

    pub(crate) fn add_client(&self, client: Arc<dyn ClientBase>) {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(client);
    }

    /// Live subscriptions in insertion order. Dead entries are pruned.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Arc<dyn SubscriptionBase>> {
        let mut list = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        list.retain(|weak| weak.upgrade().is_some());
        list.iter().filter_map(Weak::upgrade).collect()
    }

    /// Live timers in insertion order. Dead entries are pruned.
    #[must_use]
    pub fn timers(&self) -> Vec<Arc<Timer>> {
        let mut list = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        list.retain(|weak| weak.upgrade().is_some());
        list.iter().filter_map(Weak::upgrade).collect()
    }

    /// Services in insertion order.
    #[must_use]
    pub fn services(&self) -> Vec<Arc<dyn ServiceBase>> {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Clients in insertion order.
    #[must_use]
    pub fn clients(&self) -> Vec<Arc<dyn ClientBase>> {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
