// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pluggable allocation policy for the executor's wait-set scratch.
//!
//! Before every wait the executor clears the previous handles, asks the
//! strategy for scratch with enough capacity and fills the slot vectors.
//! Readiness is communicated by nulling non-ready slots in place; the
//! executor then consumes remaining slots one by one. The default strategy
//! pools its vectors across spins so a steady-state spin allocates nothing.

use std::sync::{Arc, Weak};

use crate::callback_group::CallbackGroup;
use crate::client::ClientBase;
use crate::node::Node;
use crate::rmw::GuardCondition;
use crate::service::ServiceBase;
use crate::subscription::SubscriptionBase;
use crate::timer::Timer;

/// Capacity request for one wait-set rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScratchSizes {
    pub subscriptions: usize,
    pub timers: usize,
    pub services: usize,
    pub clients: usize,
    pub guards: usize,
}

/// One subscription wait slot. A subscription with intra-process routing
/// contributes two slots: one for the main handle and one (`intra = true`)
/// for the companion handle.
pub struct SubscriptionSlot {
    pub subscription: Arc<dyn SubscriptionBase>,
    pub intra: bool,
    pub group: Weak<CallbackGroup>,
    pub node: Weak<Node>,
}

pub struct TimerSlot {
    pub timer: Arc<Timer>,
    pub group: Weak<CallbackGroup>,
    pub node: Weak<Node>,
}

pub struct ServiceSlot {
    pub service: Arc<dyn ServiceBase>,
    pub group: Weak<CallbackGroup>,
    pub node: Weak<Node>,
}

pub struct ClientSlot {
    pub client: Arc<dyn ClientBase>,
    pub group: Weak<CallbackGroup>,
    pub node: Weak<Node>,
}

/// Slot vectors for one spin iteration.
///
/// `None` entries are slots the wait marked non-ready or the selection
/// already consumed. `generation` stamps the executor's node membership at
/// build time; leftover slots from an older membership are discarded rather
/// than dispatched.
#[derive(Default)]
pub struct WaitSetScratch {
    pub subscriptions: Vec<Option<SubscriptionSlot>>,
    pub timers: Vec<Option<TimerSlot>>,
    pub services: Vec<Option<ServiceSlot>>,
    pub clients: Vec<Option<ClientSlot>>,
    pub guards: Vec<Option<Arc<GuardCondition>>>,
    pub generation: u64,
}

impl WaitSetScratch {
    /// Drop all slots, keeping the allocations.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.timers.clear();
        self.services.clear();
        self.clients.clear();
        self.guards.clear();
    }
}

/// Allocation policy for wait-set scratch buffers.
///
/// Strategies may pool buffers across spins, use per-spin arenas, or
/// allocate fresh. The executor calls `clear_handles` before each rebuild;
/// references into the scratch stay valid until the next `clear_handles`.
pub trait MemoryStrategy: Send {
    /// Drop per-spin handle state ahead of a rebuild.
    fn clear_handles(&mut self);

    /// Guarantee capacity for at least `sizes` without reallocation during
    /// the fill.
    fn reserve(&mut self, sizes: &ScratchSizes);

    /// The current scratch buffers.
    fn handles(&mut self) -> &mut WaitSetScratch;
}

/// Default strategy: one scratch pooled across spins.
#[derive(Default)]
pub struct DefaultMemoryStrategy {
    scratch: WaitSetScratch,
}

impl DefaultMemoryStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStrategy for DefaultMemoryStrategy {
    fn clear_handles(&mut self) {
        self.scratch.clear();
    }

    fn reserve(&mut self, sizes: &ScratchSizes) {
        self.scratch.subscriptions.reserve(sizes.subscriptions);
        self.scratch.timers.reserve(sizes.timers);
        self.scratch.services.reserve(sizes.services);
        self.scratch.clients.reserve(sizes.clients);
        self.scratch.guards.reserve(sizes.guards);
    }

    fn handles(&mut self) -> &mut WaitSetScratch {
        &mut self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_keeps_capacity() {
        let mut strategy = DefaultMemoryStrategy::new();
        strategy.reserve(&ScratchSizes {
            subscriptions: 8,
            timers: 4,
            services: 2,
            clients: 2,
            guards: 2,
        });
        let capacity = strategy.handles().subscriptions.capacity();
        assert!(capacity >= 8);

        strategy.handles().guards.push(None);
        strategy.clear_handles();
        assert!(strategy.handles().guards.is_empty());
        assert!(strategy.handles().subscriptions.capacity() >= capacity);
    }
}
