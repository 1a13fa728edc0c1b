// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-threaded executor: the default spin driver.

use std::sync::Arc;
use std::time::Duration;

use super::{Executor, MemoryStrategy};
use crate::context::{self, Context};
use crate::error::Result;
use crate::node::Node;

/// Trivial spin driver: one thread, one selection step at a time.
///
/// Because the group token is never observed to be cleared by anyone else,
/// mutual exclusion is automatic.
pub struct SingleThreadedExecutor {
    executor: Executor,
}

impl SingleThreadedExecutor {
    #[must_use]
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            executor: Executor::new(context),
        }
    }

    #[must_use]
    pub fn with_memory_strategy(
        context: Arc<Context>,
        memory_strategy: Box<dyn MemoryStrategy>,
    ) -> Self {
        Self {
            executor: Executor::with_memory_strategy(context, memory_strategy),
        }
    }

    /// Dispatch work as it becomes available until shutdown.
    ///
    /// Blocks indefinitely between units of work; a guard trigger (notify or
    /// shutdown) wakes the wait, after which the shutdown flag is checked
    /// before the next iteration.
    pub fn spin(&self) -> Result<()> {
        while context::ok() {
            if let Some(executable) = self.executor.get_next_executable(None)? {
                self.executor.execute_any_executable(executable)?;
            }
        }
        Ok(())
    }

    pub fn add_node(&self, node: &Arc<Node>, notify: bool) {
        self.executor.add_node(node, notify);
    }

    pub fn remove_node(&self, node: &Arc<Node>, notify: bool) {
        self.executor.remove_node(node, notify);
    }

    pub fn spin_some(&self) -> Result<()> {
        self.executor.spin_some()
    }

    pub fn spin_node_once(&self, node: &Arc<Node>, timeout: Option<Duration>) -> Result<()> {
        self.executor.spin_node_once(node, timeout)
    }

    pub fn spin_node_some(&self, node: &Arc<Node>) -> Result<()> {
        self.executor.spin_node_some(node)
    }

    pub fn set_memory_strategy(&self, memory_strategy: Box<dyn MemoryStrategy>) {
        self.executor.set_memory_strategy(memory_strategy);
    }
}
