// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-threaded executor: a pool of workers sharing one selection step.
//!
//! Every worker takes the selection mutex, runs `get_next_executable`, then
//! releases the mutex before dispatching. Per-group serialization comes
//! entirely from the callback-group token claimed at selection, so no lock
//! is held across user code and reentrant groups run callbacks concurrently
//! up to the pool size.

use std::sync::{Arc, Mutex};
use std::thread;

use super::{Executor, MemoryStrategy};
use crate::context::{self, Context};
use crate::error::{Error, Result};
use crate::node::Node;

/// Spin driver with a worker-thread pool.
pub struct MultiThreadedExecutor {
    executor: Executor,
    selection: Mutex<()>,
    number_of_threads: usize,
}

impl MultiThreadedExecutor {
    /// Pool sized to the machine's available parallelism.
    #[must_use]
    pub fn new(context: Arc<Context>) -> Self {
        let threads = thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(2);
        Self::with_number_of_threads(context, threads)
    }

    #[must_use]
    pub fn with_number_of_threads(context: Arc<Context>, number_of_threads: usize) -> Self {
        Self {
            executor: Executor::new(context),
            selection: Mutex::new(()),
            number_of_threads: number_of_threads.max(1),
        }
    }

    #[must_use]
    pub fn number_of_threads(&self) -> usize {
        self.number_of_threads
    }

    pub fn add_node(&self, node: &Arc<Node>, notify: bool) {
        self.executor.add_node(node, notify);
    }

    pub fn remove_node(&self, node: &Arc<Node>, notify: bool) {
        self.executor.remove_node(node, notify);
    }

    pub fn set_memory_strategy(&self, memory_strategy: Box<dyn MemoryStrategy>) {
        self.executor.set_memory_strategy(memory_strategy);
    }

    /// Dispatch work on the worker pool until shutdown.
    ///
    /// Returns the first error any worker encountered, after all workers
    /// stopped.
    pub fn spin(&self) -> Result<()> {
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..self.number_of_threads {
                scope.spawn(|| self.run_worker(&first_error));
            }
        });

        match first_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run_worker(&self, first_error: &Mutex<Option<Error>>) {
        while context::ok() {
            if first_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_some()
            {
                break;
            }

            let next = {
                let _selection = self.selection.lock().unwrap_or_else(|e| e.into_inner());
                if !context::ok() {
                    break;
                }
                self.executor.get_next_executable(None)
            };

            match next {
                Ok(Some(executable)) => {
                    if let Err(err) = self.executor.execute_any_executable(executable) {
                        self.record_error(first_error, err);
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    self.record_error(first_error, err);
                    break;
                }
            }
        }
    }

    fn record_error(&self, first_error: &Mutex<Option<Error>>, err: Error) {
        log::warn!("[executor] worker stopping on error: {}", err);
        let mut slot = first_error.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        // A peer may be blocked in the wait without a timeout; wake it so it
        // observes the recorded error and stops too.
        self.executor.interrupt();
    }
}
