// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed service client.
//!
//! Requests are asynchronous: `call_async` registers a completion callback
//! keyed by the transport-assigned sequence number, and the executor invokes
//! it when the correlated response is taken.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::msg::Message;
use crate::rmw::RmwClient;

/// Object-safe view of a client used by callback groups and the executor.
pub trait ClientBase: Send + Sync {
    fn service_name(&self) -> &str;

    fn handle(&self) -> Arc<dyn RmwClient>;

    /// Take one pending response and run its completion callback.
    fn execute(&self) -> Result<()>;
}

type ResponseCallback<Res> = Box<dyn FnOnce(Res) + Send>;

/// Typed requesting side of a service.
pub struct Client<Req: Message, Res: Message> {
    name: String,
    handle: Arc<dyn RmwClient>,
    pending: Mutex<HashMap<i64, ResponseCallback<Res>>>,
    _marker: PhantomData<fn() -> Req>,
}

impl<Req: Message, Res: Message> Client<Req, Res> {
    pub(crate) fn new(name: String, handle: Arc<dyn RmwClient>) -> Self {
        Self {
            name,
            handle,
            pending: Mutex::new(HashMap::new()),
            _marker: PhantomData,
        }
    }

    /// Send a request; `on_response` runs on the executor thread when the
    /// response arrives. Returns the request's sequence number.
    pub fn call_async<F>(&self, request: &Req, on_response: F) -> Result<i64>
    where
        F: FnOnce(Res) + Send + 'static,
    {
        let sequence = self.handle.send_request(&request.encode()?)?;
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(sequence, Box::new(on_response));
        Ok(sequence)
    }

    /// Number of requests still awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<Req: Message, Res: Message> ClientBase for Client<Req, Res> {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> Arc<dyn RmwClient> {
        Arc::clone(&self.handle)
    }

    fn execute(&self) -> Result<()> {
        let Some((sequence, payload)) = self.handle.take_response()? else {
            return Ok(());
        };
        let callback = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&sequence);
        let Some(callback) = callback else {
            log::debug!(
                "[client] response with unknown sequence {} on '{}', dropped",
                sequence,
                self.name
            );
            return Ok(());
        };
        let response = Res::decode(&payload)?;
        callback(response);
        Ok(())
    }
}
