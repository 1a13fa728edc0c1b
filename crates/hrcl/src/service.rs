// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed service server.

use std::sync::Arc;

use crate::error::Result;
use crate::msg::Message;
use crate::rmw::RmwService;

/// Object-safe view of a service used by callback groups and the executor.
pub trait ServiceBase: Send + Sync {
    fn service_name(&self) -> &str;

    fn handle(&self) -> Arc<dyn RmwService>;

    /// Take one pending request, run the handler and send the response.
    fn execute(&self) -> Result<()>;
}

/// Typed server side of a service.
///
/// The handler runs on the dispatching executor thread; its return value is
/// encoded and sent back correlated to the request.
pub struct Service<Req: Message, Res: Message> {
    name: String,
    handle: Arc<dyn RmwService>,
    callback: Box<dyn Fn(Req) -> Res + Send + Sync>,
}

impl<Req: Message, Res: Message> Service<Req, Res> {
    pub(crate) fn new(
        name: String,
        handle: Arc<dyn RmwService>,
        callback: Box<dyn Fn(Req) -> Res + Send + Sync>,
    ) -> Self {
        Self {
            name,
            handle,
            callback,
        }
    }
}

impl<Req: Message, Res: Message> ServiceBase for Service<Req, Res> {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> Arc<dyn RmwService> {
        Arc::clone(&self.handle)
    }

    fn execute(&self) -> Result<()> {
        let Some((request_id, payload)) = self.handle.take_request()? else {
            return Ok(());
        };
        let request = Req::decode(&payload)?;
        let response = (self.callback)(request);
        self.handle.send_response(request_id, &response.encode()?)
    }
}
