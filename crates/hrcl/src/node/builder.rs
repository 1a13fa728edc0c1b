// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builder for [`Node`].

use std::sync::Arc;

use super::Node;
use crate::context::Context;
use crate::error::Result;

/// Builder returned by [`Node::builder`].
///
/// # Example
///
/// ```no_run
/// use hrcl::Node;
///
/// hrcl::init()?;
/// let node = Node::builder("telemetry").use_intra_process(true).build()?;
/// # Ok::<(), hrcl::Error>(())
/// ```
pub struct NodeBuilder {
    name: String,
    context: Option<Arc<Context>>,
    use_intra_process: Option<bool>,
}

impl NodeBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            context: None,
            use_intra_process: None,
        }
    }

    /// Attach to an explicit context instead of the default one.
    #[must_use]
    pub fn context(mut self, context: Arc<Context>) -> Self {
        self.context = Some(context);
        self
    }

    /// Enable or disable intra-process routing for this node's entities.
    ///
    /// Defaults to the context's `HRCL_INTRA_PROCESS` setting.
    #[must_use]
    pub fn use_intra_process(mut self, enabled: bool) -> Self {
        self.use_intra_process = Some(enabled);
        self
    }

    /// Create the node.
    ///
    /// # Errors
    ///
    /// `NotInit` when no context was supplied and `init()` has not run;
    /// transport errors when the node handle cannot be created.
    pub fn build(self) -> Result<Arc<Node>> {
        let context = match self.context {
            Some(context) => context,
            None => Context::default_context()?,
        };
        let use_intra_process = self
            .use_intra_process
            .unwrap_or(context.env().intra_process);
        let rmw_node = context.transport().create_node(&self.name)?;
        log::debug!(
            "[node] '{}' created (intra_process={})",
            self.name,
            use_intra_process
        );
        Ok(Node::from_parts(
            self.name,
            context,
            rmw_node,
            use_intra_process,
        ))
    }
}
