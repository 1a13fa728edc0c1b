// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the public API.
//!
//! A single `Error` enum covers every fallible path in the crate. Entity
//! creation errors leave the owning node usable; teardown-race errors
//! (`IntraProcessUnavailable`) are the normal signal that the process-wide
//! intra-process manager was dropped before the caller finished.

/// Errors surfaced by the public API.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// `init()` was called while the library is already initialized.
    AlreadyInit,
    /// An operation required the default context before `init()` was called.
    NotInit,

    // ========================================================================
    // Entity Errors
    // ========================================================================
    /// The underlying transport refused to create a handle.
    TransportCreationFailed(String),
    /// The supplied callback group belongs to a different node.
    GroupNotInNode,
    /// Topic name uses the reserved intra-process suffix or is empty.
    InvalidTopicName(String),

    // ========================================================================
    // Intra-Process Errors
    // ========================================================================
    /// The intra-process manager was destroyed before the operation completed.
    ///
    /// There is no fallback to the inter-process path; callers observing this
    /// during teardown should drop the entity.
    IntraProcessUnavailable,
    /// Runtime type of a message does not match the publisher's declared type.
    TypeMismatch {
        /// Type the publisher was created with.
        expected: &'static str,
        /// Type actually handed to the publish call.
        actual: &'static str,
    },
    /// An absent message was handed to a publish call.
    NullMessage,

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Message encode/decode failed.
    Serialization(String),

    // ========================================================================
    // Wakeup Errors
    // ========================================================================
    /// A guard-condition trigger failed.
    ///
    /// Notify and shutdown wakeups are best-effort; the executor logs this
    /// and continues rather than aborting a spin.
    TriggerFailed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AlreadyInit => write!(f, "already initialized"),
            Error::NotInit => write!(f, "not initialized, call init() first"),
            Error::TransportCreationFailed(msg) => {
                write!(f, "could not create transport handle: {}", msg)
            }
            Error::GroupNotInNode => write!(f, "callback group not in node"),
            Error::InvalidTopicName(name) => write!(f, "invalid topic name: {:?}", name),
            Error::IntraProcessUnavailable => {
                write!(f, "intra-process manager destroyed before operation completed")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(
                    f,
                    "published type '{}' is incompatible with the publisher type '{}'",
                    actual, expected
                )
            }
            Error::NullMessage => write!(f, "cannot publish an absent message"),
            Error::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Error::TriggerFailed(msg) => write!(f, "guard condition trigger failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
