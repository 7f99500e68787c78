//! Channel plumbing shared by every adapter.
//!
//! Each channel implements the [`Channel`] lifecycle trait and pushes
//! normalized messages through a [`BaseChannel`], which owns the allow-list
//! and the running flag the rest of the application reads for health
//! reporting.

pub mod base;
pub mod error;
pub mod gating;
pub mod plugin;

pub use {
    base::BaseChannel,
    error::{Error, Result},
    plugin::{Channel, MessageSink},
};
