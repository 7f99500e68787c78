//! Media pipeline: download attachments to transient files, derive extensions, clean up.

pub mod cleanup;
pub mod error;
pub mod mime;
pub mod store;

pub use {
    cleanup::TransientMedia,
    error::{Error, Result},
    store::MediaDownloader,
};
