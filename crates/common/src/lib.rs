//! Message shapes and helpers shared across all wharf crates.

pub mod types;

pub use types::{
    InboundMessage, META_IS_GROUP, META_MESSAGE_ID, META_SENDER_JID, META_USER_NAME,
    OutboundMessage, truncate_for_log,
};
