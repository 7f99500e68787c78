//! Native mode: an embedded multi-device protocol client.

pub mod client;
pub mod pairing;
pub mod transport;

pub use {
    client::{EventHandler, ProtocolBackend, ProtocolClient},
    pairing::{PairingDisplay, render_qr, stdout_display},
    transport::NativeTransport,
};
