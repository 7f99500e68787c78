//! Operator-facing display of pairing progress.

use std::sync::Arc;

use {
    qrcode::{QrCode, render::unicode},
    tracing::{info, warn},
};

/// Receives each pairing code as it is issued.
pub type PairingDisplay = Arc<dyn Fn(&str) + Send + Sync>;

/// Render `code` as a QR code made of half-block characters, two modules
/// per terminal row.
pub fn render_qr(code: &str) -> Result<String, qrcode::types::QrError> {
    let qr = QrCode::new(code.as_bytes())?;
    Ok(qr
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Print the QR code to stdout so it can be scanned from the terminal.
pub fn stdout_display() -> PairingDisplay {
    Arc::new(|code: &str| match render_qr(code) {
        Ok(rendered) => {
            info!("scan this QR code with WhatsApp (Linked Devices)");
            println!("{rendered}");
        },
        Err(e) => {
            warn!(error = %e, "failed to render pairing QR code, printing raw code");
            println!("{code}");
        },
    })
}
