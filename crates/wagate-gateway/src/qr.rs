// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QR code rendering for the pairing screen.

use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;

use wagate_core::GatewayError;

/// Render a raw QR payload into an SVG image encoded as a `data:` URL,
/// directly usable as an `<img src>`.
pub fn render_data_url(payload: &str) -> Result<String, GatewayError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| GatewayError::Internal(format!("QR generation failed: {e}")))?;

    let image = code
        .render::<svg::Color>()
        .min_dimensions(264, 264)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    let encoded = base64::engine::general_purpose::STANDARD.encode(image.as_bytes());
    Ok(format!("data:image/svg+xml;base64,{encoded}"))
}
