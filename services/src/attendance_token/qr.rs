use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::QrCode;
use qrcode::render::{svg, unicode};
use qrcode::types::QrError;
use util::config;

#[derive(Debug, Clone, PartialEq)]
pub struct QrOptions {
    /// Minimum rendered edge, in pixels.
    pub width: u32,
    pub dark_color: String,
    pub light_color: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            width: 256,
            dark_color: "#0ea5e9".into(),
            light_color: "#ffffff".into(),
        }
    }
}

impl QrOptions {
    pub fn from_config() -> Self {
        Self {
            width: config::qr_width(),
            dark_color: config::qr_dark_color(),
            light_color: config::qr_light_color(),
        }
    }
}

/// Renders `data` as an SVG QR code.
pub fn render_svg(data: &str, opts: &QrOptions) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(opts.width, opts.width)
        .quiet_zone(true)
        .dark_color(svg::Color(&opts.dark_color))
        .light_color(svg::Color(&opts.light_color))
        .build())
}

/// Renders `data` as an SVG QR code wrapped in a base64 `data:` URL.
pub fn render_data_url(data: &str, opts: &QrOptions) -> Result<String, QrError> {
    let svg = render_svg(data, opts)?;
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}

/// Half-block rendering for terminals; scannable from most screens.
pub fn render_terminal(data: &str) -> Result<String, QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
