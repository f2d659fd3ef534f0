//! Output rendering: placement planning, raster composition and summaries.

pub mod layout;
pub mod raster;
pub mod summary;
pub mod transform;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;

pub use layout::{layout, DrawOp, RenderPlan, SignaturePlacement};
pub use raster::{load_font, render_page};
pub use transform::{aspect_fit, from_container, to_container, to_normalized, to_output, PageSize, PixelRect};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Font error: {0}")]
    Font(String),
}

/// A captured signature image, kept both encoded and decoded.
#[derive(Debug, Clone)]
pub struct SignatureData {
    png: Vec<u8>,
    image: DynamicImage,
}

impl SignatureData {
    /// Decode image bytes (PNG or JPEG); the PNG form is re-encoded for export.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let image = image::load_from_memory(bytes)?;
        let mut png = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
        Ok(Self { png, image })
    }

    /// Accepts raw base64 or a `data:image/png;base64,` URL.
    pub fn from_base64(payload: &str) -> Result<Self, RenderError> {
        let encoded = match payload.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => payload,
        };
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_png_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Width / height; 1.0 for an empty image.
    pub fn aspect_ratio(&self) -> f64 {
        PageSize::from_dimensions((self.image.width(), self.image.height())).aspect_ratio()
    }
}
