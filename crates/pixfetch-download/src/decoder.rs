//! Decoder adapter backed by the `image` crate.

use image::{DynamicImage, ImageFormat};
use pixfetch_core::{DecodeError, DecodedImage, ImageDecoderPort};

/// Decodes PNG, JPEG, GIF, WebP and the other formats the `image` crate
/// supports into RGBA8 pixels.
///
/// The format is sniffed from the bytes first. The declared content type is
/// only a fallback, since servers routinely mislabel images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageCrateDecoder {
    /// Create a new decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn load(bytes: &[u8], content_type: Option<&str>) -> Result<DynamicImage, image::ImageError> {
        let sniffed = image::guess_format(bytes).ok();
        let declared = content_type.and_then(format_from_content_type);

        match sniffed.or(declared) {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
    }
}

impl ImageDecoderPort for ImageCrateDecoder {
    fn decode(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<DecodedImage, DecodeError> {
        let image = Self::load(bytes, content_type).map_err(|e| DecodeError::new(e.to_string()))?;
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(DecodedImage::new(width, height, rgba.into_raw()))
    }
}

fn format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let mime = content_type
        .split(';')
        .next()
        .map(|ct| ct.trim().to_ascii_lowercase())?;
    ImageFormat::from_mime_type(mime)
}
