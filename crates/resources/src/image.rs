//! Image decoding to RGBA8.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::ResourceResult;
use crate::loader::read_bytes;

/// Decoded image, always expanded to four 8-bit channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image before expansion.
    pub channels: u8,
}

impl DecodedImage {
    fn from_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let channels = img.color().channel_count();
        let pixels = img.to_rgba8().into_raw();

        Self {
            pixels,
            width,
            height,
            channels,
        }
    }

    /// Size of the pixel data in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Loads and decodes the image at `path`.
pub fn decode(path: impl AsRef<Path>) -> ResourceResult<DecodedImage> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let decoded = decode_bytes(&bytes)?;

    debug!(
        "Decoded {}: {}x{}, {} source channel(s)",
        path.display(),
        decoded.width,
        decoded.height,
        decoded.channels
    );
    Ok(decoded)
}

/// Decodes an in-memory PNG or JPEG.
pub fn decode_bytes(bytes: &[u8]) -> ResourceResult<DecodedImage> {
    let img = image::load_from_memory(bytes)?;
    Ok(DecodedImage::from_image(img))
}
