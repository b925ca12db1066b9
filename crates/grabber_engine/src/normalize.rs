use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("not a decodable image: {0}")]
    DecodeFailed(String),
    #[error("jpeg encoding failed: {0}")]
    EncodeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeSettings {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Colour transparent pixels are composited onto.
    pub background: [u8; 3],
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            quality: 95,
            background: [255, 255, 255],
        }
    }
}

pub trait Normalizer: Send + Sync {
    /// Decode `raw` in any supported format and re-encode it canonically.
    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, NormalizeError>;
}

/// Re-encodes everything as 8-bit RGB JPEG.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegNormalizer {
    settings: NormalizeSettings,
}

impl JpegNormalizer {
    pub fn new(settings: NormalizeSettings) -> Self {
        Self { settings }
    }
}

impl Normalizer for JpegNormalizer {
    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>, NormalizeError> {
        let decoded = image::load_from_memory(raw)
            .map_err(|err| NormalizeError::DecodeFailed(err.to_string()))?;
        let rgb = flatten(decoded, self.settings.background);

        let mut out = Cursor::new(Vec::new());
        let quality = self.settings.quality.clamp(1, 100);
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&rgb)
            .map_err(|err| NormalizeError::EncodeFailed(err.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Drop alpha by blending every pixel over `background`.
fn flatten(image: DynamicImage, background: [u8; 3]) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }
    let rgba = image.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |fg: u8, bg: u8| -> u8 {
            ((u16::from(fg) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}
