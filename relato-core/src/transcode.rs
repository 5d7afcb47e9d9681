//! Photo transcoding for report submission
//!
//! Field photos arrive in whatever format the device produced. Before a
//! report is queued, its photo is normalized: decoded, downscaled to a
//! maximum width (aspect ratio preserved), re-encoded as JPEG at a fixed
//! quality, and emitted as a bare base64 payload. The collector receives a
//! predictable format and queue entries stay small enough to hold many
//! reports through a long offline stretch.
//!
//! Pixel work happens on the blocking thread pool; the async `transcode`
//! entry point never stalls the caller's executor thread.

use crate::config::ImageConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Normalizes raw photo bytes into base64 JPEG payloads
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    max_width: u32,
    quality: f32,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self::new(&ImageConfig::default())
    }
}

impl ImageTranscoder {
    /// Build a transcoder from the image configuration
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            max_width: config.max_width,
            quality: config.quality,
        }
    }

    /// Transcode raw photo bytes into a base64 JPEG payload.
    ///
    /// Images wider than the configured maximum are scaled down to it with
    /// height rounded to preserve aspect ratio; narrower images keep their
    /// dimensions. The returned string is the base64 of the JPEG bytes with
    /// no data-URI prefix.
    ///
    /// Fails with [`Error::Decode`] when the bytes are not a decodable
    /// image and [`Error::Encode`] when re-encoding fails.
    pub async fn transcode(&self, source: Vec<u8>) -> Result<String> {
        let max_width = self.max_width;
        let quality = quality_percent(self.quality);

        tokio::task::spawn_blocking(move || transcode_blocking(&source, max_width, quality))
            .await
            .map_err(|e| Error::Encode(format!("transcode worker failed: {}", e)))?
    }
}

fn transcode_blocking(source: &[u8], max_width: u32, quality: u8) -> Result<String> {
    let decoded = image::load_from_memory(source).map_err(|e| Error::Decode(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_width, target_height) = scaled_dimensions(width, height, max_width);

    let frame = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Triangle)
    };

    // JPEG has no alpha channel
    let rgb = frame.to_rgb8();

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::Encode(e.to_string()))?;

    Ok(BASE64.encode(&jpeg))
}

/// Output dimensions for an image scaled to fit `max_width`.
///
/// Images at or under the threshold keep their dimensions. Wider images
/// scale to exactly `max_width`, with height rounded to the nearest pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
    (max_width, scaled)
}

/// Map a 0.0-1.0 quality setting onto the encoder's 1-100 scale
fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn oversized_photo_scales_to_max_width() {
        assert_eq!(scaled_dimensions(4000, 3000, 1280), (1280, 960));
        assert_eq!(scaled_dimensions(2560, 1440, 1280), (1280, 720));
    }

    #[test]
    fn small_photo_keeps_its_dimensions() {
        assert_eq!(scaled_dimensions(800, 600, 1280), (800, 600));
        assert_eq!(scaled_dimensions(1280, 960, 1280), (1280, 960));
    }

    #[test]
    fn scaled_height_rounds_to_nearest_pixel() {
        // 333 * 500 / 1000 = 166.5, rounds up
        assert_eq!(scaled_dimensions(1000, 333, 500), (500, 167));
    }

    #[test]
    fn quality_maps_onto_encoder_scale() {
        assert_eq!(quality_percent(0.7), 70);
        assert_eq!(quality_percent(1.0), 100);
        assert_eq!(quality_percent(0.005), 1);
    }

    #[tokio::test]
    async fn transcode_downscales_and_emits_bare_base64_jpeg() {
        let transcoder = ImageTranscoder::default();
        let payload = transcoder.transcode(png_bytes(2000, 1500)).await.unwrap();

        assert!(!payload.starts_with("data:"));

        let jpeg = BASE64.decode(payload.as_bytes()).unwrap();
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1280, 960));
    }

    #[tokio::test]
    async fn transcode_leaves_small_photos_at_native_size() {
        let transcoder = ImageTranscoder::default();
        let payload = transcoder.transcode(png_bytes(800, 600)).await.unwrap();

        let jpeg = BASE64.decode(payload.as_bytes()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 600));
    }

    #[tokio::test]
    async fn transcode_rejects_undecodable_bytes() {
        let transcoder = ImageTranscoder::default();
        let err = transcoder
            .transcode(b"definitely not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn transcode_honors_configured_max_width() {
        let transcoder = ImageTranscoder::new(&ImageConfig {
            max_width: 100,
            quality: 0.7,
        });
        let payload = transcoder.transcode(png_bytes(400, 200)).await.unwrap();

        let jpeg = BASE64.decode(payload.as_bytes()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }
}
