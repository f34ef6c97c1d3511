//! Image compaction: one compressor per format.
//!
//! Raster formats re-encode through the `image` codecs (lossless where the
//! format convention is lossless, quality 75 for jpeg) and keep the
//! original bytes when re-encoding does not shrink them. Vector content is
//! normalized through usvg with indentation stripped.

use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;

use crate::error::PipelineError;
use crate::mime::types;

use super::{Minifier, minify_err};

/// Jpeg re-encode quality (the conventional lossy setting).
const JPEG_QUALITY: u8 = 75;

/// Keep whichever of original/re-encoded is smaller.
///
/// Also what makes the lossless formats idempotent: a second pass
/// re-encodes to the same bytes and neither side is smaller.
fn smaller(original: &[u8], reencoded: Vec<u8>) -> Vec<u8> {
    if reencoded.len() < original.len() {
        reencoded
    } else {
        original.to_vec()
    }
}

/// Lossless png re-encode at best compression.
pub struct PngCompressor;

impl Minifier for PngCompressor {
    fn content_types(&self) -> &[&str] {
        &[types::PNG]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let img = image::load_from_memory_with_format(content, ImageFormat::Png)
            .map_err(|e| minify_err(types::PNG, e.to_string()))?;
        let mut out = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
        img.write_with_encoder(encoder)
            .map_err(|e| minify_err(types::PNG, e.to_string()))?;
        Ok(smaller(content, out))
    }
}

/// Lossy jpeg re-encode at quality 75.
pub struct JpegCompressor;

impl Minifier for JpegCompressor {
    fn content_types(&self) -> &[&str] {
        &[types::JPEG]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let img = image::load_from_memory_with_format(content, ImageFormat::Jpeg)
            .map_err(|e| minify_err(types::JPEG, e.to_string()))?;
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        img.write_with_encoder(encoder)
            .map_err(|e| minify_err(types::JPEG, e.to_string()))?;
        Ok(smaller(content, out))
    }
}

/// Lossless webp re-encode.
pub struct WebpCompressor;

impl Minifier for WebpCompressor {
    fn content_types(&self) -> &[&str] {
        &[types::WEBP]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let img = image::load_from_memory_with_format(content, ImageFormat::WebP)
            .map_err(|e| minify_err(types::WEBP, e.to_string()))?;
        let mut out = Vec::new();
        let encoder = WebPEncoder::new_lossless(&mut out);
        img.write_with_encoder(encoder)
            .map_err(|e| minify_err(types::WEBP, e.to_string()))?;
        Ok(smaller(content, out))
    }
}

/// Vector normalization: parse and reserialize without indentation.
pub struct SvgCompressor;

impl Minifier for SvgCompressor {
    fn content_types(&self) -> &[&str] {
        &[types::SVG]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let tree = usvg::Tree::from_data(content, &usvg::Options::default())
            .map_err(|e| minify_err(types::SVG, e.to_string()))?;
        let compact = tree.to_string(&usvg::WriteOptions {
            indent: usvg::Indent::None,
            ..Default::default()
        });
        Ok(compact.into_bytes())
    }
}

/// Encode test pixels as a wasteful baseline for the compressors.
#[cfg(test)]
fn sample_png() -> Vec<u8> {
    use image::{DynamicImage, RgbaImage};
    use std::io::Cursor;
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(32, 32, |x, y| {
        image::Rgba([(x * 8) as u8, (y * 8) as u8, 0, 255])
    }));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
