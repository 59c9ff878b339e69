//! Asset loading – logos, signatures and images embedded in rich text.
//!
//! Sources may be base64 `data:` URIs (the usual shape of uploaded blobs),
//! `http(s)` URLs or local paths. Every failure here is soft: callers get
//! `None` plus a `log::warn!` and carry on laying out the page without the
//! image.

use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::{DocError, Result};

/// Something that can turn an image source string into raw bytes.
pub trait AssetLoader {
    fn fetch(&self, src: &str) -> Result<Vec<u8>>;
}

/// Loader for data URIs, remote URLs and local files.
#[derive(Debug, Clone, Default)]
pub struct DefaultAssetLoader {
    timeout: Option<Duration>,
}

impl DefaultAssetLoader {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(self.timeout)
            .build()
            .into();
        let mut response = agent
            .get(url)
            .call()
            .map_err(|e| DocError::asset(url, e))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| DocError::asset(url, e))
    }
}

impl AssetLoader for DefaultAssetLoader {
    fn fetch(&self, src: &str) -> Result<Vec<u8>> {
        let src = src.trim();
        if src.starts_with("data:") {
            parse_data_uri(src)
        } else if src.starts_with("http://") || src.starts_with("https://") {
            log::debug!("Fetching remote image {src}");
            self.fetch_remote(src)
        } else {
            let path = src.strip_prefix("file://").unwrap_or(src);
            std::fs::read(Path::new(path)).map_err(|e| DocError::asset(src, e))
        }
    }
}

/// Parse a `data:` URI and return its bytes. Base64 payloads are decoded;
/// plain payloads are taken verbatim and must not be percent-encoded.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| DocError::asset(src, "not a data URI"))?;
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| DocError::asset(src, "missing `,` between header and data"))?;
    let header = &rest[..comma_pos];
    if !header.split(';').any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        let payload = &rest[comma_pos + 1..];
        if payload.contains('%') {
            return Err(DocError::asset(src, "percent-encoded data URIs are not supported"));
        }
        return Ok(payload.as_bytes().to_vec());
    }
    // Browsers hand over URIs with embedded line breaks now and then.
    let b64_data: String = rest[comma_pos + 1..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    BASE64_STD
        .decode(b64_data)
        .map_err(|e| DocError::asset(src, format!("base64 decode error: {e}")))
}

/// Encoded format the PDF renderer can embed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedFormat {
    Png,
    Jpeg,
}

/// A decoded image ready for placement.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Stable key used to register the image once per document.
    pub key: String,
    pub format: EmbedFormat,
    /// Encoded bytes (PNG or JPEG) as embedded in the PDF.
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl LoadedImage {
    /// Build from already-decoded pixels, re-encoding as PNG.
    pub fn from_dynamic(key: impl Into<String>, img: &DynamicImage) -> Result<Self> {
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Self {
            key: key.into(),
            format: EmbedFormat::Png,
            bytes,
            width_px: img.width(),
            height_px: img.height(),
        })
    }

    /// Largest size with the image's aspect ratio that fits `max_w × max_h`.
    pub fn fit_within(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        fit_within(self.width_px, self.height_px, max_w, max_h)
    }
}

pub fn fit_within(width_px: u32, height_px: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    if width_px == 0 || height_px == 0 || max_w <= 0.0 || max_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / width_px as f32).min(max_h / height_px as f32);
    (width_px as f32 * scale, height_px as f32 * scale)
}

/// Decode raw bytes into pixels, keeping PNG/JPEG bytes as-is for embedding
/// and transcoding anything else (GIF, WebP support varies) to PNG.
pub fn decode_image(key: &str, bytes: Vec<u8>) -> Result<(LoadedImage, DynamicImage)> {
    let format = image::guess_format(&bytes).map_err(|e| DocError::asset(key, e))?;
    let img = image::load_from_memory(&bytes).map_err(|e| DocError::asset(key, e))?;
    let (width_px, height_px) = img.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(DocError::asset(key, "image has no pixels"));
    }
    let loaded = match format {
        ImageFormat::Png => LoadedImage {
            key: key.to_string(),
            format: EmbedFormat::Png,
            bytes,
            width_px,
            height_px,
        },
        ImageFormat::Jpeg => LoadedImage {
            key: key.to_string(),
            format: EmbedFormat::Jpeg,
            bytes,
            width_px,
            height_px,
        },
        _ => LoadedImage::from_dynamic(key, &img)?,
    };
    Ok((loaded, img))
}

/// Fetch and decode an image. Empty sources and every failure give `None`.
pub fn load_image(loader: &dyn AssetLoader, src: &str) -> Option<LoadedImage> {
    load_image_pixels(loader, src).map(|(loaded, _)| loaded)
}

/// Like [`load_image`], also returning the decoded pixels for rasterisation.
pub fn load_image_pixels(
    loader: &dyn AssetLoader,
    src: &str,
) -> Option<(LoadedImage, DynamicImage)> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let result = loader
        .fetch(src)
        .and_then(|bytes| decode_image(&image_key(src), bytes));
    match result {
        Ok(pair) => Some(pair),
        Err(e) => {
            log::warn!("Skipping image: {e}");
            None
        }
    }
}

/// Short, stable key for an image source.
fn image_key(src: &str) -> String {
    // FNV-1a; data URIs are too long to use directly as resource names.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in src.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("img-{hash:016x}")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// A solid-colour PNG as a data URI.
    pub(crate) fn png_data_uri(w: u32, h: u32, rgba: [u8; 4]) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(rgba)));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64_STD.encode(bytes))
    }

    #[test]
    fn data_uri_round_trip_decodes() {
        let uri = png_data_uri(4, 2, [255, 0, 0, 255]);
        let img = load_image(&DefaultAssetLoader::default(), &uri).unwrap();
        assert_eq!((img.width_px, img.height_px), (4, 2));
        assert_eq!(img.format, EmbedFormat::Png);
    }

    #[test]
    fn plain_data_uri_payload_is_verbatim() {
        assert_eq!(parse_data_uri("data:text/plain,hello").unwrap(), b"hello");
        assert_eq!(parse_data_uri("data:,").unwrap(), b"");
        assert_eq!(
            parse_data_uri("data:image/png;BASE64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            parse_data_uri("data:text/plain,50%25%20off"),
            Err(DocError::Asset { .. })
        ));
    }

    #[test]
    fn empty_source_is_none() {
        assert!(load_image(&DefaultAssetLoader::default(), "").is_none());
        assert!(load_image(&DefaultAssetLoader::default(), "   ").is_none());
    }

    #[test]
    fn garbage_is_soft_failure() {
        let loader = DefaultAssetLoader::default();
        assert!(load_image(&loader, "data:image/png;base64,!!!!").is_none());
        assert!(load_image(&loader, "data:image/png;base64,aGVsbG8=").is_none());
        assert!(load_image(&loader, "data:text/plain,hello").is_none());
        assert!(load_image(&loader, "/definitely/not/here.png").is_none());
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_within(200, 100, 40.0, 40.0), (40.0, 20.0));
        assert_eq!(fit_within(100, 200, 40.0, 40.0), (20.0, 40.0));
        assert_eq!(fit_within(0, 200, 40.0, 40.0), (0.0, 0.0));
    }

    #[test]
    fn image_keys_are_stable() {
        assert_eq!(image_key("abc"), image_key("abc"));
        assert_ne!(image_key("abc"), image_key("abd"));
    }
}
