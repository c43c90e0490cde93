//! Image loading from URLs, data URLs, base64 payloads, files, and raw bytes.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::resources::SharedResources;
use crate::types::{EngineResult, PixelImage, VerifyError};

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageRef {
    /// `http(s)://` location, or a `data:` URL decoded in memory.
    Url { url: String },
    Base64 {
        data: String,
        #[serde(default)]
        mime: Option<String>,
    },
    File { path: PathBuf },
    /// Encoded bytes handed over in-process.
    #[serde(skip)]
    Bytes(Vec<u8>),
}

impl ImageRef {
    pub fn url(url: impl Into<String>) -> Self {
        ImageRef::Url { url: url.into() }
    }

    /// Short label for logs. Never includes payload bytes.
    pub fn describe(&self) -> String {
        match self {
            ImageRef::Url { url } if url.starts_with("data:") => "data-url".to_string(),
            ImageRef::Url { url } => url.clone(),
            ImageRef::Base64 { mime, .. } => {
                format!("base64 ({})", mime.as_deref().unwrap_or("unknown"))
            }
            ImageRef::File { path } => path.display().to_string(),
            ImageRef::Bytes(b) => format!("{} bytes", b.len()),
        }
    }
}

/// Load and decode an image, fetching over the network when needed.
///
/// Decoding runs on the blocking thread pool so the async runtime stays responsive.
pub async fn load_image(
    source: &ImageRef,
    resources: &SharedResources,
    timeout: Duration,
) -> EngineResult<PixelImage> {
    match source {
        ImageRef::Url { url } if url.starts_with("data:") => {
            let url = url.clone();
            decode_off_runtime(move || decode_data_url(&url)).await
        }
        ImageRef::Url { url } => {
            let bytes = fetch(resources, url, timeout).await?;
            decode_off_runtime(move || decode_bytes(&bytes, None)).await
        }
        ImageRef::Base64 { data, mime } => {
            let (data, mime) = (data.clone(), mime.clone());
            decode_off_runtime(move || decode_base64(&data, mime.as_deref())).await
        }
        ImageRef::File { path } => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                VerifyError::ImageLoad(format!("Failed to read {}: {e}", path.display()))
            })?;
            decode_off_runtime(move || decode_bytes(&bytes, None)).await
        }
        ImageRef::Bytes(bytes) => {
            let bytes = bytes.clone();
            decode_off_runtime(move || decode_bytes(&bytes, None)).await
        }
    }
}

async fn decode_off_runtime<F>(decode: F) -> EngineResult<PixelImage>
where
    F: FnOnce() -> EngineResult<PixelImage> + Send + 'static,
{
    tokio::task::spawn_blocking(decode)
        .await
        .map_err(|e| VerifyError::ImageLoad(format!("Decode task failed: {e}")))?
}

async fn fetch(resources: &SharedResources, url: &str, timeout: Duration) -> EngineResult<Vec<u8>> {
    tracing::debug!("Fetching image from {url}");

    let client = resources.http().ok_or_else(|| {
        VerifyError::ImageLoad(format!("HTTP client unavailable, cannot fetch {url}"))
    })?;
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| fetch_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(VerifyError::ImageLoad(format!(
            "GET {url} returned HTTP {}",
            status.as_u16()
        )));
    }

    let body = response.bytes().await.map_err(|e| fetch_error(url, e))?;
    Ok(body.to_vec())
}

fn fetch_error(url: &str, e: reqwest::Error) -> VerifyError {
    if e.is_timeout() {
        VerifyError::ImageLoad(format!("Timed out fetching {url}"))
    } else {
        VerifyError::ImageLoad(format!("Failed to fetch {url}: {e}"))
    }
}

/// Decode an encoded image into 8-bit RGB. `mime` pins the format when recognised.
pub fn decode_bytes(bytes: &[u8], mime: Option<&str>) -> EngineResult<PixelImage> {
    if bytes.is_empty() {
        return Err(VerifyError::ImageLoad("Empty image payload".to_string()));
    }

    let img = match mime.and_then(format_for_mime) {
        Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        None => image::load_from_memory(bytes)?,
    };

    Ok(PixelImage::from_rgb(img.to_rgb8()))
}

/// Decode a bare base64 payload.
pub fn decode_base64(data: &str, mime: Option<&str>) -> EngineResult<PixelImage> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| VerifyError::ImageLoad(format!("Invalid base64: {e}")))?;
    decode_bytes(&bytes, mime)
}

/// Decode a `data:<mime>;base64,<payload>` URL, as produced by browser screenshots.
pub fn decode_data_url(url: &str) -> EngineResult<PixelImage> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| VerifyError::ImageLoad("Not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| VerifyError::ImageLoad("Malformed data URL".to_string()))?;

    let mut parts = header.split(';');
    let mime = parts.next().filter(|m| !m.is_empty());
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(VerifyError::ImageLoad(
            "Only base64-encoded data URLs are supported".to_string(),
        ));
    }

    decode_base64(payload, mime)
}

fn format_for_mime(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(&DynamicImage::new_rgb8(4, 3));
        let img = decode_bytes(&bytes, Some("image/png")).unwrap();
        assert_eq!((img.width(), img.height(), img.channels()), (4, 3, 3));
    }

    #[test]
    fn test_rgba_is_flattened_to_rgb() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]));
        let bytes = png_bytes(&DynamicImage::ImageRgba8(rgba));
        let img = decode_bytes(&bytes, None).unwrap();
        assert_eq!(img.channels(), 3);
        assert_eq!(&img.as_bytes()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_empty_payload() {
        let err = decode_bytes(&[], None).unwrap_err();
        assert_eq!(err.kind(), "ImageLoadError");
    }

    #[test]
    fn test_corrupt_payload() {
        let err = decode_bytes(b"definitely not an image", None).unwrap_err();
        assert_eq!(err.kind(), "ImageLoadError");
    }

    #[test]
    fn test_data_url() {
        let bytes = png_bytes(&DynamicImage::new_rgb8(5, 5));
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let img = decode_data_url(&format!("data:image/png;base64,{encoded}")).unwrap();
        assert_eq!(img.width(), 5);

        assert!(decode_data_url("data:image/png,rawtext").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }

    #[test]
    fn test_invalid_base64() {
        let err = decode_base64("!!!", Some("image/png")).unwrap_err();
        assert!(err.to_string().contains("Invalid base64"));
    }

    #[test]
    fn test_image_ref_json_shape() {
        let r: ImageRef =
            serde_json::from_str(r#"{"type": "url", "url": "https://example.com/a.jpg"}"#).unwrap();
        assert_eq!(r, ImageRef::url("https://example.com/a.jpg"));

        let r: ImageRef = serde_json::from_str(r#"{"type": "base64", "data": "AAAA"}"#).unwrap();
        assert!(matches!(r, ImageRef::Base64 { mime: None, .. }));

        assert_eq!(
            ImageRef::url("data:image/png;base64,AAAA").describe(),
            "data-url"
        );
    }
}
