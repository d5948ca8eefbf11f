//! # Offline-Aware Photo Capture
//!
//! Turns a picked or shot image into a [`Photo`] that can ride along with
//! a report draft.
//!
//! ## Flow
//!
//! 1. Reject anything that is not image data
//! 2. Compress (always, no network needed)
//! 3. Online and signed in: upload now, keep the public URL
//! 4. Otherwise, or if the upload fails: embed as a base64 data URL
//!
//! Capture never fails because of connectivity. The sync engine later
//! decodes embedded photos with [`decode_data_url`] and uploads them.

use base64::prelude::*;
use std::sync::Arc;

use crate::remote::{IdentityProvider, ReportBackend};
use crate::shared::error::{CaptureError, SharedError};
use crate::shared::report::Photo;
use crate::sync::network_monitor::NetworkMonitor;

const DATA_URL_PREFIX: &str = "data:image/";

/// Re-encode target format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }
}

/// Compression settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// 0.0 to 1.0
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: 1600,
            max_height: 1600,
            quality: 0.82,
            format: OutputFormat::Jpeg,
        }
    }
}

/// Scale `(width, height)` to fit inside the bounds, keeping aspect ratio
///
/// Never upscales.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let ratio = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    (
        (width as f64 * ratio).round() as u32,
        (height as f64 * ratio).round() as u32,
    )
}

/// Image as handed over by the platform picker or camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    fn validate(&self) -> Result<(), CaptureError> {
        if !self.mime_type.starts_with("image/") {
            return Err(CaptureError::NotAnImage {
                mime_type: self.mime_type.clone(),
            });
        }
        if self.bytes.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(())
    }
}

/// Compressed image bytes and their type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Resize and re-encode; implemented by the platform's image codec
pub trait ImageCompressor: Send + Sync {
    fn compress(&self, image: &RawImage, options: &CompressOptions) -> Result<CompressedImage, CaptureError>;
}

/// Hands the input back unchanged
///
/// For platforms whose picker already delivers compressed images.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompressor;

impl ImageCompressor for PassthroughCompressor {
    fn compress(&self, image: &RawImage, _options: &CompressOptions) -> Result<CompressedImage, CaptureError> {
        Ok(CompressedImage {
            bytes: image.bytes.clone(),
            mime_type: image.mime_type.clone(),
        })
    }
}

/// Compress, keeping the original when compression does not shrink it
pub fn compress_or_keep(
    compressor: &dyn ImageCompressor,
    image: &RawImage,
    options: &CompressOptions,
) -> Result<CompressedImage, CaptureError> {
    let compressed = compressor.compress(image, options)?;
    if compressed.bytes.len() >= image.bytes.len() {
        return Ok(CompressedImage {
            bytes: image.bytes.clone(),
            mime_type: image.mime_type.clone(),
        });
    }
    Ok(compressed)
}

/// Whether a string is an embedded image data URL
pub fn is_data_url(value: &str) -> bool {
    value.starts_with(DATA_URL_PREFIX)
}

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64_STANDARD.encode(bytes))
}

/// Split a base64 image data URL into its MIME type and bytes
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), SharedError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| SharedError::validation("photo", "not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SharedError::validation("photo", "data URL has no payload"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| SharedError::validation("photo", "data URL is not base64"))?;
    if !mime_type.starts_with("image/") {
        return Err(SharedError::validation("photo", format!("not an image: {}", mime_type)));
    }
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|e| SharedError::serialization(format!("base64: {}", e)))?;
    Ok((mime_type.to_string(), bytes))
}

/// Object-store path for a photo: `<user>/<epoch_ms>.<ext>`
pub fn object_path(user_id: &str, now_ms: i64, mime_type: &str) -> String {
    let ext = if mime_type == "image/webp" { "webp" } else { "jpg" };
    format!("{}/{}.{}", user_id, now_ms, ext)
}

/// Result of a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub photo: Photo,
    pub original_size: usize,
    pub compressed_size: usize,
}

impl CapturedPhoto {
    /// True if the photo is stored inline and still has to be uploaded
    pub fn saved_offline(&self) -> bool {
        self.photo.is_inline()
    }
}

/// Photo capture that degrades to inline storage when it cannot upload
pub struct PhotoCapture {
    compressor: Arc<dyn ImageCompressor>,
    backend: Arc<dyn ReportBackend>,
    identity: Arc<dyn IdentityProvider>,
    monitor: Arc<NetworkMonitor>,
    bucket: String,
    options: CompressOptions,
}

impl PhotoCapture {
    pub fn new(
        compressor: Arc<dyn ImageCompressor>,
        backend: Arc<dyn ReportBackend>,
        identity: Arc<dyn IdentityProvider>,
        monitor: Arc<NetworkMonitor>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            compressor,
            backend,
            identity,
            monitor,
            bucket: bucket.into(),
            options: CompressOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompressOptions) -> Self {
        self.options = options;
        self
    }

    /// Capture an image as a draft photo
    pub async fn capture(&self, image: RawImage) -> Result<CapturedPhoto, CaptureError> {
        image.validate()?;
        let compressed = compress_or_keep(self.compressor.as_ref(), &image, &self.options)?;
        let original_size = image.bytes.len();
        let compressed_size = compressed.bytes.len();
        tracing::debug!(original_size, compressed_size, "compressed photo");

        let photo = match self.identity.current_user_id() {
            Some(user_id) if self.monitor.is_online() => {
                self.upload_or_inline(&user_id, compressed).await
            }
            _ => inline(&compressed),
        };

        Ok(CapturedPhoto {
            photo,
            original_size,
            compressed_size,
        })
    }

    async fn upload_or_inline(&self, user_id: &str, compressed: CompressedImage) -> Photo {
        let path = object_path(user_id, chrono::Utc::now().timestamp_millis(), &compressed.mime_type);
        match self
            .backend
            .upload_object(&self.bucket, &path, compressed.bytes.clone(), &compressed.mime_type)
            .await
        {
            Ok(url) => {
                tracing::info!(%path, "uploaded photo");
                Photo::Remote { url }
            }
            Err(e) => {
                tracing::warn!(error = %e, "photo upload failed, keeping photo offline");
                inline(&compressed)
            }
        }
    }
}

fn inline(compressed: &CompressedImage) -> Photo {
    Photo::Inline {
        data_url: encode_data_url(&compressed.mime_type, &compressed.bytes),
    }
}
