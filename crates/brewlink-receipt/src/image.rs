//! Captured receipt images.
//!
//! The camera path and the file path converge on one representation: a
//! displayable preview plus the binary payload that gets uploaded. Input
//! is validated here so the submission machine only ever holds an
//! acceptable image.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use brewlink_core::error::AppError;
use brewlink_core::result::AppResult;

/// Which input path produced the image. Retake returns to the matching
/// acquisition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Live device-camera capture.
    Camera,
    /// Local file choice.
    File,
}

/// A validated captured image, ready for preview and upload.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// The input path that produced this image.
    pub source: ImageSource,
    /// Sniffed MIME type of the payload.
    pub content_type: String,
    /// Binary payload uploaded to the collaborator.
    pub bytes: Bytes,
    /// Displayable preview as a base64 data URL.
    pub preview: String,
}

impl CapturedImage {
    /// Accept a locally chosen file.
    ///
    /// Rejects payloads over `max_bytes` and anything that does not sniff
    /// as an image; the file's claimed extension is not trusted.
    pub fn from_file(bytes: Bytes, max_bytes: u64) -> AppResult<Self> {
        Self::validated(ImageSource::File, bytes, max_bytes)
    }

    /// Accept a compressed camera frame.
    pub fn from_camera_frame(bytes: Bytes, max_bytes: u64) -> AppResult<Self> {
        Self::validated(ImageSource::Camera, bytes, max_bytes)
    }

    fn validated(source: ImageSource, bytes: Bytes, max_bytes: u64) -> AppResult<Self> {
        if bytes.len() as u64 > max_bytes {
            return Err(AppError::validation(format!(
                "Image is {} bytes, exceeding the {} byte limit",
                bytes.len(),
                max_bytes
            )));
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| AppError::validation("Unsupported file type: expected an image"))?;
        let content_type = format.to_mime_type().to_string();
        let preview = format!("data:{content_type};base64,{}", BASE64.encode(&bytes));

        Ok(Self {
            source,
            content_type,
            bytes,
            preview,
        })
    }
}
