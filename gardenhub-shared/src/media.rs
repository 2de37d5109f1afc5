/// Base64 data-URL images
///
/// Images travel in JSON as `data:<mime>;base64,<payload>` and are stored as
/// raw bytes plus mime type. Only `image/*` types up to [`MAX_IMAGE_BYTES`]
/// are accepted.
///
/// # Example
///
/// ```
/// use gardenhub_shared::media::{decode_data_url, encode_data_url};
///
/// let image = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
/// assert_eq!(image.mime, "image/png");
/// assert_eq!(encode_data_url(&image.bytes, &image.mime), "data:image/png;base64,iVBORw0KGgo=");
/// ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Upper bound on decoded image size (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Image must be a data URL (data:<mime>;base64,<payload>)")]
    NotDataUrl,

    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("Invalid base64 payload")]
    InvalidEncoding,

    #[error("Image exceeds {max} bytes")]
    TooLarge { max: usize },
}

/// Decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Image {
    /// `(bytes, mime)` pair as taken by the create inputs
    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.bytes, self.mime)
    }
}

/// Parses and validates a data URL
pub fn decode_data_url(data_url: &str) -> Result<Image, MediaError> {
    let rest = data_url.trim().strip_prefix("data:").ok_or(MediaError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(MediaError::NotDataUrl)?;
    let mime = meta.strip_suffix(";base64").ok_or(MediaError::NotDataUrl)?;

    let mime = mime.to_ascii_lowercase();
    if !mime.starts_with("image/") || mime.len() == "image/".len() {
        return Err(MediaError::UnsupportedType(mime));
    }

    // base64 inflates by 4/3; reject oversized payloads before decoding
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(MediaError::TooLarge { max: MAX_IMAGE_BYTES });
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| MediaError::InvalidEncoding)?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge { max: MAX_IMAGE_BYTES });
    }

    Ok(Image { bytes, mime })
}

/// Optional variant for request bodies; `None` and `""` mean no image
pub fn decode_optional(data_url: Option<&str>) -> Result<Option<Image>, MediaError> {
    match data_url.map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) => decode_data_url(url).map(Some),
    }
}

/// Renders stored bytes back to a data URL
pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Renders an optional stored image
pub fn render(bytes: Option<&[u8]>, mime: Option<&str>) -> Option<String> {
    match (bytes, mime) {
        (Some(bytes), Some(mime)) => Some(encode_data_url(bytes, mime)),
        _ => None,
    }
}
