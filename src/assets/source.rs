//! Where image bytes come from, and how they become pixels.

use crate::render::TextureImage;
use base64::Engine as _;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Remote images larger than this are refused.
pub const MAX_REMOTE_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to fetch {url}: {message}")]
    Http { url: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("blob {0} is not registered")]
    UnknownBlob(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A user-supplied image reference, classified by scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    DataUrl(String),
    Remote(String),
    Path(PathBuf),
    /// `blob:` key that has to be resolved through the blob store first.
    Blob(String),
    Bytes(Arc<Vec<u8>>),
}

impl ImageSource {
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("data:") {
            Self::DataUrl(trimmed.to_string())
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else if trimmed.starts_with("blob:") {
            Self::Blob(trimmed.to_string())
        } else {
            let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
            Self::Path(PathBuf::from(path))
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(Arc::new(bytes))
    }
}

/// Raw encoded bytes of `source`. Blocking: remote sources hit the network.
pub fn fetch_bytes(source: &ImageSource) -> Result<Arc<Vec<u8>>, ImageLoadError> {
    match source {
        ImageSource::DataUrl(url) => decode_data_url(url).map(Arc::new),
        ImageSource::Remote(url) => fetch_remote(url).map(Arc::new),
        ImageSource::Path(path) => std::fs::read(path)
            .map(Arc::new)
            .map_err(|source| ImageLoadError::Io {
                path: path.display().to_string(),
                source,
            }),
        ImageSource::Blob(key) => Err(ImageLoadError::UnknownBlob(key.clone())),
        ImageSource::Bytes(bytes) => Ok(bytes.clone()),
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<image::RgbaImage, ImageLoadError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Fetch and decode in one blocking step.
pub fn load_texture_image(source: &ImageSource) -> Result<TextureImage, ImageLoadError> {
    let bytes = fetch_bytes(source)?;
    let decoded = decode_image(&bytes)?;
    let (width, height) = decoded.dimensions();
    Ok(TextureImage {
        width,
        height,
        rgba: decoded.into_raw(),
    })
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, ImageLoadError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or(ImageLoadError::MalformedDataUrl)?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or(ImageLoadError::MalformedDataUrl)?;
    if header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

fn fetch_remote(url: &str) -> Result<Vec<u8>, ImageLoadError> {
    log::debug!("Fetching image from {}", url);
    let http_error = |message: String| ImageLoadError::Http {
        url: url.to_string(),
        message,
    };
    let response = ureq::get(url)
        .call()
        .map_err(|err| http_error(err.to_string()))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_REMOTE_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|err| http_error(err.to_string()))?;
    Ok(bytes)
}
