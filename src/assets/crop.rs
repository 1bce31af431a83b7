//! Crop-to-texture: cut a rectangle out of a user image and re-encode it as PNG.

use crate::assets::source::{decode_image, fetch_bytes, ImageLoadError, ImageSource};
use std::io::Cursor;

/// Rectangle in source pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

/// Encoded crop result.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageBlob {
    pub const MIME: &'static str = "image/png";
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("failed to load source image: {0}")]
    ImageLoad(#[from] ImageLoadError),
    #[error("crop region {0:?} is empty")]
    InvalidRegion(CropRegion),
    #[error("crop region {region:?} exceeds the {width}x{height} source")]
    OutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },
    #[error("failed to encode cropped image: {0}")]
    Encoding(String),
}

/// Loads `source` on the blocking pool and returns exactly `region` as PNG.
/// Pixels are copied 1:1; regions that leave the source are refused.
pub async fn crop_to_image(source: ImageSource, region: CropRegion) -> Result<ImageBlob, CropError> {
    if region.width == 0 || region.height == 0 {
        return Err(CropError::InvalidRegion(region));
    }
    tokio::task::spawn_blocking(move || crop_blocking(&source, region))
        .await
        .map_err(ImageLoadError::from)?
}

pub fn crop_blocking(source: &ImageSource, region: CropRegion) -> Result<ImageBlob, CropError> {
    if region.width == 0 || region.height == 0 {
        return Err(CropError::InvalidRegion(region));
    }
    let bytes = fetch_bytes(source)?;
    let decoded = decode_image(&bytes)?;
    let (width, height) = decoded.dimensions();
    if !region.fits(width, height) {
        return Err(CropError::OutOfBounds {
            region,
            width,
            height,
        });
    }

    let cropped = image::imageops::crop_imm(&decoded, region.x, region.y, region.width, region.height)
        .to_image();
    let mut encoded = Vec::new();
    cropped
        .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
        .map_err(|err| CropError::Encoding(err.to_string()))?;
    if encoded.is_empty() {
        return Err(CropError::Encoding("encoder produced no data".to_string()));
    }
    log::debug!(
        "Cropped {}x{} at ({}, {}) from {}x{} source",
        region.width,
        region.height,
        region.x,
        region.y,
        width,
        height
    );
    Ok(ImageBlob {
        bytes: encoded,
        width: region.width,
        height: region.height,
    })
}
