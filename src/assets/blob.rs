//! Content-addressed store for images produced during the session (cropped
//! uploads). Keys are `blob:sha256-<hex>`, so the same pixels always map to
//! the same texture reference.

use crate::assets::source::ImageSource;
use crate::scene::TextureRef;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

pub const BLOB_PREFIX: &str = "blob:sha256-";

#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<String, Arc<Vec<u8>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` and returns their reference. Identical content is kept once.
    pub fn insert(&mut self, bytes: Vec<u8>) -> TextureRef {
        let key = blob_key(&bytes);
        self.blobs
            .entry(key.clone())
            .or_insert_with(|| Arc::new(bytes));
        TextureRef::new(key)
    }

    pub fn get(&self, reference: &TextureRef) -> Option<Arc<Vec<u8>>> {
        self.blobs.get(reference.as_str()).cloned()
    }

    /// Turns a texture reference into something the loader can fetch.
    /// Unknown blob keys stay [`ImageSource::Blob`] and fail at fetch time.
    pub fn resolve(&self, reference: &TextureRef) -> ImageSource {
        match self.get(reference) {
            Some(bytes) => ImageSource::Bytes(bytes),
            None => ImageSource::parse(reference.as_str()),
        }
    }

    /// Drops every blob no longer referenced by `keep`.
    pub fn retain<'a>(&mut self, keep: impl IntoIterator<Item = &'a TextureRef>) -> usize {
        let keep: Vec<&str> = keep.into_iter().map(TextureRef::as_str).collect();
        let before = self.blobs.len();
        self.blobs.retain(|key, _| keep.contains(&key.as_str()));
        before - self.blobs.len()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

pub fn blob_key(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{BLOB_PREFIX}{hex}")
}
