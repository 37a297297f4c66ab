//! Image fingerprinting.
//!
//! A fingerprint identifies a *set* of images by content. Each image is
//! hashed with SHA-256 on its own; for more than one image the hex digests
//! are sorted, concatenated and hashed again. Selection order therefore does
//! not change the fingerprint, but any byte change in any image does.

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::Result;
use crate::types::{ImageFingerprint, ImageInput, LoadedImage};

/// Fingerprint a set of images, reading their bytes first.
///
/// Fails with [`FleamarkError::Hashing`](crate::FleamarkError::Hashing) if
/// any image cannot be read.
pub async fn fingerprint(images: &[ImageInput]) -> Result<ImageFingerprint> {
    let mut loaded = Vec::with_capacity(images.len());
    for image in images {
        loaded.push(image.read().await?.bytes);
    }
    Ok(fingerprint_bytes(&loaded))
}

/// Fingerprint images that are already in memory.
pub fn fingerprint_loaded(images: &[LoadedImage]) -> ImageFingerprint {
    let digests: Vec<String> = images.iter().map(|i| sha256_hex(&i.bytes)).collect();
    combine(digests)
}

/// Fingerprint raw byte buffers.
pub fn fingerprint_bytes(images: &[Bytes]) -> ImageFingerprint {
    let digests: Vec<String> = images.iter().map(|b| sha256_hex(b)).collect();
    combine(digests)
}

fn combine(mut digests: Vec<String>) -> ImageFingerprint {
    if digests.len() == 1 {
        return ImageFingerprint::from_hex(digests.remove(0));
    }
    digests.sort_unstable();
    ImageFingerprint::from_hex(sha256_hex(digests.concat().as_bytes()))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
