//! Public types for the Fleamark API.

mod image;
mod item;
mod key;
mod options;
mod recognition;

pub use image::{ImageInput, ImageSource, LoadedImage, mime_from_extension};
pub use item::{Item, ItemRef};
pub use key::{ImageFingerprint, TextSearchKey};
pub use options::RecognitionOptions;
pub use recognition::{RecognitionMetadata, RecognitionResult, Rect};
