//! Image recognizers.
//!
//! - [`Recognizer`]: the capability trait
//! - [`RecognizerChain`]: primary/fallback selection with per-call deadlines
//! - [`RetryingRecognizer`]: retry decorator for transient failures
//! - [`CatalogRecognizer`]: file-name lookup against an item catalog
//! - [`HttpRecognizer`]: remote recognition service (feature `http-recognizer`)

pub mod catalog;
pub mod chain;
#[cfg(feature = "http-recognizer")]
pub mod http;
pub mod retry;
pub mod traits;

pub use catalog::{CatalogRecognizer, hint_from_file_name};
pub use chain::{DEFAULT_RECOGNITION_TIMEOUT, RecognitionStrategy, RecognizerChain};
#[cfg(feature = "http-recognizer")]
pub use http::HttpRecognizer;
pub use retry::{RetryConfig, RetryingRecognizer};
pub use traits::Recognizer;
