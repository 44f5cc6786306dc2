//! Imaging factory.

mod loader;

pub use loader::{DecodedImage, ImageLoadError, ImageLoader};
