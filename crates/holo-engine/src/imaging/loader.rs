use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image is {width}x{height}; both sides must be non-zero")]
    Empty { width: u32, height: u32 },
}

/// Decoded RGBA8 pixels, tightly packed rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }

    /// Texture extent for uploading this image as a single 2D layer.
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Device-independent imaging factory.
///
/// Decodes opaque byte buffers handed in by the I/O layer. Decoding does not
/// touch the GPU, so decoded images survive device loss and can be uploaded
/// again onto the restored device.
#[derive(Debug, Default)]
pub struct ImageLoader;

impl ImageLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decodes PNG/JPEG/BMP bytes to RGBA8.
    pub fn decode_rgba8(&self, bytes: &[u8]) -> Result<DecodedImage, ImageLoadError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageLoadError::Empty { width, height });
        }
        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}
