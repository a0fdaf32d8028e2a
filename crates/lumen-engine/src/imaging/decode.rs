use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Pixel layout of a [`PendingImage`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, non-premultiplied, row-major, no row padding.
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded, format-normalized image awaiting injection into the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl PendingImage {
    /// Wraps tightly packed RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty);
        }
        let expected = width as usize * height as usize * PixelFormat::Rgba8.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(DecodeError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Average RGBA over all pixels.
    pub fn mean_color(&self) -> [u8; 4] {
        let texels: &[[u8; 4]] = bytemuck::cast_slice(&self.pixels);
        let mut sum = [0u64; 4];
        for texel in texels {
            for (acc, c) in sum.iter_mut().zip(texel) {
                *acc += u64::from(*c);
            }
        }
        let n = texels.len().max(1) as u64;
        sum.map(|c| (c / n) as u8)
    }
}

impl fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opaque reference to a selected image.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// Encoded bytes already in memory (e.g. from a content resolver).
    Bytes(Arc<[u8]>),
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read image `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or corrupt image data")]
    Format(#[from] image::ImageError),

    #[error("image has no pixels")]
    Empty,

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("failed to start image decode helper")]
    Spawn(#[source] std::io::Error),
}

/// Decodes `source` and normalizes it to RGBA8.
pub fn decode_image(source: &ImageSource) -> Result<PendingImage, DecodeError> {
    let decoded = match source {
        ImageSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
                path: path.clone(),
                source,
            })?;
            image::load_from_memory(&bytes)?
        }
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes)?,
    };

    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("decoded {source} ({width}x{height})");

    PendingImage::from_rgba8(width, height, rgba.into_raw())
}
