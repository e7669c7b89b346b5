use crate::utils::error::ClassifierError;
use crate::Result;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Where an image to classify comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An image already persisted on disk.
    Path(PathBuf),
    /// An in-memory image payload.
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Drain a byte stream positioned at the start of an image payload.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| ClassifierError::Decode(format!("Could not read image stream: {}", e)))?;
        Ok(Self::Bytes(buffer))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// Decode an image from either kind of source.
    pub fn load(source: &ImageSource) -> Result<DynamicImage> {
        match source {
            ImageSource::Path(path) => Self::from_path(path),
            ImageSource::Bytes(bytes) => Self::from_bytes(bytes),
        }
    }

    /// Load from a file path; the format is sniffed from the content, not the extension.
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        let read_error = |e: &dyn std::fmt::Display| {
            ClassifierError::Decode(format!(
                "Could not read image from path: {} ({})",
                path.display(),
                e
            ))
        };

        ImageReader::open(path)
            .map_err(|e| read_error(&e))?
            .with_guessed_format()
            .map_err(|e| read_error(&e))?
            .decode()
            .map_err(|e| read_error(&e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(ClassifierError::Decode("Could not decode image: empty payload".to_string()));
        }

        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ClassifierError::Decode(format!("Could not decode image: {}", e)))?
            .decode()
            .map_err(|e| ClassifierError::Decode(format!("Could not decode image: {}", e)))
    }

    /// Reduce any decoded image to exactly three RGB channels.
    ///
    /// Alpha is discarded rather than composited and grayscale is replicated
    /// into all three channels. The `image` decoders always produce RGB
    /// ordering, so no BGR flip is needed.
    pub fn to_rgb(image: &DynamicImage) -> RgbImage {
        match image {
            DynamicImage::ImageRgb8(rgb) => rgb.clone(),
            DynamicImage::ImageRgba8(rgba) => {
                RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                    let [r, g, b, _] = rgba.get_pixel(x, y).0;
                    Rgb([r, g, b])
                })
            }
            DynamicImage::ImageLuma8(gray) => {
                RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
                    let [l] = gray.get_pixel(x, y).0;
                    Rgb([l, l, l])
                })
            }
            DynamicImage::ImageLumaA8(gray) => {
                RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
                    let [l, _] = gray.get_pixel(x, y).0;
                    Rgb([l, l, l])
                })
            }
            // 16-bit and float images: let the decoder scale down to 8 bits
            other => other.to_rgb8(),
        }
    }
}
