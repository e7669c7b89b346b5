use crate::config::{IMG_SIZE, NORMALIZE_MEAN, NORMALIZE_STD};
use crate::image::loader::{ImageLoader, ImageSource};
use crate::Result;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Shape of the tensor the classifier expects: NHWC, batch of one.
pub const INPUT_SHAPE: [usize; 4] = [1, IMG_SIZE as usize, IMG_SIZE as usize, 3];

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Decode `source` and turn it into a standardized `[1, 224, 224, 3]` tensor.
    pub fn preprocess(source: &ImageSource) -> Result<Array4<f32>> {
        let image = ImageLoader::load(source)?;

        tracing::debug!(
            "Decoded {}: {}x{}, {} channel(s)",
            source.describe(),
            image.width(),
            image.height(),
            image.color().channel_count()
        );

        Ok(Self::preprocess_image(&image))
    }

    /// Preprocess an already decoded image.
    pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
        let rgb = ImageLoader::to_rgb(image);
        let resized = Self::resize(&rgb, IMG_SIZE);
        Self::standardize(&resized)
    }

    /// Stretch to `size` x `size` with bilinear filtering; aspect ratio is not kept.
    pub fn resize(image: &RgbImage, size: u32) -> RgbImage {
        if image.dimensions() == (size, size) {
            return image.clone();
        }
        imageops::resize(image, size, size, FilterType::Triangle)
    }

    /// `(pixel / 255 - mean_c) / std_c` per channel, with a leading batch axis.
    pub fn standardize(image: &RgbImage) -> Array4<f32> {
        let (width, height) = image.dimensions();

        Array4::from_shape_fn((1, height as usize, width as usize, 3), |(_, y, x, c)| {
            let value = image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (value - NORMALIZE_MEAN[c]) / NORMALIZE_STD[c]
        })
    }

    /// Value a channel takes for a given 8-bit intensity after standardization.
    pub fn standardized_value(channel: usize, pixel: u8) -> f32 {
        (pixel as f32 / 255.0 - NORMALIZE_MEAN[channel]) / NORMALIZE_STD[channel]
    }
}
