pub mod loader;
pub mod preprocessing;
pub mod postprocessing;

pub use loader::{ImageLoader, ImageSource};
pub use preprocessing::ImagePreprocessor;
pub use postprocessing::{Prediction, ResultFormatter};
