pub mod config;
pub mod models;
pub mod image;
pub mod classify;
pub mod web;
pub mod utils;

// Re-export main types
pub use classify::{ClassifyPipeline, PredictionPair};
pub use config::Config;
pub use crate::image::ImageSource;
pub use models::ModelHost;
pub use utils::error::ClassifierError;

pub type Result<T> = std::result::Result<T, ClassifierError>;
