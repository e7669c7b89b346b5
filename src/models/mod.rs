pub mod classifier;
pub mod manager;

pub use classifier::{OnnxClassifier, ScoreModel};
pub use manager::{ModelHost, ModelStats};
