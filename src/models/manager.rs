use crate::models::classifier::shape_matches;
use crate::models::{OnnxClassifier, ScoreModel};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use ndarray::Array4;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of loading the model artifact at startup.
enum ModelState {
    Loaded(Arc<dyn ScoreModel>),
    Unavailable { reason: String },
}

/// Owns the loaded model for the lifetime of the process.
///
/// Built once before the server starts and shared behind an `Arc`. A failed
/// load does not abort startup: the host is kept in the `Unavailable` state
/// and every inference call fails fast with `ModelUnavailable`.
pub struct ModelHost {
    state: ModelState,
    model_path: Option<PathBuf>,
    intra_threads: usize,
    optimization_level: u8,
}

impl ModelHost {
    /// Load the configured artifact. Never fails: a bad artifact leaves the host unavailable.
    pub fn load(config: &Config) -> Self {
        tracing::info!("Initializing model host...");

        let state = match OnnxClassifier::load(&config.model_path, &config.onnx_config) {
            Ok(classifier) => {
                tracing::info!("Model loaded successfully from {}", config.model_path.display());
                ModelState::Loaded(Arc::new(classifier))
            }
            Err(e) => {
                tracing::error!(
                    "Error loading model from {}: {}. Predictions will be unavailable.",
                    config.model_path.display(),
                    e
                );
                ModelState::Unavailable { reason: e.to_string() }
            }
        };

        Self {
            state,
            model_path: Some(config.model_path.clone()),
            intra_threads: config.onnx_config.intra_threads,
            optimization_level: config.onnx_config.optimization_level,
        }
    }

    /// Wrap an already constructed model.
    pub fn with_model(model: Arc<dyn ScoreModel>) -> Self {
        Self {
            state: ModelState::Loaded(model),
            model_path: None,
            intra_threads: 0,
            optimization_level: 0,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable { reason: reason.into() },
            model_path: None,
            intra_threads: 0,
            optimization_level: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Loaded(_) => None,
            ModelState::Unavailable { reason } => Some(reason),
        }
    }

    /// Run one forward pass after checking the tensor matches the model input.
    pub fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let model = match &self.state {
            ModelState::Loaded(model) => model,
            ModelState::Unavailable { reason } => {
                return Err(ClassifierError::ModelUnavailable(reason.clone()))
            }
        };

        let expected = model.input_dims();
        if !shape_matches(&expected, input.shape()) {
            return Err(ClassifierError::ShapeMismatch {
                expected,
                actual: input.shape().to_vec(),
            });
        }

        model.infer(input)
    }

    pub fn health_check(&self) -> Result<()> {
        match &self.state {
            ModelState::Loaded(_) => {
                tracing::debug!("Model health check passed");
                Ok(())
            }
            ModelState::Unavailable { reason } => {
                Err(ClassifierError::ModelUnavailable(reason.clone()))
            }
        }
    }

    pub fn stats(&self) -> ModelStats {
        let (model_name, input_shape) = match &self.state {
            ModelState::Loaded(model) => (Some(model.name()), Some(model.input_dims())),
            ModelState::Unavailable { .. } => (None, None),
        };

        ModelStats {
            model_loaded: self.is_available(),
            model_name,
            model_path: self.model_path.as_ref().map(|p| p.display().to_string()),
            input_shape,
            labels: crate::config::CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            unavailable_reason: self.unavailable_reason().map(str::to_string),
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
        }
    }
}

/// Model information exposed by the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Vec<i64>>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
    pub intra_threads: usize,
    pub optimization_level: u8,
}
