use crate::image::Prediction;
use crate::utils::error::ClassifierError;
use serde::Serialize;

/// Label shown when the model artifact could not be loaded.
pub const MODEL_UNAVAILABLE_LABEL: &str = "Error";
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Model not loaded.";

/// Label shown when preprocessing, inference or decoding failed.
pub const PREDICTION_ERROR_LABEL: &str = "Error during prediction";

/// What callers render: a label and either a percentage or an error phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionPair {
    pub label: String,
    pub confidence: String,
}

impl PredictionPair {
    pub fn new(label: impl Into<String>, confidence: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.into(),
        }
    }

    pub fn model_unavailable() -> Self {
        Self::new(MODEL_UNAVAILABLE_LABEL, MODEL_UNAVAILABLE_MESSAGE)
    }

    pub fn from_error(error: &ClassifierError) -> Self {
        match error {
            ClassifierError::ModelUnavailable(_) => Self::model_unavailable(),
            other => Self::new(PREDICTION_ERROR_LABEL, other.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.label == MODEL_UNAVAILABLE_LABEL || self.label == PREDICTION_ERROR_LABEL
    }

    pub fn into_tuple(self) -> (String, String) {
        (self.label, self.confidence)
    }
}

impl From<Prediction> for PredictionPair {
    fn from(prediction: Prediction) -> Self {
        Self::new(prediction.label, prediction.confidence)
    }
}
