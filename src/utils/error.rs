use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Decode(String),

    #[error("Input tensor shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: Vec<i64>,
        actual: Vec<usize>,
    },

    #[error("Predicted class index {index} has no label (label set has {len} entries)")]
    LabelIndexOutOfRange { index: usize, len: usize },

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ClassifierError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassifierError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClassifierError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClassifierError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClassifierError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClassifierError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ClassifierError::Decode(_) => "DECODE_ERROR",
            ClassifierError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            ClassifierError::LabelIndexOutOfRange { .. } => "LABEL_INDEX_OUT_OF_RANGE",
            ClassifierError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            ClassifierError::Inference(_) => "INFERENCE_ERROR",
            ClassifierError::InvalidInput(_) => "INVALID_INPUT",
            ClassifierError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ClassifierError::Config(_) => "CONFIG_ERROR",
            ClassifierError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ClassifierError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ClassifierError::ModelUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ClassifierError::Decode("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ClassifierError::ShapeMismatch { expected: vec![1], actual: vec![2] }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ClassifierError::UnsupportedFormat("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_label_index_message() {
        let err = ClassifierError::LabelIndexOutOfRange { index: 3, len: 2 };
        assert_eq!(err.error_code(), "LABEL_INDEX_OUT_OF_RANGE");
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn test_decode_message_is_passed_through() {
        let err = ClassifierError::Decode("Could not read image from path: a.png".into());
        assert_eq!(err.to_string(), "Could not read image from path: a.png");
    }
}
