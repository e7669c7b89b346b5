use crate::config::OnnxConfig;
use crate::image::preprocessing::INPUT_SHAPE;
use crate::utils::error::ClassifierError;
use crate::Result;
use ndarray::Array4;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::{Tensor, ValueType},
};
use parking_lot::Mutex;
use std::path::Path;

/// A model that turns one preprocessed image into per-class scores.
pub trait ScoreModel: Send + Sync {
    /// Input dims the model declares. `-1` marks a dynamic axis.
    fn input_dims(&self) -> Vec<i64> {
        INPUT_SHAPE.iter().map(|&d| d as i64).collect()
    }

    /// One forward pass. Position `i` of the result is class `i`.
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>>;

    /// Short identifier for logs and stats.
    fn name(&self) -> String;
}

/// Image classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    // `Session::run` needs `&mut`, so concurrent requests take turns
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_dims: Vec<i64>,
    name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_dims", &self.input_dims)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    pub fn load(model_path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let load_error = |stage: &str, e: &dyn std::fmt::Display| {
            ClassifierError::ModelLoad(format!("{} ({}): {}", stage, model_path.display(), e))
        };

        let session = Session::builder()
            .map_err(|e| load_error("Failed to create session builder", &e))?
            .with_optimization_level(Self::optimization_level(onnx_config.optimization_level))
            .map_err(|e| load_error("Failed to set optimization level", &e))?
            .with_intra_threads(onnx_config.intra_threads)
            .map_err(|e| load_error("Failed to set intra threads", &e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error("Failed to load model", &e))?;

        let (input_name, input_dims) = match session.inputs.first() {
            Some(input) => (input.name.clone(), declared_dims(&input.input_type)?),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        for (i, input) in session.inputs.iter().enumerate() {
            tracing::debug!("Classifier input[{}]: '{}' {:?}", i, input.name, input.input_type);
        }
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classifier output[{}]: '{}' {:?}", i, output.name, output.output_type);
        }

        tracing::info!(
            "Classification model loaded: input '{}' {:?}, output '{}'",
            input_name,
            input_dims,
            output_name
        );

        let name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_dims,
            name,
        })
    }

    fn optimization_level(level: u8) -> GraphOptimizationLevel {
        match level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }
}

/// Dims of a tensor input as the artifact declares them.
pub fn declared_dims(input_type: &ValueType) -> Result<Vec<i64>> {
    match input_type.tensor_shape() {
        Some(shape) => Ok(shape.to_vec()),
        None => Err(ClassifierError::ModelLoad(format!(
            "Classification model input is not a tensor: {:?}",
            input_type
        ))),
    }
}

/// Whether a tensor of `shape` fits the declared `dims`. Negative dims match any size.
pub fn shape_matches(dims: &[i64], shape: &[usize]) -> bool {
    dims.len() == shape.len()
        && dims
            .iter()
            .zip(shape)
            .all(|(&dim, &size)| dim < 0 || dim as usize == size)
}

impl ScoreModel for OnnxClassifier {
    fn input_dims(&self) -> Vec<i64> {
        self.input_dims.clone()
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input.to_owned())
            .map_err(|e| ClassifierError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let predictions = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_tensor])
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            match outputs.get(self.output_name.as_str()) {
                Some(output) => output
                    .try_extract_array::<f32>()
                    .map_err(|e| ClassifierError::Inference(e.to_string()))?
                    .into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifierError::Inference(format!(
                        "Output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        // expect [1, num_classes]; a bare [num_classes] is accepted too
        let shape = predictions.shape().to_vec();
        if shape.len() > 1 && shape[0] != 1 {
            return Err(ClassifierError::Inference(format!(
                "Expected batch size 1 in model output, got shape {:?}",
                shape
            )));
        }

        Ok(predictions.iter().copied().collect())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ort::tensor::{Shape, SymbolicDimensions, TensorElementType};

    #[test]
    fn test_load_missing_model() {
        let err = OnnxClassifier::load(Path::new("/nonexistent/model.onnx"), &OnnxConfig::default())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
        assert!(err.to_string().contains("/nonexistent/model.onnx"));
    }

    #[test]
    fn test_load_corrupt_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"this is not a protobuf").unwrap();

        let err = OnnxClassifier::load(&path, &OnnxConfig::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    fn tensor_input(dims: [i64; 4]) -> ValueType {
        ValueType::Tensor {
            ty: TensorElementType::Float32,
            shape: Shape::new(dims),
            dimension_symbols: SymbolicDimensions::empty(4),
        }
    }

    #[test]
    fn test_declared_dims_nhwc() {
        let dims = declared_dims(&tensor_input([1, 224, 224, 3])).unwrap();
        assert_eq!(dims, vec![1, 224, 224, 3]);
        assert!(shape_matches(&dims, &INPUT_SHAPE));
    }

    #[test]
    fn test_declared_dims_nchw_rejects_nhwc_tensor() {
        let dims = declared_dims(&tensor_input([1, 3, 224, 224])).unwrap();
        assert_eq!(dims, vec![1, 3, 224, 224]);
        assert!(!shape_matches(&dims, &INPUT_SHAPE));
        assert!(shape_matches(&dims, &[1, 3, 224, 224]));
    }

    #[test]
    fn test_declared_dims_dynamic_batch() {
        let dims = declared_dims(&tensor_input([-1, 224, 224, 3])).unwrap();
        assert_eq!(dims, vec![-1, 224, 224, 3]);
        assert!(shape_matches(&dims, &INPUT_SHAPE));
        assert!(shape_matches(&dims, &[4, 224, 224, 3]));
        assert!(!shape_matches(&dims, &[1, 299, 299, 3]));
    }

    #[test]
    fn test_shape_matches_rank() {
        assert!(!shape_matches(&[1, 224, 224, 3], &[224, 224, 3]));
        assert!(!shape_matches(&[-1, -1, -1], &INPUT_SHAPE));
    }

    #[test]
    fn test_optimization_level_mapping() {
        assert!(matches!(OnnxClassifier::optimization_level(0), GraphOptimizationLevel::Disable));
        assert!(matches!(OnnxClassifier::optimization_level(9), GraphOptimizationLevel::Level3));
    }
}
