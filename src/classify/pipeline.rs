use crate::{
    classify::PredictionPair,
    config::CLASS_NAMES,
    image::{ImagePreprocessor, ImageSource, Prediction, ResultFormatter},
    models::ModelHost,
    utils::error::ClassifierError,
    Result,
};
use std::time::Instant;

/// Preprocess → infer → decode.
pub struct ClassifyPipeline;

impl ClassifyPipeline {
    /// Classify one image, surfacing failures as errors.
    pub fn classify(host: &ModelHost, source: &ImageSource) -> Result<Prediction> {
        // don't spend time decoding when there is nothing to run it through
        if let Some(reason) = host.unavailable_reason() {
            return Err(ClassifierError::ModelUnavailable(reason.to_string()));
        }

        let start_time = Instant::now();

        let tensor = ImagePreprocessor::preprocess(source)?;
        let preprocess_time = start_time.elapsed();

        let scores = host.infer(&tensor)?;
        tracing::debug!("Raw scores for {}: {:?}", source.describe(), scores);

        let prediction = ResultFormatter::decode(&scores, &CLASS_NAMES)?;

        tracing::info!(
            "Prediction completed: source={}, label={}, confidence={}, preprocess={:.3}s, total={:.3}s",
            source.describe(),
            prediction.label,
            prediction.confidence,
            preprocess_time.as_secs_f32(),
            start_time.elapsed().as_secs_f32()
        );

        Ok(prediction)
    }

    /// Classify one image; every failure becomes an error pair instead of an `Err`.
    pub fn predict(host: &ModelHost, source: &ImageSource) -> PredictionPair {
        match Self::classify(host, source) {
            Ok(prediction) => prediction.into(),
            Err(e) => {
                tracing::warn!("Prediction failed for {}: {}", source.describe(), e);
                PredictionPair::from_error(&e)
            }
        }
    }
}
