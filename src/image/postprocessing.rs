use crate::utils::error::ClassifierError;
use crate::Result;
use serde::Serialize;

/// A decoded model prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Label at the winning output position
    pub label: String,
    /// Raw score at that position
    pub score: f32,
    /// Score as a percentage with two decimals, e.g. "97.43%"
    pub confidence: String,
}

pub struct ResultFormatter;

impl ResultFormatter {
    /// Map a score vector to a label and a formatted confidence.
    ///
    /// `labels[i]` must name output position `i`. Ties resolve to the lowest index.
    pub fn decode(scores: &[f32], labels: &[&str]) -> Result<Prediction> {
        let (index, score) = Self::argmax(scores).ok_or_else(|| {
            ClassifierError::Inference("Model returned an empty score vector".to_string())
        })?;

        let label = labels.get(index).ok_or(ClassifierError::LabelIndexOutOfRange {
            index,
            len: labels.len(),
        })?;

        Ok(Prediction {
            label: label.to_string(),
            score,
            confidence: Self::format_confidence(score),
        })
    }

    /// First position holding the maximum value. NaN never wins over a number.
    pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;

        for (i, &score) in scores.iter().enumerate() {
            best = match best {
                None => Some((i, score)),
                Some((_, current)) if current.is_nan() && !score.is_nan() => Some((i, score)),
                Some((_, current)) if score > current => Some((i, score)),
                keep => keep,
            };
        }

        best
    }

    pub fn format_confidence(score: f32) -> String {
        format!("{:.2}%", score as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CLASS_NAMES;

    fn pair(scores: &[f32]) -> (String, String) {
        let p = ResultFormatter::decode(scores, &CLASS_NAMES).unwrap();
        (p.label, p.confidence)
    }

    #[test]
    fn test_decode_cat() {
        assert_eq!(pair(&[0.9, 0.1]), ("cat".to_string(), "90.00%".to_string()));
    }

    #[test]
    fn test_decode_dog() {
        assert_eq!(pair(&[0.3, 0.7]), ("dog".to_string(), "70.00%".to_string()));
    }

    #[test]
    fn test_decode_tie_prefers_lowest_index() {
        assert_eq!(pair(&[0.5, 0.5]), ("cat".to_string(), "50.00%".to_string()));
    }

    #[test]
    fn test_decode_unnormalized_scores() {
        let p = ResultFormatter::decode(&[1.7, 3.25], &CLASS_NAMES).unwrap();
        assert_eq!(p.label, "dog");
        assert_eq!(p.confidence, "325.00%");
        assert_eq!(p.score, 3.25);
    }

    #[test]
    fn test_decode_index_out_of_range() {
        let err = ResultFormatter::decode(&[0.1, 0.2, 0.7], &CLASS_NAMES).unwrap_err();
        assert!(matches!(err, ClassifierError::LabelIndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_decode_empty_scores() {
        let err = ResultFormatter::decode(&[], &CLASS_NAMES).unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(ResultFormatter::argmax(&[f32::NAN, 0.2]), Some((1, 0.2)));
        assert_eq!(ResultFormatter::argmax(&[0.2, f32::NAN, 0.1]), Some((0, 0.2)));
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(ResultFormatter::format_confidence(0.97432), "97.43%");
        assert_eq!(ResultFormatter::format_confidence(0.0), "0.00%");
        assert_eq!(ResultFormatter::format_confidence(1.0), "100.00%");
    }

    #[test]
    fn test_prediction_json() {
        let p = ResultFormatter::decode(&[0.25, 0.75], &CLASS_NAMES).unwrap();
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            serde_json::json!({"label": "dog", "score": 0.75, "confidence": "75.00%"})
        );
    }
}
