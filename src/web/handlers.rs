use crate::{
    classify::{types::PREDICTION_ERROR_LABEL, ClassifyPipeline, PredictionPair},
    image::{ImageSource, Prediction},
    utils::error::ClassifierError,
    web::{extractors::RequestId, ui, AppState},
    Result,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Instant;
use unicode_normalization::UnicodeNormalization;

/// JSON response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// Form upload: store the file, classify it from disk and render the result page.
pub async fn upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Response {
    let start_time = Instant::now();
    tracing::info!("Processing upload: request_id={}", request_id);

    let mut upload: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read multipart field: request_id={}, {}", request_id, e);
                return ui::index_with_message(&state, StatusCode::BAD_REQUEST, "Failed to read upload");
            }
        };

        if field.name() != Some("file") {
            tracing::debug!("Ignoring field: {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(data) => upload = Some((filename, data)),
            Err(e) => {
                tracing::warn!("Failed to read file data: request_id={}, {}", request_id, e);
                return ui::index_with_message(&state, StatusCode::BAD_REQUEST, "Failed to read upload");
            }
        }
    }

    let Some((filename, data)) = upload else {
        return ui::index_with_message(&state, StatusCode::BAD_REQUEST, "No file part");
    };

    if filename.is_empty() {
        return ui::index_with_message(&state, StatusCode::BAD_REQUEST, "No selected file");
    }

    let safe_name = secure_filename(&filename);
    if !state.config.is_allowed_file(&filename) || !state.config.is_allowed_file(&safe_name) {
        let message = format!(
            "Allowed image types are {}",
            state.config.allowed_extensions_display()
        );
        return ui::index_with_message(&state, StatusCode::BAD_REQUEST, &message);
    }

    let stored_name = format!("{}_{}", uuid::Uuid::new_v4().simple(), safe_name);
    let path = state.config.upload_dir.join(&stored_name);

    if let Err(e) = tokio::fs::write(&path, &data).await {
        tracing::error!("Failed to save upload to {}: {}", path.display(), e);
        return ui::index_with_message(
            &state,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save the uploaded file",
        );
    }
    tracing::debug!("Saved upload: {} ({} bytes)", path.display(), data.len());

    let host = state.host.clone();
    let source = ImageSource::from_path(path);
    let pair = tokio::task::spawn_blocking(move || ClassifyPipeline::predict(&host, &source))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Prediction task failed: request_id={}, {}", request_id, e);
            PredictionPair::new(PREDICTION_ERROR_LABEL, "Prediction task failed")
        });

    tracing::info!(
        "Upload completed: request_id={}, file={}, label={}, confidence={}, time={:.3}s",
        request_id,
        stored_name,
        pair.label,
        pair.confidence,
        start_time.elapsed().as_secs_f32()
    );

    let image_url = format!("/uploads/{}", stored_name);
    Html(ui::render_result(&pair, &image_url)).into_response()
}

/// Raw image body in, JSON prediction out.
pub async fn predict_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    body: Bytes,
) -> Result<Json<ApiResponse<Prediction>>> {
    let start_time = Instant::now();

    if body.is_empty() {
        return Err(ClassifierError::InvalidInput("Empty image data".to_string()));
    }

    tracing::info!("Processing prediction: request_id={}, {} bytes", request_id, body.len());

    // model availability is reported before payload problems
    state.host.health_check()?;
    let format = ::image::guess_format(&body).map_err(|_| {
        ClassifierError::UnsupportedFormat("Request body is not a recognized image format".to_string())
    })?;
    tracing::debug!("Detected {:?} payload: request_id={}", format, request_id);

    let host = state.host.clone();
    let source = ImageSource::from_bytes(body.to_vec());
    let prediction = tokio::task::spawn_blocking(move || ClassifyPipeline::classify(&host, &source))
        .await
        .map_err(|e| ClassifierError::Internal(format!("Prediction task failed: {}", e)))??;

    tracing::info!(
        "Prediction completed: request_id={}, label={}, time={:.3}s",
        request_id,
        prediction.label,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(prediction, request_id)))
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Accented letters are transliterated through NFKD (`é` becomes `e`) and
/// any other non-ASCII character is dropped. Path separators and whitespace
/// become `_`, anything outside ASCII letters, digits, `_`, `.` and `-` is
/// dropped, and leading or trailing dots and underscores are stripped.
/// May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cute cat.JPG"), "My_cute_cat.JPG");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename(r"C:\Users\me\dog.png"), "C_Users_me_dog.png");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_secure_filename_transliterates_accents() {
        assert_eq!(secure_filename("héllo wörld.gif"), "hello_world.gif");
        assert_eq!(secure_filename("Crème Brûlée.jpeg"), "Creme_Brulee.jpeg");
        assert_eq!(secure_filename("ﬁsh.png"), "fish.png");
        // no decomposition, so nothing survives
        assert_eq!(secure_filename("猫.png"), "png");
    }

    #[test]
    fn test_secure_filename_can_strip_extension() {
        // only the extension survives, so the upload must be rejected
        assert_eq!(secure_filename("../../.png"), "png");
    }
}
