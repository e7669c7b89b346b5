use crate::{classify::PredictionPair, web::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const RESULT_TEMPLATE: &str = include_str!("../../templates/result.html");

/// Upload form
pub async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(render_index(&state, None))
}

/// Upload form with a flash message, e.g. after a rejected upload.
pub fn index_with_message(state: &AppState, status: StatusCode, message: &str) -> Response {
    (status, Html(render_index(state, Some(message)))).into_response()
}

pub fn render_index(state: &AppState, message: Option<&str>) -> String {
    let flash = message
        .map(|m| format!(r#"<div class="flash">{}</div>"#, escape_html(m)))
        .unwrap_or_default();

    let accept = state
        .config
        .server_config
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    INDEX_TEMPLATE
        .replace("{{flash}}", &flash)
        .replace("{{accept}}", &escape_html(&accept))
}

pub fn render_result(pair: &PredictionPair, image_url: &str) -> String {
    RESULT_TEMPLATE
        .replace("{{image_url}}", &escape_html(image_url))
        .replace("{{prediction}}", &escape_html(&pair.label))
        .replace("{{confidence}}", &escape_html(&pair.confidence))
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<b a="1">&'"#), "&lt;b a=&quot;1&quot;&gt;&amp;&#x27;");
        assert_eq!(escape_html("97.43%"), "97.43%");
    }

    #[test]
    fn test_render_result() {
        let html = render_result(&PredictionPair::new("dog", "88.10%"), "/uploads/x_dog.png");
        assert!(html.contains(r#"<img src="/uploads/x_dog.png""#));
        assert!(html.contains(r#"<div class="prediction">dog</div>"#));
        assert!(html.contains("Confidence: 88.10%"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_result_escapes_error_text() {
        let html = render_result(
            &PredictionPair::new("Error during prediction", "bad <input>"),
            "/uploads/a.png",
        );
        assert!(html.contains("bad &lt;input&gt;"));
    }
}
