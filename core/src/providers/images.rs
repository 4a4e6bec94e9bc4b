//! Image-reference resolution for providers that need inline base64
//! payloads (Ollama, Gemini) rather than a URL.

use crate::error::AgentError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

const DEFAULT_MIME: &str = "image/jpeg";

/// Resolves an image reference to `(mime_type, base64_data)`. Data URIs
/// are split in place; anything else is fetched over HTTP.
pub async fn image_to_base64(
    client: &reqwest::Client,
    url: &str,
) -> Result<(String, String), AgentError> {
    if let Some((mime, data)) = split_data_uri(url) {
        return Ok((mime.to_string(), data.to_string()));
    }
    // A data URI that failed to split must not fall through to a fetch.
    if url.starts_with("data:") {
        return Err(AgentError::Configuration(
            "data URIs must be base64-encoded: expected 'data:<mime>;base64,<data>'".to_string(),
        ));
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AgentError::Transport(format!(
            "image fetch failed with status {} for {}",
            response.status(),
            url
        )));
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| DEFAULT_MIME.to_string());

    let bytes = response.bytes().await?;
    Ok((mime, BASE64.encode(&bytes)))
}

fn split_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((if mime.is_empty() { DEFAULT_MIME } else { mime }, data))
}
