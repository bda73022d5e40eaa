use reqwest::StatusCode;
use std::fmt;

/// A non-success response from the API.
///
/// Client methods return it inside [`anyhow::Error`]; recover it with
/// `err.downcast_ref::<ApiError>()`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub url: String,
    /// Server message, or the raw response body if it had none.
    pub message: String,
}

// The API responds with either {"message": ...} or {"error": ...}.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiError {
    pub(crate) fn from_body(status: StatusCode, url: &str, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|e| e.message.or(e.error).or(e.detail))
            .unwrap_or_else(|| body.trim().to_string());
        Self {
            status,
            url: url.to_string(),
            message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.status.as_u16();
        if self.status == StatusCode::UNAUTHORIZED || self.status == StatusCode::FORBIDDEN {
            return write!(
                f,
                "Arlula authentication/authorization failed (HTTP {}).\n- Check the API key and secret (ARLULA_API_KEY / ARLULA_API_SECRET or .arlularc)\n- Ensure the API account has access to the requested entity\n\nServer message: {}\nrequest: {}",
                code, self.message, self.url
            );
        }

        if self.status == StatusCode::NOT_FOUND {
            return write!(
                f,
                "Arlula API entity or endpoint not found (HTTP 404).\n- Check the identifier, and that the configured url is https://api.arlula.com\n\nServer message: {}\nrequest: {}",
                self.message, self.url
            );
        }

        write!(
            f,
            "API request failed: HTTP {} for url ({})\n{}",
            code, self.url, self.message
        )
    }
}

impl std::error::Error for ApiError {}
