use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::models::integration::Credentials;

pub const AUTHORIZE_PATH: &str = "/integrations/hubspot/authorize";
pub const CREDENTIALS_PATH: &str = "/integrations/hubspot/credentials";
pub const LOAD_PATH: &str = "/integrations/hubspot/load";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid authorization URL: {0:?}")]
    InvalidAuthorizationUrl(String),
    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Backend URL must be http(s) with a host: {0:?}")]
    UnsupportedBaseUrl(String),
}

impl ApiError {
    /// The server's `detail` message, when the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user: the server detail verbatim, else `fallback`.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.detail().unwrap_or(fallback)
    }
}

/// The three calls the widget makes against the integrations backend.
#[async_trait(?Send)]
pub trait IntegrationBackend {
    /// Returns the URL the popup should be pointed at.
    async fn authorize(&self, user_id: &str, org_id: &str) -> Result<String, ApiError>;

    /// Returns `Ok(None)` when the backend answered with an empty or falsy body.
    async fn credentials(&self, user_id: &str, org_id: &str)
        -> Result<Option<Credentials>, ApiError>;

    async fn load(&self, credentials: &Credentials) -> Result<Value, ApiError>;
}

/// HTTP client for the integrations backend. All calls are form-encoded POSTs.
#[derive(Clone, Debug)]
pub struct HubspotApi {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct SessionForm<'a> {
    user_id: &'a str,
    org_id: &'a str,
}

#[derive(Serialize)]
struct LoadForm {
    credentials: String,
}

impl HubspotApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !is_http_base(&Url::parse(&base_url)?) {
            return Err(ApiError::UnsupportedBaseUrl(base_url));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Posts `form` and returns the raw body of a 2xx response.
    async fn post_form<F: Serialize + ?Sized>(&self, path: &str, form: &F) -> Result<String, ApiError> {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);

        let response = self.client.post(&url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = extract_detail(&body);
            tracing::warn!("POST {} returned {}: {:?}", path, status, detail);
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(body)
    }
}

#[async_trait(?Send)]
impl IntegrationBackend for HubspotApi {
    async fn authorize(&self, user_id: &str, org_id: &str) -> Result<String, ApiError> {
        let body = self
            .post_form(AUTHORIZE_PATH, &SessionForm { user_id, org_id })
            .await?;
        parse_authorization_url(&body)
    }

    async fn credentials(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<Credentials>, ApiError> {
        let body = self
            .post_form(CREDENTIALS_PATH, &SessionForm { user_id, org_id })
            .await?;
        parse_credentials(&body)
    }

    async fn load(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        let form = LoadForm {
            credentials: credentials.to_json_string()?,
        };
        let body = self.post_form(LOAD_PATH, &form).await?;
        parse_load_body(&body)
    }
}

/// True for `http`/`https` URLs that name a host. `localhost:8000` parses as
/// scheme `localhost` and fails here.
pub fn is_http_base(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host()
}

/// Pulls a string `detail` out of an error body like `{"detail": "..."}`.
pub fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(String::from)
}

/// The authorize endpoint answers with a JSON string; a bare text body is
/// accepted as well.
pub fn parse_authorization_url(body: &str) -> Result<String, ApiError> {
    let trimmed = body.trim();
    let candidate = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(url)) => url,
        Ok(_) => return Err(ApiError::InvalidAuthorizationUrl(trimmed.to_string())),
        Err(_) => trimmed.to_string(),
    };

    if candidate.is_empty() || Url::parse(&candidate).is_err() {
        return Err(ApiError::InvalidAuthorizationUrl(candidate));
    }
    Ok(candidate)
}

pub fn parse_credentials(body: &str) -> Result<Option<Credentials>, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(trimmed)?;
    Ok(Credentials::from_value(value))
}

/// An empty load body is shown as an empty JSON string, not `null`.
pub fn parse_load_body(body: &str) -> Result<Value, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Value::String(String::new()));
    }
    Ok(serde_json::from_str(trimmed)?)
}
