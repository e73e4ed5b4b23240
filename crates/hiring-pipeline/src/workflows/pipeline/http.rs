//! reqwest adapter for the recruiting backend's REST API.
//!
//! Every operation is one request. Non-2xx responses become [`BackendError::Rejected`]
//! carrying whatever human-readable message the body offers; nothing else about the error
//! body is assumed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{BackendError, PipelineBackend, StatusUpdate};
use super::domain::{Application, ApplicationId, JobSummary};

/// Connection settings for the backend of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct HttpPipelineBackend {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl std::fmt::Debug for HttpPipelineBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPipelineBackend")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.api_token.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApplicationList {
    Bare(Vec<Application>),
    Wrapped { applications: Vec<Application> },
    Data { data: Vec<Application> },
}

impl ApplicationList {
    fn into_inner(self) -> Vec<Application> {
        match self {
            ApplicationList::Bare(items)
            | ApplicationList::Wrapped {
                applications: items,
            }
            | ApplicationList::Data { data: items } => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobList {
    Bare(Vec<JobSummary>),
    Wrapped { jobs: Vec<JobSummary> },
    Data { data: Vec<JobSummary> },
}

impl JobList {
    fn into_inner(self) -> Vec<JobSummary> {
        match self {
            JobList::Bare(items) | JobList::Wrapped { jobs: items } | JobList::Data { data: items } => {
                items
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApplicationEnvelope {
    Wrapped { application: Application },
    Data { data: Application },
    Bare(Application),
}

impl ApplicationEnvelope {
    fn into_inner(self) -> Application {
        match self {
            ApplicationEnvelope::Wrapped { application }
            | ApplicationEnvelope::Data { data: application }
            | ApplicationEnvelope::Bare(application) => application,
        }
    }
}

#[derive(Serialize)]
struct NotesBody<'a> {
    employer_notes: &'a str,
}

#[derive(Serialize)]
struct NotifyBody<'a> {
    message: &'a str,
}

impl HttpPipelineBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        // A trailing slash keeps `join` from replacing the last path segment.
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|error| BackendError::Transport(format!("invalid base url: {error}")))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone().filter(|token| !token.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|error| BackendError::Transport(format!("invalid endpoint '{path}': {error}")))
    }

    fn application_endpoint(&self, id: &ApplicationId, action: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint("applications")?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Transport("base url cannot carry a path".to_string()))?
            .push(id.as_str())
            .push(action);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        debug!(status = status.as_u16(), ?message, "backend rejected request");
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|error| BackendError::Decode(error.to_string()))
    }

    /// Successful writes may or may not echo the record back.
    async fn optional_record(response: Response) -> Result<Option<Application>, BackendError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice::<ApplicationEnvelope>(&bytes) {
            Ok(envelope) => Ok(Some(envelope.into_inner())),
            Err(error) => {
                warn!(%error, "write acknowledged without a decodable application record");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl PipelineBackend for HttpPipelineBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        let url = self.endpoint("applications")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let list: ApplicationList = Self::decode(response).await?;
        Ok(list.into_inner())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Option<Application>, BackendError> {
        let url = self.application_endpoint(id, "status")?;
        let response = self
            .send(self.request(Method::PATCH, url).json(&update))
            .await?;
        Self::optional_record(response).await
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, BackendError> {
        let url = self.endpoint("jobs")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let list: JobList = Self::decode(response).await?;
        Ok(list.into_inner())
    }

    async fn update_notes(
        &self,
        id: &ApplicationId,
        notes: &str,
    ) -> Result<Option<Application>, BackendError> {
        let url = self.application_endpoint(id, "notes")?;
        let body = NotesBody {
            employer_notes: notes,
        };
        let response = self
            .send(self.request(Method::PATCH, url).json(&body))
            .await?;
        Self::optional_record(response).await
    }

    async fn notify_candidate(
        &self,
        id: &ApplicationId,
        message: &str,
    ) -> Result<(), BackendError> {
        let url = self.application_endpoint(id, "notify")?;
        self.send(self.request(Method::POST, url).json(&NotifyBody { message }))
            .await
            .map(|_| ())
    }
}

/// Pulls a human-readable message out of an error body, if it has one.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return None,
    };

    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .or_else(|| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
