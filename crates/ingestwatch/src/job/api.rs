//! Request/response calls to the ingestion server.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::decode::deserialize_job_id;
use crate::config::{ClientConfig, ServerConfig};
use crate::error::ApiError;

/// Files chosen for a job, as identified by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSelection {
    pub files: Vec<String>,
}

impl FileSelection {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Pipeline options sent with the start request. Unknown OCR or model
/// parameters are carried through in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingSettings {
    #[serde(default = "default_true")]
    pub ocr: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ocr_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_dpi: Option<u32>,
    #[serde(default = "default_true")]
    pub llm_refinement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default = "default_true")]
    pub embedding: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            ocr: true,
            ocr_languages: Vec::new(),
            ocr_dpi: None,
            llm_refinement: true,
            prompt: None,
            embedding: true,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    files: &'a [String],
    settings: &'a ProcessingSettings,
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    job_id: &'a str,
}

/// Server acknowledgement of a started job.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StartResponse {
    #[serde(alias = "jobId", deserialize_with = "deserialize_job_id")]
    pub job_id: String,
    #[serde(default, alias = "totalFiles")]
    pub total_files: usize,
}

/// The server endpoints the controller depends on.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Starts a job. A job already active on the server is `ApiError::Conflict`.
    async fn start(
        &self,
        selection: &FileSelection,
        settings: &ProcessingSettings,
    ) -> Result<StartResponse, ApiError>;

    /// Asks the server to stop `job_id`. The acknowledgement carries no state.
    async fn request_cancel(&self, job_id: &str) -> Result<(), ApiError>;

    /// Clears a stuck job on the server.
    async fn reset(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpIngestApi {
    client: Client,
    server: ServerConfig,
}

impl HttpIngestApi {
    pub fn new(client: Client, server: ServerConfig) -> Self {
        Self { client, server }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.http.connect_timeout())
            .timeout(config.http.request_timeout())
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self::new(client, config.server.clone()))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: Option<&T>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(ApiError::Conflict(body));
        }
        Err(ApiError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IngestApi for HttpIngestApi {
    async fn start(
        &self,
        selection: &FileSelection,
        settings: &ProcessingSettings,
    ) -> Result<StartResponse, ApiError> {
        let body = StartRequest {
            files: &selection.files,
            settings,
        };
        let response = self.post(&self.server.start_url(), Some(&body)).await?;
        let started: StartResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        log::info!(
            "Server accepted job {} ({} files)",
            started.job_id,
            started.total_files
        );
        Ok(started)
    }

    async fn request_cancel(&self, job_id: &str) -> Result<(), ApiError> {
        let body = CancelRequest { job_id };
        self.post(&self.server.cancel_url(), Some(&body)).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        self.post::<Value>(&self.server.reset_url(), None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults_enable_every_stage() {
        let settings: ProcessingSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.ocr && settings.llm_refinement && settings.embedding);
        assert_eq!(settings, ProcessingSettings::default());
    }

    #[test]
    fn test_settings_keep_unknown_parameters() {
        let settings: ProcessingSettings =
            serde_json::from_value(json!({"ocr_dpi": 300, "psm": 6, "model": "small"})).unwrap();
        assert_eq!(settings.ocr_dpi, Some(300));
        assert_eq!(settings.extra["psm"], json!(6));

        let round = serde_json::to_value(&settings).unwrap();
        assert_eq!(round["model"], "small");
        assert!(round.get("prompt").is_none());
    }

    #[test]
    fn test_start_response_accepts_camel_case() {
        let response: StartResponse =
            serde_json::from_value(json!({"jobId": "abc", "totalFiles": 3})).unwrap();
        assert_eq!(response.job_id, "abc");
        assert_eq!(response.total_files, 3);
    }

    #[test]
    fn test_start_response_accepts_numeric_job_id() {
        let response: StartResponse =
            serde_json::from_value(json!({"jobId": 42, "totalFiles": 1})).unwrap();
        assert_eq!(response.job_id, "42");

        let response: StartResponse =
            serde_json::from_str(r#"{"job_id": 42, "total_files": 1}"#).unwrap();
        assert_eq!(response.job_id, "42");
        assert_eq!(response.total_files, 1);
    }

    #[test]
    fn test_start_response_rejects_object_job_id() {
        let result = serde_json::from_value::<StartResponse>(json!({"job_id": {"id": 1}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_selection() {
        let selection = FileSelection::new(["a.pdf", "b.pdf"]);
        assert_eq!(selection.files, vec!["a.pdf", "b.pdf"]);
        assert!(!selection.is_empty());
        assert!(FileSelection::default().is_empty());
    }
}
