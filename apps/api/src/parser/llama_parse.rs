//! LlamaParse cloud client: upload, poll the job, fetch the result.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use super::{Document, DocumentParser, ParseError, ParserSettings, UploadedFile};

/// Separator LlamaParse puts between pages in a markdown result.
pub const PAGE_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    markdown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    detail: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JobStatus {
    Pending,
    Success,
    Failed(String),
}

impl JobStatus {
    fn from_api(status: &str) -> Self {
        match status {
            "SUCCESS" | "PARTIAL_SUCCESS" => JobStatus::Success,
            "ERROR" | "CANCELED" | "CANCELLED" => JobStatus::Failed(status.to_string()),
            _ => JobStatus::Pending,
        }
    }
}

#[derive(Clone)]
pub struct LlamaParseClient {
    client: Client,
    api_key: String,
    base_url: String,
    settings: ParserSettings,
    poll_interval: Duration,
    max_wait: Duration,
}

impl LlamaParseClient {
    pub fn new(
        api_key: String,
        base_url: String,
        settings: ParserSettings,
        request_timeout: Duration,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            client: Client::builder().timeout(request_timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            poll_interval,
            max_wait,
        })
    }

    async fn upload(&self, file: &UploadedFile) -> Result<String, ParseError> {
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("language", self.settings.language.clone());

        let response = self
            .client
            .post(format!("{}/api/parsing/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let job: JobResponse = check_status(response).await?.json().await?;
        Ok(job.id)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<(), ParseError> {
        let started = Instant::now();
        loop {
            let response = self
                .client
                .get(format!("{}/api/parsing/job/{job_id}", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let job: JobResponse = check_status(response).await?.json().await?;
            let status = job.status.unwrap_or_default();

            match JobStatus::from_api(&status) {
                JobStatus::Success => return Ok(()),
                JobStatus::Failed(status) => {
                    return Err(ParseError::JobFailed {
                        job_id: job_id.to_string(),
                        status,
                    })
                }
                JobStatus::Pending => {}
            }

            if started.elapsed() >= self.max_wait {
                return Err(ParseError::Timeout {
                    job_id: job_id.to_string(),
                    secs: self.max_wait.as_secs(),
                });
            }

            if self.settings.verbose {
                info!("Parsing job {job_id} is {status}, checking again shortly");
            } else {
                debug!("Parsing job {job_id} is {status}");
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<String, ParseError> {
        let result_type = self.settings.result_type.as_str();
        let response = self
            .client
            .get(format!(
                "{}/api/parsing/job/{job_id}/result/{result_type}",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let result: ResultResponse = check_status(response).await?.json().await?;
        Ok(result.markdown.unwrap_or_default())
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    async fn load_data(&self, file: UploadedFile) -> Result<Vec<Document>, ParseError> {
        let job_id = self.upload(&file).await?;
        if self.settings.verbose {
            info!("Started parsing {} as job {job_id}", file.file_name);
        }

        self.wait_for_job(&job_id).await?;
        let content = self.fetch_result(&job_id).await?;

        Ok(split_pages(&content, &file.file_name))
    }
}

/// Splits a parse result into one document per non-blank page.
fn split_pages(content: &str, file_name: &str) -> Vec<Document> {
    content
        .split(PAGE_SEPARATOR)
        .filter(|page| !page.trim().is_empty())
        .map(|page| Document {
            text: page.to_string(),
            file_name: file_name.to_string(),
        })
        .collect()
}

async fn check_status(response: Response) -> Result<Response, ParseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| match e.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(body);
    Err(ParseError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_one_document_per_page() {
        let content = "# John Doe\nBackend engineer\n---\n## Experience\n- Acme";
        let docs = split_pages(content, "cv.pdf");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "# John Doe\nBackend engineer");
        assert_eq!(docs[1].text, "## Experience\n- Acme");
        assert!(docs.iter().all(|d| d.file_name == "cv.pdf"));
    }

    #[test]
    fn test_split_pages_drops_blank_pages() {
        let docs = split_pages("page one\n---\n   \n---\npage three", "cv.pdf");
        let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["page one", "page three"]);
    }

    #[test]
    fn test_split_pages_empty_result_has_no_documents() {
        assert!(split_pages("", "cv.pdf").is_empty());
        assert!(split_pages("\n\n", "cv.pdf").is_empty());
    }

    #[test]
    fn test_job_status_mapping() {
        assert_eq!(JobStatus::from_api("SUCCESS"), JobStatus::Success);
        assert_eq!(JobStatus::from_api("PARTIAL_SUCCESS"), JobStatus::Success);
        assert_eq!(JobStatus::from_api("PENDING"), JobStatus::Pending);
        assert_eq!(JobStatus::from_api(""), JobStatus::Pending);
        assert_eq!(
            JobStatus::from_api("ERROR"),
            JobStatus::Failed("ERROR".to_string())
        );
    }

    #[test]
    fn test_result_response_reads_markdown() {
        let result: ResultResponse =
            serde_json::from_str(r##"{"markdown": "# CV", "job_metadata": {}}"##).unwrap();
        assert_eq!(result.markdown.as_deref(), Some("# CV"));

        let result: ResultResponse = serde_json::from_str(r#"{"job_metadata": {}}"#).unwrap();
        assert!(result.markdown.is_none());
    }

    #[test]
    fn test_job_response_deserializes_upload_reply() {
        let job: JobResponse =
            serde_json::from_str(r#"{"id": "c0ffee", "status": "PENDING"}"#).unwrap();
        assert_eq!(job.id, "c0ffee");
        assert_eq!(job.status.as_deref(), Some("PENDING"));
    }

    mod against_mock_server {
        use super::super::*;
        use bytes::Bytes;
        use serde_json::json;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const JOB_ID: &str = "job-123";

        fn client(server: &MockServer, max_wait: Duration) -> LlamaParseClient {
            LlamaParseClient::new(
                "llx-test".to_string(),
                server.uri(),
                ParserSettings::default(),
                Duration::from_secs(5),
                Duration::from_millis(10),
                max_wait,
            )
            .unwrap()
        }

        fn resume() -> UploadedFile {
            UploadedFile {
                file_name: "john_doe.pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF-1.4 fake"),
            }
        }

        async fn mount_upload(server: &MockServer) {
            Mock::given(method("POST"))
                .and(path("/api/parsing/upload"))
                .and(header("authorization", "Bearer llx-test"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"id": JOB_ID, "status": "PENDING"})),
                )
                .mount(server)
                .await;
        }

        async fn mount_status(server: &MockServer, status: &str) {
            Mock::given(method("GET"))
                .and(path(format!("/api/parsing/job/{JOB_ID}")))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"id": JOB_ID, "status": status})),
                )
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_upload_poll_fetch_returns_pages() {
            let server = MockServer::start().await;
            mount_upload(&server).await;
            mount_status(&server, "SUCCESS").await;
            Mock::given(method("GET"))
                .and(path(format!("/api/parsing/job/{JOB_ID}/result/markdown")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "markdown": "# John Doe\nBackend engineer\n---\n## Experience\n- Acme"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let docs = client(&server, Duration::from_secs(5))
                .load_data(resume())
                .await
                .unwrap();

            let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
            assert_eq!(texts, vec!["# John Doe\nBackend engineer", "## Experience\n- Acme"]);
            assert!(docs.iter().all(|d| d.file_name == "john_doe.pdf"));
        }

        #[tokio::test]
        async fn test_error_status_is_job_failed() {
            let server = MockServer::start().await;
            mount_upload(&server).await;
            mount_status(&server, "ERROR").await;

            let err = client(&server, Duration::from_secs(5))
                .load_data(resume())
                .await
                .unwrap_err();

            assert!(
                matches!(err, ParseError::JobFailed { ref job_id, ref status } if job_id == JOB_ID && status == "ERROR")
            );
        }

        #[tokio::test]
        async fn test_pending_job_times_out() {
            let server = MockServer::start().await;
            mount_upload(&server).await;
            mount_status(&server, "PENDING").await;

            let err = client(&server, Duration::from_millis(50))
                .load_data(resume())
                .await
                .unwrap_err();

            assert!(matches!(err, ParseError::Timeout { ref job_id, .. } if job_id == JOB_ID));
        }

        #[tokio::test]
        async fn test_rejected_upload_reads_detail() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/parsing/upload"))
                .respond_with(
                    ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid API Key"})),
                )
                .mount(&server)
                .await;

            let err = client(&server, Duration::from_secs(5))
                .load_data(resume())
                .await
                .unwrap_err();

            match err {
                ParseError::Api { status, message } => {
                    assert_eq!(status, 401);
                    assert_eq!(message, "Invalid API Key");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }
    }
}
