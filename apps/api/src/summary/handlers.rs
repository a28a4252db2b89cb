//! Axum route handler for the summary endpoint.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::parser::UploadedFile;
use crate::state::AppState;
use crate::summary::generator::generate_summary;

const DEFAULT_FILE_NAME: &str = "resume.pdf";

/// Multipart form of `POST /generate_summary`.
#[derive(Debug)]
pub struct SummaryForm {
    pub resume: UploadedFile,
    pub job_description: String,
}

impl SummaryForm {
    /// Reads `resume` and `job_description`; other fields are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut resume = None;
        let mut job_description = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Malformed multipart body", e))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("resume") => {
                    let file_name = field
                        .file_name()
                        .filter(|name| !name.is_empty())
                        .unwrap_or(DEFAULT_FILE_NAME)
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error("Failed to read resume", e))?;
                    resume = Some(UploadedFile { file_name, bytes });
                }
                Some("job_description") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| multipart_error("Failed to read job_description", e))?;
                    job_description = Some(text);
                }
                _ => {}
            }
        }

        Ok(Self {
            resume: resume
                .ok_or_else(|| AppError::UnprocessableEntity("Field required: resume".to_string()))?,
            job_description: job_description.ok_or_else(|| {
                AppError::UnprocessableEntity("Field required: job_description".to_string())
            })?,
        })
    }
}

/// Body-limit failures surface as 413; anything else is a malformed request.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Upload exceeds the size limit: {}", e.body_text()))
    } else {
        AppError::UnprocessableEntity(format!("{context}: {e}"))
    }
}

/// POST /generate_summary
///
/// Multipart upload of a resume PDF plus a job description. Returns the
/// model's summary/experience/skills object, pretty-printed.
pub async fn handle_generate_summary(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("generate_summary", %request_id);

    async move {
        let form = SummaryForm::from_multipart(multipart).await?;
        let body = generate_summary(
            state.parser.clone(),
            state.llm.as_ref(),
            form.resume,
            &form.job_description,
        )
        .await?;

        Ok::<_, AppError>(([(header::CONTENT_TYPE, "application/json")], body))
    }
    .instrument(span)
    .await
}
