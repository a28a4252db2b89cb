//! Summary generator — the full pipeline behind `POST /generate_summary`.
//!
//! extract → prompt → complete → parse → pretty-print. Each stage maps its
//! failure onto a distinct `AppError` variant.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::llm_client::fences::extract_fenced_block;
use crate::llm_client::CompletionClient;
use crate::parser::{join_documents, load_files, DocumentParser, UploadedFile};
use crate::summary::prompts::build_summary_prompt;

pub const NO_TEXT_FOUND: &str = "No text found in the PDF";

/// Keys the prompt asks the model for. Not enforced.
const EXPECTED_KEYS: [&str; 3] = ["summary", "experience", "skills"];

/// Runs the pipeline and returns the response body: the model's JSON object
/// pretty-printed with 4-space indentation.
pub async fn generate_summary(
    parser: Arc<dyn DocumentParser>,
    llm: &dyn CompletionClient,
    resume: UploadedFile,
    job_description: &str,
) -> Result<String, AppError> {
    let resume_markdown = extract_resume(parser, resume).await?;

    let prompt = build_summary_prompt(&resume_markdown, job_description);
    let preview: String = prompt.chars().take(100).collect();
    info!("Sending prompt to completion service: {preview}...");

    let reply = llm
        .complete(&prompt)
        .await
        .map_err(|e| AppError::Completion(e.to_string()))?;
    info!("Response received from completion service");

    let summary = parse_reply(&reply)?;
    to_pretty_json(&summary)
}

async fn extract_resume(
    parser: Arc<dyn DocumentParser>,
    resume: UploadedFile,
) -> Result<String, AppError> {
    info!(
        "Resume file received ({}, {} bytes), starting PDF parsing",
        resume.file_name,
        resume.bytes.len()
    );

    let documents = load_files(parser, vec![resume])
        .await
        .map_err(|e| AppError::Extraction(e.to_string()))?;

    if documents.is_empty() {
        error!("Failed to extract text from the PDF");
        return Err(AppError::Validation(NO_TEXT_FOUND.to_string()));
    }

    info!(
        "Text successfully extracted from the resume ({} document(s))",
        documents.len()
    );
    Ok(join_documents(&documents))
}

/// Recovers the JSON object from the first ```json fenced block of a reply.
pub fn parse_reply(reply: &str) -> Result<Value, AppError> {
    let block = extract_fenced_block(reply.trim(), "json").ok_or_else(|| {
        AppError::ReplyFormat("model reply did not contain a ```json fenced block".to_string())
    })?;

    let value: Value = serde_json::from_str(block)
        .map_err(|e| AppError::ReplyFormat(format!("invalid JSON in model reply: {e}")))?;

    let missing: Vec<&str> = EXPECTED_KEYS
        .into_iter()
        .filter(|key| value.get(key).is_none())
        .collect();
    if !missing.is_empty() {
        warn!("Model reply is missing expected keys: {}", missing.join(", "));
    }

    Ok(value)
}

/// Serializes with 4-space indentation, keeping the model's key order.
pub fn to_pretty_json(value: &Value) -> Result<String, AppError> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("Failed to serialize summary")?;
    Ok(String::from_utf8(buf).context("Serialized summary was not UTF-8")?)
}
