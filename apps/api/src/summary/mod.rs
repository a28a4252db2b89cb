// Resume summary engine: multipart intake, document extraction,
// prompt construction, completion, and fenced-JSON recovery.
// All completion calls go through llm_client.

pub mod generator;
pub mod handlers;
pub mod prompts;
