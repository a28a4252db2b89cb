// Prompt template for the tailored summary.
// Inputs are interpolated verbatim; nothing is escaped.

/// Builds the single user message sent to the completion service.
pub fn build_summary_prompt(resume_markdown: &str, job_description: &str) -> String {
    format!(
        r#"
    Given the resume content in markdown format:
    ```{resume_markdown}```
    and the job description: "{job_description}",
    provide the following in a JSON format:

    {{
        "summary": ["3 different executive summaries tailored to fit the job description"],
        "experience": ["outline relevant experiences tailored to the job description with kpis and good structure"],
        "skills": ["List the 10 most relevant skills for the job"]
    }}
    Make sure the summaries are concise and relevant to the job description.
    "#
    )
}
