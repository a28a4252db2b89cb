//! Markdown code-fence helpers for model output.

const FENCE: &str = "```";

/// Returns the trimmed body of the first fenced block opened with
/// `` ```{tag} ``, or `None` when no such opening fence exists.
///
/// The body ends at the next `` ``` ``. An unclosed fence runs to the end of
/// the text.
pub fn extract_fenced_block<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let opening = format!("{FENCE}{tag}");
    let start = text.find(&opening)? + opening.len();
    let rest = &text[start..];
    let body = match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(body.trim())
}
