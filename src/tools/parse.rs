use serde_json::Value;

use crate::collaborators::DataSource;
use crate::step::StepError;

/// Drop a surrounding Markdown code fence, if any.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    lines.join("\n")
}

/// Find the JSON object in a model response, tolerating fences and chatter
/// around it.
pub fn extract_json(response: &str) -> Result<Value, StepError> {
    let text = strip_code_fences(response);
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(serde_json::from_str(&text[start..=end])?),
        _ => Err(StepError::invalid(format!("no JSON object in response: {text}"))),
    }
}

fn yes_no(word: &str) -> Option<bool> {
    match word.trim().trim_matches(|c: char| c == '"' || c == '.').to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// Read a grader verdict. Accepts `{"binary_score": true}`,
/// `{"binary_score": "yes"}`, or a bare yes/no.
pub fn binary_score(response: &str) -> Result<bool, StepError> {
    if let Some(verdict) = yes_no(&strip_code_fences(response)) {
        return Ok(verdict);
    }
    let value = extract_json(response)?;
    match value.get("binary_score") {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => {
            yes_no(s).ok_or_else(|| StepError::invalid(format!("unrecognised binary_score: {s}")))
        }
        _ => Err(StepError::invalid(format!("missing binary_score in {value}"))),
    }
}

/// Read a router verdict: `{"datasource": "vectorstore" | "websearch"}`.
pub fn datasource(response: &str) -> Result<DataSource, StepError> {
    let value = extract_json(response)?;
    let source = value
        .get("datasource")
        .cloned()
        .ok_or_else(|| StepError::invalid(format!("missing datasource in {value}")))?;
    Ok(serde_json::from_value(source)?)
}
