//! Pulling structured payloads out of free-text completions

/// Returns the JSON payload of a reply, unwrapping a fenced block if present
pub fn extract_json_from_markdown(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start_idx) = trimmed.find("```json") {
        let after_fence = &trimmed[start_idx + 7..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    if let Some(start_idx) = trimmed.find("```") {
        let after_fence = &trimmed[start_idx + 3..];
        if let Some(end_idx) = after_fence.find("```") {
            return after_fence[..end_idx].trim();
        }
    }

    trimmed
}

/// Extracts the body that follows a `---NAME---` marker.
///
/// The body runs until the next line starting with `---` or the end of the
/// text. Returns `None` when the marker is absent or the body is blank.
pub fn extract_section(content: &str, name: &str) -> Option<String> {
    let marker = format!("---{}---", name);
    let start = content.find(&marker)? + marker.len();
    let rest = &content[start..];

    let mut body = Vec::new();
    for (i, line) in rest.split('\n').enumerate() {
        // the remainder of the marker line itself is skipped
        if i == 0 {
            continue;
        }
        if line.trim_start().starts_with("---") {
            break;
        }
        body.push(line);
    }

    let text = body.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extracts the first fenced block tagged `language`.
///
/// When `context` is given the search starts at its first mention, so two
/// `yaml` blocks can be told apart by the prose introducing them.
pub fn extract_code_block(content: &str, language: &str, context: Option<&str>) -> Option<String> {
    let lowered = content.to_ascii_lowercase();
    let marker = format!("```{}", language.to_ascii_lowercase());

    let mut start = match context {
        Some(ctx) => {
            let ctx_idx = lowered.find(&ctx.to_ascii_lowercase())?;
            lowered[ctx_idx..].find(&marker).map(|i| i + ctx_idx)
        }
        None => lowered.find(&marker),
    }?;

    start += marker.len();
    // skip the rest of the fence line (e.g. "```yaml title=appspec")
    let body_start = content[start..]
        .find('\n')
        .map(|i| start + i + 1)
        .unwrap_or(content.len());

    let body = match content[body_start..].find("```") {
        Some(end) => &content[body_start..body_start + end],
        None => &content[body_start..],
    };

    let text = body.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
