//! Removal of markdown code fences around model output.

/// Strip an outer ```` ``` ```` fence and an optional `json` language tag.
///
/// Text without a leading fence is only trimmed. The fence content itself is
/// never touched, so the word "json" inside string values survives.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = rest.trim_start_matches('`');
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };

    rest.trim_end().trim_end_matches('`').trim()
}
