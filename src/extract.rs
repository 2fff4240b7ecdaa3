//! Description mining - regex helpers over task descriptions
//!
//! The planner and executor both fall back to these when the LLM omits
//! explicit arguments. Every extractor has a documented fallback chain and
//! returns `None` rather than guessing wildly; callers decide the final
//! default.

use regex::Regex;

/// Tool keywords recognized during inference, in match order
const TOOL_KEYWORDS: &[(&str, &str)] = &[
    (r"\b(?:file|create|write)\b", "file"),
    (r"\b(?:run|execute)\b", "bash"),
    (r"\b(?:edit|modify)\b", "edit"),
    (r"\b(?:search|grep|find)\b", "grep"),
    (r"\b(?:web|fetch|price)\b", "web"),
    (r"\b(?:git|commit)\b", "git"),
];

/// Markers that a description spans multiple steps
const MULTI_STEP_MARKERS: &[&str] = &[
    "then", "after", "next", "finally", "and then", "first", "second", "third", "lastly",
];

/// Infer the minimal tool set a description implies
///
/// Keyword table: file/create/write → file, run/execute → bash,
/// edit/modify → edit, search/grep/find → grep, web/fetch/price → web,
/// git/commit → git. Duplicates are removed, match order is preserved.
pub fn infer_tools(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    let mut tools = Vec::new();
    for (pattern, tool) in TOOL_KEYWORDS {
        let re = Regex::new(pattern).expect("static tool keyword pattern");
        if re.is_match(&lower) && !tools.iter().any(|t| t == tool) {
            tools.push((*tool).to_string());
        }
    }
    tools
}

/// Whether a description contains any tool keyword
pub fn has_tool_keywords(description: &str) -> bool {
    !infer_tools(description).is_empty()
}

/// Whether a description contains a multi-step marker
pub fn has_multi_step_markers(description: &str) -> bool {
    let lower = description.to_lowercase();
    MULTI_STEP_MARKERS.iter().any(|marker| {
        Regex::new(&format!(r"\b{}\b", regex::escape(marker)))
            .expect("static marker pattern")
            .is_match(&lower)
    })
}

/// Whether a description refers anaphorically to earlier work
/// ("it", "result", "output", "back", "the file", "that file")
pub fn has_anaphoric_reference(description: &str) -> bool {
    let lower = description.to_lowercase();
    Regex::new(r"\b(?:it|result|output|back)\b|the file|that file")
        .expect("static anaphora pattern")
        .is_match(&lower)
}

/// Word count of a description
pub fn word_count(description: &str) -> usize {
    description.split_whitespace().count()
}

/// First quoted string (single, double, or backtick), without the quotes
pub fn extract_quoted(description: &str) -> Option<String> {
    let re = Regex::new(r#""([^"]+)"|'([^']+)'|`([^`]+)`"#).expect("static quote pattern");
    let captures = re.captures(description)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))
        .map(|m| m.as_str().to_string())
}

/// Extract a shell command from a description
///
/// Precedence: backtick-quoted fragment → text after "run"/"execute"
/// (dropping a leading "the command"). Returns `None` when neither matches.
pub fn extract_command(description: &str) -> Option<String> {
    let backtick = Regex::new(r"`([^`]+)`").expect("static backtick pattern");
    if let Some(captures) = backtick.captures(description) {
        return Some(captures[1].trim().to_string());
    }

    let phrase = Regex::new(r"(?i)\b(?:run|execute)\s+(?:the\s+command\s+)?(.+)$").expect("static command pattern");
    phrase.captures(description).map(|captures| {
        captures[1]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim_end_matches('.')
            .to_string()
    })
}

/// Extract a file path from a description
///
/// Precedence: structured path (directories plus extension) → quoted
/// filename → "create/write/make <path>" phrase → any extension-bearing
/// token. Returns `None` when nothing looks like a path; callers fall back
/// to `file.txt`.
pub fn extract_file_path(description: &str) -> Option<String> {
    let structured = Regex::new(r"\b[\w.-]+(?:/[\w.-]+)+\.[A-Za-z0-9]{1,6}\b").expect("static path pattern");
    if let Some(m) = structured.find(description) {
        return Some(m.as_str().to_string());
    }

    if let Some(quoted) = extract_quoted(description)
        && looks_like_filename(&quoted)
    {
        return Some(quoted);
    }

    let phrase = Regex::new(
        r"(?i)\b(?:create|write|make)\s+(?:a\s+)?(?:file\s+)?(?:called\s+|named\s+)?([\w./-]+\.[A-Za-z0-9]{1,6})\b",
    )
    .expect("static create pattern");
    if let Some(captures) = phrase.captures(description) {
        return Some(captures[1].to_string());
    }

    let extension = Regex::new(r"\b([\w-]+\.[A-Za-z0-9]{1,6})\b").expect("static extension pattern");
    extension.find(description).map(|m| m.as_str().to_string())
}

/// Extract a search pattern for grep-style tools
///
/// Fallback chain: first quoted string → first word of at least 3 chars
/// that is not a stopword → match-everything.
pub fn extract_search_pattern(description: &str) -> String {
    if let Some(quoted) = extract_quoted(description) {
        return quoted;
    }

    const STOPWORDS: &[&str] = &[
        "search", "grep", "find", "for", "the", "all", "files", "file", "with", "containing", "matches", "pattern", "and",
    ];
    description
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|word| word.len() >= 3 && !STOPWORDS.contains(&word.to_lowercase().as_str()))
        .map(String::from)
        .unwrap_or_else(|| ".*".to_string())
}

/// Extract a web query: quoted string, else the description minus
/// leading verbs
pub fn extract_web_query(description: &str) -> String {
    if let Some(quoted) = extract_quoted(description) {
        return quoted;
    }
    let re = Regex::new(r"(?i)^\s*(?:search|fetch|look\s+up|web\s+search)\s+(?:for\s+|the\s+)?").expect("static web pattern");
    re.replace(description, "").trim().to_string()
}

fn looks_like_filename(s: &str) -> bool {
    Regex::new(r"^[\w./-]+\.[A-Za-z0-9]{1,6}$").expect("static filename pattern").is_match(s)
}
