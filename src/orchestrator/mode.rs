//! Prompt classification - pacing mode and information-query detection
//!
//! Independent from the planner's complexity heuristic on purpose: mode
//! influences pacing and memory retrieval depth, complexity only logging.
//! The two may disagree.

use regex::Regex;

use crate::domain::Mode;
use crate::extract;

/// Keywords that ask for depth
const DEEP_KEYWORDS: &[&str] = &[
    "thorough",
    "thoroughly",
    "deep",
    "detailed",
    "comprehensive",
    "in depth",
    "analyze",
    "analysis",
];

/// Detect the pacing mode from word count and keyword set
pub fn detect_mode(prompt: &str) -> Mode {
    let lower = prompt.to_lowercase();
    if DEEP_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return Mode::Deep;
    }
    if extract::word_count(prompt) <= 12 { Mode::Direct } else { Mode::Concise }
}

/// Whether a prompt is an information query rather than a request for work
///
/// Interrogative opener, a trailing question mark, or an ask-me phrase.
pub fn is_information_query(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    if trimmed.ends_with('?') {
        return true;
    }

    let lower = trimmed.to_lowercase();
    let opener = Regex::new(r"^(?:what|how|why|when|where|who)\b").expect("static interrogative pattern");
    if opener.is_match(&lower) {
        return true;
    }

    ["tell me", "explain", "describe", "show me"].iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode_direct() {
        assert_eq!(detect_mode("What is 2 + 2?"), Mode::Direct);
        assert_eq!(detect_mode("Create notes.txt"), Mode::Direct);
    }

    #[test]
    fn test_detect_mode_concise() {
        assert_eq!(
            detect_mode("Create a configuration file for the web server and fill in sensible default values please"),
            Mode::Concise
        );
    }

    #[test]
    fn test_detect_mode_deep() {
        assert_eq!(detect_mode("Give me a thorough analysis of the error logs"), Mode::Deep);
        assert_eq!(detect_mode("Do a deep dive"), Mode::Deep);
    }

    #[test]
    fn test_information_query_interrogatives() {
        assert!(is_information_query("What is the capital of France"));
        assert!(is_information_query("how does the retry logic work"));
        assert!(is_information_query("Is this thing on?"));
    }

    #[test]
    fn test_information_query_phrases() {
        assert!(is_information_query("Tell me about the deployment"));
        assert!(is_information_query("Please explain the approval gate"));
        assert!(is_information_query("show me the config"));
    }

    #[test]
    fn test_not_information_query() {
        assert!(!is_information_query("Create a file called notes.txt"));
        assert!(!is_information_query("Run the test suite"));
        // "whoami" must not trip the "who" opener
        assert!(!is_information_query("whoami should be run first"));
    }
}
