//! Fixed user-facing strings: greeting, phase labels, error texts, and the
//! tips rotated while a deck is being generated.

pub const INITIAL_GREETING: &str =
    "What kind of deck would you like to build? I can summarize a URL too!";

pub const THINKING: &str = "Thinking...";

pub const ERROR_GENERIC: &str = "Something went wrong. Please try again.";
pub const ERROR_MODEL_NOT_AVAILABLE: &str = "That model doesn't seem to be available yet. \
Restart the chat to pick a different model and keep going.";

/// Substring the backend puts in errors for a model that isn't provisioned.
pub const MODEL_NOT_AVAILABLE_MARKER: &str = "model identifier is invalid";

// Phase labels. Active labels share a prefix with their parameterized
// variants; completed labels deliberately do not, so prefix checks only
// ever match in-progress entries.
pub const SLIDE_GENERATING: &str = "Generating slides...";
pub const SLIDE_GENERATING_PREFIX: &str = "Generating slides...";
pub const SLIDE_COMPLETED: &str = "Slides ready";

pub const WEB_SEARCH_PREFIX: &str = "Searching the web...";
pub const WEB_SEARCH_COMPLETED: &str = "Web search complete";

pub const TWEET_GENERATING: &str = "Drafting a tweet...";
pub const TWEET_COMPLETED: &str = "Tweet draft ready";

/// Prompt auto-submitted by the share flow.
pub const SHARE_PROMPT: &str =
    "Please suggest a URL for sharing this session on X (start using the tool silently).";

/// Shown one at a time under the generation status entry.
pub const TIPS: &[&str] = &[
    "deckchat talks to the agent over plain server-sent events, so every word streams in live.",
    "Your deck is just markdown. Export it to PDF or PPTX whenever you like.",
    "The agent can search the web while drafting, watch for the search status above.",
    "Repeated requests in one session reach the same backend worker, so the agent remembers the deck.",
    "Asking for fewer bullets per slide usually makes a cleaner deck.",
    "You can ask for edits after the first draft: change the tone, trim slides, fix overflow.",
    "The Kimi model is the cheapest way to draft a long deck.",
    "Press Ctrl+T after exporting to get a ready-made post for sharing your deck.",
];

/// Search status label, optionally parameterized with the query.
pub fn web_search_status(query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{WEB_SEARCH_PREFIX} \"{q}\""),
        _ => WEB_SEARCH_PREFIX.to_string(),
    }
}

/// Prose entry appended when the agent returns a tweet URL.
pub fn share_message(url: &str) -> String {
    format!("Thanks for downloading! Want to share the result on X? 👉 {url}")
}

/// Picks the fixed error message for a failed turn.
pub fn error_display_message(error: &str) -> &'static str {
    if error.contains(MODEL_NOT_AVAILABLE_MARKER) {
        ERROR_MODEL_NOT_AVAILABLE
    } else {
        ERROR_GENERIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_status_includes_query() {
        assert_eq!(
            web_search_status(Some("AWS")),
            "Searching the web... \"AWS\""
        );
        assert_eq!(web_search_status(None), WEB_SEARCH_PREFIX);
        assert_eq!(web_search_status(Some("")), WEB_SEARCH_PREFIX);
    }

    #[test]
    fn completed_labels_do_not_match_active_prefixes() {
        assert!(!WEB_SEARCH_COMPLETED.starts_with(WEB_SEARCH_PREFIX));
        assert!(!SLIDE_COMPLETED.starts_with(SLIDE_GENERATING_PREFIX));
    }

    #[test]
    fn model_unavailable_selected_by_substring() {
        assert_eq!(
            error_display_message("The provided model identifier is invalid."),
            ERROR_MODEL_NOT_AVAILABLE
        );
        assert_eq!(error_display_message("API error: 500"), ERROR_GENERIC);
    }
}
