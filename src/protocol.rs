use serde::{Deserialize, Serialize};

/// Literal line the agent sends to close a stream gracefully.
pub const DONE_MARKER: &str = "[DONE]";

// Tool names reported over the wire via `tool_use` events.
pub const TOOL_OUTPUT_SLIDE: &str = "output_slide";
pub const TOOL_WEB_SEARCH: &str = "web_search";
pub const TOOL_GENERATE_TWEET: &str = "generate_tweet_url";

/// One SSE frame from the agent, parsed from a `data: <json>` line.
///
/// The type field is open-ended: unknown values fall through the router's
/// text-or-error heuristic. The payload arrives redundantly under `content`
/// or `data` depending on which backend handler emitted it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl StreamEvent {
    pub fn typed(event_type: &str) -> Self {
        Self {
            event_type: Some(event_type.to_string()),
            ..Self::default()
        }
    }

    pub fn with_data(event_type: &str, data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::typed(event_type)
        }
    }

    /// The event payload: `content` wins over `data`, empty strings count
    /// as absent.
    pub fn value(&self) -> Option<&str> {
        non_empty(&self.content).or_else(|| non_empty(&self.data))
    }

    /// Error text precedence for `error`-typed events: `error`, then
    /// `message`, then the shared payload field.
    pub fn error_text(&self) -> Option<&str> {
        non_empty(&self.error)
            .or_else(|| non_empty(&self.message))
            .or_else(|| self.value())
    }
}

pub(crate) fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Request body for a conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub prompt: String,
    pub markdown: String,
    #[serde(default)]
    pub model_type: Option<String>,
}

/// Request body for a single-shot export or share action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub action: String,
    pub markdown: String,
    pub theme: String,
}

/// Either kind of request the agent endpoint accepts. Export bodies carry
/// an `action` field, conversational bodies a `prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentRequest {
    Export(ExportRequest),
    Invoke(InvokeRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModelType {
    #[default]
    Claude,
    Kimi,
    Claude5,
}

impl ModelType {
    pub fn wire_name(self) -> &'static str {
        match self {
            ModelType::Claude => "claude",
            ModelType::Kimi => "kimi",
            ModelType::Claude5 => "claude5",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelType::Claude => "Claude Sonnet 4.5",
            ModelType::Kimi => "Kimi K2 Thinking",
            ModelType::Claude5 => "Claude Sonnet 5",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            ModelType::Claude => ModelType::Kimi,
            ModelType::Kimi => ModelType::Claude5,
            ModelType::Claude5 => ModelType::Claude,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub fn action(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "export_pdf",
            ExportFormat::Pptx => "export_pptx",
        }
    }

    /// The `type` of the single artifact event carrying the result.
    pub fn event_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Pptx => "pptx",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Pptx => "pptx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Pptx => "PPTX",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Result of a `share_slide` action: a public URL and its expiry (unix
/// seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareResult {
    pub url: String,
    pub expires_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_prefers_content_over_data() {
        let event = StreamEvent {
            content: Some("from content".to_string()),
            data: Some("from data".to_string()),
            ..StreamEvent::typed("text")
        };
        assert_eq!(event.value(), Some("from content"));
    }

    #[test]
    fn value_falls_back_to_data_when_content_empty() {
        let event = StreamEvent {
            content: Some(String::new()),
            data: Some("from data".to_string()),
            ..StreamEvent::typed("text")
        };
        assert_eq!(event.value(), Some("from data"));
    }

    #[test]
    fn error_text_precedence() {
        let event = StreamEvent {
            error: Some("boom".to_string()),
            message: Some("ignored".to_string()),
            data: Some("also ignored".to_string()),
            ..StreamEvent::typed("error")
        };
        assert_eq!(event.error_text(), Some("boom"));

        let event = StreamEvent {
            message: Some("from message".to_string()),
            ..StreamEvent::typed("error")
        };
        assert_eq!(event.error_text(), Some("from message"));

        let event = StreamEvent::with_data("error", "from payload");
        assert_eq!(event.error_text(), Some("from payload"));
    }

    #[test]
    fn agent_request_distinguishes_bodies() {
        let invoke: AgentRequest =
            serde_json::from_str(r#"{"prompt":"hi","markdown":"","model_type":"claude"}"#).unwrap();
        assert!(matches!(invoke, AgentRequest::Invoke(_)));

        let export: AgentRequest =
            serde_json::from_str(r##"{"action":"export_pdf","markdown":"# a","theme":"gradient"}"##)
                .unwrap();
        assert!(matches!(export, AgentRequest::Export(_)));
    }

    #[test]
    fn stream_event_parses_wire_shape() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"tool_use","data":"web_search","query":"rust sse"}"#)
                .unwrap();
        assert_eq!(event.event_type.as_deref(), Some("tool_use"));
        assert_eq!(event.value(), Some("web_search"));
        assert_eq!(event.query.as_deref(), Some("rust sse"));
    }
}
