//! Streaming transport to the agent endpoint and the event router that
//! fans parsed frames out to typed callbacks.

use crate::protocol::{InvokeRequest, ModelType, StreamEvent, non_empty};
use crate::sse::{StreamEnd, read_sse_stream};
use reqwest::Client as HttpClient;
use reqwest::header::ACCEPT;
use serde::Serialize;
use std::error::Error;
use std::ops::ControlFlow;
use std::path::PathBuf;

/// Header used for sticky routing: requests sharing a value reach the same
/// backend worker, which keeps conversational context server-side.
pub const SESSION_HEADER: &str = "x-deckchat-session-id";

pub type ClientResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Resolved agent endpoint: where to POST and how to authenticate.
#[derive(Debug, Clone)]
pub struct AgentEndpoint {
    pub url: String,
    pub token: String,
}

impl AgentEndpoint {
    pub fn resolve(url: Option<String>, token: Option<String>) -> ClientResult<Self> {
        let url = url.ok_or(
            "No agent endpoint configured; pass --endpoint or set DECKCHAT_ENDPOINT.",
        )?;
        let token = match token {
            Some(token) => token,
            None => read_token_file().map_err(|_| {
                "No auth token found; pass --token, set DECKCHAT_TOKEN, or run `deckchat serve` to create one."
            })?,
        };

        Ok(Self {
            url: normalize_url(&url),
            token,
        })
    }
}

/// Per-event-type callbacks invoked by the router. Implementations own the
/// reaction; the router only decides which method fires.
///
/// `on_tweet_url` is optional: turns that don't expect a share result leave
/// the default no-op in place.
pub trait AgentCallbacks {
    fn on_text(&mut self, text: &str);
    fn on_status(&mut self, status: &str);
    fn on_markdown(&mut self, markdown: &str);
    fn on_tweet_url(&mut self, _url: &str) {}
    fn on_tool_use(&mut self, tool_name: &str, query: Option<&str>);
    fn on_error(&mut self, error: &str);
    fn on_complete(&mut self);
}

/// Routes one parsed frame to at most one callback. This dispatch table is
/// the wire contract with the agent: known types require a non-empty
/// payload to fire, unknown types fall back to text if a payload is
/// present, else to error if an error string is present, else are dropped.
pub fn route_event(event: &StreamEvent, callbacks: &mut impl AgentCallbacks) {
    let value = event.value();

    match event.event_type.as_deref() {
        Some("text") => {
            if let Some(text) = value {
                callbacks.on_text(text);
            }
        }
        Some("status") => {
            if let Some(status) = value {
                callbacks.on_status(status);
            }
        }
        Some("markdown") => {
            if let Some(markdown) = value {
                callbacks.on_markdown(markdown);
            }
        }
        Some("tweet_url") => {
            if let Some(url) = value {
                callbacks.on_tweet_url(url);
            }
        }
        Some("tool_use") => {
            if let Some(tool_name) = value {
                callbacks.on_tool_use(tool_name, event.query.as_deref());
            }
        }
        Some("error") => {
            if let Some(error) = event.error_text() {
                callbacks.on_error(error);
            }
        }
        _ => {
            if let Some(error) = non_empty(&event.error) {
                callbacks.on_error(error);
            } else if let Some(text) = value {
                callbacks.on_text(text);
            }
        }
    }
}

/// Runs one conversational turn against the agent, streaming events into
/// `callbacks` as they arrive.
///
/// Every failure path is funneled into `on_error`; this never returns an
/// error to the caller. `on_complete` fires exactly once when the stream
/// ends, whether by `[DONE]` or natural closure.
pub async fn invoke_agent(
    endpoint: &AgentEndpoint,
    prompt: &str,
    current_markdown: &str,
    callbacks: &mut impl AgentCallbacks,
    session_id: Option<&str>,
    model_type: ModelType,
) {
    let request = InvokeRequest {
        prompt: prompt.to_string(),
        markdown: current_markdown.to_string(),
        model_type: Some(model_type.wire_name().to_string()),
    };

    if let Err(err) = stream_turn(endpoint, &request, callbacks, session_id).await {
        callbacks.on_error(&err.to_string());
    }
}

async fn stream_turn(
    endpoint: &AgentEndpoint,
    request: &InvokeRequest,
    callbacks: &mut impl AgentCallbacks,
    session_id: Option<&str>,
) -> ClientResult<()> {
    let response = open_stream(endpoint, request, session_id).await?;

    let end = read_sse_stream(response.bytes_stream(), |event| {
        route_event(&event, callbacks);
        ControlFlow::Continue(())
    })
    .await?;

    if end == StreamEnd::Done {
        callbacks.on_complete();
    }

    Ok(())
}

/// Opens the streaming POST shared by the chat and export flows.
pub(crate) async fn open_stream(
    endpoint: &AgentEndpoint,
    body: &impl Serialize,
    session_id: Option<&str>,
) -> ClientResult<reqwest::Response> {
    let http = HttpClient::new();
    let mut request = http
        .post(&endpoint.url)
        .bearer_auth(&endpoint.token)
        .header(ACCEPT, "text/event-stream")
        .json(body);
    if let Some(id) = session_id {
        request = request.header(SESSION_HEADER, id);
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("API error: {} - {}", status, body).into());
    }

    Ok(response)
}

fn normalize_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

fn read_token_file() -> ClientResult<String> {
    let token = std::fs::read_to_string(token_path())?;
    Ok(token.trim().to_string())
}

pub(crate) fn write_token_file(token: &str) -> ClientResult<()> {
    let path = token_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&path)?;
    use std::io::Write;
    file.write_all(token.as_bytes())?;
    Ok(())
}

pub(crate) fn token_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".deckchat").join("token");
    }

    PathBuf::from("deckchat.token")
}
