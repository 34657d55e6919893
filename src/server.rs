//! Local mock agent: speaks the exact wire protocol (SSE frames terminated
//! by `data: [DONE]`) so the chat and export flows can run without the
//! remote service. Also the remote-agent stand-in for integration tests.

use crate::client::write_token_file;
use crate::protocol::{
    AgentRequest, DONE_MARKER, ExportRequest, InvokeRequest, StreamEvent, TOOL_GENERATE_TWEET,
    TOOL_OUTPUT_SLIDE, TOOL_WEB_SEARCH,
};
use axum::Json;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

pub struct ServerConfig {
    pub listen: String,
    pub auth_token: String,
}

struct ServerState {
    auth_token: String,
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;
type EventStream = Sse<ReceiverStream<Result<Event, Infallible>>>;

const CHAR_DELAY: Duration = Duration::from_millis(10);
const TOOL_DELAY: Duration = Duration::from_millis(250);
const SHARE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(listen = %config.listen, "mock agent listening");
    tracing::info!(path = %crate::client::token_path().display(), "auth token stored");
    axum::serve(listener, app(config.auth_token)).await?;
    Ok(())
}

pub fn app(auth_token: String) -> axum::Router {
    let state = Arc::new(ServerState { auth_token });
    axum::Router::new()
        .route("/", post(handle_agent))
        .with_state(state)
}

/// Returns the configured token, or generates and persists one so the chat
/// client can pick it up.
pub fn resolve_token(explicit: Option<String>) -> ServerResult<String> {
    if let Some(token) = explicit {
        write_token_file(&token)?;
        return Ok(token);
    }

    let token = Uuid::new_v4().to_string();
    write_token_file(&token)?;
    Ok(token)
}

async fn handle_agent(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<AgentRequest>,
) -> Result<EventStream, StatusCode> {
    authorize(&headers, &state.auth_token)?;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);
    match request {
        AgentRequest::Invoke(invoke) => {
            tracing::debug!(prompt = %invoke.prompt, "simulating turn");
            tokio::spawn(simulate_turn(invoke, tx));
        }
        AgentRequest::Export(export) => {
            tracing::debug!(action = %export.action, "simulating export");
            tokio::spawn(simulate_export(export, tx));
        }
    }

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn simulate_turn(request: InvokeRequest, tx: mpsc::Sender<Result<Event, Infallible>>) {
    let prompt = request.prompt.trim().to_string();
    let wants_search = prompt.to_lowercase().contains("search");
    let wants_tweet = {
        let lower = prompt.to_lowercase();
        lower.contains("shar") || lower.contains("tweet")
    };

    let intro = "Let me put a deck together for that.\n\nSketching the outline...";
    for ch in intro.chars() {
        if !send(&tx, &StreamEvent::with_data("text", ch.to_string())).await {
            return;
        }
        tokio::time::sleep(CHAR_DELAY).await;
    }

    if wants_search {
        if !send(&tx, &StreamEvent::with_data("status", "Looking that up")).await {
            return;
        }
        let search = StreamEvent {
            query: Some(prompt.clone()),
            ..StreamEvent::with_data("tool_use", TOOL_WEB_SEARCH)
        };
        if !send(&tx, &search).await {
            return;
        }
        tokio::time::sleep(TOOL_DELAY).await;
    }

    if !send(&tx, &StreamEvent::with_data("tool_use", TOOL_OUTPUT_SLIDE)).await {
        return;
    }
    tokio::time::sleep(TOOL_DELAY).await;

    if !send(&tx, &StreamEvent::with_data("markdown", sample_markdown(&prompt))).await {
        return;
    }
    if !send(
        &tx,
        &StreamEvent::with_data("text", "\n\nDeck generated! Check the preview."),
    )
    .await
    {
        return;
    }

    if wants_tweet {
        if !send(&tx, &StreamEvent::with_data("tool_use", TOOL_GENERATE_TWEET)).await {
            return;
        }
        tokio::time::sleep(TOOL_DELAY).await;
        let intent = "https://twitter.com/intent/tweet?text=Built%20a%20deck%20with%20deckchat";
        if !send(&tx, &StreamEvent::with_data("tweet_url", intent)).await {
            return;
        }
    }

    let _ = tx.send(Ok(Event::default().data(DONE_MARKER))).await;
}

async fn simulate_export(request: ExportRequest, tx: mpsc::Sender<Result<Event, Infallible>>) {
    tokio::time::sleep(TOOL_DELAY).await;

    let event = match request.action.as_str() {
        "export_pdf" => StreamEvent::with_data("pdf", BASE64.encode(request.markdown.as_bytes())),
        "export_pptx" => StreamEvent::with_data("pptx", BASE64.encode(request.markdown.as_bytes())),
        "share_slide" => StreamEvent {
            url: Some(format!(
                "https://mock.deckchat.test/slides/{}/index.html",
                Uuid::new_v4()
            )),
            expires_at: Some(unix_now() + SHARE_TTL_SECS),
            ..StreamEvent::typed("share_result")
        },
        other => StreamEvent {
            message: Some(format!("unknown action: {other}")),
            ..StreamEvent::typed("error")
        },
    };

    if send(&tx, &event).await {
        let _ = tx.send(Ok(Event::default().data(DONE_MARKER))).await;
    }
}

async fn send(tx: &mpsc::Sender<Result<Event, Infallible>>, event: &StreamEvent) -> bool {
    let data = serde_json::to_string(event).unwrap_or_default();
    tx.send(Ok(Event::default().data(data))).await.is_ok()
}

fn sample_markdown(prompt: &str) -> String {
    let title = if prompt.is_empty() { "Your deck" } else { prompt };
    format!(
        "---\nmarp: true\ntheme: border\nsize: 16:9\npaginate: true\n---\n\n\
# {title}\n\nA sample deck\n\n---\n\n# Slide 2\n\n- Point 1\n- Point 2\n- Point 3\n\n---\n\n\
# Wrap-up\n\nThanks for reading\n"
    )
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn authorize(headers: &HeaderMap, token: &str) -> Result<(), StatusCode> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match header {
        Some(value) if value == format!("Bearer {}", token) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_markdown_titles_after_prompt() {
        let markdown = sample_markdown("AWS in five slides");
        assert!(markdown.starts_with("---\nmarp: true"));
        assert!(markdown.contains("# AWS in five slides"));
    }

    #[test]
    fn authorize_requires_exact_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorize(&headers, "t"), Err(StatusCode::UNAUTHORIZED));

        headers.insert(AUTHORIZATION, "Bearer t".parse().unwrap());
        assert_eq!(authorize(&headers, "t"), Ok(()));

        headers.insert(AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert_eq!(authorize(&headers, "t"), Err(StatusCode::UNAUTHORIZED));
    }
}
