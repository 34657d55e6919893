//! Single-shot export and share calls. Same transport as the chat flow,
//! but each expects exactly one matching artifact event and stops reading
//! as soon as it arrives.

use crate::client::{AgentEndpoint, ClientResult, open_stream};
use crate::protocol::{ExportFormat, ExportRequest, ShareResult, non_empty};
use crate::sse::read_sse_stream;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::ops::ControlFlow;

pub const DEFAULT_THEME: &str = "gradient";

/// A decoded binary artifact ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Renders the deck to `format` via the agent. Errors (setup failures, an
/// `error` event before the artifact, a stream that ends with no artifact)
/// surface as `Err` — unlike the chat flow, callers here await one result.
pub async fn export_slide(
    endpoint: &AgentEndpoint,
    markdown: &str,
    format: ExportFormat,
    theme: &str,
) -> ClientResult<ExportedFile> {
    let request = ExportRequest {
        action: format.action().to_string(),
        markdown: markdown.to_string(),
        theme: theme.to_string(),
    };

    let response = open_stream(endpoint, &request, None).await?;

    let mut result: Option<ExportedFile> = None;
    let mut stream_error: Option<String> = None;

    read_sse_stream(response.bytes_stream(), |event| {
        match event.event_type.as_deref() {
            Some(t) if t == format.event_type() => {
                if let Some(data) = non_empty(&event.data) {
                    match BASE64.decode(data) {
                        Ok(bytes) => {
                            result = Some(ExportedFile {
                                bytes,
                                mime: format.mime(),
                            });
                        }
                        Err(err) => {
                            stream_error = Some(format!(
                                "{} artifact payload is not valid base64: {err}",
                                format.label()
                            ));
                        }
                    }
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            Some("error") => {
                stream_error = Some(
                    event
                        .error_text()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{} export failed", format.label())),
                );
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        }
    })
    .await?;

    if let Some(error) = stream_error {
        return Err(error.into());
    }
    result.ok_or_else(|| format!("{} export produced no artifact", format.label()).into())
}

/// Publishes the deck and returns its public URL and expiry.
pub async fn share_slide(
    endpoint: &AgentEndpoint,
    markdown: &str,
    theme: &str,
) -> ClientResult<ShareResult> {
    let request = ExportRequest {
        action: "share_slide".to_string(),
        markdown: markdown.to_string(),
        theme: theme.to_string(),
    };

    let response = open_stream(endpoint, &request, None).await?;

    let mut result: Option<ShareResult> = None;
    let mut stream_error: Option<String> = None;

    read_sse_stream(response.bytes_stream(), |event| {
        match event.event_type.as_deref() {
            Some("share_result") => {
                if let Some(url) = non_empty(&event.url) {
                    result = Some(ShareResult {
                        url: url.to_string(),
                        expires_at: event.expires_at.unwrap_or_default(),
                    });
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
            Some("error") => {
                stream_error = Some(
                    event
                        .error_text()
                        .map(str::to_string)
                        .unwrap_or_else(|| "Slide sharing failed".to_string()),
                );
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        }
    })
    .await?;

    if let Some(error) = stream_error {
        return Err(error.into());
    }
    result.ok_or_else(|| "Slide sharing produced no result".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip_preserves_bytes() {
        let raw: Vec<u8> = (0u8..=255).collect();
        let encoded = BASE64.encode(&raw);
        assert_eq!(BASE64.decode(&encoded).unwrap(), raw);
    }

    #[test]
    fn mime_types_match_formats() {
        assert_eq!(ExportFormat::Pdf.mime(), "application/pdf");
        assert!(ExportFormat::Pptx.mime().contains("presentationml"));
    }
}
