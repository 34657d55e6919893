//! The message-stream reducer: owns the conversation transcript and maps
//! stream events onto it.
//!
//! All mutation happens here, on the UI task, in channel-arrival order.
//! The network, tip-rotation, and reveal tasks only send [`ChatEvent`]s.

use crate::messages::{
    SLIDE_COMPLETED, SLIDE_GENERATING, SLIDE_GENERATING_PREFIX, THINKING, TWEET_COMPLETED,
    TWEET_GENERATING, WEB_SEARCH_COMPLETED, WEB_SEARCH_PREFIX, error_display_message,
    share_message, web_search_status,
};
use crate::protocol::{TOOL_GENERATE_TWEET, TOOL_OUTPUT_SLIDE, TOOL_WEB_SEARCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation view.
///
/// Prose entries accumulate `content` while `is_streaming`. Status entries
/// (`is_status`) carry a phase label instead, mutated in place as the
/// operation progresses; `tip_index` points into [`crate::messages::TIPS`]
/// while the generation phase is active.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub is_streaming: bool,
    pub is_status: bool,
    pub status_text: Option<String>,
    pub tip_index: Option<usize>,
}

impl Message {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_streaming: false,
            is_status: false,
            status_text: None,
            tip_index: None,
        }
    }

    fn assistant(content: impl Into<String>, is_streaming: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_streaming,
            is_status: false,
            status_text: None,
            tip_index: None,
        }
    }

    fn status(label: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            is_streaming: false,
            is_status: true,
            status_text: Some(label.into()),
            tip_index: None,
        }
    }

    fn status_starts_with(&self, prefix: &str) -> bool {
        self.is_status
            && self
                .status_text
                .as_deref()
                .is_some_and(|label| label.starts_with(prefix))
    }

    fn status_is(&self, label: &str) -> bool {
        self.is_status && self.status_text.as_deref() == Some(label)
    }
}

/// The ordered transcript. Exclusively owned by the reducer; no other
/// component holds a mutable handle to it.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_streaming).count()
    }

    fn push_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    /// Opens the empty assistant entry that a turn streams into.
    fn begin_assistant(&mut self) {
        self.messages.push(Message::assistant("", true));
    }

    /// Places streamed text per the backward-scan rule: if the most recent
    /// status entry has no prose assistant entry after it, the text starts
    /// a new entry (status bubbles and prose are never merged); otherwise
    /// it appends to the most recent prose assistant entry; with neither
    /// present it starts a new entry.
    fn apply_text(&mut self, text: &str) {
        self.complete_active_searches();

        let mut last_status = None;
        let mut last_prose = None;
        for i in (0..self.messages.len()).rev() {
            let msg = &self.messages[i];
            if msg.is_status && last_status.is_none() {
                last_status = Some(i);
            }
            if msg.role == Role::Assistant && !msg.is_status && last_prose.is_none() {
                last_prose = Some(i);
            }
        }

        match (last_status, last_prose) {
            (Some(status), prose) if prose.is_none_or(|p| p < status) => {
                self.messages.push(Message::assistant(text, true));
            }
            (_, Some(prose)) => self.messages[prose].content.push_str(text),
            _ => self.messages.push(Message::assistant(text, true)),
        }
    }

    /// Share-turn text goes straight onto the trailing assistant entry.
    fn apply_share_text(&mut self, text: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant && !last.is_status {
                last.content.push_str(text);
            }
        }
    }

    fn clear_streaming(&mut self) {
        for msg in &mut self.messages {
            msg.is_streaming = false;
        }
    }

    /// Opens a search status entry. An identical in-progress label is a
    /// no-op; any other still-active search indicator is replaced so only
    /// one is open at a time.
    fn begin_search(&mut self, query: Option<&str>) {
        let label = web_search_status(query);
        if self.messages.iter().any(|m| m.status_is(&label)) {
            return;
        }
        self.messages.retain(|m| {
            !(m.status_starts_with(WEB_SEARCH_PREFIX) && !m.status_is(WEB_SEARCH_COMPLETED))
        });
        self.messages.push(Message::status(label));
    }

    /// Opens the generation status entry, finalizing any open search first.
    /// A second `output_slide` notice leaves the existing entry alone.
    fn begin_generation(&mut self) {
        if self
            .messages
            .iter()
            .any(|m| m.status_starts_with(SLIDE_GENERATING_PREFIX))
        {
            return;
        }
        self.complete_active_searches();
        self.messages.push(Message::status(SLIDE_GENERATING));
    }

    fn begin_tweet(&mut self) {
        if self.messages.iter().any(|m| m.status_is(TWEET_GENERATING)) {
            return;
        }
        self.messages.push(Message::status(TWEET_GENERATING));
    }

    fn complete_generation(&mut self) {
        for msg in &mut self.messages {
            if msg.status_starts_with(SLIDE_GENERATING_PREFIX) {
                msg.status_text = Some(SLIDE_COMPLETED.to_string());
                msg.tip_index = None;
            }
        }
    }

    fn complete_active_searches(&mut self) {
        for msg in &mut self.messages {
            if msg.status_starts_with(WEB_SEARCH_PREFIX) {
                msg.status_text = Some(WEB_SEARCH_COMPLETED.to_string());
            }
        }
    }

    fn apply_tweet_url(&mut self, url: &str) {
        for msg in &mut self.messages {
            if msg.status_is(TWEET_GENERATING) {
                msg.status_text = Some(TWEET_COMPLETED.to_string());
            }
        }
        self.messages.push(Message::assistant(share_message(url), false));
    }

    fn finalize_share(&mut self) {
        self.clear_streaming();
        for msg in &mut self.messages {
            if msg.status_is(TWEET_GENERATING) {
                msg.status_text = Some(TWEET_COMPLETED.to_string());
            }
        }
    }

    fn set_tip(&mut self, index: usize) {
        for msg in &mut self.messages {
            if msg.status_starts_with(SLIDE_GENERATING_PREFIX) {
                msg.tip_index = Some(index);
            }
        }
    }

    /// Prepares the target entry for a canned-text reveal: optionally drops
    /// status entries, then reuses the trailing assistant prose entry
    /// (replacing its content) or appends a fresh one.
    fn begin_reveal(&mut self, drop_status: bool) {
        if drop_status {
            self.messages.retain(|m| !m.is_status);
        }
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant && !last.is_status => {
                last.content.clear();
                last.is_streaming = true;
            }
            _ => self.begin_assistant(),
        }
    }

    fn push_reveal_char(&mut self, ch: char) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.content.push(ch);
            }
        }
    }

    fn end_reveal(&mut self) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.is_streaming = false;
            }
        }
    }
}

/// Which callback mapping a turn uses. Share turns came from the share
/// button, not the input box, and react to a narrower event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnKind {
    #[default]
    Chat,
    Share,
}

/// Messages sent to the reducer over the UI channel, one per router
/// callback plus the timer/reveal ticks and the end-of-turn signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Text(String),
    Status(String),
    ToolUse { name: String, query: Option<String> },
    Markdown(String),
    TweetUrl(String),
    Error(String),
    Complete,
    /// The network task finished, successfully or not.
    TurnFinished,
    Tip(usize),
    RevealBegin { drop_status: bool },
    RevealChar(char),
    RevealEnd,
}

/// Side effects the caller must run after applying an event. Kept out of
/// the reducer so timer and task lifecycles stay owned by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartTips,
    StopTips,
    Reveal {
        text: &'static str,
        drop_status: bool,
    },
}

/// Reducer state for one conversation: the transcript plus the transient
/// phase label, the busy flag gating submissions, and the current deck
/// markdown carried into each request.
#[derive(Debug, Default)]
pub struct ChatState {
    transcript: Transcript,
    pub phase: Option<String>,
    pub is_loading: bool,
    pub current_markdown: String,
    turn: TurnKind,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn has_user_message(&self) -> bool {
        self.transcript.has_user_message()
    }

    pub fn streaming_count(&self) -> usize {
        self.transcript.streaming_count()
    }

    /// Starts a conversational turn. Returns false while a previous turn
    /// is still in flight (submission is gated, not cancelled).
    pub fn begin_chat_turn(&mut self, prompt: &str) -> bool {
        if self.is_loading || prompt.trim().is_empty() {
            return false;
        }
        self.transcript.push_user(prompt);
        self.is_loading = true;
        self.phase = Some(THINKING.to_string());
        self.transcript.begin_assistant();
        self.turn = TurnKind::Chat;
        true
    }

    /// Starts the auto-submitted share turn.
    pub fn begin_share_turn(&mut self) -> bool {
        if self.is_loading {
            return false;
        }
        self.is_loading = true;
        self.transcript.begin_assistant();
        self.turn = TurnKind::Share;
        true
    }

    /// Folds one event into the transcript. Events must be applied in
    /// arrival order; the reducer never reorders them.
    pub fn apply(&mut self, event: ChatEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            ChatEvent::Text(text) => match self.turn {
                TurnKind::Chat => {
                    self.phase = None;
                    self.transcript.apply_text(&text);
                }
                TurnKind::Share => self.transcript.apply_share_text(&text),
            },
            ChatEvent::Status(status) => {
                if self.turn == TurnKind::Chat {
                    self.phase = Some(status);
                }
            }
            ChatEvent::ToolUse { name, query } => {
                self.transcript.clear_streaming();
                match self.turn {
                    TurnKind::Chat => match name.as_str() {
                        TOOL_OUTPUT_SLIDE => {
                            self.transcript.begin_generation();
                            effects.push(Effect::StartTips);
                        }
                        TOOL_WEB_SEARCH => self.transcript.begin_search(query.as_deref()),
                        _ => {}
                    },
                    TurnKind::Share => {
                        if name == TOOL_GENERATE_TWEET {
                            self.transcript.begin_tweet();
                        }
                    }
                }
            }
            ChatEvent::Markdown(markdown) => {
                if self.turn == TurnKind::Chat {
                    self.current_markdown = markdown;
                    effects.push(Effect::StopTips);
                    self.transcript.complete_generation();
                }
            }
            ChatEvent::TweetUrl(url) => {
                if self.turn == TurnKind::Share {
                    self.transcript.apply_tweet_url(&url);
                }
            }
            ChatEvent::Error(error) => {
                if self.turn == TurnKind::Chat {
                    self.phase = None;
                    effects.push(Effect::Reveal {
                        text: error_display_message(&error),
                        drop_status: true,
                    });
                }
            }
            ChatEvent::Complete => match self.turn {
                TurnKind::Chat => self.transcript.complete_active_searches(),
                TurnKind::Share => self.transcript.finalize_share(),
            },
            ChatEvent::TurnFinished => {
                self.transcript.clear_streaming();
                self.is_loading = false;
                self.phase = None;
                effects.push(Effect::StopTips);
            }
            ChatEvent::Tip(index) => self.transcript.set_tip(index),
            ChatEvent::RevealBegin { drop_status } => self.transcript.begin_reveal(drop_status),
            ChatEvent::RevealChar(ch) => self.transcript.push_reveal_char(ch),
            ChatEvent::RevealEnd => self.transcript.end_reveal(),
        }

        effects
    }
}
