//! Terminal chat UI. All transcript logic lives in the reducer
//! ([`crate::transcript::ChatState`]); this module renders it and owns the
//! task lifecycles (network turn, tip rotation, canned reveals).

use crate::client::{AgentCallbacks, AgentEndpoint, invoke_agent};
use crate::messages::{
    INITIAL_GREETING, SHARE_PROMPT, SLIDE_COMPLETED, TIPS, TWEET_COMPLETED, WEB_SEARCH_COMPLETED,
};
use crate::protocol::ModelType;
use crate::reveal::spawn_reveal;
use crate::tips::TipRotation;
use crate::transcript::{ChatEvent, ChatState, Effect, Message, Role};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::error::Error;
use std::io;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

type UiResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const INPUT_HEIGHT: u16 = 3;
const STREAM_CURSOR: &str = "▌";

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = io::stdout().flush();
    }
}

/// Single-line prompt input.
struct InputBuffer {
    value: String,
    cursor: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            value: String::new(),
            cursor: 0,
        }
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset();
        self.value.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset();
            self.value.remove(at);
        }
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    fn byte_offset(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn render(&self) -> Text<'static> {
        if self.is_empty() {
            return Text::from(Span::styled(
                "Describe the deck you want...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(self.value.clone())
    }
}

/// Forwards router callbacks onto the UI channel, preserving arrival order.
struct ChannelCallbacks {
    sender: mpsc::UnboundedSender<ChatEvent>,
}

impl AgentCallbacks for ChannelCallbacks {
    fn on_text(&mut self, text: &str) {
        let _ = self.sender.send(ChatEvent::Text(text.to_string()));
    }

    fn on_status(&mut self, status: &str) {
        let _ = self.sender.send(ChatEvent::Status(status.to_string()));
    }

    fn on_markdown(&mut self, markdown: &str) {
        let _ = self.sender.send(ChatEvent::Markdown(markdown.to_string()));
    }

    fn on_tweet_url(&mut self, url: &str) {
        let _ = self.sender.send(ChatEvent::TweetUrl(url.to_string()));
    }

    fn on_tool_use(&mut self, tool_name: &str, query: Option<&str>) {
        let _ = self.sender.send(ChatEvent::ToolUse {
            name: tool_name.to_string(),
            query: query.map(str::to_string),
        });
    }

    fn on_error(&mut self, error: &str) {
        let _ = self.sender.send(ChatEvent::Error(error.to_string()));
    }

    fn on_complete(&mut self) {
        let _ = self.sender.send(ChatEvent::Complete);
    }
}

pub struct App {
    state: ChatState,
    tips: TipRotation,
    input: InputBuffer,
    should_quit: bool,
    sender: mpsc::UnboundedSender<ChatEvent>,
    receiver: mpsc::UnboundedReceiver<ChatEvent>,
    endpoint: AgentEndpoint,
    session_id: String,
    model: ModelType,
}

impl App {
    pub fn new(endpoint: AgentEndpoint, model: ModelType) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        spawn_reveal(sender.clone(), INITIAL_GREETING, false);

        Self {
            state: ChatState::new(),
            tips: TipRotation::new(),
            input: InputBuffer::new(),
            should_quit: false,
            sender,
            receiver,
            endpoint,
            session_id: Uuid::new_v4().to_string(),
            model,
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            for effect in self.state.apply(event) {
                match effect {
                    Effect::StartTips => self.tips.start(self.sender.clone()),
                    Effect::StopTips => self.tips.stop(),
                    Effect::Reveal { text, drop_status } => {
                        spawn_reveal(self.sender.clone(), text, drop_status);
                    }
                }
            }
        }
    }

    fn submit(&mut self) {
        if self.state.is_loading || self.input.value.trim().is_empty() {
            return;
        }
        let prompt = self.input.take();
        if !self.state.begin_chat_turn(&prompt) {
            return;
        }
        self.spawn_turn(prompt);
    }

    fn submit_share(&mut self) {
        if !self.state.begin_share_turn() {
            return;
        }
        self.spawn_turn(SHARE_PROMPT.to_string());
    }

    fn spawn_turn(&self, prompt: String) {
        let endpoint = self.endpoint.clone();
        let sender = self.sender.clone();
        let markdown = self.state.current_markdown.clone();
        let session_id = self.session_id.clone();
        let model = self.model;

        tokio::spawn(async move {
            let mut callbacks = ChannelCallbacks {
                sender: sender.clone(),
            };
            invoke_agent(
                &endpoint,
                &prompt,
                &markdown,
                &mut callbacks,
                Some(&session_id),
                model,
            )
            .await;
            let _ = sender.send(ChatEvent::TurnFinished);
        });
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('t') => self.submit_share(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                if !self.input.is_empty() {
                    self.submit();
                }
            }
            // The model can only change before the first message is sent.
            KeyCode::Tab => {
                if !self.state.has_user_message() && !self.state.is_loading {
                    self.model = self.model.cycle();
                }
            }
            KeyCode::Char(c) => self.input.insert_char(c),
            KeyCode::Backspace => self.input.delete_char(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.cursor = 0,
            KeyCode::End => self.input.cursor = self.input.value.chars().count(),
            _ => {}
        }
    }

    fn draw(&self, f: &mut Frame) {
        let [transcript_area, input_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)])
                .areas(f.area());

        let mut lines: Vec<Line> = Vec::new();
        for msg in self.state.messages() {
            lines.extend(message_lines(msg));
        }
        if self.state.is_loading {
            if let Some(phase) = &self.state.phase {
                lines.push(Line::from(Span::styled(
                    format!("… {phase}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }

        let total_rows = wrapped_rows(&lines, transcript_area.width);
        let scroll = total_rows.saturating_sub(transcript_area.height);
        let transcript = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        f.render_widget(transcript, transcript_area);

        let title = if self.state.is_loading {
            format!(" {} [working] ", self.model.label())
        } else if self.state.has_user_message() {
            format!(" {} — Enter send · Ctrl+T share · Esc quit ", self.model.label())
        } else {
            format!(" {} — Tab to switch model · Enter send ", self.model.label())
        };
        let input = Paragraph::new(self.input.render()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(input, input_area);

        let cursor_x = (input_area.x + 1 + self.input.cursor as u16)
            .min(input_area.x + input_area.width.saturating_sub(2));
        f.set_cursor_position((cursor_x, input_area.y + 1));
    }
}

fn message_lines(msg: &Message) -> Vec<Line<'static>> {
    if msg.is_status {
        return status_lines(msg);
    }

    // Empty placeholder entries render nothing until text arrives.
    if msg.content.is_empty() && !msg.is_streaming {
        return Vec::new();
    }

    let (header, color) = match msg.role {
        Role::User => ("You:", Color::Blue),
        Role::Assistant => ("Agent:", Color::Yellow),
    };
    let header_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    let body_style = Style::default().fg(color);

    let mut lines = vec![Line::from(Span::styled(header, header_style))];
    let mut body: Vec<String> = msg.content.lines().map(str::to_string).collect();
    if body.is_empty() {
        body.push(String::new());
    }
    let last = body.len() - 1;
    for (i, text) in body.into_iter().enumerate() {
        let mut spans = vec![Span::styled(format!("  {text}"), body_style)];
        if msg.is_streaming && i == last {
            spans.push(Span::styled(STREAM_CURSOR, body_style));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines
}

fn status_lines(msg: &Message) -> Vec<Line<'static>> {
    let label = msg.status_text.clone().unwrap_or_default();
    let completed =
        label == WEB_SEARCH_COMPLETED || label == SLIDE_COMPLETED || label == TWEET_COMPLETED;
    let (glyph, style) = if completed {
        ("✓", Style::default().fg(Color::Green))
    } else {
        (
            "…",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )
    };

    let mut lines = vec![Line::from(Span::styled(format!("{glyph} {label}"), style))];
    if let Some(tip) = msg.tip_index.and_then(|i| TIPS.get(i)) {
        lines.push(Line::from(Span::styled(
            format!("  💡 {tip}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));
    lines
}

fn wrapped_rows(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total = 0usize;
    for line in lines {
        let len: usize = line
            .spans
            .iter()
            .map(|span| span.content.chars().count())
            .sum();
        total += (len.max(1) + width - 1) / width;
    }
    total as u16
}

pub fn run_chat(endpoint: AgentEndpoint, model: ModelType) -> UiResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let _guard = TerminalGuard;
    let mut app = App::new(endpoint, model);

    while !app.should_quit {
        app.drain_events();
        terminal.draw(|f| app.draw(f))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::InputBuffer;

    #[test]
    fn input_buffer_edits_around_the_cursor() {
        let mut input = InputBuffer::new();
        for ch in "deck".chars() {
            input.insert_char(ch);
        }
        input.move_left();
        input.insert_char('!');
        assert_eq!(input.value, "dec!k");

        input.delete_char();
        assert_eq!(input.value, "deck");

        let taken = input.take();
        assert_eq!(taken, "deck");
        assert!(input.is_empty());
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn input_buffer_handles_multibyte_chars() {
        let mut input = InputBuffer::new();
        input.insert_char('デ');
        input.insert_char('ッ');
        input.delete_char();
        assert_eq!(input.value, "デ");
    }
}
