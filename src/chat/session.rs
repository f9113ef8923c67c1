//! Application state and command dispatch for one chat session.

use std::fmt;

use crate::config::{get_messages, Messages};
use crate::conversation::Conversation;
use crate::model::{HandleProvider, RetryingInvoker, Sleeper, TokioSleeper};

use super::fallback::LocalResponder;

/// Where replies come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Claude on AWS Bedrock.
    Online,
    /// Local keyword responder.
    #[default]
    Offline,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Online => Mode::Offline,
            Mode::Offline => Mode::Online,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Online => f.write_str("online"),
            Mode::Offline => f.write_str("offline"),
        }
    }
}

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    SetMode(Mode),
    ToggleMode,
    Reset,
    History,
    SaveSettings,
    Help,
    Quit,
    Empty,
}

/// Parse one input line. Anything that is not a known command is a prompt.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        "quit" | "exit" | "/quit" | "/exit" => Command::Quit,
        "/online" => Command::SetMode(Mode::Online),
        "/offline" => Command::SetMode(Mode::Offline),
        "/mode" => Command::ToggleMode,
        "/reset" | "/clear" => Command::Reset,
        "/history" => Command::History,
        "/save" => Command::SaveSettings,
        "/help" => Command::Help,
        _ => Command::Prompt(line.to_string()),
    }
}

/// The assistant side of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Text appended to the conversation as the assistant message.
    pub reply: String,
    /// Client construction failure to show next to the reply.
    pub error: Option<String>,
}

/// What the shell should show after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Reply(Turn),
    ModeChanged(Mode),
    Cleared,
    History,
    SaveSettings,
    Help,
    Quit,
    Ignored,
}

/// Conversation plus mode, owned by the shell and driven one line at a time.
pub struct ChatSession<P, S = TokioSleeper> {
    conversation: Conversation,
    mode: Mode,
    messages: &'static Messages,
    responder: LocalResponder,
    provider: P,
    invoker: RetryingInvoker<S>,
}

impl<P: HandleProvider> ChatSession<P> {
    /// Start an offline session with the default retry policy.
    pub fn new(provider: P, lang: &str) -> Self {
        let messages = get_messages(lang);
        Self {
            conversation: Conversation::new(),
            mode: Mode::default(),
            messages,
            responder: LocalResponder::for_lang(lang),
            provider,
            invoker: RetryingInvoker::new(messages),
        }
    }
}

impl<P: HandleProvider, S: Sleeper> ChatSession<P, S> {
    /// Replace the invoker, e.g. to observe throttling or change the clock.
    pub fn with_invoker<T: Sleeper>(self, invoker: RetryingInvoker<T>) -> ChatSession<P, T> {
        ChatSession {
            conversation: self.conversation,
            mode: self.mode,
            messages: self.messages,
            responder: self.responder,
            provider: self.provider,
            invoker,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn messages(&self) -> &'static Messages {
        self.messages
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::info!("Switching to {} mode", mode);
        }
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    /// Discard the whole conversation.
    pub fn reset(&mut self) {
        tracing::info!(messages = self.conversation.len(), "Conversation reset");
        self.conversation.clear();
    }

    /// Handle one line of user input.
    pub async fn handle_line(&mut self, line: &str) -> SessionEvent {
        match parse_command(line) {
            Command::Prompt(prompt) => SessionEvent::Reply(self.submit(&prompt).await),
            Command::SetMode(mode) => {
                self.set_mode(mode);
                SessionEvent::ModeChanged(mode)
            }
            Command::ToggleMode => SessionEvent::ModeChanged(self.toggle_mode()),
            Command::Reset => {
                self.reset();
                SessionEvent::Cleared
            }
            Command::History => SessionEvent::History,
            Command::SaveSettings => SessionEvent::SaveSettings,
            Command::Help => SessionEvent::Help,
            Command::Quit => SessionEvent::Quit,
            Command::Empty => SessionEvent::Ignored,
        }
    }

    /// Append `prompt`, produce a reply for the current mode and append it.
    ///
    /// Online mode falls back to the local responder when the client cannot
    /// be constructed. Retries are invisible here: only the final text is
    /// recorded.
    pub async fn submit(&mut self, prompt: &str) -> Turn {
        self.conversation.push_user(prompt);

        let turn = match self.mode {
            Mode::Offline => Turn {
                reply: self.responder.respond(prompt),
                error: None,
            },
            Mode::Online => match self.provider.handle() {
                Ok(handle) => Turn {
                    reply: self
                        .invoker
                        .invoke(handle.as_ref(), &self.conversation)
                        .await,
                    error: None,
                },
                Err(e) => {
                    tracing::debug!("Bedrock client unavailable, answering locally: {}", e);
                    Turn {
                        reply: format!(
                            "{}\n\n{}",
                            self.messages.connection_failed,
                            self.responder.respond(prompt)
                        ),
                        error: Some(format!("{}: {}", self.messages.client_init_failed, e)),
                    }
                }
            },
        };

        self.conversation.push_assistant(turn.reply.clone());
        turn
    }
}
