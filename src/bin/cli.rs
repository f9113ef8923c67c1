//! Bedrock Chat - terminal chatbot backed by Claude on AWS Bedrock
//!
//! This is the CLI entry point for the bedrock-chat tool.
//! Run with: cargo run --bin bedrock-chat

use bedrock_chat::chat::{parse_command, ChatSession, Command, Mode, SessionEvent, Turn};
use bedrock_chat::config::{get_messages, Messages};
use bedrock_chat::model::{BedrockConnector, RetryingInvoker, MODEL_ID};
use bedrock_chat::AppSettings;
use std::env;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

/// Chat output already reports throttling and failures, so logs stay off
/// unless `RUST_LOG` asks for them.
const DEFAULT_LOG_FILTER: &str = "off";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    // Keep the on-disk values apart so /save never persists env overrides
    let mut stored = AppSettings::load();
    let mut settings = stored.clone().with_env_overrides();

    // Parse command line arguments
    let mut prompt_words = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--online" => settings.online = true,
            "--offline" => settings.online = false,
            "--lang" => {
                if let Some(lang) = args.next() {
                    settings.lang = lang.to_lowercase();
                }
            }
            _ => prompt_words.push(arg),
        }
    }

    let messages = get_messages(&settings.lang);

    let invoker = RetryingInvoker::new(messages).with_throttle_observer(move |notice| {
        eprintln!("⚠️  {}", messages.throttle_warning(notice.delay));
    });
    let connector = BedrockConnector::new(settings.client_config());
    let mut session = ChatSession::new(connector, &settings.lang)
        .with_invoker(invoker)
        .with_mode(settings.mode());

    println!("{}", messages.title);
    println!("================================================");
    println!("{}", messages.description);
    println!("Model: {}", MODEL_ID);
    print_mode(messages, session.mode());
    println!("================================================\n");

    // Single-shot mode when a prompt is given as arguments
    if !prompt_words.is_empty() {
        let prompt = prompt_words.join(" ");
        print_busy(messages, session.mode());
        let turn = session.submit(&prompt).await;
        print_turn(&turn);
        return Ok(());
    }

    println!("{}\n", messages.help);

    let stdin = io::stdin();
    loop {
        print!("📝 {}: ", messages.input_prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        if matches!(parse_command(&line), Command::Prompt(_)) {
            print_busy(messages, session.mode());
        }

        match session.handle_line(&line).await {
            SessionEvent::Reply(turn) => print_turn(&turn),
            SessionEvent::ModeChanged(mode) => print_mode(messages, mode),
            SessionEvent::Cleared => println!("{}\n", messages.history_cleared),
            SessionEvent::History => {
                if session.conversation().is_empty() {
                    println!("{}\n", messages.history_empty);
                }
                for message in session.conversation().messages() {
                    println!("[{}] {}", message.role(), message.content());
                }
                println!();
            }
            SessionEvent::SaveSettings => {
                stored = stored.with_session_prefs(&settings.lang, session.mode());
                match stored.save() {
                    Ok(()) => println!("{}\n", messages.settings_saved),
                    Err(e) => eprintln!("❌ {}\n", e),
                }
            }
            SessionEvent::Help => println!("{}\n", messages.help),
            SessionEvent::Quit => {
                println!("{}", messages.goodbye);
                break;
            }
            SessionEvent::Ignored => {}
        }
    }

    Ok(())
}

fn print_mode(messages: &Messages, mode: Mode) {
    match mode {
        Mode::Online => {
            println!("{}", messages.online_mode);
            println!("{}", messages.model_info);
        }
        Mode::Offline => println!("{}", messages.offline_mode),
    }
}

fn print_busy(messages: &Messages, mode: Mode) {
    match mode {
        Mode::Online => println!("⏳ {}", messages.thinking),
        Mode::Offline => println!("⏳ {}", messages.local_thinking),
    }
}

fn print_turn(turn: &Turn) {
    if let Some(error) = &turn.error {
        eprintln!("❌ {}", error);
    }
    println!("\n🤖 {}\n", turn.reply);
}
