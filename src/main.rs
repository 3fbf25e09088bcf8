//! geochat - terminal chat front end
//!
//! Line-oriented stand-in for the sidebar, thread view and composer of the
//! chat interface. Replies come from the simulated responder.

use geochat::command::{Command, Target, HELP};
use geochat::config::{AppConfig, LogFormat};
use geochat::runtime::SessionEvent;
use geochat::state_machine::ReplyOutcome;
use geochat::{
    Conversation, LoggingResponder, Message, Role, SessionRuntime, SimulatedResponder,
    SimulatedRuntime,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const WELCOME: &str = "Hello! How can I Help you ?";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_logging(config.log_format);

    let simulated = SimulatedResponder::with_delay(config.reply_delay);
    tracing::info!(reply_delay_ms = %simulated.delay().as_millis(), "Starting geochat");

    let responder = LoggingResponder::new(simulated);
    let mut session: SimulatedRuntime = SessionRuntime::new(responder);
    let mut updates = session.subscribe();

    // Start with a new, empty conversation
    session.create_conversation();
    drain_updates(&session, &mut updates);
    println!("{WELCOME}");
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut session, Command::parse(&line)) {
                    break;
                }
            }
            event = session.recv_event() => {
                session.handle_event(event);
            }
        }
        drain_updates(&session, &mut updates);
    }

    session.stop_generating();
    tracing::info!("geochat stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "geochat=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so they don't interleave with the conversation
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Apply one command. Returns false when the user asked to quit.
fn handle_command(session: &mut SimulatedRuntime, command: Command) -> bool {
    match command {
        Command::Send(text) => {
            // The composer is disabled while a reply is pending
            if session.is_generating() {
                println!("(still generating, type /stop to cancel)");
            } else if let Err(e) = session.send_user_message(&text) {
                tracing::debug!(error = %e, "Message not sent");
            }
        }
        Command::New => {
            session.create_conversation();
            println!("{WELCOME}");
        }
        Command::List => print_sidebar(session),
        Command::Select(target) => {
            let id = match target {
                Target::Index(index) => index
                    .checked_sub(1)
                    .and_then(|i| session.conversations().get(i))
                    .map(|c| c.id().to_string()),
                Target::Id(id) => Some(id),
            };
            match id.map(|id| session.select_conversation(&id)) {
                Some(Ok(())) => print_thread(session),
                Some(Err(e)) => println!("({e})"),
                None => println!("(no such conversation, see /list)"),
            }
        }
        Command::Stop => {
            if !session.stop_generating() {
                println!("(nothing to stop)");
            }
        }
        Command::Json => match serde_json::to_string_pretty(session.conversations()) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize session"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Empty => {}
        Command::Unknown(input) => println!("(unknown command: {input}, see /help)"),
    }
    true
}

fn drain_updates(session: &SimulatedRuntime, updates: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match updates.try_recv() {
            Ok(event) => render_update(session, &event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Dropped session updates");
            }
            Err(_) => break,
        }
    }
}

fn render_update(session: &SimulatedRuntime, event: &SessionEvent) {
    let is_active = |id: &str| session.active_conversation_id() == Some(id);

    match event {
        SessionEvent::MessageAppended {
            conversation_id,
            message,
        } if message.role == Role::Model => {
            if is_active(conversation_id) {
                print_message(message);
            } else {
                let title = session
                    .conversation(conversation_id)
                    .map_or("?", Conversation::title);
                println!("(reply delivered to \"{title}\")");
            }
        }
        SessionEvent::GenerationStarted { .. } => println!("..."),
        SessionEvent::GenerationDone {
            outcome: ReplyOutcome::Cancelled,
            ..
        } => println!("(stopped)"),
        SessionEvent::Error { message } => eprintln!("error: {message}"),
        _ => {}
    }
}

fn print_sidebar(session: &SimulatedRuntime) {
    for (i, conv) in session.conversations().iter().enumerate() {
        let marker = if session.active_conversation_id() == Some(conv.id()) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {:>2}. {}  [{}]", i + 1, conv.title(), conv.id());
    }
}

fn print_thread(session: &SimulatedRuntime) {
    if !session.conversation_started() {
        println!("{WELCOME}");
        return;
    }
    for message in session.active_messages() {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Model => "model",
    };
    println!("{who}> {}", message.text);
    for (i, source) in message.sources().iter().enumerate() {
        println!("   [{}] {} ({})", i + 1, source.title, source.uri);
    }
}
