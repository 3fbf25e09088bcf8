//! Parsing of terminal input lines into user intents

/// One line of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send to the active conversation
    Send(String),
    New,
    List,
    /// Select by sidebar position (1-based) or by id
    Select(Target),
    Stop,
    Json,
    Help,
    Quit,
    /// Blank line
    Empty,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(trimmed.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match (name, arg) {
            ("new", "") => Command::New,
            ("list", "") => Command::List,
            ("stop", "") => Command::Stop,
            ("json", "") => Command::Json,
            ("help", "") => Command::Help,
            ("quit" | "exit", "") => Command::Quit,
            ("select", arg) if !arg.is_empty() => Command::Select(match arg.parse::<usize>() {
                Ok(index) => Target::Index(index),
                Err(_) => Target::Id(arg.to_string()),
            }),
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "\
Type a message and press enter to send it.
  /new             start a new conversation
  /list            list conversations
  /select <n|id>   switch conversation
  /stop            stop generating
  /json            print the session as JSON
  /quit            exit";
