//! Input line parsing
//!
//! Plain lines are questions for the assistant. Lines starting with `/` are
//! commands.

/// One line of user input, interpreted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Ask the assistant
    Send(String),
    /// Stop the streaming reply
    Stop,
    /// Start a new conversation
    New,
    /// Show the sentiment cards
    Cards,
    /// Show trending keywords, optionally for one commodity
    Trending(Option<String>),
    /// Show the time series for a commodity
    Series(String),
    /// Show recent news for a commodity
    News(String),
    /// Check the backend
    Health,
    /// Show the command list
    Help,
    /// Leave
    Quit,
    /// A command that needs an argument was given none
    MissingArgument(&'static str),
    /// Anything else starting with `/`
    Unknown(String),
}

/// Help text for `/help`
pub const HELP: &str = "\
Type a question and press enter to ask the assistant.

  /stop                 stop the streaming reply
  /new                  start a new conversation
  /cards                latest sentiment per commodity
  /trending [commodity] trending keywords
  /series <commodity>   daily sentiment and price
  /news <commodity>     recent scored articles
  /health               check the backend
  /quit                 leave (Ctrl-D works too)

Ctrl-C stops a streaming reply, or quits when nothing is streaming.";

impl Command {
    /// Parse one input line; `None` for a blank line
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Send(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        let command = match (name.to_ascii_lowercase().as_str(), arg) {
            ("stop", _) => Self::Stop,
            ("new", _) => Self::New,
            ("cards", _) => Self::Cards,
            ("trending", arg) => Self::Trending(arg.map(ToString::to_string)),
            ("series", Some(arg)) => Self::Series(arg.to_string()),
            ("series", None) => Self::MissingArgument("series"),
            ("news", Some(arg)) => Self::News(arg.to_string()),
            ("news", None) => Self::MissingArgument("news"),
            ("health", _) => Self::Health,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        };
        Some(command)
    }
}
