//! Parsing of terminal input lines into chat intents.

use std::path::PathBuf;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: a simulation request.
    Send(String),
    /// Attach an IDF file to the next send.
    Upload(PathBuf),
    History,
    Rerun(String),
    Compare(String),
    /// Show the current result's breakdown.
    Result,
    Clear,
    Reset,
    Help,
    Quit,
    /// Blank line.
    Empty,
    /// A slash command that could not be understood.
    Unknown(String),
}

pub const HELP: &str = "\
Type a building description to run a simulation. Commands:
  /upload <path>   attach an IDF file to the next message
  /history         refresh and list past simulations
  /rerun <id>      run a past simulation's message again
  /compare <id>    compare the current result with a past run
  /result          show the current result breakdown
  /clear           dismiss the current result
  /reset           start a new conversation
  /help            show this help
  /quit            exit";

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match (name, arg) {
            ("upload", path) if !path.is_empty() => Command::Upload(PathBuf::from(path)),
            ("history", "") => Command::History,
            ("rerun", id) if !id.is_empty() => Command::Rerun(id.to_string()),
            ("compare", id) if !id.is_empty() => Command::Compare(id.to_string()),
            ("result", "") => Command::Result,
            ("clear", "") => Command::Clear,
            ("reset", "") => Command::Reset,
            ("help", _) => Command::Help,
            ("quit", _) | ("exit", _) => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}
