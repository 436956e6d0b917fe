//! Chat input parsing

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Symptom description or other free text
    Say(String),
    ToggleLanguage,
    /// Spoken input from a WAV file
    Listen(PathBuf),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name.to_lowercase().as_str() {
            "lang" | "language" => Command::ToggleLanguage,
            "listen" if !arg.is_empty() => Command::Listen(PathBuf::from(arg)),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /lang               Switch between English and Hindi
  /listen <file.wav>  Speak to the doctor using a recorded WAV file
  /help               Show this help
  /quit               Leave the chat
Anything else is read as a description of your symptoms.";
