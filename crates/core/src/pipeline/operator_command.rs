use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("enroll needs a name, e.g. `c alice`")]
    MissingName,
    #[error("unknown command `{0}` (expected `c <name>` or `q`)")]
    Unknown(String),
}

/// A command typed at the operator console while the watch loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Enroll the most prominent face of the latest frame under this name.
    Enroll(String),
    Quit,
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "" => Err(CommandParseError::Empty),
            "q" | "quit" => Ok(Self::Quit),
            "c" | "enroll" if rest.is_empty() => Err(CommandParseError::MissingName),
            "c" | "enroll" => Ok(Self::Enroll(rest.to_string())),
            _ => Err(CommandParseError::Unknown(verb.to_string())),
        }
    }
}
