//! Input line parsing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Click at a normalized canvas position
    Move { x: f64, y: f64 },
    /// Click at a grid cell
    Click { col: usize, row: usize },
    Look,
    Who,
    Quit,
    Chat(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown command '{0}' (try /move, /click, /look, /who, /quit)")]
    Unknown(String),
}

impl Command {
    /// Lines starting with `/` are commands; anything else is chat.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Chat(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match name {
            "move" => match args.as_slice() {
                [x, y] => match (x.parse::<f64>(), y.parse::<f64>()) {
                    (Ok(x), Ok(y)) => Ok(Self::Move { x, y }),
                    _ => Err(CommandError::Usage("/move <x> <y>  (0.0 to 1.0)")),
                },
                _ => Err(CommandError::Usage("/move <x> <y>  (0.0 to 1.0)")),
            },
            "click" => match args.as_slice() {
                [col, row] => match (col.parse::<usize>(), row.parse::<usize>()) {
                    (Ok(col), Ok(row)) => Ok(Self::Click { col, row }),
                    _ => Err(CommandError::Usage("/click <col> <row>")),
                },
                _ => Err(CommandError::Usage("/click <col> <row>")),
            },
            "look" => Ok(Self::Look),
            "who" => Ok(Self::Who),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
