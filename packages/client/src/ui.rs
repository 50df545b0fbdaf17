//! UI utilities for the client.

use std::io::Write;

pub const PROMPT: &str = "> ";

/// Print `text`, then redisplay the prompt
pub fn print_notice(text: &str) {
    print!("{}", text);
    redisplay_prompt();
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}
