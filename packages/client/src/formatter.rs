//! Message formatting utilities for terminal display.

use hiroba_shared::protocol::UserInfo;

use crate::renderer::Avatar;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the greeting shown after `welcome`
    ///
    /// # Arguments
    ///
    /// * `name` - The name the hub assigned to us
    /// * `others` - Everyone who was already present
    pub fn format_welcome(name: &str, others: &[UserInfo]) -> String {
        let mut output = format!("\n\n{RULE}\nYou are {name}.\n");
        if others.is_empty() {
            output.push_str("Nobody else is here yet.\n");
        } else {
            output.push_str("Also here:\n");
            for user in others {
                output.push_str(&format!("  {}\n", user.name));
            }
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// `at` is a time-of-day label such as `14:03:27`.
    pub fn format_joined(name: &str, at: &str) -> String {
        format!("\n+ {} arrived at {}\n", name, at)
    }

    pub fn format_left(name: &str, at: &str) -> String {
        format!("\n- {} left at {}\n", name, at)
    }

    pub fn format_chat(name: &str, text: &str, at: &str) -> String {
        format!("\n[{}] @{}: {}\n", at, name, text)
    }

    /// Format the `/who` listing
    ///
    /// Positions are shown as percentages of the canvas.
    pub fn format_participants(avatars: &[Avatar]) -> String {
        let mut output = format!("\n{RULE}\nParticipants:\n");
        if avatars.is_empty() {
            output.push_str("(No participants)\n");
        }
        for avatar in avatars {
            let me_suffix = if avatar.is_self { " (me)" } else { "" };
            output.push_str(&format!(
                "{}{} at ({:.0}%, {:.0}%)\n",
                avatar.name,
                me_suffix,
                avatar.target.x * 100.0,
                avatar.target.y * 100.0
            ));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Frame the latest rendered grid for `/look`
    pub fn format_frame(frame: &str, cols: usize) -> String {
        let border = format!("+{}+", "-".repeat(cols));
        let mut output = format!("\n{border}\n");
        for line in frame.split('\n') {
            output.push_str(&format!("|{:<width$}|\n", line, width = cols));
        }
        output.push_str(&border);
        output.push('\n');
        output
    }
}
