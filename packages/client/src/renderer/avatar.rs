//! Per-participant visual state.

use std::time::Duration;

use hiroba_shared::{position::Position, time::duration_millis};

use super::wrap::{BUBBLE_WRAP_WIDTH, wrap_text};

/// Fraction of the remaining distance covered each frame.
pub const EASE_FACTOR: f64 = 0.12;
pub const FADE_IN_STEP: f64 = 0.05;
pub const BUBBLE_HOLD: Duration = Duration::from_secs(10);
pub const BUBBLE_FADE_STEP: f64 = 0.05;

// Opacity at or below this counts as fully faded.
const OPACITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatBubble {
    pub text: String,
    pub lines: Vec<String>,
    pub expires_at: i64,
    pub opacity: f64,
}

impl ChatBubble {
    pub fn new(text: &str, now_millis: i64) -> Self {
        Self {
            text: text.to_string(),
            lines: wrap_text(text, BUBBLE_WRAP_WIDTH),
            expires_at: now_millis.saturating_add(duration_millis(BUBBLE_HOLD)),
            opacity: 1.0,
        }
    }

    /// Advances one frame. Returns `false` once the bubble has faded out.
    fn step(&mut self, now_millis: i64) -> bool {
        if now_millis >= self.expires_at {
            self.opacity -= BUBBLE_FADE_STEP;
        }
        if self.opacity <= OPACITY_EPSILON {
            self.opacity = 0.0;
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub id: String,
    pub name: String,
    pub target: Position,
    pub current: Position,
    pub opacity: f64,
    pub bubble: Option<ChatBubble>,
    pub is_self: bool,
}

impl Avatar {
    /// New avatars appear at their position, fully transparent.
    pub fn new(id: &str, name: &str, position: Position, is_self: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            target: position,
            current: position,
            opacity: 0.0,
            bubble: None,
            is_self,
        }
    }

    pub fn set_target(&mut self, target: Position) {
        self.target = target;
    }

    /// Replaces any bubble currently shown.
    pub fn show_chat(&mut self, text: &str, now_millis: i64) {
        self.bubble = Some(ChatBubble::new(text, now_millis));
    }

    pub fn step(&mut self, now_millis: i64) {
        self.current.x += (self.target.x - self.current.x) * EASE_FACTOR;
        self.current.y += (self.target.y - self.current.y) * EASE_FACTOR;
        self.opacity = (self.opacity + FADE_IN_STEP).min(1.0);

        if let Some(bubble) = &mut self.bubble
            && !bubble.step(now_millis)
        {
            self.bubble = None;
        }
    }
}
