//! One live participant as seen by its own connection.

use std::fmt;

use hiroba_shared::{
    limits::{CHAT_INTERVAL, MAX_CHAT_CHARS, MOVE_INTERVAL},
    position::Position,
    protocol::UserInfo,
    throttle::Throttle,
};
use uuid::Uuid;

use super::identity::Identity;

/// Process-unique participant id, generated per connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn generate() -> Self {
        Self(format!("u{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Trim, reject empty, cap at [`MAX_CHAT_CHARS`] characters.
pub fn normalize_chat(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_CHAT_CHARS).collect())
}

/// Connection-local state: identity, last position and the throttles.
///
/// Owned by the connection's reader task, so the throttle bookkeeping needs
/// no lock.
#[derive(Debug)]
pub struct ParticipantSession {
    pub id: ParticipantId,
    pub token: Option<String>,
    pub name: String,
    pub position: Position,
    move_throttle: Throttle,
    chat_throttle: Throttle,
}

impl ParticipantSession {
    pub fn new(id: ParticipantId, token: Option<String>, identity: Identity) -> Self {
        Self {
            id,
            token,
            name: identity.name,
            position: Position::clamped(identity.position.x, identity.position.y),
            move_throttle: Throttle::new(MOVE_INTERVAL),
            chat_throttle: Throttle::new(CHAT_INTERVAL),
        }
    }

    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            id: self.id.as_str().to_string(),
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
        }
    }

    /// Apply a move request. `None` when throttled.
    pub fn accept_move(&mut self, x: f64, y: f64, now_millis: i64) -> Option<Position> {
        if !self.move_throttle.try_acquire(now_millis) {
            return None;
        }
        self.position = Position::clamped(x, y);
        Some(self.position)
    }

    /// Apply a chat request. `None` when throttled or empty after trimming.
    ///
    /// Rejected chats do not consume the throttle window.
    pub fn accept_chat(&mut self, text: &str, now_millis: i64) -> Option<String> {
        if !self.chat_throttle.is_ready(now_millis) {
            return None;
        }
        let text = normalize_chat(text)?;
        self.chat_throttle.mark(now_millis);
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiroba_shared::time::{Clock, ManualClock};
    use std::time::Duration;

    fn session() -> ParticipantSession {
        ParticipantSession::new(
            ParticipantId::from("u1"),
            Some("tok".to_string()),
            Identity {
                name: "fuzzy kale".to_string(),
                position: Position { x: 0.5, y: 0.5 },
            },
        )
    }

    #[test]
    fn test_generated_ids_are_unique() {
        // テスト項目: 生成される ID は一意で "u" から始まる
        // given (前提条件):

        // when (操作):
        let a = ParticipantId::generate();
        let b = ParticipantId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
        assert!(a.as_str().starts_with('u'));
    }

    #[test]
    fn test_accept_move_clamps_coordinates() {
        // テスト項目: 範囲外の座標は [0, 1] に丸めて保存される
        // given (前提条件):
        let mut session = session();

        // when (操作):
        let accepted = session.accept_move(-2.0, 7.5, 0);

        // then (期待する結果):
        assert_eq!(accepted, Some(Position { x: 0.0, y: 1.0 }));
        assert_eq!(session.position, Position { x: 0.0, y: 1.0 });
    }

    #[test]
    fn test_accept_move_throttles_within_100ms() {
        // テスト項目: 100ms 未満の連続 move は 2 回目が拒否される
        // given (前提条件):
        let mut session = session();
        session.accept_move(0.1, 0.1, 1_000);

        // when (操作):
        let rejected = session.accept_move(0.9, 0.9, 1_050);
        let accepted = session.accept_move(0.8, 0.8, 1_100);

        // then (期待する結果):
        assert_eq!(rejected, None);
        assert_eq!(accepted, Some(Position { x: 0.8, y: 0.8 }));
    }

    #[test]
    fn test_moves_keep_flowing_after_clock_steps_back() {
        // テスト項目: 時計が 60 秒巻き戻っても move / chat が受け付けられ続ける
        // given (前提条件):
        let clock = ManualClock::new(1_000_000);
        let mut session = session();
        assert!(session.accept_move(0.5, 0.5, clock.now_millis()).is_some());
        assert!(session.accept_chat("before", clock.now_millis()).is_some());
        clock.set(1_000_000 - 60_000);

        // when (操作): 巻き戻った時刻から 1 秒おきに 50 回 move
        let mut accepted_moves = 0;
        for _ in 0..50 {
            clock.advance(Duration::from_secs(1));
            if session.accept_move(0.4, 0.6, clock.now_millis()).is_some() {
                accepted_moves += 1;
            }
        }
        let chat = session.accept_chat("after", clock.now_millis());

        // then (期待する結果):
        assert_eq!(accepted_moves, 50);
        assert_eq!(chat.as_deref(), Some("after"));
    }

    #[test]
    fn test_accept_chat_throttles_within_one_second() {
        // テスト項目: 1 秒未満の連続 chat は 2 回目が拒否される
        // given (前提条件):
        let mut session = session();
        assert!(session.accept_chat("hello", 0).is_some());

        // when (操作):
        let rejected = session.accept_chat("again", 999);
        let accepted = session.accept_chat("later", 1_000);

        // then (期待する結果):
        assert_eq!(rejected, None);
        assert_eq!(accepted.as_deref(), Some("later"));
    }

    #[test]
    fn test_empty_chat_does_not_consume_window() {
        // テスト項目: 空白のみの chat は破棄され、スロットル窓を消費しない
        // given (前提条件):
        let mut session = session();

        // when (操作):
        let blank = session.accept_chat("   \t ", 0);
        let real = session.accept_chat("hi", 10);

        // then (期待する結果):
        assert_eq!(blank, None);
        assert_eq!(real.as_deref(), Some("hi"));
    }

    #[test]
    fn test_normalize_chat_truncates_to_140_chars() {
        // テスト項目: 140 文字を超える chat は切り詰められる（マルチバイトでも壊れない）
        // given (前提条件):
        let long = format!("  {}  ", "あ".repeat(200));

        // when (操作):
        let text = normalize_chat(&long).unwrap();

        // then (期待する結果):
        assert_eq!(text.chars().count(), MAX_CHAT_CHARS);
        assert!(text.chars().all(|c| c == 'あ'));
    }
}
