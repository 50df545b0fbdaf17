//! Protocol limits and timing constants shared by server and client.

use std::time::Duration;

/// Largest inbound WebSocket message the server accepts, in bytes.
pub const MAX_FRAME_BYTES: usize = 512;

/// Maximum chat length after trimming, in characters.
pub const MAX_CHAT_CHARS: usize = 140;

/// Identity tokens longer than this are ignored.
pub const MAX_TOKEN_CHARS: usize = 64;

/// Minimum interval between accepted `move` messages from one participant.
pub const MOVE_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum interval between accepted `chat` messages from one participant.
pub const CHAT_INTERVAL: Duration = Duration::from_secs(1);

/// Client-side move rate limit (10 per second).
pub const CLIENT_MOVE_INTERVAL: Duration = Duration::from_millis(100);

/// How often the server pings an otherwise idle connection.
pub const PING_PERIOD: Duration = Duration::from_secs(30);

/// A connection without inbound activity for this long is considered dead.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(45);

/// Upper bound for a single socket write on the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of each participant's outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// Returns the token if it is usable as an identity key.
///
/// Empty tokens and tokens over [`MAX_TOKEN_CHARS`] are treated as absent.
pub fn sanitize_token(token: Option<&str>) -> Option<String> {
    match token {
        Some(t) if !t.is_empty() && t.chars().count() <= MAX_TOKEN_CHARS => Some(t.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_token_accepts_short_token() {
        // テスト項目: 64 文字以下のトークンはそのまま使われる
        // given (前提条件):
        let token = "a".repeat(MAX_TOKEN_CHARS);

        // when (操作):
        let result = sanitize_token(Some(&token));

        // then (期待する結果):
        assert_eq!(result, Some(token));
    }

    #[test]
    fn test_sanitize_token_rejects_long_token() {
        // テスト項目: 64 文字を超えるトークンは匿名扱いになる
        // given (前提条件):
        let token = "a".repeat(MAX_TOKEN_CHARS + 1);

        // when (操作):
        let result = sanitize_token(Some(&token));

        // then (期待する結果):
        assert_eq!(result, None);
    }

    #[test]
    fn test_sanitize_token_rejects_empty_and_missing() {
        // テスト項目: 空文字列と未指定は匿名扱いになる
        // given (前提条件):

        // when (操作):
        let empty = sanitize_token(Some(""));
        let missing = sanitize_token(None);

        // then (期待する結果):
        assert_eq!(empty, None);
        assert_eq!(missing, None);
    }
}
