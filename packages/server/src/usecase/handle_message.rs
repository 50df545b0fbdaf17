//! UseCase: 受信メッセージ処理（move / chat）
//!
//! ## 判定ルール
//!
//! - move: 100ms 以内の連続は破棄。座標は [0, 1] に丸め、送信者以外へ `moved`
//! - chat: 1 秒以内の連続は破棄。trim 後に空なら破棄、140 文字で切り詰め、
//!   送信者を含む全員へ `chatted`（送信者はこのエコーで自分の吹き出しを描く）
//! - 不正なフレームは黙って捨てる（接続は維持）

use std::sync::Arc;

use hiroba_shared::{
    protocol::{ClientMessage, ServerMessage},
    time::Clock,
};

use crate::{domain::ParticipantSession, hub::ConnectionHub};

/// 1 フレームを処理した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Moved { recipients: usize },
    Chatted { recipients: usize },
    Rejected,
    Ignored,
}

/// 受信メッセージ処理のユースケース
pub struct HandleMessageUseCase {
    hub: Arc<ConnectionHub>,
    clock: Arc<dyn Clock>,
}

impl HandleMessageUseCase {
    /// 新しい HandleMessageUseCase を作成
    pub fn new(hub: Arc<ConnectionHub>, clock: Arc<dyn Clock>) -> Self {
        Self { hub, clock }
    }

    /// テキストフレームを 1 つ処理する
    ///
    /// # Arguments
    ///
    /// * `session` - 送信者の接続ローカル状態（reader タスクが所有）
    /// * `frame` - 受信した JSON テキスト
    pub async fn execute(&self, session: &mut ParticipantSession, frame: &str) -> InboundOutcome {
        let message = match ClientMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Discarding frame from '{}': {}", session.id, e);
                return InboundOutcome::Ignored;
            }
        };

        let now = self.clock.now_millis();
        match message {
            ClientMessage::Move { x, y } => {
                let Some(position) = session.accept_move(x, y, now) else {
                    tracing::debug!("Move from '{}' throttled", session.id);
                    return InboundOutcome::Rejected;
                };
                self.hub.update_position(&session.id, position).await;

                let moved = ServerMessage::Moved {
                    id: session.id.as_str().to_string(),
                    x: position.x,
                    y: position.y,
                };
                let recipients = self.broadcast(&moved, Some(&*session)).await;
                InboundOutcome::Moved { recipients }
            }
            ClientMessage::Chat { text } => {
                let Some(text) = session.accept_chat(&text, now) else {
                    tracing::debug!("Chat from '{}' throttled or empty", session.id);
                    return InboundOutcome::Rejected;
                };
                tracing::info!("{} ({}) says: {}", session.name, session.id, text);

                let chatted = ServerMessage::Chatted {
                    id: session.id.as_str().to_string(),
                    text,
                };
                let recipients = self.broadcast(&chatted, None).await;
                InboundOutcome::Chatted { recipients }
            }
        }
    }

    async fn broadcast(&self, message: &ServerMessage, exclude: Option<&ParticipantSession>) -> usize {
        match message.encode() {
            Ok(payload) => self.hub.broadcast(&payload, exclude.map(|s| &s.id)).await,
            Err(e) => {
                tracing::warn!("Failed to encode broadcast: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HubConfig,
        domain::{Identity, ParticipantId},
        hub::Participant,
    };
    use hiroba_shared::{limits::MAX_CHAT_CHARS, position::Position, time::ManualClock};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        hub: Arc<ConnectionHub>,
        clock: Arc<ManualClock>,
        usecase: HandleMessageUseCase,
        sender: ParticipantSession,
        sender_rx: mpsc::Receiver<String>,
        peer_rx: mpsc::Receiver<String>,
    }

    async fn register(hub: &ConnectionHub, id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        hub.register(Participant {
            id: ParticipantId::from(id),
            token: None,
            name: id.to_string(),
            position: Position { x: 0.5, y: 0.5 },
            outbound: tx,
        })
        .await;
        rx
    }

    async fn fixture() -> Fixture {
        let hub = Arc::new(ConnectionHub::new(&HubConfig::default()));
        let clock = Arc::new(ManualClock::new(10_000));
        let usecase = HandleMessageUseCase::new(hub.clone(), clock.clone());
        let sender_rx = register(&hub, "alice").await;
        let peer_rx = register(&hub, "bob").await;
        let sender = ParticipantSession::new(
            ParticipantId::from("alice"),
            None,
            Identity {
                name: "alice".to_string(),
                position: Position { x: 0.5, y: 0.5 },
            },
        );
        Fixture {
            hub,
            clock,
            usecase,
            sender,
            sender_rx,
            peer_rx,
        }
    }

    #[tokio::test]
    async fn test_move_is_clamped_and_sent_to_others_only() {
        // テスト項目: move は丸められて送信者以外へ配信される
        // given (前提条件):
        let mut f = fixture().await;

        // when (操作):
        let outcome = f
            .usecase
            .execute(&mut f.sender, r#"{"type":"move","x":1.7,"y":-0.3}"#)
            .await;

        // then (期待する結果):
        assert_eq!(outcome, InboundOutcome::Moved { recipients: 1 });
        let moved = ServerMessage::decode(&f.peer_rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            moved,
            ServerMessage::Moved {
                id: "alice".to_string(),
                x: 1.0,
                y: 0.0
            }
        );
        assert!(f.sender_rx.try_recv().is_err());
        assert_eq!(
            f.hub.position_of(&ParticipantId::from("alice")).await,
            Some(Position { x: 1.0, y: 0.0 })
        );
    }

    #[tokio::test]
    async fn test_two_quick_moves_yield_one_broadcast() {
        // テスト項目: 100ms 以内の 2 回の move は 1 回だけ配信される
        // given (前提条件):
        let mut f = fixture().await;
        f.usecase
            .execute(&mut f.sender, r#"{"type":"move","x":0.4,"y":0.6}"#)
            .await;

        // when (操作):
        f.clock.advance(Duration::from_millis(50));
        let second = f
            .usecase
            .execute(&mut f.sender, r#"{"type":"move","x":0.1,"y":0.1}"#)
            .await;

        // then (期待する結果):
        assert_eq!(second, InboundOutcome::Rejected);
        assert!(f.peer_rx.recv().await.is_some());
        assert!(f.peer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_is_echoed_to_sender_and_truncated() {
        // テスト項目: chat は送信者を含む全員へ配信され、140 文字に切り詰められる
        // given (前提条件):
        let mut f = fixture().await;
        let long = "x".repeat(MAX_CHAT_CHARS + 60);
        let frame = serde_json::json!({"type": "chat", "text": format!("  {long}  ")}).to_string();

        // when (操作):
        let outcome = f.usecase.execute(&mut f.sender, &frame).await;

        // then (期待する結果):
        assert_eq!(outcome, InboundOutcome::Chatted { recipients: 2 });
        for rx in [&mut f.sender_rx, &mut f.peer_rx] {
            match ServerMessage::decode(&rx.recv().await.unwrap()).unwrap() {
                ServerMessage::Chatted { id, text } => {
                    assert_eq!(id, "alice");
                    assert_eq!(text.chars().count(), MAX_CHAT_CHARS);
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_two_quick_chats_yield_one_broadcast() {
        // テスト項目: 1 秒以内の 2 回の chat は 1 回だけ配信される
        // given (前提条件):
        let mut f = fixture().await;
        f.usecase
            .execute(&mut f.sender, r#"{"type":"chat","text":"hello"}"#)
            .await;

        // when (操作):
        f.clock.advance(Duration::from_millis(500));
        let second = f
            .usecase
            .execute(&mut f.sender, r#"{"type":"chat","text":"again"}"#)
            .await;
        f.clock.advance(Duration::from_millis(500));
        let third = f
            .usecase
            .execute(&mut f.sender, r#"{"type":"chat","text":"later"}"#)
            .await;

        // then (期待する結果):
        assert_eq!(second, InboundOutcome::Rejected);
        assert_eq!(third, InboundOutcome::Chatted { recipients: 2 });
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        // テスト項目: 不正なフレームは無視され何も配信されない
        // given (前提条件):
        let mut f = fixture().await;

        // when (操作):
        let outcomes = [
            f.usecase.execute(&mut f.sender, "{oops").await,
            f.usecase
                .execute(&mut f.sender, r#"{"type":"dance"}"#)
                .await,
            f.usecase
                .execute(&mut f.sender, r#"{"type":"chat","text":"   "}"#)
                .await,
        ];

        // then (期待する結果):
        assert_eq!(outcomes[0], InboundOutcome::Ignored);
        assert_eq!(outcomes[1], InboundOutcome::Ignored);
        assert_eq!(outcomes[2], InboundOutcome::Rejected);
        assert!(f.peer_rx.try_recv().is_err());
    }
}
