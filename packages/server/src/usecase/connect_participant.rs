//! UseCase: 参加者接続処理
//!
//! ## 受け入れの順序
//!
//! 1. トークンから Identity を解決（未知なら新規作成）
//! 2. 新しい participant id と送信キューを用意（`prepare`）
//! 3. UI 層が writer タスクを起動
//! 4. Hub に登録し、本人へ welcome、他の全員へ join（`admit`）

use std::sync::Arc;

use hiroba_shared::protocol::ServerMessage;
use tokio::sync::mpsc;

use crate::{
    domain::{ParticipantId, ParticipantSession},
    hub::{ConnectionHub, OutboundSender, Participant},
};

use super::error::ConnectError;

/// `prepare` の結果: まだ Hub に登録されていない参加者
#[derive(Debug)]
pub struct PendingParticipant {
    pub session: ParticipantSession,
    pub outbound: OutboundSender,
    pub outbound_rx: mpsc::Receiver<String>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    hub: Arc<ConnectionHub>,
    queue_capacity: usize,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(hub: Arc<ConnectionHub>, queue_capacity: usize) -> Self {
        Self {
            hub,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Identity を解決し、送信キューを持つ未登録の参加者を作る
    ///
    /// # Arguments
    ///
    /// * `token` - 検証済みの identity トークン（匿名なら `None`）
    pub async fn prepare(&self, token: Option<String>) -> PendingParticipant {
        let identity = self.hub.resolve_identity(token.as_deref()).await;
        let (outbound, outbound_rx) = mpsc::channel(self.queue_capacity);
        let session = ParticipantSession::new(ParticipantId::generate(), token, identity);

        PendingParticipant {
            session,
            outbound,
            outbound_rx,
        }
    }

    /// Hub に登録し、welcome と join を送る
    ///
    /// writer タスクが送信キューを読み始めた後に呼ぶこと。
    pub async fn admit(
        &self,
        session: &ParticipantSession,
        outbound: OutboundSender,
    ) -> Result<(), ConnectError> {
        let me = session.user_info();

        self.hub
            .register(Participant {
                id: session.id.clone(),
                token: session.token.clone(),
                name: session.name.clone(),
                position: session.position,
                outbound,
            })
            .await;

        let welcome = ServerMessage::Welcome {
            id: me.id.clone(),
            name: me.name.clone(),
            x: me.x,
            y: me.y,
            users: self.hub.snapshot(Some(&session.id)).await,
        }
        .encode()?;
        if !self.hub.send_to(&session.id, &welcome).await {
            return Err(ConnectError::WelcomeNotQueued(me.id));
        }

        let join = ServerMessage::join(&me).encode()?;
        let recipients = self.hub.broadcast(&join, Some(&session.id)).await;

        tracing::info!(
            "{} ({}) joined at ({:.2}, {:.2}), announced to {} participant(s)",
            me.name,
            me.id,
            me.x,
            me.y,
            recipients
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;

    fn create_test_hub() -> Arc<ConnectionHub> {
        Arc::new(ConnectionHub::new(&HubConfig::default()))
    }

    async fn connect(usecase: &ConnectParticipantUseCase, token: Option<&str>) -> PendingParticipant {
        let pending = usecase.prepare(token.map(str::to_string)).await;
        usecase
            .admit(&pending.session, pending.outbound.clone())
            .await
            .unwrap();
        pending
    }

    #[tokio::test]
    async fn test_first_participant_gets_empty_welcome() {
        // テスト項目: 最初の参加者は users が空の welcome を受け取る
        // given (前提条件):
        let hub = create_test_hub();
        let usecase = ConnectParticipantUseCase::new(hub.clone(), 8);

        // when (操作):
        let mut alice = connect(&usecase, None).await;

        // then (期待する結果):
        let frame = alice.outbound_rx.recv().await.unwrap();
        match ServerMessage::decode(&frame).unwrap() {
            ServerMessage::Welcome { id, users, x, y, .. } => {
                assert_eq!(id, alice.session.id.as_str());
                assert!(users.is_empty());
                assert_eq!((x, y), (alice.session.position.x, alice.session.position.y));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(hub.len().await, 1);
    }

    #[tokio::test]
    async fn test_second_participant_is_announced_to_first() {
        // テスト項目: 2 人目の接続時、1 人目に join が届き、2 人目の welcome に 1 人目が含まれる
        // given (前提条件):
        let hub = create_test_hub();
        let usecase = ConnectParticipantUseCase::new(hub.clone(), 8);
        let mut alice = connect(&usecase, None).await;
        let _alice_welcome = alice.outbound_rx.recv().await.unwrap();

        // when (操作):
        let mut bob = connect(&usecase, None).await;

        // then (期待する結果):
        let join = ServerMessage::decode(&alice.outbound_rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            join,
            ServerMessage::join(&bob.session.user_info())
        );
        match ServerMessage::decode(&bob.outbound_rx.recv().await.unwrap()).unwrap() {
            ServerMessage::Welcome { users, .. } => {
                assert_eq!(users, vec![alice.session.user_info()]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_token_resolves_same_identity() {
        // テスト項目: 同じトークンでの接続は同じ名前と位置を引き継ぐ
        // given (前提条件):
        let hub = create_test_hub();
        let usecase = ConnectParticipantUseCase::new(hub.clone(), 8);
        let first = usecase.prepare(Some("tok".to_string())).await;

        // when (操作):
        let second = usecase.prepare(Some("tok".to_string())).await;

        // then (期待する結果):
        assert_eq!(first.session.name, second.session.name);
        assert_eq!(first.session.position, second.session.position);
        assert_ne!(first.session.id, second.session.id);
    }

    #[tokio::test]
    async fn test_admit_fails_when_queue_already_closed() {
        // テスト項目: writer 側が既に閉じている場合は welcome を積めずエラーになる
        // given (前提条件):
        let hub = create_test_hub();
        let usecase = ConnectParticipantUseCase::new(hub.clone(), 8);
        let pending = usecase.prepare(None).await;
        let PendingParticipant {
            session,
            outbound,
            outbound_rx,
        } = pending;
        drop(outbound_rx);

        // when (操作):
        let result = usecase.admit(&session, outbound).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::WelcomeNotQueued(_))));
    }
}
