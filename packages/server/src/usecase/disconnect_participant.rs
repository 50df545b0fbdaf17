//! UseCase: 参加者切断処理
//!
//! ## 順序
//!
//! 1. 最終位置を Identity に保存（トークンがある場合）
//! 2. Hub から登録解除（送信キューが閉じる）
//! 3. 残りの全員へ `leave`
//!
//! 登録解除の後では live な位置が失われるため、保存は必ず先に行う。

use std::sync::Arc;

use hiroba_shared::protocol::ServerMessage;

use crate::{domain::ParticipantId, hub::ConnectionHub};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    hub: Arc<ConnectionHub>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(hub: Arc<ConnectionHub>) -> Self {
        Self { hub }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// 登録されていた参加者を取り除いた場合は `true`
    pub async fn execute(&self, id: &ParticipantId, token: Option<&str>) -> bool {
        if let (Some(token), Some(position)) = (token, self.hub.position_of(id).await) {
            self.hub.persist_identity(token, position).await;
        }

        if !self.hub.unregister(id).await {
            return false;
        }

        match (ServerMessage::Leave {
            id: id.as_str().to_string(),
        })
        .encode()
        {
            Ok(payload) => {
                let recipients = self.hub.broadcast(&payload, None).await;
                tracing::debug!("Broadcasted leave for '{}' to {} participant(s)", id, recipients);
            }
            Err(e) => tracing::warn!("Failed to encode leave for '{}': {}", id, e),
        }
        true
    }

    /// 残りの参加者数を取得
    pub async fn count_remaining_participants(&self) -> usize {
        self.hub.len().await
    }
}
