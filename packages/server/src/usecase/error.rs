//! UseCase 層のエラー型

use hiroba_shared::protocol::ProtocolError;
use thiserror::Error;

/// 参加者の受け入れに失敗した理由
#[derive(Debug, Error)]
pub enum ConnectError {
    /// welcome / join のエンコードに失敗
    #[error("failed to encode admission message: {0}")]
    Encode(#[from] ProtocolError),

    /// welcome を送信キューに積めなかった（接続が既に閉じている）
    #[error("participant '{0}' went away before the welcome was queued")]
    WelcomeNotQueued(String),
}
