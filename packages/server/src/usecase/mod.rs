//! UseCase 層: 接続・受信メッセージ処理・切断
//!
//! ソケットの入出力は UI 層（`ui::handler::websocket`）が担当し、
//! ここでは Hub に対する操作の順序と判定ロジックだけを扱う。

mod connect_participant;
mod disconnect_participant;
mod error;
mod handle_message;

pub use connect_participant::{ConnectParticipantUseCase, PendingParticipant};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::ConnectError;
pub use handle_message::{HandleMessageUseCase, InboundOutcome};
