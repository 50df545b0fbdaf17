//! Connection hub: the live participant registry and its fan-out.
//!
//! ## Locking
//!
//! One `RwLock` guards both the live participant map and the identity store.
//! Fan-out and snapshots take the shared lock; registration, removal,
//! position and identity updates take the exclusive lock. Nothing awaits
//! socket I/O while holding it: delivery is a non-blocking `try_send` onto
//! each participant's bounded outbound queue.
//!
//! ## Backpressure
//!
//! A full queue drops that one message for that one recipient. Presence data
//! is superseded by the next update, so the broadcaster never waits.

use std::collections::HashMap;

use hiroba_shared::{position::Position, protocol::UserInfo};
use tokio::sync::{RwLock, mpsc};

use crate::{
    config::HubConfig,
    domain::{Identity, IdentityStore, ParticipantId},
};

/// Sending half of a participant's outbound queue.
pub type OutboundSender = mpsc::Sender<String>;

/// Everything the hub needs to know to fan out to one participant.
#[derive(Debug)]
pub struct Participant {
    pub id: ParticipantId,
    pub token: Option<String>,
    pub name: String,
    pub position: Position,
    pub outbound: OutboundSender,
}

#[derive(Debug)]
struct HubInner {
    participants: HashMap<ParticipantId, Participant>,
    identities: IdentityStore,
}

/// Registry of live participants plus the identity memory.
#[derive(Debug)]
pub struct ConnectionHub {
    inner: RwLock<HubInner>,
}

impl ConnectionHub {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            inner: RwLock::new(HubInner {
                participants: HashMap::new(),
                identities: IdentityStore::new(config.identity_capacity),
            }),
        }
    }

    pub async fn register(&self, participant: Participant) {
        let mut inner = self.inner.write().await;
        tracing::debug!("Participant '{}' registered to hub", participant.id);
        inner
            .participants
            .insert(participant.id.clone(), participant);
    }

    /// Remove a participant. Dropping its sender closes the outbound queue,
    /// which lets the writer task finish.
    pub async fn unregister(&self, id: &ParticipantId) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.participants.remove(id).is_some();
        if removed {
            tracing::debug!("Participant '{}' unregistered from hub", id);
        }
        removed
    }

    /// Enqueue `payload` for every live participant except `exclude`.
    ///
    /// Returns the number of recipients the payload was queued for.
    pub async fn broadcast(&self, payload: &str, exclude: Option<&ParticipantId>) -> usize {
        let inner = self.inner.read().await;
        let mut delivered = 0;
        for (id, participant) in inner.participants.iter() {
            if Some(id) == exclude {
                continue;
            }
            if enqueue(participant, payload) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Enqueue `payload` for one participant, with the same drop semantics
    /// as [`ConnectionHub::broadcast`].
    pub async fn send_to(&self, id: &ParticipantId, payload: &str) -> bool {
        let inner = self.inner.read().await;
        match inner.participants.get(id) {
            Some(participant) => enqueue(participant, payload),
            None => false,
        }
    }

    /// Public view of every live participant except `exclude`, ordered by id.
    pub async fn snapshot(&self, exclude: Option<&ParticipantId>) -> Vec<UserInfo> {
        let inner = self.inner.read().await;
        let mut users: Vec<UserInfo> = inner
            .participants
            .values()
            .filter(|p| Some(&p.id) != exclude)
            .map(|p| UserInfo {
                id: p.id.as_str().to_string(),
                name: p.name.clone(),
                x: p.position.x,
                y: p.position.y,
            })
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub async fn resolve_identity(&self, token: Option<&str>) -> Identity {
        let mut inner = self.inner.write().await;
        inner.identities.resolve(token, &mut rand::rng())
    }

    pub async fn persist_identity(&self, token: &str, position: Position) -> bool {
        let mut inner = self.inner.write().await;
        inner.identities.remember(token, position)
    }

    pub async fn update_position(&self, id: &ParticipantId, position: Position) -> bool {
        let mut inner = self.inner.write().await;
        match inner.participants.get_mut(id) {
            Some(participant) => {
                participant.position = Position::clamped(position.x, position.y);
                true
            }
            None => false,
        }
    }

    pub async fn position_of(&self, id: &ParticipantId) -> Option<Position> {
        let inner = self.inner.read().await;
        inner.participants.get(id).map(|p| p.position)
    }

    pub async fn contains(&self, id: &ParticipantId) -> bool {
        self.inner.read().await.participants.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.participants.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn remembered_identities(&self) -> usize {
        self.inner.read().await.identities.len()
    }
}

fn enqueue(participant: &Participant, payload: &str) -> bool {
    match participant.outbound.try_send(payload.to_string()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!(
                "Outbound queue full for '{}', dropping message",
                participant.id
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("Outbound queue closed for '{}'", participant.id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // 【何をテストするか】
    // - register / unregister による登録管理
    // - broadcast: 除外指定、キュー満杯時のドロップ
    // - snapshot: 自分以外の一覧
    // - resolve_identity / persist_identity
    // ========================================

    fn hub() -> ConnectionHub {
        ConnectionHub::new(&HubConfig::default())
    }

    fn participant(id: &str, capacity: usize) -> (Participant, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let participant = Participant {
            id: ParticipantId::from(id),
            token: None,
            name: format!("name-{id}"),
            position: Position { x: 0.5, y: 0.5 },
            outbound: tx,
        };
        (participant, rx)
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        // テスト項目: 除外指定した参加者以外に配信される
        // given (前提条件):
        let hub = hub();
        let (alice, mut alice_rx) = participant("alice", 4);
        let (bob, mut bob_rx) = participant("bob", 4);
        hub.register(alice).await;
        hub.register(bob).await;

        // when (操作):
        let delivered = hub
            .broadcast("payload", Some(&ParticipantId::from("alice")))
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert_eq!(bob_rx.recv().await.as_deref(), Some("payload"));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        // テスト項目: 除外なしの場合は全員に配信される
        // given (前提条件):
        let hub = hub();
        let (alice, mut alice_rx) = participant("alice", 4);
        let (bob, mut bob_rx) = participant("bob", 4);
        hub.register(alice).await;
        hub.register(bob).await;

        // when (操作):
        let delivered = hub.broadcast("all", None).await;

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert_eq!(alice_rx.recv().await.as_deref(), Some("all"));
        assert_eq!(bob_rx.recv().await.as_deref(), Some("all"));
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_that_recipient() {
        // テスト項目: キューが満杯の受信者だけメッセージが破棄され、他は受信できる
        // given (前提条件):
        let hub = hub();
        let (slow, mut slow_rx) = participant("slow", 1);
        let (fast, mut fast_rx) = participant("fast", 8);
        hub.register(slow).await;
        hub.register(fast).await;
        hub.broadcast("first", None).await;

        // when (操作):
        let delivered = hub.broadcast("second", None).await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert_eq!(slow_rx.recv().await.as_deref(), Some("first"));
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(fast_rx.recv().await.as_deref(), Some("first"));
        assert_eq!(fast_rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_unregister_closes_queue_and_stops_delivery() {
        // テスト項目: 登録解除するとキューが閉じられ、以後配信されない
        // given (前提条件):
        let hub = hub();
        let (alice, mut alice_rx) = participant("alice", 4);
        hub.register(alice).await;

        // when (操作):
        let removed = hub.unregister(&ParticipantId::from("alice")).await;
        let delivered = hub.broadcast("late", None).await;

        // then (期待する結果):
        assert!(removed);
        assert_eq!(delivered, 0);
        assert_eq!(alice_rx.recv().await, None);
        assert!(hub.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_excludes_given_participant() {
        // テスト項目: snapshot は指定した参加者を除いた一覧を ID 順で返す
        // given (前提条件):
        let hub = hub();
        let (carol, _c) = participant("carol", 1);
        let (alice, _a) = participant("alice", 1);
        let (bob, _b) = participant("bob", 1);
        hub.register(carol).await;
        hub.register(alice).await;
        hub.register(bob).await;

        // when (操作):
        let users = hub.snapshot(Some(&ParticipantId::from("bob"))).await;

        // then (期待する結果):
        let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "carol"]);
        assert_eq!(users[0].name, "name-alice");
    }

    #[tokio::test]
    async fn test_update_position_is_clamped_and_visible_in_snapshot() {
        // テスト項目: 位置更新は丸められ snapshot に反映される
        // given (前提条件):
        let hub = hub();
        let (alice, _rx) = participant("alice", 1);
        hub.register(alice).await;

        // when (操作):
        let updated = hub
            .update_position(&ParticipantId::from("alice"), Position { x: 3.0, y: 0.25 })
            .await;

        // then (期待する結果):
        assert!(updated);
        let users = hub.snapshot(None).await;
        assert_eq!((users[0].x, users[0].y), (1.0, 0.25));
    }

    #[tokio::test]
    async fn test_identity_round_trip_through_hub() {
        // テスト項目: persist した位置が同じトークンの再解決で返される
        // given (前提条件):
        let hub = hub();
        let first = hub.resolve_identity(Some("tok")).await;

        // when (操作):
        hub.persist_identity("tok", Position { x: 0.1, y: 0.2 }).await;
        let again = hub.resolve_identity(Some("tok")).await;

        // then (期待する結果):
        assert_eq!(again.name, first.name);
        assert_eq!(again.position, Position { x: 0.1, y: 0.2 });
        assert_eq!(hub.remembered_identities().await, 1);
    }
}
