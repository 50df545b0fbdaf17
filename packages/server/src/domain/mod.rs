//! Domain model of the presence hub.
//!
//! Pure types and rules with no socket or lock in sight: identity memory,
//! name generation and the per-connection move/chat gates.

mod identity;
mod name;
mod participant;

pub use identity::{Identity, IdentityStore};
pub use name::{generate_name, spawn_position};
pub use participant::{ParticipantId, ParticipantSession, normalize_chat};
