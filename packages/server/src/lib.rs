//! Presence hub for Hiroba.
//!
//! Tracks every visitor on the shared canvas, throttles and rebroadcasts their
//! moves and chat lines, and remembers returning visitors by token.

pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod ui;
pub mod usecase;

pub use error::ServerError;
pub use hub::ConnectionHub;
