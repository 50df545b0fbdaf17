//! Hiroba terminal client.
//!
//! The [`transport`] keeps a resilient link to the presence hub, the
//! [`orchestrator`] turns user input and inbound events into renderer
//! updates, and the [`renderer`] eases avatars across a drawing surface.

pub mod backoff;
pub mod command;
pub mod error;
pub mod formatter;
pub mod orchestrator;
pub mod renderer;
pub mod runner;
pub mod token;
pub mod transport;
pub mod ui;

pub use error::ClientError;
pub use runner::{ClientOptions, run_client};
