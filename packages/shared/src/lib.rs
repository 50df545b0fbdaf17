//! Shared building blocks for the Hiroba presence server and client.
//!
//! Both halves of the system speak the same JSON protocol and enforce the same
//! limits, so the wire types, constants and the small timing helpers live here.

pub mod limits;
pub mod logger;
pub mod position;
pub mod protocol;
pub mod throttle;
pub mod time;
