// src/control/mod.rs

//! Line-delimited JSON control channel.
//!
//! The binary's calling layer: one JSON request per input line, one JSON
//! response per output line. [`protocol`] holds the wire types, [`session`]
//! the read/dispatch/write loop.

pub mod protocol;
pub mod session;

pub use protocol::{Request, Response};
pub use session::{handle_request, serve};
