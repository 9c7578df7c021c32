//! Game engine collaborator: the external process that actually plays the
//! self-play games. The pool only drives it through the `Engine` /
//! `GameSession` seam.

mod gtp;
mod options;
mod session;

pub use gtp::GtpEngine;
pub use options::{EngineOptions, ResignPolicy};
pub use session::{Engine, GameSession};
