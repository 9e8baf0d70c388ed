//! DTMF Bridge - keypad tone playback behind a method channel
//!
//! Sequences DTMF keypad tones over a platform tone generator. A host
//! application calls `playTone` through a [`core::MethodChannel`]; the
//! [`core::ToneSequencer`] checks the user's dialing-tone preference, sets the
//! DTMF stream volume and plays each digit on a background task.

pub mod config;
pub mod core;
pub mod protocols;
pub mod interfaces;
pub mod error;
pub mod utils;

pub use error::{Error, Result};

/// Bridge version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
