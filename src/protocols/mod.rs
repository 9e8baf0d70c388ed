//! Protocol definitions for the DTMF bridge

pub mod dtmf;

pub use dtmf::{tone_for_digit, DtmfTone};
