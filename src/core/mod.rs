//! Core of the DTMF bridge: tone sequencing and the method channel it is served on

pub mod channel;
pub mod plugin;
pub mod sequencer;

pub use channel::{MethodCall, MethodCallHandler, MethodChannel, MethodResponse};
pub use plugin::DtmfPlugin;
pub use sequencer::{
    Dispatch, SequenceHandle, SequenceState, SequencerEvent, ToneRequest, ToneSequencer,
};
