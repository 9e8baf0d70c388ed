//! DTMF plugin: answers `getPlatformVersion` and `playTone` on the method channel

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::channel::{
    MethodCall, MethodCallHandler, MethodResponse, INVALID_ARGUMENTS, PLAYBACK_FAILED,
};
use super::sequencer::{
    Dispatch, SequenceHandle, SequencerEvent, ToneRequest, ToneSequencer, DEFAULT_VOLUME,
};
use crate::interfaces::{AudioService, PlatformInfo, SystemSettings};
use crate::{Error, Result};

pub const GET_PLATFORM_VERSION: &str = "getPlatformVersion";
pub const PLAY_TONE: &str = "playTone";

const MISSING_ARGUMENTS: &str = "Missing required arguments for playTone";

/// Build a [`ToneRequest`] from `playTone` arguments.
///
/// `digits` (string, trimmed) and `durationMs` (positive integer) are
/// required. `volume`, `ignoreDtmfSystemSettings` and `forceMaxVolume` fall
/// back to their defaults when absent or mistyped. `volume` accepts any JSON
/// number, so an integer such as `1` is read as `1.0` rather than falling back.
pub fn parse_play_tone_args(arguments: &Value) -> Result<ToneRequest> {
    let args = arguments
        .as_object()
        .ok_or_else(|| Error::invalid_arguments(MISSING_ARGUMENTS))?;

    let digits = args
        .get("digits")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_arguments(MISSING_ARGUMENTS))?;

    let duration_ms = args
        .get("durationMs")
        .and_then(Value::as_u64)
        .and_then(|ms| u32::try_from(ms).ok())
        .filter(|ms| *ms > 0)
        .ok_or_else(|| Error::invalid_arguments(MISSING_ARGUMENTS))?;

    let volume = args.get("volume").and_then(Value::as_f64).unwrap_or(DEFAULT_VOLUME);

    Ok(ToneRequest::new(digits.trim(), Duration::from_millis(u64::from(duration_ms)))
        .with_volume(volume)
        .ignore_system_setting(flag(args, "ignoreDtmfSystemSettings"))
        .force_max_volume(flag(args, "forceMaxVolume")))
}

fn flag(args: &Map<String, Value>, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub struct DtmfPlugin {
    sequencer: ToneSequencer,
    info: Arc<dyn PlatformInfo>,
    running: Mutex<Vec<SequenceHandle>>,
}

impl DtmfPlugin {
    pub fn new(
        settings: Arc<dyn SystemSettings>,
        audio: Arc<dyn AudioService>,
        info: Arc<dyn PlatformInfo>,
    ) -> Self {
        Self {
            sequencer: ToneSequencer::new(settings, audio),
            info,
            running: Mutex::new(Vec::new()),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SequencerEvent>> {
        self.sequencer.take_event_receiver()
    }

    pub async fn active_sequences(&self) -> usize {
        let mut running = self.running.lock().await;
        running.retain(|handle| !handle.is_finished());
        running.len()
    }

    /// Wait up to `timeout` for dispatched sequences to finish.
    /// Returns false if some were still playing when time ran out.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let handles: Vec<SequenceHandle> = self.running.lock().await.drain(..).collect();
        if handles.is_empty() {
            return true;
        }

        info!("Waiting for {} tone sequence(s) to finish", handles.len());
        let wait_all = async {
            for handle in handles {
                handle.finished().await;
            }
        };

        match tokio::time::timeout(timeout, wait_all).await {
            Ok(()) => true,
            Err(_) => {
                warn!("Tone sequences still playing after {:?}", timeout);
                false
            }
        }
    }

    async fn play_tone(&self, arguments: &Value) -> MethodResponse {
        let request = match parse_play_tone_args(arguments) {
            Ok(request) => request,
            Err(e) => {
                debug!("Rejected playTone call: {}", e);
                return MethodResponse::error(INVALID_ARGUMENTS, MISSING_ARGUMENTS);
            }
        };

        match self.sequencer.play_tone(request).await {
            Ok(Dispatch::Started(handle)) => {
                let mut running = self.running.lock().await;
                running.retain(|h| !h.is_finished());
                running.push(handle);
                MethodResponse::Success(json!(true))
            }
            Ok(Dispatch::Suppressed) => MethodResponse::Success(json!(true)),
            Err(e) => {
                error!("playTone failed: {}", e);
                MethodResponse::error(PLAYBACK_FAILED, e.to_string())
            }
        }
    }
}

#[async_trait]
impl MethodCallHandler for DtmfPlugin {
    async fn on_method_call(&self, call: MethodCall) -> MethodResponse {
        match call.method.as_str() {
            GET_PLATFORM_VERSION => MethodResponse::Success(json!(self.info.platform_version())),
            PLAY_TONE => self.play_tone(&call.arguments).await,
            _ => MethodResponse::NotImplemented,
        }
    }
}
