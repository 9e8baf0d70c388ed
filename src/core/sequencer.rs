//! Tone sequencer
//!
//! Turns a [`ToneRequest`] into a timed run of keypad tones. The caller-facing
//! part (preference check, volume, generator acquisition) runs inline; the
//! digit loop runs on a spawned task so [`ToneSequencer::play_tone`] returns
//! as soon as playback is dispatched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::interfaces::{AudioService, SystemSettings, ToneGeneratorHandle};
use crate::protocols::{tone_for_digit, DtmfTone};
use crate::Result;

/// Silence appended after every digit slot
pub const INTER_TONE_GAP: Duration = Duration::from_millis(80);

/// Ceiling used instead of the stream maximum when max volume is forced
pub const FORCED_MAX_VOLUME: u32 = 100;

pub const DEFAULT_VOLUME: f64 = 0.5;

/// A validated playback request
#[derive(Debug, Clone, PartialEq)]
pub struct ToneRequest {
    pub digits: String,
    pub duration: Duration,
    /// Fraction of the maximum level; not clamped
    pub volume: f64,
    pub ignore_system_setting: bool,
    pub force_max_volume: bool,
}

impl ToneRequest {
    pub fn new(digits: impl Into<String>, duration: Duration) -> Self {
        Self {
            digits: digits.into(),
            duration,
            volume: DEFAULT_VOLUME,
            ignore_system_setting: false,
            force_max_volume: false,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn ignore_system_setting(mut self, ignore: bool) -> Self {
        self.ignore_system_setting = ignore;
        self
    }

    pub fn force_max_volume(mut self, force: bool) -> Self {
        self.force_max_volume = force;
        self
    }

    /// Time one digit occupies, audible or not
    pub fn slot(&self) -> Duration {
        self.duration + INTER_TONE_GAP
    }
}

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    SettingChecked,
    VolumeSet,
    Sequencing { index: usize },
    Released,
    Aborted,
}

impl SequenceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequenceState::Released | SequenceState::Aborted)
    }
}

/// Sequencer events
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    Suppressed { request_id: Uuid },
    VolumeApplied { request_id: Uuid, level: i32 },
    ToneStarted { request_id: Uuid, index: usize, tone: DtmfTone },
    DigitSkipped { request_id: Uuid, index: usize, digit: char },
    Released { request_id: Uuid, tones_played: usize },
}

/// Handle to a running sequence. Dropping it does not stop playback.
#[derive(Debug)]
pub struct SequenceHandle {
    request_id: Uuid,
    level: i32,
    task: JoinHandle<()>,
}

impl SequenceHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the generator to be released.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            error!("Sequence {} ended abnormally: {}", self.request_id, e);
        }
    }
}

/// Outcome of dispatching a request
#[derive(Debug)]
pub enum Dispatch {
    /// The system preference disables keypad tones; nothing was acquired.
    Suppressed,
    Started(SequenceHandle),
}

impl Dispatch {
    pub fn into_handle(self) -> Option<SequenceHandle> {
        match self {
            Dispatch::Suppressed => None,
            Dispatch::Started(handle) => Some(handle),
        }
    }
}

/// Round `volume * max_level` to a stream level. NaN maps to 0.
pub fn target_level(volume: f64, max_level: u32) -> i32 {
    (volume * f64::from(max_level)).round() as i32
}

pub struct ToneSequencer {
    settings: Arc<dyn SystemSettings>,
    audio: Arc<dyn AudioService>,
    /// Set once a receiver is handed out; events are not queued before that.
    event_tx: Option<mpsc::UnboundedSender<SequencerEvent>>,
}

impl ToneSequencer {
    pub fn new(settings: Arc<dyn SystemSettings>, audio: Arc<dyn AudioService>) -> Self {
        Self {
            settings,
            audio,
            event_tx: None,
        }
    }

    /// Start delivering events. Only the first call returns a receiver.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SequencerEvent>> {
        if self.event_tx.is_some() {
            return None;
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_tx = Some(event_tx);
        Some(event_rx)
    }

    /// Play `request` on the DTMF stream.
    ///
    /// Returns once the generator is acquired and the digit loop is spawned.
    /// The stream volume is overwritten for every caller; concurrent requests
    /// race on it and the last writer wins. Must be called within a tokio
    /// runtime.
    pub async fn play_tone(&self, request: ToneRequest) -> Result<Dispatch> {
        let request_id = Uuid::new_v4();
        let mut state = SequenceState::Idle;
        debug!(%request_id, ?state, digits = %request.digits, "Tone request received");

        if !request.ignore_system_setting && !self.tones_enabled().await {
            state = SequenceState::Aborted;
            info!(
                %request_id,
                ?state,
                "No sound is played: DTMF tone is disabled on device and not ignored"
            );
            emit(&self.event_tx, SequencerEvent::Suppressed { request_id });
            return Ok(Dispatch::Suppressed);
        }
        state = SequenceState::SettingChecked;
        debug!(%request_id, ?state);

        let max_level = if request.force_max_volume {
            FORCED_MAX_VOLUME
        } else {
            self.audio.stream_max_volume().await?
        };

        let level = target_level(request.volume, max_level);
        self.audio.set_stream_volume(level).await?;
        state = SequenceState::VolumeSet;
        debug!(%request_id, ?state, level, max_level);
        emit(&self.event_tx, SequencerEvent::VolumeApplied { request_id, level });

        let generator = ToneGeneratorHandle::new(self.audio.create_tone_generator(level).await?);

        info!(
            %request_id,
            digits = request.digits.chars().count(),
            duration_ms = request.duration.as_millis() as u64,
            level,
            "Dispatching tone sequence"
        );

        let event_tx = self.event_tx.clone();
        let task = tokio::spawn(run_sequence(request_id, request, generator, event_tx));

        Ok(Dispatch::Started(SequenceHandle {
            request_id,
            level,
            task,
        }))
    }

    /// Fails open: an unreadable preference counts as enabled.
    async fn tones_enabled(&self) -> bool {
        match self.settings.dtmf_tone_when_dialing().await {
            Ok(enabled) => enabled,
            Err(e) => {
                error!("{}", e);
                true
            }
        }
    }
}

fn emit(event_tx: &Option<mpsc::UnboundedSender<SequencerEvent>>, event: SequencerEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event);
    }
}

async fn run_sequence(
    request_id: Uuid,
    request: ToneRequest,
    mut generator: ToneGeneratorHandle,
    event_tx: Option<mpsc::UnboundedSender<SequencerEvent>>,
) {
    let slot = request.slot();
    let mut tones_played = 0;

    for (index, digit) in request.digits.chars().enumerate() {
        let state = SequenceState::Sequencing { index };

        match tone_for_digit(digit) {
            Some(tone) => match generator.start_tone(tone, request.duration) {
                Ok(()) => {
                    tones_played += 1;
                    debug!(%request_id, ?state, %tone, "Tone started");
                    emit(&event_tx, SequencerEvent::ToneStarted { request_id, index, tone });
                }
                Err(e) => {
                    warn!(%request_id, ?state, %tone, "Failed to start tone: {}", e);
                }
            },
            None => {
                debug!(%request_id, ?state, ?digit, "No tone for digit, holding silence");
                emit(&event_tx, SequencerEvent::DigitSkipped { request_id, index, digit });
            }
        }

        tokio::time::sleep(slot).await;
    }

    generator.release();
    let state = SequenceState::Released;
    info!(%request_id, ?state, tones_played, "Tone sequence finished");
    emit(&event_tx, SequencerEvent::Released { request_id, tones_played });
}
