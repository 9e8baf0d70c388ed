//! Simulated platform implementation
//!
//! Stands in for the host preference store and audio service. Nothing is
//! rendered; every stream and generator operation is logged and recorded so
//! callers can inspect what the host would have been asked to do.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{AudioService, PlatformInfo, SystemSettings, ToneGenerator};
use crate::config::PlatformConfig;
use crate::protocols::DtmfTone;
use crate::{Error, Result};

/// Something the simulated host was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformActivity {
    StreamVolumeSet { level: i32 },
    GeneratorCreated { generator_id: u64, level: i32 },
    ToneStarted { generator_id: u64, tone: DtmfTone, duration: Duration, at: Instant },
    GeneratorReleased { generator_id: u64 },
}

struct SimulatedState {
    stream_volume: RwLock<i32>,
    dtmf_tone_when_dialing: RwLock<Option<bool>>,
    generators_available: AtomicBool,
    next_generator_id: AtomicU64,
    activity: Mutex<Vec<PlatformActivity>>,
}

impl SimulatedState {
    fn activity(&self) -> MutexGuard<'_, Vec<PlatformActivity>> {
        self.activity.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, activity: PlatformActivity) {
        self.activity().push(activity);
    }
}

/// In-process host platform. Cloning shares the same state.
#[derive(Clone)]
pub struct SimulatedPlatform {
    config: PlatformConfig,
    state: Arc<SimulatedState>,
}

impl SimulatedPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        let state = SimulatedState {
            stream_volume: RwLock::new(config.initial_stream_volume),
            dtmf_tone_when_dialing: RwLock::new(config.dtmf_tone_when_dialing),
            generators_available: AtomicBool::new(true),
            next_generator_id: AtomicU64::new(1),
            activity: Mutex::new(Vec::new()),
        };

        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// `None` makes the preference unreadable
    pub async fn set_dtmf_tone_when_dialing(&self, value: Option<bool>) {
        *self.state.dtmf_tone_when_dialing.write().await = value;
    }

    /// When false, generator creation fails as if the host ran out of them
    pub fn set_generators_available(&self, available: bool) {
        self.state.generators_available.store(available, Ordering::SeqCst);
    }

    pub fn activity(&self) -> Vec<PlatformActivity> {
        self.state.activity().clone()
    }

    pub fn started_tones(&self) -> Vec<DtmfTone> {
        self.state
            .activity()
            .iter()
            .filter_map(|a| match a {
                PlatformActivity::ToneStarted { tone, .. } => Some(*tone),
                _ => None,
            })
            .collect()
    }

    pub fn generators_created(&self) -> usize {
        self.count(|a| matches!(a, PlatformActivity::GeneratorCreated { .. }))
    }

    pub fn generators_released(&self) -> usize {
        self.count(|a| matches!(a, PlatformActivity::GeneratorReleased { .. }))
    }

    fn count(&self, predicate: impl Fn(&PlatformActivity) -> bool) -> usize {
        self.state.activity().iter().filter(|a| predicate(a)).count()
    }
}

#[async_trait]
impl SystemSettings for SimulatedPlatform {
    async fn dtmf_tone_when_dialing(&self) -> Result<bool> {
        let value = *self.state.dtmf_tone_when_dialing.read().await;
        value.ok_or_else(|| Error::setting_unavailable("dtmf_tone_when_dialing not found"))
    }
}

#[async_trait]
impl AudioService for SimulatedPlatform {
    async fn stream_max_volume(&self) -> Result<u32> {
        Ok(self.config.stream_max_volume)
    }

    async fn set_stream_volume(&self, level: i32) -> Result<()> {
        *self.state.stream_volume.write().await = level;
        self.state.record(PlatformActivity::StreamVolumeSet { level });
        debug!("DTMF stream volume set to {}", level);
        Ok(())
    }

    async fn stream_volume(&self) -> i32 {
        *self.state.stream_volume.read().await
    }

    async fn create_tone_generator(&self, level: i32) -> Result<Box<dyn ToneGenerator>> {
        if !self.state.generators_available.load(Ordering::SeqCst) {
            return Err(Error::audio("No tone generator available on the DTMF stream"));
        }

        let generator_id = self.state.next_generator_id.fetch_add(1, Ordering::SeqCst);
        self.state.record(PlatformActivity::GeneratorCreated { generator_id, level });
        debug!("Created tone generator {} at level {}", generator_id, level);

        Ok(Box::new(SimulatedToneGenerator {
            generator_id,
            state: Arc::clone(&self.state),
        }))
    }
}

impl PlatformInfo for SimulatedPlatform {
    fn platform_version(&self) -> String {
        format!("{} {}", self.config.name, self.config.version)
    }
}

struct SimulatedToneGenerator {
    generator_id: u64,
    state: Arc<SimulatedState>,
}

impl ToneGenerator for SimulatedToneGenerator {
    fn start_tone(&mut self, tone: DtmfTone, duration: Duration) -> Result<()> {
        let (low, high) = tone.frequencies();
        info!(
            "Tone {} ({} Hz + {} Hz) for {} ms on generator {}",
            tone,
            low,
            high,
            duration.as_millis(),
            self.generator_id
        );
        self.state.record(PlatformActivity::ToneStarted {
            generator_id: self.generator_id,
            tone,
            duration,
            at: Instant::now(),
        });
        Ok(())
    }

    fn release(&mut self) {
        self.state.record(PlatformActivity::GeneratorReleased {
            generator_id: self.generator_id,
        });
        debug!("Released tone generator {}", self.generator_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_platform_version_label() {
        let platform = SimulatedPlatform::new(PlatformConfig::default());
        assert_eq!(platform.platform_version(), "Simulated 1.0");
    }

    #[tokio::test]
    async fn test_preference_can_be_unreadable() {
        let platform = SimulatedPlatform::new(PlatformConfig::default());
        assert!(platform.dtmf_tone_when_dialing().await.unwrap());

        platform.set_dtmf_tone_when_dialing(Some(false)).await;
        assert!(!platform.dtmf_tone_when_dialing().await.unwrap());

        platform.set_dtmf_tone_when_dialing(None).await;
        let result = platform.dtmf_tone_when_dialing().await;
        assert!(matches!(result, Err(Error::SettingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_stream_volume_is_shared_between_clones() {
        let platform = SimulatedPlatform::new(PlatformConfig::default());
        let other = platform.clone();

        tokio_test::assert_ok!(platform.set_stream_volume(3).await);
        tokio_test::assert_ok!(other.set_stream_volume(11).await);

        assert_eq!(platform.stream_volume().await, 11);
        assert_eq!(
            platform.activity(),
            vec![
                PlatformActivity::StreamVolumeSet { level: 3 },
                PlatformActivity::StreamVolumeSet { level: 11 },
            ]
        );
    }

    #[tokio::test]
    async fn test_generator_records_tones_and_release() {
        let platform = SimulatedPlatform::new(PlatformConfig::default());
        let mut generator = platform.create_tone_generator(7).await.unwrap();

        generator.start_tone(DtmfTone::Pound, Duration::from_millis(120)).unwrap();
        generator.release();

        assert_eq!(platform.started_tones(), vec![DtmfTone::Pound]);
        assert_eq!(platform.generators_created(), 1);
        assert_eq!(platform.generators_released(), 1);
    }

    #[tokio::test]
    async fn test_generator_exhaustion() {
        let platform = SimulatedPlatform::new(PlatformConfig::default());
        platform.set_generators_available(false);

        let result = platform.create_tone_generator(5).await;
        assert!(matches!(result, Err(Error::Audio(_))));
        assert_eq!(platform.generators_created(), 0);
    }
}
