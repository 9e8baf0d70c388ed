//! Platform capabilities the bridge depends on
//!
//! The preference store, the audio service and the tone generator belong to
//! the host. The sequencer only sees these traits; `simulated` provides an
//! in-process implementation.

pub mod simulated;

use std::time::Duration;

use async_trait::async_trait;

use crate::protocols::DtmfTone;
use crate::Result;

pub use simulated::{PlatformActivity, SimulatedPlatform};

/// Read access to the host's user preferences
#[async_trait]
pub trait SystemSettings: Send + Sync {
    /// The "DTMF tone when dialing" preference. An error means the
    /// preference could not be read.
    async fn dtmf_tone_when_dialing(&self) -> Result<bool>;
}

/// The host audio service owning the DTMF output stream.
///
/// The stream volume is shared by every caller: a write replaces whatever
/// level the previous writer set (last writer wins).
#[async_trait]
pub trait AudioService: Send + Sync {
    async fn stream_max_volume(&self) -> Result<u32>;

    async fn set_stream_volume(&self, level: i32) -> Result<()>;

    async fn stream_volume(&self) -> i32;

    /// Acquire a tone generator bound to the DTMF stream at `level`.
    async fn create_tone_generator(&self, level: i32) -> Result<Box<dyn ToneGenerator>>;
}

/// A platform tone generator. Starting a tone does not block; the tone
/// stops on its own after `duration`.
pub trait ToneGenerator: Send {
    fn start_tone(&mut self, tone: DtmfTone, duration: Duration) -> Result<()>;

    fn release(&mut self);
}

pub trait PlatformInfo: Send + Sync {
    /// Human-readable label such as "Simulated 1.0"
    fn platform_version(&self) -> String;
}

/// Owns a tone generator and releases it exactly once when dropped.
pub struct ToneGeneratorHandle {
    inner: Option<Box<dyn ToneGenerator>>,
}

impl ToneGeneratorHandle {
    pub fn new(generator: Box<dyn ToneGenerator>) -> Self {
        Self { inner: Some(generator) }
    }

    pub fn start_tone(&mut self, tone: DtmfTone, duration: Duration) -> Result<()> {
        match self.inner.as_mut() {
            Some(generator) => generator.start_tone(tone, duration),
            None => Err(crate::Error::audio("Tone generator already released")),
        }
    }

    pub fn release(&mut self) {
        if let Some(mut generator) = self.inner.take() {
            generator.release();
        }
    }
}

impl Drop for ToneGeneratorHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingGenerator {
        releases: Arc<AtomicUsize>,
    }

    impl ToneGenerator for CountingGenerator {
        fn start_tone(&mut self, _tone: DtmfTone, _duration: Duration) -> Result<()> {
            Ok(())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_handle_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut handle = ToneGeneratorHandle::new(Box::new(CountingGenerator {
            releases: Arc::clone(&releases),
        }));

        assert!(handle.start_tone(DtmfTone::Digit1, Duration::from_millis(10)).is_ok());
        handle.release();
        assert!(handle.start_tone(DtmfTone::Digit2, Duration::from_millis(10)).is_err());
        drop(handle);

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_releases_on_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _handle = ToneGeneratorHandle::new(Box::new(CountingGenerator {
                releases: Arc::clone(&releases),
            }));
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
