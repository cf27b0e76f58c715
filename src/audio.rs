//! Audio cues played alongside a draw. Decorative: failures are logged, never fatal.

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info};

/// Failures reported by an audio backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// No output device or player is available.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// Sounds played during a draw.
pub trait AudioCue: Send + Sync {
    /// Play the spin sound for `duration`; resolves when it ends.
    fn spin(&self, duration: Duration) -> BoxFuture<'static, Result<(), AudioError>>;

    /// Play the celebration sound. Fire and forget.
    fn celebrate(&self);
}

/// Cue without a device: waits out the requested duration and logs.
#[derive(Debug, Clone, Copy)]
pub struct TimedAudioCue {
    volume: f32,
    enabled: bool,
}

impl TimedAudioCue {
    /// Cue at `volume` (clamped to `[0, 1]`).
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            enabled: true,
        }
    }

    /// Cue with its output switched off; every spin reports [`AudioError::Unavailable`].
    pub fn disabled() -> Self {
        Self {
            volume: 0.0,
            enabled: false,
        }
    }
}

impl Default for TimedAudioCue {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl AudioCue for TimedAudioCue {
    fn spin(&self, duration: Duration) -> BoxFuture<'static, Result<(), AudioError>> {
        let volume = self.volume;
        if !self.enabled {
            return Box::pin(async {
                Err(AudioError::Unavailable("audio output disabled".into()))
            });
        }
        Box::pin(async move {
            debug!(duration_ms = duration.as_millis() as u64, volume, "spin sound started");
            tokio::time::sleep(duration).await;
            debug!("spin sound ended");
            Ok(())
        })
    }

    fn celebrate(&self) {
        if self.enabled {
            info!(volume = self.volume, "celebration sound");
        } else {
            debug!("celebration sound skipped; audio disabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_cue_lasts_the_requested_duration() {
        let cue = TimedAudioCue::new(3.0);
        assert_eq!(cue.volume, 1.0);

        let started = tokio::time::Instant::now();
        cue.spin(Duration::from_secs(4)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(4));
        cue.celebrate();
    }

    #[tokio::test]
    async fn disabled_cue_reports_unavailable_output() {
        let cue = TimedAudioCue::disabled();
        assert!(matches!(
            cue.spin(Duration::from_secs(1)).await,
            Err(AudioError::Unavailable(_))
        ));
        cue.celebrate();
    }
}
