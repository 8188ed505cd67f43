//! Silence detection for active calls.
//!
//! A [`SilenceMonitor`] task polls the platform for a call's inbound audio
//! level once per sampling period and posts each reading to the state
//! machine. The machine feeds readings to the call's [`SilenceDetector`],
//! so samples are serialized with every other event for the same call.

use crate::machine::BotInput;
use crate::platform::Platform;
use crate::settings::SilenceSettings;
use huddle_types::{AudioLevel, CallId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Consecutive-silence counter with a fixed firing threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceDetector {
    threshold_samples: u32,
    loudness_threshold: AudioLevel,
    count: u32,
}

impl SilenceDetector {
    pub fn new(settings: &SilenceSettings) -> Self {
        Self {
            threshold_samples: settings.threshold_samples.max(1),
            loudness_threshold: settings.loudness_threshold,
            count: 0,
        }
    }

    /// Records one sample and returns `true` when the call just became
    /// silent.
    ///
    /// A missing statistic or a level above the loudness threshold resets the
    /// counter. Firing also resets it, so the next signal needs a full new run
    /// of silent samples.
    pub fn observe(&mut self, level: Option<AudioLevel>) -> bool {
        match level {
            Some(level) if level <= self.loudness_threshold => {
                self.count += 1;
                if self.count >= self.threshold_samples {
                    self.count = 0;
                    true
                } else {
                    false
                }
            }
            _ => {
                self.count = 0;
                false
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// One audio-level reading taken by a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    pub call_id: CallId,
    /// Epoch of the call record the monitor was started for.
    pub epoch: u64,
    pub level: Option<AudioLevel>,
}

/// Periodic audio-level poller for one call.
pub struct SilenceMonitor;

impl SilenceMonitor {
    /// Starts polling. The first sample is taken one full period from now.
    pub(crate) fn start(
        platform: Arc<dyn Platform>,
        call_id: CallId,
        epoch: u64,
        period: Duration,
        inbox: WeakUnboundedSender<BotInput>,
    ) -> MonitorHandle {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let level = match platform.audio_level(&call_id).await {
                    Ok(level) => level,
                    Err(e) => {
                        tracing::debug!(call_id = %call_id, "audio level unavailable: {}", e);
                        None
                    }
                };
                tracing::trace!(call_id = %call_id, ?level, "audio level sampled");

                let Some(inbox) = inbox.upgrade() else {
                    break;
                };
                let sample = AudioSample {
                    call_id: call_id.clone(),
                    epoch,
                    level,
                };
                if inbox.send(BotInput::Sample(sample)).is_err() {
                    break;
                }
            }
        });

        MonitorHandle { task }
    }
}

/// Owning handle of a running monitor. Dropping it stops the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(self) {
        // Drop aborts.
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SilenceDetector {
        SilenceDetector::new(&SilenceSettings::default())
    }

    #[test]
    fn fires_after_threshold_and_resets() {
        let mut d = detector();
        for expected in 1..=4 {
            assert!(!d.observe(Some(10)));
            assert_eq!(d.count(), expected);
        }
        assert!(d.observe(Some(10)));
        assert_eq!(d.count(), 0);

        // A sixth loud sample keeps the counter at zero.
        assert!(!d.observe(Some(80)));
        assert_eq!(d.count(), 0);
    }

    #[test]
    fn needs_a_full_new_run_before_firing_again() {
        let mut d = detector();
        let fired: Vec<bool> = (0..10).map(|_| d.observe(Some(0))).collect();
        assert_eq!(
            fired,
            vec![false, false, false, false, true, false, false, false, false, true]
        );
    }

    #[test]
    fn missing_statistic_and_speech_reset() {
        let mut d = detector();
        d.observe(Some(10));
        d.observe(Some(10));
        assert!(!d.observe(None));
        assert_eq!(d.count(), 0);

        d.observe(Some(50));
        assert_eq!(d.count(), 1, "level equal to the threshold is silence");
        d.observe(Some(51));
        assert_eq!(d.count(), 0);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let mut d = SilenceDetector::new(&SilenceSettings {
            threshold_samples: 0,
            ..SilenceSettings::default()
        });
        assert!(d.observe(Some(0)));
    }
}
