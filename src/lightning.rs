//! Light-threshold trigger logic.
//!
//! Decides when a light-sensor reading should fire the shutter. The threshold
//! either follows the ambient light level (auto mode) or is stepped by hand.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Lowest allowed sensitivity.
pub const MIN_SENSITIVITY: f32 = 10.0;
/// Highest allowed sensitivity.
pub const MAX_SENSITIVITY: f32 = 110.0;
/// Sensitivity after start-up.
pub const DEFAULT_SENSITIVITY: f32 = 50.0;
/// Manual sensitivity step.
pub const SENSITIVITY_STEP: f32 = 10.0;
/// Auto mode keeps the threshold this far above the ambient reading.
pub const AUTO_HEADROOM: f32 = 10.0;
/// Auto mode moves the threshold at this many units per second.
pub const AUTO_RATE_PER_SEC: f32 = 10.0;
/// Shortest time between two triggers.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// User-adjustable trigger settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerSettings {
    /// Readings above this value fire the shutter.
    pub sensitivity: f32,
    /// Whether the trigger is armed.
    pub enabled: bool,
    /// Manual mode freezes the threshold at the user's setting.
    pub manual: bool,
    /// Shortest time between two triggers.
    pub min_interval: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            enabled: false,
            manual: false,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Fires when the light level jumps above the sensitivity threshold.
#[derive(Debug, Clone, Default)]
pub struct LightningTrigger {
    settings: TriggerSettings,
    last_fired: Option<Instant>,
}

impl LightningTrigger {
    /// Create a disarmed trigger in auto mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trigger from saved settings. The sensitivity is clamped.
    pub fn with_settings(settings: TriggerSettings) -> Self {
        Self {
            settings: TriggerSettings {
                sensitivity: clamp_sensitivity(settings.sensitivity),
                ..settings
            },
            last_fired: None,
        }
    }

    /// Current settings, for saving.
    pub fn settings(&self) -> TriggerSettings {
        self.settings
    }

    /// Current threshold.
    pub fn sensitivity(&self) -> f32 {
        self.settings.sensitivity
    }

    /// Check if the trigger is armed.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Check if the threshold is set by hand.
    pub fn is_manual(&self) -> bool {
        self.settings.manual
    }

    /// When the trigger last fired, if ever.
    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    /// Check whether `reading` is above the current threshold.
    pub fn is_above_threshold(&self, reading: f32) -> bool {
        reading > self.settings.sensitivity
    }

    /// Decide whether `reading` fires the shutter at `now`.
    ///
    /// Fires only when armed, above threshold and more than `min_interval`
    /// after the previous trigger. A positive result is recorded as the new
    /// last-fired time.
    pub fn check(&mut self, reading: f32, now: Instant) -> bool {
        if !self.settings.enabled || !self.is_above_threshold(reading) {
            return false;
        }

        let rested = match self.last_fired {
            Some(last) => now.saturating_duration_since(last) > self.settings.min_interval,
            None => true,
        };
        if !rested {
            return false;
        }

        debug!(
            "Light reading {} above sensitivity {}",
            reading, self.settings.sensitivity
        );
        self.last_fired = Some(now);
        true
    }

    /// Raise the threshold by one step, up to [`MAX_SENSITIVITY`].
    pub fn sensitivity_up(&mut self) {
        self.settings.sensitivity =
            clamp_sensitivity(self.settings.sensitivity + SENSITIVITY_STEP);
    }

    /// Lower the threshold by one step, down to [`MIN_SENSITIVITY`].
    pub fn sensitivity_down(&mut self) {
        self.settings.sensitivity =
            clamp_sensitivity(self.settings.sensitivity - SENSITIVITY_STEP);
    }

    /// Arm or disarm the trigger. Returns the new state.
    pub fn toggle_enabled(&mut self) -> bool {
        self.settings.enabled = !self.settings.enabled;
        info!(
            "Trigger {}",
            if self.settings.enabled { "running" } else { "paused" }
        );
        self.settings.enabled
    }

    /// Switch between auto and manual sensitivity. Returns true in manual mode.
    pub fn toggle_manual(&mut self) -> bool {
        self.settings.manual = !self.settings.manual;
        info!(
            "Sensitivity mode {}",
            if self.settings.manual { "manual" } else { "auto" }
        );
        self.settings.manual
    }

    /// Drift the threshold toward `reading + 10`, `elapsed` after the last call.
    ///
    /// Does nothing in manual mode.
    pub fn update_auto_sensitivity(&mut self, reading: f32, elapsed: Duration) {
        let elapsed_secs = elapsed.as_secs_f32();
        if self.settings.manual || elapsed_secs <= 0.0 {
            return;
        }

        let target = reading + AUTO_HEADROOM;
        let current = self.settings.sensitivity;
        let next = if (target - current).abs() < 1.0 {
            target
        } else if target > current {
            current + elapsed_secs * AUTO_RATE_PER_SEC
        } else {
            current - elapsed_secs * AUTO_RATE_PER_SEC
        };

        self.settings.sensitivity = clamp_sensitivity(next);
    }
}

fn clamp_sensitivity(value: f32) -> f32 {
    value.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn armed() -> LightningTrigger {
        let mut trigger = LightningTrigger::new();
        trigger.toggle_enabled();
        trigger
    }

    #[test]
    fn test_defaults() {
        let trigger = LightningTrigger::new();
        assert_eq!(trigger.sensitivity(), 50.0);
        assert!(!trigger.is_enabled());
        assert!(!trigger.is_manual());
        assert_eq!(trigger.settings().min_interval, Duration::from_secs(1));
        assert_eq!(trigger.last_fired(), None);
    }

    #[test]
    fn test_disarmed_never_fires() {
        let mut trigger = LightningTrigger::new();
        assert!(!trigger.check(100.0, Instant::now()));
        assert_eq!(trigger.last_fired(), None);
    }

    #[test]
    fn test_fires_above_threshold() {
        let mut trigger = armed();
        let now = Instant::now();

        assert!(!trigger.check(50.0, now));
        assert!(trigger.check(50.5, now));
        assert_eq!(trigger.last_fired(), Some(now));
    }

    #[test]
    fn test_min_interval() {
        let mut trigger = armed();
        let start = Instant::now();

        assert!(trigger.check(90.0, start));
        assert!(!trigger.check(90.0, start + Duration::from_millis(500)));
        assert!(!trigger.check(90.0, start + Duration::from_secs(1)));
        assert!(trigger.check(90.0, start + Duration::from_millis(1001)));
        assert_eq!(
            trigger.last_fired(),
            Some(start + Duration::from_millis(1001))
        );
    }

    #[test]
    fn test_sensitivity_steps_clamp() {
        let mut trigger = LightningTrigger::new();
        for _ in 0..10 {
            trigger.sensitivity_up();
        }
        assert_eq!(trigger.sensitivity(), 110.0);

        for _ in 0..20 {
            trigger.sensitivity_down();
        }
        assert_eq!(trigger.sensitivity(), 10.0);

        trigger.sensitivity_up();
        assert_eq!(trigger.sensitivity(), 20.0);
    }

    #[test]
    fn test_toggles() {
        let mut trigger = LightningTrigger::new();
        assert!(trigger.toggle_enabled());
        assert!(!trigger.toggle_enabled());
        assert!(trigger.toggle_manual());
        assert!(trigger.is_manual());
        assert!(!trigger.toggle_manual());
    }

    #[test]
    fn test_auto_sensitivity_drifts_toward_target() {
        let mut trigger = LightningTrigger::new();

        trigger.update_auto_sensitivity(20.0, Duration::from_millis(500));
        assert_eq!(trigger.sensitivity(), 45.0);

        trigger.update_auto_sensitivity(80.0, Duration::from_secs(2));
        assert_eq!(trigger.sensitivity(), 65.0);
    }

    #[test]
    fn test_auto_sensitivity_snaps_when_close() {
        let mut trigger = LightningTrigger::new();
        trigger.update_auto_sensitivity(40.5, Duration::from_millis(100));
        assert_eq!(trigger.sensitivity(), 50.5);
    }

    #[test]
    fn test_auto_sensitivity_ignored() {
        let mut trigger = LightningTrigger::new();
        trigger.update_auto_sensitivity(0.0, Duration::ZERO);
        assert_eq!(trigger.sensitivity(), 50.0);

        trigger.toggle_manual();
        trigger.update_auto_sensitivity(0.0, Duration::from_secs(3));
        assert_eq!(trigger.sensitivity(), 50.0);
    }

    #[test]
    fn test_with_settings_clamps() {
        let trigger = LightningTrigger::with_settings(TriggerSettings {
            sensitivity: 500.0,
            enabled: true,
            ..Default::default()
        });
        assert_eq!(trigger.sensitivity(), 110.0);
        assert!(trigger.is_enabled());
    }

    proptest! {
        #[test]
        fn prop_auto_sensitivity_stays_in_range(
            reading in 0.0f32..4096.0,
            millis in 1u64..10_000,
        ) {
            let mut trigger = LightningTrigger::new();
            trigger.update_auto_sensitivity(reading, Duration::from_millis(millis));
            prop_assert!((MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&trigger.sensitivity()));
        }
    }
}
