use log::debug;
use serde::{Deserialize, Serialize};

use crate::HudError;

use super::AlertStatus;

const SIGNAL_WEIGHT: f32 = 0.6;
const LOAD_WEIGHT: f32 = 0.4;

/// Stress rises as the signal fades and as the average load climbs.
pub fn stress_score(signal_strength: f32, mean_load: f32) -> f32 {
    (SIGNAL_WEIGHT * (1. - signal_strength.clamp(0., 1.)) + LOAD_WEIGHT * mean_load.clamp(0., 1.))
        .clamp(0., 1.)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusConfig {
    /// Stress thresholds for entering Caution, Alert and Critical, ascending
    pub thresholds: [f32; 3],
    /// Minimum time a status is held before it is re-evaluated
    pub min_dwell_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            thresholds: [0.35, 0.55, 0.75],
            min_dwell_ms: 1500,
        }
    }
}

impl StatusConfig {
    pub fn validate(&self) -> Result<(), HudError> {
        let ascending = self.thresholds.windows(2).all(|w| w[0] <= w[1]);
        let in_unit = self.thresholds.iter().all(|t| (0. ..=1.).contains(t));
        if !ascending || !in_unit {
            return Err(HudError::InvalidParameter {
                field: "status.thresholds".to_string(),
                reason: format!(
                    "thresholds must be ascending within [0, 1], got {:?}",
                    self.thresholds
                ),
            });
        }
        Ok(())
    }
}

/// Picks an `AlertStatus` from a stress score and holds it for a minimum dwell time.
#[derive(Clone, Debug)]
pub struct StatusDebouncer {
    config: StatusConfig,
    current: AlertStatus,
    entered_at_ms: Option<u64>,
}

impl StatusDebouncer {
    pub fn new(config: StatusConfig) -> Self {
        Self {
            config,
            current: AlertStatus::Nominal,
            entered_at_ms: None,
        }
    }

    /// Monotonic threshold mapping: a higher score never yields a calmer status.
    pub fn classify(&self, stress: f32) -> AlertStatus {
        let level = self
            .config
            .thresholds
            .iter()
            .filter(|threshold| stress >= **threshold)
            .count();
        AlertStatus::ALL[level]
    }

    pub fn update(&mut self, now_ms: u64, stress: f32) -> AlertStatus {
        let Some(entered_at) = self.entered_at_ms else {
            self.current = self.classify(stress);
            self.entered_at_ms = Some(now_ms);
            return self.current;
        };

        if now_ms.saturating_sub(entered_at) < self.config.min_dwell_ms {
            return self.current;
        }

        let next = self.classify(stress);
        if next != self.current {
            debug!("Status {} -> {} (stress {:.3})", self.current, next, stress);
            self.current = next;
            self.entered_at_ms = Some(now_ms);
        }
        self.current
    }
}
