//! Score, combo and accuracy bookkeeping.

use serde::{Deserialize, Serialize};

use super::HitAccuracy;

/// Multiplier applied once the combo reaches `min_combo`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComboStep {
    pub min_combo: u32,
    pub multiplier: u32,
}

/// Tier base values and combo multipliers. These are game balance, not rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScoringConfig {
    pub perfect: u32,
    pub good: u32,
    pub okay: u32,
    pub miss: u32,
    /// Checked from the highest threshold down; below all of them the
    /// multiplier is 1
    pub combo_steps: Vec<ComboStep>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            perfect: 300,
            good: 200,
            okay: 100,
            miss: 0,
            combo_steps: vec![
                ComboStep { min_combo: 10, multiplier: 2 },
                ComboStep { min_combo: 25, multiplier: 3 },
                ComboStep { min_combo: 50, multiplier: 4 },
            ],
        }
    }
}

impl ScoringConfig {
    pub fn base_value(&self, accuracy: HitAccuracy) -> u32 {
        match accuracy {
            HitAccuracy::Perfect => self.perfect,
            HitAccuracy::Good => self.good,
            HitAccuracy::Okay => self.okay,
            HitAccuracy::Miss => self.miss,
        }
    }

    pub fn multiplier(&self, combo: u32) -> u32 {
        self.combo_steps
            .iter()
            .filter(|step| combo >= step.min_combo)
            .map(|step| step.multiplier)
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

/// Running score for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreState {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect: u32,
    pub good: u32,
    pub okay: u32,
    pub miss: u32,
    /// Weighted accuracy over every judged note, 0-100
    pub accuracy: f64,
}

impl ScoreState {
    pub fn judged(&self) -> u32 {
        self.perfect + self.good + self.okay + self.miss
    }

    /// Apply one judgment and return the points it earned
    pub fn apply(&mut self, accuracy: HitAccuracy, config: &ScoringConfig) -> u64 {
        match accuracy {
            HitAccuracy::Perfect => self.perfect += 1,
            HitAccuracy::Good => self.good += 1,
            HitAccuracy::Okay => self.okay += 1,
            HitAccuracy::Miss => self.miss += 1,
        }

        if accuracy == HitAccuracy::Miss {
            self.combo = 0;
        } else {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }

        let delta = config.base_value(accuracy) as u64 * config.multiplier(self.combo) as u64;
        self.score += delta;
        self.accuracy = self.weighted_accuracy(config);
        delta
    }

    fn weighted_accuracy(&self, config: &ScoringConfig) -> f64 {
        let judged = self.judged() as f64;
        let top = config.perfect as f64;
        if judged == 0.0 || top == 0.0 {
            return 0.0;
        }
        let earned = self.perfect as f64 * config.perfect as f64
            + self.good as f64 * config.good as f64
            + self.okay as f64 * config.okay as f64
            + self.miss as f64 * config.miss as f64;
        (earned / (judged * top) * 100.0).clamp(0.0, 100.0)
    }
}
