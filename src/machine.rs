//! Level classification and the lives counter

use crate::error::MeterResult;
use crate::thresholds::{ThresholdKey, ThresholdSet};
use std::fmt;

/// Qualitative loudness bucket for one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Quiet,
    Moderate,
    Loud,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::Quiet => "Quiet",
            Level::Moderate => "Moderate",
            Level::Loud => "Loud",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a reading against the low and medium cutoffs.
///
/// Readings equal to either cutoff are `Moderate`. With inverted cutoffs
/// (`low > medium`) every reading is `Moderate`.
pub fn classify(decibels: f64, thresholds: &ThresholdSet) -> Level {
    if thresholds.is_inverted() {
        return Level::Moderate;
    }
    if decibels < thresholds.low() {
        Level::Quiet
    } else if decibels > thresholds.medium() {
        Level::Loud
    } else {
        Level::Moderate
    }
}

/// Result of running one reading through the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub level: Level,
    pub lives: u32,
    pub life_lost: bool,
}

/// Classify a reading and take a life if it is above the medium cutoff.
///
/// Every qualifying reading costs a life; there is no cooldown, so a sustained
/// loud sound drains lives at the capture cadence. Lives stop at zero.
pub fn evaluate(decibels: f64, thresholds: &mut ThresholdSet) -> Evaluation {
    let level = classify(decibels, thresholds);
    let mut life_lost = false;

    if decibels > thresholds.medium() {
        let lives = thresholds.lives();
        // a whole number below the current count always passes the registry
        if lives > 0 && thresholds.update(ThresholdKey::Lives, lives - 1).is_ok() {
            life_lost = true;
            log::debug!("life removed at {:.1} dB, {} left", decibels, lives - 1);
        }
    }

    Evaluation {
        level,
        lives: thresholds.lives(),
        life_lost,
    }
}

/// A manual change to the lives counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeAdjustment {
    Add,
    Remove,
}

/// Apply a manual lives change and return the new count.
///
/// Adding has no ceiling; removing at zero leaves the count at zero.
pub fn adjust_lives(thresholds: &mut ThresholdSet, adjustment: LifeAdjustment) -> MeterResult<u32> {
    let lives = thresholds.lives();
    match adjustment {
        LifeAdjustment::Add => thresholds.update(ThresholdKey::Lives, lives.saturating_add(1))?,
        LifeAdjustment::Remove if lives > 0 => thresholds.update(ThresholdKey::Lives, lives - 1)?,
        LifeAdjustment::Remove => log::info!("no lives to take"),
    }
    Ok(thresholds.lives())
}
