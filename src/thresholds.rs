//! Threshold registry: the user-tunable settings the engine reads

use crate::constants::thresholds as defaults;
use crate::error::{MeterError, MeterResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the values held by a [`ThresholdSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdKey {
    Duration,
    Low,
    Medium,
    Lives,
    Minutes,
}

impl ThresholdKey {
    /// Every key, in settings panel order
    pub const ALL: [ThresholdKey; 5] = [
        ThresholdKey::Duration,
        ThresholdKey::Low,
        ThresholdKey::Medium,
        ThresholdKey::Lives,
        ThresholdKey::Minutes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThresholdKey::Duration => "duration",
            ThresholdKey::Low => "low",
            ThresholdKey::Medium => "medium",
            ThresholdKey::Lives => "lives",
            ThresholdKey::Minutes => "minutes",
        }
    }

    /// Whether the key only accepts non-negative whole numbers
    pub fn is_integer(self) -> bool {
        !matches!(self, ThresholdKey::Low | ThresholdKey::Medium)
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdKey {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ThresholdKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MeterError::UnknownThresholdKey(s.to_string()))
    }
}

/// A value on its way into the registry, as typed by a user or computed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(text: &'a str) -> Self {
        RawValue::Text(text)
    }
}

impl From<f64> for RawValue<'_> {
    fn from(number: f64) -> Self {
        RawValue::Number(number)
    }
}

impl From<u32> for RawValue<'_> {
    fn from(number: u32) -> Self {
        RawValue::Number(f64::from(number))
    }
}

impl fmt::Display for RawValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(text) => f.write_str(text),
            RawValue::Number(number) => write!(f, "{}", number),
        }
    }
}

enum Parsed {
    Whole(u32),
    Real(f64),
}

/// Current threshold values.
///
/// Fields are private: after construction every change goes through
/// [`ThresholdSet::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    duration: u32,
    low: f64,
    medium: f64,
    lives: u32,
    minutes: u32,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            duration: defaults::DURATION_SECS,
            low: defaults::LOW_DB,
            medium: defaults::MEDIUM_DB,
            lives: defaults::LIVES,
            minutes: defaults::MINUTES,
        }
    }
}

impl ThresholdSet {
    /// Averaging window in seconds
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// True when the quiet cutoff sits above the loud cutoff
    pub fn is_inverted(&self) -> bool {
        self.low > self.medium
    }

    /// Current value of a key, widened to `f64`
    pub fn get(&self, key: ThresholdKey) -> f64 {
        match key {
            ThresholdKey::Duration => f64::from(self.duration),
            ThresholdKey::Low => self.low,
            ThresholdKey::Medium => self.medium,
            ThresholdKey::Lives => f64::from(self.lives),
            ThresholdKey::Minutes => f64::from(self.minutes),
        }
    }

    /// Replace one value.
    ///
    /// `duration`, `lives` and `minutes` take non-negative integers; `low` and
    /// `medium` take any finite real. On error the set is left unchanged.
    pub fn update<'a>(&mut self, key: ThresholdKey, raw: impl Into<RawValue<'a>>) -> MeterResult<()> {
        let raw = raw.into();
        match parse(key, raw)? {
            Parsed::Whole(value) => match key {
                ThresholdKey::Duration => self.duration = value,
                ThresholdKey::Lives => self.lives = value,
                _ => self.minutes = value,
            },
            Parsed::Real(value) => match key {
                ThresholdKey::Low => self.low = value,
                _ => self.medium = value,
            },
        }
        log::debug!("threshold {} set to {}", key, raw);
        Ok(())
    }

    /// Like [`ThresholdSet::update`], with the key given by name
    pub fn update_named<'a>(&mut self, key: &str, raw: impl Into<RawValue<'a>>) -> MeterResult<()> {
        let key = key.parse()?;
        self.update(key, raw)
    }
}

fn parse(key: ThresholdKey, raw: RawValue<'_>) -> MeterResult<Parsed> {
    let invalid = |reason: &str| MeterError::InvalidThresholdValue {
        key: key.name().to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if key.is_integer() {
        let whole = match raw {
            RawValue::Text(text) => text
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("expected a non-negative whole number"))?,
            RawValue::Number(n) => {
                if !n.is_finite() || n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
                    return Err(invalid("expected a non-negative whole number"));
                }
                n as u32
            }
        };
        Ok(Parsed::Whole(whole))
    } else {
        let real = match raw {
            RawValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid("expected a number of decibels"))?,
            RawValue::Number(n) => n,
        };
        if !real.is_finite() {
            return Err(invalid("must be finite"));
        }
        Ok(Parsed::Real(real))
    }
}
