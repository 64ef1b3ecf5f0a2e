//! Sample block to decibel conversion

use crate::constants::audio::{CALIBRATION_DB_SPL, SILENCE_FLOOR_DB};
use crate::error::{MeterError, MeterResult};

/// Converts sample blocks into calibrated decibel readings
#[derive(Debug, Clone, Copy)]
pub struct LevelConverter {
    adjustment_factor: f64,
}

impl LevelConverter {
    /// Create a converter for the given reference level (dB SPL).
    ///
    /// The adjustment factor is fixed here; a reference level of 94 dB SPL
    /// leaves readings unadjusted.
    pub fn new(reference_level: f64) -> Self {
        Self {
            adjustment_factor: db_to_amplitude(reference_level - CALIBRATION_DB_SPL),
        }
    }

    pub fn adjustment_factor(&self) -> f64 {
        self.adjustment_factor
    }

    /// Convert one block, reporting the zero-amplitude singularity as an error
    pub fn try_convert(&self, block: &[f32]) -> MeterResult<f64> {
        let rms = rms(block);
        if rms == 0.0 {
            return Err(MeterError::CalibrationUndefined);
        }
        Ok(amplitude_to_db(rms / self.adjustment_factor))
    }

    /// Convert one block, never failing.
    ///
    /// Silent blocks and anything quieter than [`SILENCE_FLOOR_DB`] come back
    /// as the floor value, so the result is always a displayable number.
    pub fn convert(&self, block: &[f32]) -> f64 {
        match self.try_convert(block) {
            // f64::max drops a NaN operand in favour of the floor
            Ok(db) => db.max(SILENCE_FLOOR_DB),
            Err(_) => SILENCE_FLOOR_DB,
        }
    }
}

impl Default for LevelConverter {
    fn default() -> Self {
        Self::new(crate::constants::audio::DEFAULT_REFERENCE_LEVEL)
    }
}

/// Root-mean-square amplitude of a block; an empty block has none
pub fn rms(block: &[f32]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    let sum: f64 = block.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / block.len() as f64).sqrt()
}

/// Convert linear amplitude to decibels
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// Convert decibels to linear amplitude
pub fn db_to_amplitude(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

/// Round a reading to one decimal place
pub fn round_tenth(db: f64) -> f64 {
    (db * 10.0).round() / 10.0
}

/// Format a reading the way it is displayed and exported
pub fn format_db(db: f64) -> String {
    format!("{:.1}", db)
}
