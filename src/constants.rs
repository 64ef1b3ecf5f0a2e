//! Application constants and configuration values

/// Audio processing constants
pub mod audio {
    /// Calibration point the reference level is measured against (dB SPL)
    pub const CALIBRATION_DB_SPL: f64 = 94.0;
    /// Default reference level (dB SPL); equal to the calibration point, so no adjustment
    pub const DEFAULT_REFERENCE_LEVEL: f64 = 94.0;
    /// Reading reported for silence, and the lowest reading ever reported
    pub const SILENCE_FLOOR_DB: f64 = -120.0;
    /// Lowest dB level drawn on the gauge
    pub const MIN_DB_LEVEL: f64 = -60.0;
    /// Samples per block handed to the engine
    pub const DEFAULT_BLOCK_SIZE: usize = 2048;
    /// Accepted block sizes
    pub const MIN_BLOCK_SIZE: usize = 64;
    pub const MAX_BLOCK_SIZE: usize = 65536;
    /// Preferred capture sample rate
    pub const PREFERRED_SAMPLE_RATE: u32 = 44100;
    /// Blocks that may wait for the processor before new ones are dropped
    pub const BLOCK_QUEUE_DEPTH: usize = 4;
    /// Buffer size for audio streams
    pub const BUFFER_SIZE: cpal::BufferSize = cpal::BufferSize::Default;
}

/// Default threshold values
pub mod thresholds {
    /// Rolling average window in seconds
    pub const DURATION_SECS: u32 = 60;
    /// Readings below this are quiet
    pub const LOW_DB: f64 = -30.0;
    /// Readings above this are loud and cost a life
    pub const MEDIUM_DB: f64 = -18.0;
    pub const LIVES: u32 = 3;
    pub const MINUTES: u32 = 0;
}

/// UI display constants
pub mod ui {
    /// UI update interval in milliseconds
    pub const UPDATE_INTERVAL_MS: u64 = 50;
    /// Bar width calculation accounts for borders
    pub const BAR_BORDER_WIDTH: usize = 2;
    /// Shown in place of an average when there is nothing to average
    pub const NO_AVERAGE: &str = "—";
    /// Hearts drawn before the row collapses into a count
    pub const MAX_DRAWN_LIVES: u32 = 20;
}
