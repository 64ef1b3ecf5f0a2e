//! Configuration parsing and validation

use crate::constants::audio::{DEFAULT_BLOCK_SIZE, DEFAULT_REFERENCE_LEVEL, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{AppError, AppResult};
use crate::thresholds::{ThresholdKey, ThresholdSet};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command line arguments for the hushmeter application
#[derive(Parser)]
#[command(name = "hushmeter")]
#[command(about = "Sound level monitor that takes a life whenever it gets too loud")]
pub struct Args {
    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor interactively with lives, settings and log export
    Play(PlayArgs),
    /// Monitor for a while, then report the rolling average
    Average(AverageArgs),
    /// List available audio input devices
    List(ListArgs),
}

/// Options shared by every monitoring command
#[derive(ClapArgs, Default)]
pub struct MeterArgs {
    /// Audio input device name (optional, uses default if not specified)
    #[arg(long)]
    pub device: Option<String>,

    /// Rolling average window in seconds [default: 60]
    #[arg(long)]
    pub duration: Option<u32>,

    /// Readings below this many dB are quiet [default: -30]
    #[arg(long, allow_negative_numbers = true)]
    pub low: Option<f64>,

    /// Readings above this many dB are loud and cost a life [default: -18]
    #[arg(long, allow_negative_numbers = true)]
    pub medium: Option<f64>,

    /// Starting lives [default: 3]
    #[arg(long)]
    pub lives: Option<u32>,

    /// Session length in minutes, kept with the thresholds [default: 0]
    #[arg(long)]
    pub minutes: Option<u32>,

    /// Calibration reference level in dB SPL [default: 94]
    #[arg(long, allow_negative_numbers = true)]
    pub reference_level: Option<f64>,

    /// Samples per reading [default: 2048]
    #[arg(long)]
    pub block_size: Option<usize>,

    /// TOML file with a [thresholds] table and capture settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs)]
pub struct PlayArgs {
    #[command(flatten)]
    pub meter: MeterArgs,
}

#[derive(ClapArgs)]
pub struct AverageArgs {
    /// Monitoring duration in seconds
    #[arg(long)]
    pub seconds: f32,

    /// Output only the numbers without labels
    #[arg(long)]
    pub quiet: bool,

    /// Also print every reading, one per line
    #[arg(long)]
    pub export: bool,

    #[command(flatten)]
    pub meter: MeterArgs,
}

#[derive(ClapArgs)]
pub struct ListArgs {}

/// Settings read from a `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub thresholds: ThresholdSet,
    pub reference_level: Option<f64>,
    pub block_size: Option<usize>,
    pub device: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::parse(&text).map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Application configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: ThresholdSet,
    pub reference_level: f64,
    pub block_size: usize,
    pub device_name: Option<String>,
}

impl Config {
    /// Build the configuration: defaults, then the config file, then flags
    pub fn from_meter_args(args: &MeterArgs) -> AppResult<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(file, args)
    }

    fn merge(file: FileConfig, args: &MeterArgs) -> AppResult<Self> {
        let mut thresholds = file.thresholds;

        // Re-apply file values through the registry so they get the same checks as user input
        for key in ThresholdKey::ALL {
            let value = thresholds.get(key);
            thresholds.update(key, value)?;
        }

        let overrides = [
            (ThresholdKey::Duration, args.duration.map(f64::from)),
            (ThresholdKey::Low, args.low),
            (ThresholdKey::Medium, args.medium),
            (ThresholdKey::Lives, args.lives.map(f64::from)),
            (ThresholdKey::Minutes, args.minutes.map(f64::from)),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                thresholds.update(key, value)?;
            }
        }

        if thresholds.duration() == 0 {
            return Err(AppError::Config("Duration must be at least 1 second".into()));
        }
        if thresholds.is_inverted() {
            log::warn!(
                "low threshold {:.1} dB is above medium {:.1} dB, every reading will be moderate",
                thresholds.low(),
                thresholds.medium()
            );
        }

        let reference_level = args
            .reference_level
            .or(file.reference_level)
            .unwrap_or(DEFAULT_REFERENCE_LEVEL);
        if !reference_level.is_finite() {
            return Err(AppError::Config(format!(
                "Reference level must be a finite number, got {}",
                reference_level
            )));
        }

        let block_size = args.block_size.or(file.block_size).unwrap_or(DEFAULT_BLOCK_SIZE);
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(AppError::Config(format!(
                "Block size must be between {} and {} samples, got {}",
                MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, block_size
            )));
        }

        Ok(Config {
            thresholds,
            reference_level,
            block_size,
            device_name: args.device.clone().or(file.device),
        })
    }
}

/// Validate the monitoring length for `average`
pub fn validate_seconds(seconds: f32) -> AppResult<f32> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(AppError::Config("Seconds must be positive".into()))
    }
}
