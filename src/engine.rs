//! Per-block metering pipeline and the commands presenters send into it

use crate::average;
use crate::constants::audio::SILENCE_FLOOR_DB;
use crate::constants::ui::NO_AVERAGE;
use crate::error::MeterResult;
use crate::history::{HistoryLog, Reading};
use crate::level::{format_db, round_tenth, LevelConverter};
use crate::machine::{self, Level, LifeAdjustment};
use crate::thresholds::{RawValue, ThresholdSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything one sample block produced
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    /// Reading for the block, rounded to one decimal
    pub decibels: f64,
    /// Rolling average including this reading
    pub average: MeterResult<f64>,
    pub level: Level,
    pub lives: u32,
    pub life_lost: bool,
}

/// Values a presenter needs to draw the current state
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub decibels: f64,
    pub average: Option<f64>,
    /// `None` until the first reading after start or reset
    pub level: Option<Level>,
    pub lives: u32,
    pub history_len: usize,
    pub thresholds: ThresholdSet,
    pub cadence: f64,
}

impl Frame {
    pub fn decibels_text(&self) -> String {
        format_db(self.decibels)
    }

    pub fn average_text(&self) -> String {
        self.average
            .map(format_db)
            .unwrap_or_else(|| NO_AVERAGE.to_string())
    }
}

/// The metering core: converter, history log, thresholds and lives
pub struct Engine {
    converter: LevelConverter,
    history: HistoryLog,
    thresholds: ThresholdSet,
    cadence: f64,
    current_level: Option<Level>,
}

impl Engine {
    /// Create an engine.
    ///
    /// `cadence` is the capture rate in readings per second; it turns the
    /// `duration` threshold into a record count.
    pub fn new(thresholds: ThresholdSet, reference_level: f64, cadence: f64) -> Self {
        let converter = LevelConverter::new(reference_level);
        log::debug!(
            "reference level {:.1} dB SPL, adjustment factor {:.4}",
            reference_level,
            converter.adjustment_factor()
        );
        Self {
            converter,
            history: HistoryLog::new(),
            thresholds,
            cadence,
            current_level: None,
        }
    }

    /// Run one block through convert, append, average and evaluate
    pub fn process_block(&mut self, block: &[f32]) -> BlockOutcome {
        let decibels = round_tenth(self.converter.convert(block));
        self.history.append(Reading::new(decibels));
        let average = self.average();

        let evaluation = machine::evaluate(decibels, &mut self.thresholds);

        self.current_level = Some(evaluation.level);

        BlockOutcome {
            decibels,
            average,
            level: evaluation.level,
            lives: evaluation.lives,
            life_lost: evaluation.life_lost,
        }
    }

    /// Rolling average over the configured duration
    pub fn average(&self) -> MeterResult<f64> {
        average::average(f64::from(self.thresholds.duration()), &self.history, self.cadence)
    }

    pub fn update_threshold<'a>(&mut self, key: &str, raw: impl Into<RawValue<'a>>) -> MeterResult<()> {
        let result = self.thresholds.update_named(key, raw);
        if let Err(e) = &result {
            log::warn!("threshold update rejected: {}", e);
        }
        result
    }

    pub fn adjust_lives(&mut self, adjustment: LifeAdjustment) -> MeterResult<u32> {
        machine::adjust_lives(&mut self.thresholds, adjustment)
    }

    /// Empty the history log; thresholds and lives are kept
    pub fn reset_log(&mut self) {
        log::info!("history log reset after {} readings", self.history.len());
        self.history.clear();
        self.current_level = None;
    }

    pub fn export_log(&self) -> Vec<String> {
        self.history.export()
    }

    pub fn export_text(&self) -> String {
        self.history.export_text()
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn cadence(&self) -> f64 {
        self.cadence
    }

    /// Switch to a new capture rate, e.g. after reopening the device
    pub fn set_cadence(&mut self, cadence: f64) {
        self.cadence = cadence;
    }

    pub fn frame(&self) -> Frame {
        Frame {
            decibels: self
                .history
                .latest()
                .map_or(SILENCE_FLOOR_DB, Reading::decibels),
            average: self.average().ok(),
            level: self.current_level,
            lives: self.thresholds.lives(),
            history_len: self.history.len(),
            thresholds: self.thresholds.clone(),
            cadence: self.cadence,
        }
    }
}

/// Engine behind one mutex, shared between the audio path and user commands.
///
/// A whole block pass runs under a single lock, so a manual lives change can
/// never interleave with the loud-reading decrement.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine. Every mutation finishes before its guard drops, so a
    /// poisoned lock still holds consistent state and is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Spawn the consumer that processes delivered blocks one at a time.
///
/// The task ends once every sender is dropped and the queue has drained,
/// returning how many blocks it processed.
pub fn spawn_processor(engine: SharedEngine, mut blocks: mpsc::Receiver<Vec<f32>>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut processed = 0;
        while let Some(block) = blocks.recv().await {
            let outcome = engine.with(|e| e.process_block(&block));
            if outcome.life_lost {
                log::debug!("{} lives left", outcome.lives);
            }
            processed += 1;
        }
        log::info!("processor stopped after {} blocks", processed);
        processed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeterError;
    use crate::level::db_to_amplitude;
    use crate::thresholds::ThresholdKey;

    const CADENCE: f64 = 20.0;

    fn block_at(db: f64) -> Vec<f32> {
        vec![db_to_amplitude(db) as f32; 256]
    }

    fn engine(duration: u32, low: f64, medium: f64, lives: u32) -> Engine {
        let mut set = ThresholdSet::default();
        set.update(ThresholdKey::Duration, duration).unwrap();
        set.update(ThresholdKey::Low, low).unwrap();
        set.update(ThresholdKey::Medium, medium).unwrap();
        set.update(ThresholdKey::Lives, lives).unwrap();
        Engine::new(set, 94.0, CADENCE)
    }

    #[test]
    fn test_loud_readings_drain_lives() {
        let mut engine = engine(60, -30.0, -18.0, 3);
        for expected in [2, 1, 0] {
            let outcome = engine.process_block(&block_at(-10.0));
            assert_eq!(outcome.decibels, -10.0);
            assert_eq!(outcome.level, Level::Loud);
            assert_eq!(outcome.lives, expected);
            assert!(outcome.life_lost);
        }

        let outcome = engine.process_block(&block_at(-10.0));
        assert_eq!(outcome.level, Level::Loud);
        assert_eq!(outcome.lives, 0);
        assert!(!outcome.life_lost);
        assert_eq!(engine.thresholds().lives(), 0);
    }

    #[test]
    fn test_average_tracks_recent_window() {
        let mut engine = engine(1, -30.0, -18.0, 0);
        for _ in 0..15 {
            engine.process_block(&block_at(-40.0));
        }
        for _ in 0..15 {
            engine.process_block(&block_at(-10.0));
        }
        assert_eq!(engine.history_len(), 30);
        let avg = engine.average().unwrap();
        assert!((avg + 17.5).abs() < 1e-9, "got {avg}");
    }

    #[test]
    fn test_silence_produces_floor_reading() {
        let mut engine = engine(60, -30.0, -18.0, 3);
        let outcome = engine.process_block(&[0.0; 512]);
        assert_eq!(outcome.decibels, SILENCE_FLOOR_DB);
        assert_eq!(outcome.level, Level::Quiet);
        assert_eq!(outcome.average, Ok(SILENCE_FLOOR_DB));
    }

    #[test]
    fn test_reset_then_export() {
        let mut engine = engine(60, -30.0, -18.0, 3);
        engine.process_block(&block_at(-25.0));
        engine.process_block(&block_at(-12.0));
        assert_eq!(engine.export_log(), vec!["-25.0", "-12.0"]);
        assert_eq!(engine.export_text(), "-25.0\n-12.0");

        engine.reset_log();
        assert!(engine.export_log().is_empty());
        assert_eq!(engine.average(), Err(MeterError::InsufficientData));
        assert_eq!(engine.frame().average_text(), NO_AVERAGE);
        assert_eq!(engine.frame().level, None);
        // reset does not give lives back
        assert_eq!(engine.thresholds().lives(), 2);

        engine.process_block(&block_at(-40.0));
        assert_eq!(engine.export_log(), vec!["-40.0"]);
    }

    #[test]
    fn test_commands() {
        let mut engine = engine(60, -30.0, -18.0, 0);
        assert_eq!(engine.adjust_lives(LifeAdjustment::Remove), Ok(0));
        assert_eq!(engine.adjust_lives(LifeAdjustment::Add), Ok(1));

        engine.update_threshold("medium", "-5.5").unwrap();
        assert_eq!(engine.thresholds().medium(), -5.5);
        assert!(matches!(
            engine.update_threshold("treble", "1"),
            Err(MeterError::UnknownThresholdKey(_))
        ));
        assert!(matches!(
            engine.update_threshold("lives", "lots"),
            Err(MeterError::InvalidThresholdValue { .. })
        ));
        assert_eq!(engine.thresholds().lives(), 1);

        // engine keeps working after a rejected command
        let outcome = engine.process_block(&block_at(-10.0));
        assert_eq!(outcome.level, Level::Moderate);
    }

    #[test]
    fn test_frame_formatting() {
        let mut engine = engine(60, -30.0, -18.0, 3);
        engine.process_block(&block_at(-21.04));
        let frame = engine.frame();
        assert_eq!(frame.decibels_text(), "-21.0");
        assert_eq!(frame.average_text(), "-21.0");
        assert_eq!(frame.level, Some(Level::Moderate));
        assert_eq!(frame.history_len, 1);
        assert_eq!(frame.cadence, CADENCE);
    }

    #[test]
    fn test_shared_engine_has_no_lost_lives_updates() {
        let shared = SharedEngine::new(engine(60, -30.0, -18.0, 1000));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            shared.with(|e| e.process_block(&block_at(-10.0)));
                        } else {
                            shared.with(|e| e.adjust_lives(LifeAdjustment::Add)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // 200 loud readings and 200 manual additions cancel out
        assert_eq!(shared.lock().thresholds().lives(), 1000);
        assert_eq!(shared.lock().history_len(), 200);
    }

    #[tokio::test]
    async fn test_processor_drains_queue() {
        let shared = SharedEngine::new(engine(60, -30.0, -18.0, 3));
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_processor(shared.clone(), rx);

        for _ in 0..3 {
            tx.send(block_at(-10.0)).await.unwrap();
        }
        drop(tx);

        assert_eq!(handle.await.unwrap(), 3);
        let frame = shared.lock().frame();
        assert_eq!(frame.lives, 0);
        assert_eq!(frame.history_len, 3);
    }
}
