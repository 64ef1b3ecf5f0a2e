//! Main application logic and orchestration

use crate::capture::{self, Capture};
use crate::config::Config;
use crate::engine::{spawn_processor, Engine, SharedEngine};
use crate::error::{AppError, AppResult, MeterResult};
use crate::machine::LifeAdjustment;
use crate::state::{Action, AppState};
use crate::ui;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Main application struct
pub struct App {
    config: Config,
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
}

/// Exit codes for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    UserExit = 1, // User pressed Escape or Ctrl+C
    Error = 2,    // Actual application error
}

/// Result type that includes user exit information
pub type AppRunResult = Result<(), AppError>;

/// Extended result that tracks exit reason
pub struct RunResult {
    pub result: AppRunResult,
    pub exit_code: ExitCode,
}

/// What happened while a monitoring engine ran without a UI
#[derive(Debug, Clone, PartialEq)]
pub struct AverageReport {
    pub average: MeterResult<f64>,
    pub readings: usize,
    pub lives: u32,
    pub lives_lost: u32,
    /// Every reading, newline-joined
    pub export: String,
}

/// Capture plus the processing task that consumes its blocks
struct Pipeline {
    engine: SharedEngine,
    sender: mpsc::Sender<Vec<f32>>,
    processor: JoinHandle<usize>,
    capture: Option<Capture>,
}

impl Pipeline {
    fn start(config: &Config) -> AppResult<Self> {
        let (sender, receiver) = capture::block_channel();
        let capture = Capture::start(config.device_name.as_deref(), config.block_size, sender.clone())?;
        let engine = SharedEngine::new(Engine::new(
            config.thresholds.clone(),
            config.reference_level,
            capture.cadence(),
        ));
        let processor = spawn_processor(engine.clone(), receiver);
        Ok(Self {
            engine,
            sender,
            processor,
            capture: Some(capture),
        })
    }

    fn device_name(&self) -> String {
        self.capture
            .as_ref()
            .map(|c| c.config().device_name.clone())
            .unwrap_or_default()
    }

    /// Stop or restart capture; the log and thresholds carry over
    fn toggle_capture(&mut self, config: &Config) -> AppResult<bool> {
        if self.capture.take().is_some() {
            return Ok(false);
        }
        let capture = Capture::start(config.device_name.as_deref(), config.block_size, self.sender.clone())?;
        self.engine.with(|e| e.set_cadence(capture.cadence()));
        self.capture = Some(capture);
        Ok(true)
    }

    /// Stop capture and wait for blocks already delivered to be processed
    async fn stop(self) -> AppResult<SharedEngine> {
        drop(self.capture);
        drop(self.sender);
        self.processor
            .await
            .map_err(|e| AppError::AudioStream(format!("Processing task failed: {}", e)))?;
        Ok(self.engine)
    }
}

/// Record the outcome of pausing or resuming capture.
///
/// A device that fails to reopen leaves the monitor paused; the log and
/// lives stay available for export.
pub fn apply_capture_toggle(state: &mut AppState, result: AppResult<bool>) {
    match result {
        Ok(running) => state.paused = !running,
        Err(e) => {
            log::warn!("could not resume capture: {}", e);
            state.paused = true;
            state.status = format!("Could not resume: {}", e);
        }
    }
}

/// Apply a key action that only touches the engine and the screen state.
/// Returns true when the user asked to quit.
pub fn apply_action(state: &mut AppState, engine: &SharedEngine, action: Action) -> bool {
    match action {
        Action::Quit => return true,
        Action::AddLife | Action::RemoveLife => {
            let adjustment = if action == Action::AddLife {
                LifeAdjustment::Add
            } else {
                LifeAdjustment::Remove
            };
            let result = engine.with(|e| {
                let before = e.thresholds().lives();
                e.adjust_lives(adjustment).map(|after| (before, after))
            });
            match result {
                Ok((0, 0)) => state.status = "No lives to take!".to_string(),
                Ok((_, lives)) => state.status = format!("You now have {} lives", lives),
                Err(e) => state.status = e.to_string(),
            }
        }
        Action::ResetLog => {
            engine.with(|e| e.reset_log());
            state.status = "Log reset".to_string();
        }
        Action::ToggleExport => {
            state.toggle_export(|| engine.lock().export_log());
        }
        Action::ToggleSettings => state.toggle_settings(),
        Action::ScrollUp => state.scroll(-1),
        Action::ScrollDown => state.scroll(1),
        Action::SelectPrevious | Action::SelectNext | Action::Input(_) | Action::Backspace | Action::Apply => {
            if let Some(editor) = state.settings.as_mut() {
                match action {
                    Action::SelectPrevious => editor.select_previous(),
                    Action::SelectNext => editor.select_next(),
                    Action::Input(c) => editor.push(c),
                    Action::Backspace => editor.backspace(),
                    _ => {
                        let key = editor.selected_key();
                        let input = editor.take_input();
                        let result = engine.with(|e| e.update_threshold(key.name(), input.as_str()));
                        editor.message = Some(
                            result
                                .map(|()| format!("{} set to {}", key, input.trim()))
                                .map_err(|e| e.to_string()),
                        );
                    }
                }
            }
        }
        // capture is owned by the run loop
        Action::TogglePause => {}
    }
    state.update_from_engine(engine);
    false
}

impl App {
    /// Initialize the application with configuration
    pub fn new_with_config(config: Config) -> AppResult<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(App { config, terminal })
    }

    /// Run the interactive monitor until the user quits
    pub async fn run(mut self) -> RunResult {
        let outcome = self.run_loop().await;
        let _ = self.cleanup(); // Ignore cleanup errors

        match outcome {
            Ok(exit_code) => RunResult {
                result: Ok(()),
                exit_code,
            },
            Err(e) => RunResult {
                result: Err(e),
                exit_code: ExitCode::Error,
            },
        }
    }

    async fn run_loop(&mut self) -> AppResult<ExitCode> {
        let mut pipeline = Pipeline::start(&self.config)?;
        let engine = pipeline.engine.clone();
        let mut app_state = AppState::new(pipeline.device_name(), engine.lock().frame());

        let mut interval = tokio::time::interval(Duration::from_millis(crate::constants::ui::UPDATE_INTERVAL_MS));
        let exit_reason;

        loop {
            app_state.update_from_engine(&engine);

            self.terminal.draw(|f| ui::render_ui(f, &app_state))?;

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    exit_reason = ExitCode::UserExit;
                    break;
                }
                _ = interval.tick() => {}
            }

            let mut quit = false;
            while crossterm::event::poll(Duration::from_millis(0))? {
                let Event::Key(key_event) = crossterm::event::read()? else {
                    continue;
                };
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                let Some(action) = app_state.key_action(key_event) else {
                    continue;
                };

                if action == Action::TogglePause {
                    apply_capture_toggle(&mut app_state, pipeline.toggle_capture(&self.config));
                    continue;
                }
                if apply_action(&mut app_state, &engine, action) {
                    quit = true;
                    break;
                }
            }

            if quit {
                exit_reason = ExitCode::UserExit;
                break;
            }
        }

        pipeline.stop().await?;
        Ok(exit_reason)
    }

    /// Clean up terminal state
    fn cleanup(mut self) -> AppResult<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Monitor for `seconds` without a UI and report what the engine saw
pub async fn run_average(config: &Config, seconds: f32) -> AppResult<AverageReport> {
    let pipeline = Pipeline::start(config)?;
    let starting_lives = config.thresholds.lives();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("interrupted, reporting early"),
        _ = tokio::time::sleep(Duration::from_secs_f32(seconds)) => {}
    }

    let engine = pipeline.stop().await?;
    let engine = engine.lock();
    let lives = engine.thresholds().lives();
    log::info!(
        "monitored {} readings at {:.2} readings/s",
        engine.history_len(),
        engine.cadence()
    );
    Ok(AverageReport {
        average: engine.average(),
        readings: engine.history_len(),
        lives,
        lives_lost: starting_lives.saturating_sub(lives),
        export: engine.export_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::db_to_amplitude;
    use crate::machine::Level;
    use crate::thresholds::{ThresholdKey, ThresholdSet};

    fn setup() -> (AppState, SharedEngine) {
        let engine = SharedEngine::new(Engine::new(ThresholdSet::default(), 94.0, 20.0));
        let state = AppState::new("Test Mic".into(), engine.lock().frame());
        (state, engine)
    }

    #[test]
    fn test_life_buttons() {
        let (mut state, engine) = setup();
        assert!(!apply_action(&mut state, &engine, Action::AddLife));
        assert_eq!(state.frame.lives, 4);

        for _ in 0..6 {
            apply_action(&mut state, &engine, Action::RemoveLife);
        }
        assert_eq!(state.frame.lives, 0);
        assert_eq!(state.status, "No lives to take!");
    }

    #[test]
    fn test_settings_apply() {
        let (mut state, engine) = setup();
        apply_action(&mut state, &engine, Action::ToggleSettings);
        apply_action(&mut state, &engine, Action::SelectNext);
        for c in "-25.5".chars() {
            apply_action(&mut state, &engine, Action::Input(c));
        }
        apply_action(&mut state, &engine, Action::Apply);
        assert_eq!(state.frame.thresholds.low(), -25.5);
        assert_eq!(
            state.settings.as_ref().and_then(|s| s.message.clone()),
            Some(Ok("low set to -25.5".to_string()))
        );

        // lives rejects a fraction and keeps its value
        apply_action(&mut state, &engine, Action::SelectNext);
        apply_action(&mut state, &engine, Action::SelectNext);
        for c in "1.5".chars() {
            apply_action(&mut state, &engine, Action::Input(c));
        }
        apply_action(&mut state, &engine, Action::Apply);
        assert!(matches!(
            state.settings.as_ref().and_then(|s| s.message.clone()),
            Some(Err(_))
        ));
        assert_eq!(engine.lock().thresholds().get(ThresholdKey::Lives), 3.0);
    }

    #[test]
    fn test_reset_and_export() {
        let (mut state, engine) = setup();
        let block = vec![db_to_amplitude(-10.0) as f32; 128];
        engine.with(|e| e.process_block(&block));
        engine.with(|e| e.process_block(&block));
        state.update_from_engine(&engine);
        assert_eq!(state.frame.level, Some(Level::Loud));
        assert_eq!(state.frame.lives, 1);

        apply_action(&mut state, &engine, Action::ToggleExport);
        assert_eq!(state.export_lines, vec!["-10.0", "-10.0"]);
        apply_action(&mut state, &engine, Action::ToggleExport);

        apply_action(&mut state, &engine, Action::ResetLog);
        assert_eq!(state.frame.history_len, 0);
        assert_eq!(state.frame.level, None);
        apply_action(&mut state, &engine, Action::ToggleExport);
        assert!(state.export_lines.is_empty());
    }

    #[test]
    fn test_failed_resume_stays_paused() {
        let (mut state, engine) = setup();
        engine.with(|e| e.process_block(&[0.1; 64]));

        apply_capture_toggle(&mut state, Ok(false));
        assert!(state.paused);

        apply_capture_toggle(
            &mut state,
            Err(AppError::AudioDevice("Device 'USB Mic' not found".into())),
        );
        assert!(state.paused);
        assert!(state.status.contains("Device 'USB Mic' not found"));

        // the session survives and can still be exported
        apply_action(&mut state, &engine, Action::ToggleExport);
        assert_eq!(state.export_lines, vec!["-20.0"]);

        apply_capture_toggle(&mut state, Ok(true));
        assert!(!state.paused);
    }

    #[test]
    fn test_remove_life_reports_actual_change() {
        let (mut state, engine) = setup();
        engine.with(|e| e.update_threshold("lives", "1")).unwrap();
        apply_action(&mut state, &engine, Action::RemoveLife);
        assert_eq!(state.status, "You now have 0 lives");
        apply_action(&mut state, &engine, Action::RemoveLife);
        assert_eq!(state.status, "No lives to take!");
    }

    #[test]
    fn test_quit() {
        let (mut state, engine) = setup();
        assert!(apply_action(&mut state, &engine, Action::Quit));
    }
}
