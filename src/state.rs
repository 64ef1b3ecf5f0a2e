//! Application state management

use crate::engine::{Frame, SharedEngine};
use crate::thresholds::ThresholdKey;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Something the user asked for with a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    AddLife,
    RemoveLife,
    ResetLog,
    ToggleExport,
    ToggleSettings,
    TogglePause,
    ScrollUp,
    ScrollDown,
    SelectPrevious,
    SelectNext,
    Input(char),
    Backspace,
    Apply,
}

/// In-progress edit of one threshold in the settings panel
#[derive(Debug, Default, Clone)]
pub struct SettingsEditor {
    selected: usize,
    pub input: String,
    /// Outcome of the last apply: Ok with a confirmation, Err with the reason
    pub message: Option<Result<String, String>>,
}

impl SettingsEditor {
    pub fn selected_key(&self) -> ThresholdKey {
        ThresholdKey::ALL[self.selected % ThresholdKey::ALL.len()]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % ThresholdKey::ALL.len();
        self.input.clear();
    }

    pub fn select_previous(&mut self) {
        self.selected = (self.selected + ThresholdKey::ALL.len() - 1) % ThresholdKey::ALL.len();
        self.input.clear();
    }

    /// Accepts the characters a number can be typed with
    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() || c == '.' || c == '-' {
            self.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }
}

/// What occupies the lower half of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Meter,
    Export { scroll: u16 },
}

/// Internal application state
pub struct AppState {
    pub device_name: String,
    pub frame: Frame,
    pub status: String,
    pub paused: bool,
    pub view: View,
    pub settings: Option<SettingsEditor>,
    pub export_lines: Vec<String>,
}

impl AppState {
    /// Create a new application state from the engine's current frame
    pub fn new(device_name: String, frame: Frame) -> Self {
        Self {
            status: format!("Monitoring {}... Press Esc to quit.", device_name),
            device_name,
            frame,
            paused: false,
            view: View::Meter,
            settings: None,
            export_lines: Vec::new(),
        }
    }

    /// Refresh the displayed values from the engine
    pub fn update_from_engine(&mut self, engine: &SharedEngine) {
        self.frame = engine.lock().frame();
    }

    /// Map a key press to an action for the current view
    pub fn key_action(&self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }

        if self.settings.is_some() {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('s') => Some(Action::ToggleSettings),
                KeyCode::Up => Some(Action::SelectPrevious),
                KeyCode::Down | KeyCode::Tab => Some(Action::SelectNext),
                KeyCode::Enter => Some(Action::Apply),
                KeyCode::Backspace => Some(Action::Backspace),
                KeyCode::Char(c) => Some(Action::Input(c)),
                _ => None,
            };
        }

        if let View::Export { .. } = self.view {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('e') => Some(Action::ToggleExport),
                KeyCode::Up => Some(Action::ScrollUp),
                KeyCode::Down => Some(Action::ScrollDown),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::AddLife),
            KeyCode::Char('-') => Some(Action::RemoveLife),
            KeyCode::Char('r') => Some(Action::ResetLog),
            KeyCode::Char('e') => Some(Action::ToggleExport),
            KeyCode::Char('s') => Some(Action::ToggleSettings),
            KeyCode::Char(' ') => Some(Action::TogglePause),
            _ => None,
        }
    }

    /// Open the export view over `lines`, or close it
    pub fn toggle_export(&mut self, lines: impl FnOnce() -> Vec<String>) {
        self.view = match self.view {
            View::Meter => {
                self.export_lines = lines();
                View::Export { scroll: 0 }
            }
            View::Export { .. } => {
                self.export_lines.clear();
                View::Meter
            }
        };
    }

    pub fn scroll(&mut self, delta: i32) {
        if let View::Export { scroll } = &mut self.view {
            let max = self.export_lines.len().saturating_sub(1) as i32;
            *scroll = (i32::from(*scroll) + delta).clamp(0, max.min(i32::from(u16::MAX))) as u16;
        }
    }

    pub fn toggle_settings(&mut self) {
        self.settings = match self.settings {
            Some(_) => None,
            None => Some(SettingsEditor::default()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::thresholds::ThresholdSet;

    fn state() -> AppState {
        let engine = Engine::new(ThresholdSet::default(), 94.0, 20.0);
        AppState::new("Test Mic".into(), engine.frame())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_meter_keys() {
        let state = state();
        assert_eq!(state.key_action(press(KeyCode::Char('+'))), Some(Action::AddLife));
        assert_eq!(state.key_action(press(KeyCode::Char('-'))), Some(Action::RemoveLife));
        assert_eq!(state.key_action(press(KeyCode::Char('r'))), Some(Action::ResetLog));
        assert_eq!(state.key_action(press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            state.key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(state.key_action(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_settings_keys_capture_input() {
        let mut state = state();
        state.toggle_settings();
        assert_eq!(state.key_action(press(KeyCode::Char('-'))), Some(Action::Input('-')));
        assert_eq!(state.key_action(press(KeyCode::Esc)), Some(Action::ToggleSettings));
        assert_eq!(state.key_action(press(KeyCode::Enter)), Some(Action::Apply));
    }

    #[test]
    fn test_settings_editor() {
        let mut editor = SettingsEditor::default();
        assert_eq!(editor.selected_key(), ThresholdKey::Duration);
        editor.select_previous();
        assert_eq!(editor.selected_key(), ThresholdKey::Minutes);
        editor.select_next();
        editor.select_next();
        assert_eq!(editor.selected_key(), ThresholdKey::Low);

        for c in "-3a2.5".chars() {
            editor.push(c);
        }
        assert_eq!(editor.input, "-32.5");
        editor.backspace();
        assert_eq!(editor.take_input(), "-32.");
        assert!(editor.input.is_empty());
    }

    #[test]
    fn test_export_view_scrolls_within_log() {
        let mut state = state();
        state.toggle_export(|| vec!["-20.0".into(), "-21.0".into(), "-22.0".into()]);
        assert_eq!(state.view, View::Export { scroll: 0 });
        assert_eq!(state.key_action(press(KeyCode::Down)), Some(Action::ScrollDown));

        state.scroll(5);
        assert_eq!(state.view, View::Export { scroll: 2 });
        state.scroll(-10);
        assert_eq!(state.view, View::Export { scroll: 0 });

        state.toggle_export(Vec::new);
        assert_eq!(state.view, View::Meter);
        assert!(state.export_lines.is_empty());
    }
}
