//! UI rendering and layout utilities

use crate::constants::audio::MIN_DB_LEVEL;
use crate::constants::ui::{BAR_BORDER_WIDTH, MAX_DRAWN_LIVES};
use crate::machine::{classify, Level};
use crate::state::{AppState, SettingsEditor, View};
use crate::thresholds::{ThresholdKey, ThresholdSet};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Colour used for each loudness level
pub fn level_color(level: Level) -> Color {
    match level {
        Level::Quiet => Color::Green,
        Level::Moderate => Color::Yellow,
        Level::Loud => Color::Red,
    }
}

/// Position of a dB value on a gauge `width` cells wide, from MIN_DB_LEVEL to 0
fn gauge_position(db: f64, width: usize) -> usize {
    let ratio = ((db - MIN_DB_LEVEL) / -MIN_DB_LEVEL).clamp(0.0, 1.0);
    (ratio * width.saturating_sub(1) as f64).round() as usize
}

/// dB value at the centre of gauge cell `i`
fn cell_db(i: usize, width: usize) -> f64 {
    MIN_DB_LEVEL + (i as f64 + 0.5) / width as f64 * -MIN_DB_LEVEL
}

/// Create a bar showing the current level, coloured by the cutoffs
pub fn create_gradient_bar(width: usize, ratio: f64, thresholds: &ThresholdSet) -> Line<'static> {
    let filled = (ratio * width as f64) as usize;
    let partial_fill = (ratio * width as f64) - filled as f64;
    let mut spans = Vec::with_capacity(width);

    for i in 0..width {
        let color = level_color(classify(cell_db(i, width), thresholds));

        let ch = if i < filled {
            '█'
        } else if i == filled && partial_fill > 0.0 {
            match (partial_fill * 8.0) as usize {
                0..=1 => '░',
                2..=3 => '▒',
                4..=5 => '▓',
                _ => '█',
            }
        } else {
            '░'
        };
        spans.push(Span::styled(ch.to_string(), Style::default().fg(color)));
    }

    Line::from(spans)
}

/// Create the scale under the bar with markers at the low and medium cutoffs
pub fn create_db_labels(width: usize, thresholds: &ThresholdSet) -> Line<'static> {
    if width == 0 {
        return Line::default();
    }
    let low_pos = gauge_position(thresholds.low(), width);
    let medium_pos = gauge_position(thresholds.medium(), width);
    let mut spans = Vec::with_capacity(width);

    let mut i = 0;
    while i < width {
        let (text, style) = if i == medium_pos {
            ("▲".to_string(), Style::default().fg(Color::Red))
        } else if i == low_pos {
            ("▲".to_string(), Style::default().fg(Color::Green))
        } else if i == 0 {
            (format!("{}", MIN_DB_LEVEL), Style::default().fg(Color::DarkGray))
        } else if i == width - 1 {
            ("0".to_string(), Style::default().fg(Color::DarkGray))
        } else {
            (" ".to_string(), Style::default())
        };
        // multi-character labels use up the cells they cover
        let text: String = text.chars().take(width - i).collect();
        i += text.chars().count().max(1);
        spans.push(Span::styled(text, style));
    }

    Line::from(spans)
}

/// One heart per life, collapsing to a count when there are many
pub fn lives_line(lives: u32) -> Line<'static> {
    let heart = Style::default().fg(Color::Red);
    if lives == 0 {
        return Line::from(Span::styled("No lives left", Style::default().fg(Color::DarkGray)));
    }
    if lives > MAX_DRAWN_LIVES {
        return Line::from(vec![
            Span::styled("♥", heart),
            Span::raw(format!(" x {}", lives)),
        ]);
    }
    Line::from(Span::styled(vec!["♥"; lives as usize].join(" "), heart))
}

fn readings_line(state: &AppState) -> Line<'static> {
    let frame = &state.frame;
    let (label, color) = match frame.level {
        Some(level) => (level.label(), level_color(level)),
        None => ("—", Color::DarkGray),
    };
    Line::from(vec![
        Span::raw(format!("Current: {} dB   ", frame.decibels_text())),
        Span::raw(format!(
            "Average ({}s): {} dB   ",
            frame.thresholds.duration(),
            frame.average_text()
        )),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

fn settings_lines(editor: &SettingsEditor, thresholds: &ThresholdSet) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = ThresholdKey::ALL
        .into_iter()
        .map(|key| {
            let selected = key == editor.selected_key();
            let value = if key.is_integer() {
                format!("{}", thresholds.get(key))
            } else {
                format!("{:.1}", thresholds.get(key))
            };
            let text = if selected {
                format!("> {:<9}{:>7}  [{}_]", key.name(), value, editor.input)
            } else {
                format!("  {:<9}{:>7}", key.name(), value)
            };
            let style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(text, style))
        })
        .collect();

    lines.push(Line::default());
    match &editor.message {
        Some(Ok(msg)) => lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Green)))),
        Some(Err(msg)) => lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Red)))),
        None => lines.push(Line::from(Span::styled(
            "Up/Down select, Enter apply, Esc close",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

fn render_gauge(f: &mut Frame, area: Rect, state: &AppState) {
    let frame = &state.frame;
    let db_ratio = ((frame.decibels - MIN_DB_LEVEL) / -MIN_DB_LEVEL).clamp(0.0, 1.0);
    let bar_width = (area.width as usize).saturating_sub(BAR_BORDER_WIDTH);
    let bar_line = create_gradient_bar(bar_width, db_ratio, &frame.thresholds);
    let label_line = create_db_labels(bar_width, &frame.thresholds);
    let gauge = Paragraph::new(vec![bar_line, label_line]).block(
        Block::default()
            .title(format!(
                "Low {:.1} dB / Medium {:.1} dB",
                frame.thresholds.low(),
                frame.thresholds.medium()
            ))
            .borders(Borders::ALL),
    );
    f.render_widget(gauge, area);
}

/// Render the complete UI
pub fn render_ui(f: &mut Frame, state: &AppState) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(4),
        ])
        .split(size);

    let device_block = Block::default().title("Device").borders(Borders::ALL);
    let device_text = Paragraph::new(state.device_name.as_str()).block(device_block);
    f.render_widget(device_text, chunks[0]);

    let status = if state.paused {
        "Paused. Space to resume, Esc to quit.".to_string()
    } else {
        state.status.clone()
    };
    let status_block = Block::default()
        .title(format!(
            "Status ({} readings at {:.1}/s)",
            state.frame.history_len, state.frame.cadence
        ))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(status).block(status_block), chunks[1]);

    let readings = Paragraph::new(readings_line(state)).block(Block::default().title("Level").borders(Borders::ALL));
    f.render_widget(readings, chunks[2]);

    let lives = Paragraph::new(lives_line(state.frame.lives))
        .block(Block::default().title("Lives (+/-)").borders(Borders::ALL));
    f.render_widget(lives, chunks[3]);

    match state.view {
        View::Export { scroll } => {
            let text = if state.export_lines.is_empty() {
                "No readings logged.".to_string()
            } else {
                state.export_lines.join("\n")
            };
            let export = Paragraph::new(text).scroll((scroll, 0)).block(
                Block::default()
                    .title(format!("Export ({} readings, e to close)", state.export_lines.len()))
                    .borders(Borders::ALL),
            );
            f.render_widget(export, chunks[4]);
        }
        View::Meter => match &state.settings {
            Some(editor) => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .split(chunks[4]);
                render_gauge(f, halves[0], state);
                let panel = Paragraph::new(settings_lines(editor, &state.frame.thresholds))
                    .block(Block::default().title("Settings").borders(Borders::ALL));
                f.render_widget(panel, halves[1]);
            }
            None => render_gauge(f, chunks[4], state),
        },
    }
}
