//! Interactive filename picker.
//!
//! Shows the suggested names in a list above an editable input line. Moving
//! the selection copies that name into the input, where it can be tweaked
//! before Enter accepts it.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Result of the picker interaction.
#[derive(Debug, PartialEq)]
pub enum PickResult {
    /// User accepted a (possibly edited) name.
    Picked(String),
    /// User cancelled (Escape or Ctrl+C).
    Cancelled,
}

/// Selection and input state.
struct Picker {
    choices: Vec<String>,
    list: ListState,
    input: Input,
}

impl Picker {
    fn new(choices: Vec<String>) -> Self {
        let mut picker = Self {
            choices,
            list: ListState::default(),
            input: Input::default(),
        };
        if !picker.choices.is_empty() {
            picker.select(0);
        }
        picker
    }

    fn select(&mut self, index: usize) {
        self.list.select(Some(index));
        self.input = Input::default().with_value(self.choices[index].clone());
    }

    fn next(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        let index = match self.list.selected() {
            Some(i) => (i + 1) % self.choices.len(),
            None => 0,
        };
        self.select(index);
    }

    fn previous(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        let index = match self.list.selected() {
            Some(0) | None => self.choices.len() - 1,
            Some(i) => i - 1,
        };
        self.select(index);
    }

    /// Feed one key press; returns a result once the user is done.
    fn handle_key(&mut self, event: &Event) -> Option<PickResult> {
        let Event::Key(key) = event else {
            return None;
        };
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Enter => {
                let name = self.input.value().trim().to_string();
                if name.is_empty() {
                    Some(PickResult::Cancelled)
                } else {
                    Some(PickResult::Picked(name))
                }
            }
            KeyCode::Esc => Some(PickResult::Cancelled),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(PickResult::Cancelled)
            }
            KeyCode::Down | KeyCode::Tab => {
                self.next();
                None
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.previous();
                None
            }
            _ => {
                self.input.handle_event(event);
                None
            }
        }
    }
}

/// Run the picker on the terminal and return the user's choice.
pub fn pick_name(choices: Vec<String>) -> Result<PickResult> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_picker_loop(&mut terminal, Picker::new(choices));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_picker_loop<B: Backend>(terminal: &mut Terminal<B>, mut picker: Picker) -> Result<PickResult> {
    loop {
        terminal.draw(|frame| draw_ui(frame, &mut picker))?;

        if let Some(result) = picker.handle_key(&event::read()?) {
            return Ok(result);
        }
    }
}

/// Draw the list and input popup.
fn draw_ui(frame: &mut Frame, picker: &mut Picker) {
    let size = frame.area();

    let list_height = picker.choices.len() as u16 + 2;
    let popup_width = size.width.saturating_sub(4).min(80);
    let popup_area = centered_rect(popup_width, list_height + 3, size);
    frame.render_widget(Clear, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(list_height), Constraint::Length(3)])
        .split(popup_area);

    let items: Vec<ListItem> = picker
        .choices
        .iter()
        .enumerate()
        .map(|(i, name)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(name.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" pick a filename ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut picker.list);

    let block = Block::default()
        .title(" enter to accept, esc to cancel ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_area = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    // Scroll the input if cursor is beyond visible area
    let input_width = inner_area.width as usize;
    let cursor_pos = picker.input.visual_cursor();
    let scroll = if cursor_pos >= input_width {
        cursor_pos - input_width + 1
    } else {
        0
    };

    let visible_value: String = picker
        .input
        .value()
        .chars()
        .skip(scroll)
        .take(input_width)
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            visible_value,
            Style::default().fg(Color::White),
        ))),
        inner_area,
    );

    let cursor_x = inner_area.x + (cursor_pos - scroll) as u16;
    frame.set_cursor_position((cursor_x, inner_area.y));
}

/// Create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
