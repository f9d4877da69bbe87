//! Yes/No confirmation dialog
//!
//! Left/Right/Tab move the selection, Enter answers with the selected
//! option, `y`/`n` answer directly and Escape cancels.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_confirm::{ConfirmProps, Responder, View};

const WIDTH: u16 = 44;
const HEIGHT: u16 = 8;

/// Props the demo passes to the dialog
#[derive(Debug, Clone)]
pub struct Question {
    pub title: String,
    pub message: String,
}

pub struct ConfirmDialog {
    question: Question,
    selected_yes: bool,
    responder: Responder<bool, ()>,
}

/// Component building a [`ConfirmDialog`]
pub fn confirm_dialog(props: ConfirmProps<Question, bool, ()>) -> Result<Box<dyn View>> {
    if props.props.message.trim().is_empty() {
        anyhow::bail!("confirmation message is empty");
    }

    Ok(Box::new(ConfirmDialog {
        question: props.props,
        // Default to "No" for safety
        selected_yes: false,
        responder: props.responder,
    }))
}

impl ConfirmDialog {
    fn centered(area: Rect) -> Rect {
        let width = WIDTH.min(area.width);
        let height = HEIGHT.min(area.height);
        Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        }
    }

    fn button(label: &str, selected: bool) -> Paragraph<'_> {
        let style = if selected {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        Paragraph::new(format!(" {} ", label))
            .style(style)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
    }
}

impl View for ConfirmDialog {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let dialog_area = Self::centered(area);
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.question.title.clone())
            .style(Style::default().fg(Color::White));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(inner);

        let message = Paragraph::new(self.question.message.clone())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(message, rows[0]);

        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        frame.render_widget(Self::button("Yes", self.selected_yes), buttons[0]);
        frame.render_widget(Self::button("No", !self.selected_yes), buttons[1]);
    }

    fn handle_key_event(&mut self, event: KeyEvent) -> Result<bool> {
        match event.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.selected_yes = !self.selected_yes;
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.responder.resolve(self.selected_yes),
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.selected_yes = true;
                self.responder.resolve(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.selected_yes = false;
                self.responder.resolve(false);
            }
            KeyCode::Esc | KeyCode::Char('q') => self.responder.reject(()),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn is_visible(&self) -> bool {
        // Hide as soon as an answer is in, the unmount follows after the grace delay.
        !self.responder.is_settled()
    }
}
